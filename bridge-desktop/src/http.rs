//! `HttpClient` over reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse},
};
use reqwest::{Client, Method};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("cloud-browser/", env!("CARGO_PKG_VERSION"));

/// When to try a request again.
///
/// Rate limiting (429), 5xx answers and transport errors are retried with
/// doubling delays capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// No retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay after failed attempt number `attempt` (1-based)
    fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn should_retry(status: u16) -> bool {
        status == 429 || status >= 500
    }
}

/// Desktop HTTP client with pooling and retries
pub struct ReqwestHttpClient {
    client: Client,
    retry: RetryPolicy,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Client whose requests default to `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        }
    }

    async fn send_once(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, reqwest::Error> {
        let mut builder = self
            .client
            .request(Self::method(request.method), &request.url);

        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();
        let body = response.bytes().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!(attempt, method = ?request.method, "Sending HTTP request");

            let error = match self.send_once(&request).await {
                Ok(response) if RetryPolicy::should_retry(response.status) && attempt < attempts => {
                    warn!(status = response.status, attempt, "Retryable HTTP status");
                    None
                }
                Ok(response) => return Ok(response),
                Err(e) => Some(e),
            };

            if let Some(e) = error {
                warn!(error = %e, attempt, "HTTP request failed");
                if attempt >= attempts {
                    let message = if e.is_timeout() {
                        "Request timed out".to_string()
                    } else if e.is_connect() {
                        format!("Connection failed: {}", e)
                    } else {
                        e.to_string()
                    };
                    return Err(BridgeError::OperationFailed(message));
                }
            }

            sleep(self.retry.delay(attempt)).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_http_client_creation() {
        let client = ReqwestHttpClient::new()
            .unwrap()
            .with_retry_policy(RetryPolicy::none());
        assert_eq!(client.retry.max_attempts, 1);
    }

    #[test]
    fn test_method_conversion() {
        assert_eq!(ReqwestHttpClient::method(HttpMethod::Get), Method::GET);
        assert_eq!(ReqwestHttpClient::method(HttpMethod::Post), Method::POST);
    }

    #[test]
    fn test_retry_delay_doubles_up_to_cap() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
        };

        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(200));
        assert_eq!(policy.delay(4), Duration::from_millis(300));
        assert_eq!(policy.delay(40), Duration::from_millis(300));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(RetryPolicy::should_retry(429));
        assert!(RetryPolicy::should_retry(503));
        assert!(!RetryPolicy::should_retry(401));
        assert!(!RetryPolicy::should_retry(404));
    }
}
