//! OAuth 1.0 request signing and the three-legged authorization flow
//!
//! Dropbox API v1 accepts `PLAINTEXT` signatures over TLS: the signature is
//! the percent-encoded app secret and token secret joined by `&`. Like every
//! other header parameter the result is percent-encoded once more, so a `%`
//! inside a secret reaches the wire as `%25`.
//!
//! ## Flow
//!
//! ```ignore
//! let pending = authenticator.start_authorization().await?;
//! open_browser(pending.authorize_url());
//! // ... user approves, host sees the redirect ...
//! let result = authenticator.finish_authorization(pending).await?;
//! service.complete_authentication(result).await?;
//! ```

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::time::{Clock, SystemClock};
use bytes::Bytes;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::DropboxConfig;
use crate::credentials::Credentials;
use crate::error::{DropboxError, Result};
use crate::types::{AccountInfo, TokenPair};

const NONCE_LENGTH: usize = 16;

/// Computes the `Authorization` header for a request.
///
/// Must be a pure function of the credentials apart from nonce and timestamp.
pub trait RequestSigner: Send + Sync {
    fn authorization_header(&self, credentials: &Credentials) -> String;
}

/// A started authorization attempt awaiting user approval.
///
/// Consumed by [`DropboxAuthenticator::finish_authorization`].
#[derive(Debug)]
pub struct PendingAuthorization {
    request_token: Credentials,
    authorize_url: String,
}

impl PendingAuthorization {
    /// Page the user must open to approve access
    pub fn authorize_url(&self) -> &str {
        &self.authorize_url
    }
}

/// Outcome of a successful authorization: the access token pair and the
/// account display name.
///
/// Consumed by `DropboxService::complete_authentication`, so one result can
/// be applied once.
#[derive(Debug)]
pub struct AuthenticationResult {
    pub credentials: Credentials,
    pub account_name: String,
}

impl AuthenticationResult {
    pub fn new(credentials: Credentials, account_name: impl Into<String>) -> Self {
        Self {
            credentials,
            account_name: account_name.into(),
        }
    }
}

/// PLAINTEXT signer and OAuth 1.0 flow for Dropbox.
pub struct DropboxAuthenticator {
    config: DropboxConfig,
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
}

impl DropboxAuthenticator {
    pub fn new(config: DropboxConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self::with_clock(config, http_client, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: DropboxConfig,
        http_client: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            http_client,
            clock,
        }
    }

    fn nonce() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(NONCE_LENGTH)
            .map(char::from)
            .collect()
    }

    fn signature(&self, token_secret: &str) -> String {
        format!(
            "{}&{}",
            urlencoding::encode(&self.config.app_secret),
            urlencoding::encode(token_secret)
        )
    }

    /// Step 1: obtain a request token and build the approval URL.
    #[instrument(skip(self))]
    pub async fn start_authorization(&self) -> Result<PendingAuthorization> {
        info!("Requesting OAuth request token");

        let response = self
            .post_signed("oauth/request_token", &Credentials::default())
            .await?;
        let pair = Self::parse_token_pair(&response)?;
        let request_token = Credentials::new(pair.oauth_token, pair.oauth_token_secret);

        let authorize_url = self.authorize_url(&request_token.token)?;
        debug!("Built authorize URL");

        Ok(PendingAuthorization {
            request_token,
            authorize_url,
        })
    }

    /// Steps 2 and 3: trade the approved request token for an access token,
    /// then look up the account's display name.
    #[instrument(skip(self, pending))]
    pub async fn finish_authorization(
        &self,
        pending: PendingAuthorization,
    ) -> Result<AuthenticationResult> {
        let response = self
            .post_signed("oauth/access_token", &pending.request_token)
            .await?;
        let pair = Self::parse_token_pair(&response)?;
        let credentials = Credentials::new(pair.oauth_token, pair.oauth_token_secret);

        let request = HttpRequest::new(HttpMethod::Get, self.config.api_url("account/info"))
            .authorization(self.authorization_header(&credentials))
            .timeout(self.config.request_timeout);
        let response = self.http_client.execute(request).await?;
        Self::ensure_success(&response, "account/info")?;

        let account: AccountInfo = serde_json::from_slice(&response.body)
            .map_err(|e| DropboxError::ParseError(format!("account/info: {}", e)))?;

        info!("Dropbox authorization complete");
        Ok(AuthenticationResult::new(credentials, account.display_name))
    }

    fn authorize_url(&self, request_token: &str) -> Result<String> {
        let mut url = Url::parse(&self.config.web_url("oauth/authorize"))
            .map_err(|e| DropboxError::Config(format!("Invalid web base: {}", e)))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("oauth_token", request_token);
            if let Some(callback) = &self.config.oauth_callback {
                query.append_pair("oauth_callback", callback);
            }
        }

        Ok(url.into())
    }

    async fn post_signed(&self, endpoint: &str, credentials: &Credentials) -> Result<HttpResponse> {
        let request = HttpRequest::new(HttpMethod::Post, self.config.api_url(endpoint))
            .authorization(self.authorization_header(credentials))
            .body(Bytes::new())
            .timeout(self.config.request_timeout);

        let response = self.http_client.execute(request).await?;
        Self::ensure_success(&response, endpoint)?;
        Ok(response)
    }

    fn ensure_success(response: &HttpResponse, endpoint: &str) -> Result<()> {
        if response.is_success() {
            return Ok(());
        }

        warn!(status = response.status, endpoint, "OAuth request rejected");
        Err(DropboxError::AuthenticationFailed(format!(
            "{} returned HTTP {}: {}",
            endpoint,
            response.status,
            String::from_utf8_lossy(&response.body)
        )))
    }

    fn parse_token_pair(response: &HttpResponse) -> Result<TokenPair> {
        serde_urlencoded::from_bytes(&response.body)
            .map_err(|e| DropboxError::AuthenticationFailed(format!("Malformed token response: {}", e)))
    }
}

impl RequestSigner for DropboxAuthenticator {
    fn authorization_header(&self, credentials: &Credentials) -> String {
        let timestamp = self.clock.unix_timestamp().to_string();
        let nonce = Self::nonce();
        let signature = self.signature(&credentials.token_secret);

        let mut params: Vec<(&str, &str)> = vec![
            ("oauth_consumer_key", self.config.app_key.as_str()),
            ("oauth_nonce", nonce.as_str()),
            ("oauth_signature_method", "PLAINTEXT"),
            ("oauth_timestamp", timestamp.as_str()),
            ("oauth_version", "1.0"),
        ];
        if !credentials.token.is_empty() {
            params.push(("oauth_token", credentials.token.as_str()));
        }
        params.push(("oauth_signature", signature.as_str()));

        let encoded = params
            .iter()
            .map(|(key, value)| format!("{}=\"{}\"", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join(", ");

        format!("OAuth {}", encoded)
    }
}
