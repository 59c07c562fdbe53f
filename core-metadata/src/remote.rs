//! Remote tag reading
//!
//! [`RemoteTagReader`] is the desktop `TagReader`: it downloads a temporary
//! streaming URL through the host `HttpClient` and hands the bytes to
//! [`TagExtractor`].

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bridge_traits::tags::{CloudFileRequest, TagData, TagReader};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::{MetadataError, Result};
use crate::extractor::TagExtractor;

/// Files above this size are not downloaded for tag reading.
pub const DEFAULT_MAX_BYTES: u64 = 64 * 1024 * 1024;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

pub struct RemoteTagReader {
    http_client: Arc<dyn HttpClient>,
    extractor: TagExtractor,
    max_bytes: u64,
}

impl RemoteTagReader {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            extractor: TagExtractor::new(),
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }

    /// Override the download size cap
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    #[instrument(skip(self, request), fields(file = %request.filename, size = request.size))]
    async fn read(&self, request: CloudFileRequest) -> Result<TagData> {
        if request.size > self.max_bytes {
            return Err(MetadataError::FileTooLarge {
                size: request.size,
                limit: self.max_bytes,
            });
        }

        let mut http_request =
            HttpRequest::new(HttpMethod::Get, &request.url).timeout(DOWNLOAD_TIMEOUT);
        if let Some(authorization) = request.authorization {
            http_request = http_request.authorization(authorization);
        }

        let response = self.http_client.execute(http_request).await?;
        if !response.is_success() {
            return Err(MetadataError::FetchFailed(format!(
                "HTTP {} for {}",
                response.status, request.filename
            )));
        }

        // The reported size can be stale; enforce the cap on what arrived too
        if response.body.len() as u64 > self.max_bytes {
            return Err(MetadataError::FileTooLarge {
                size: response.body.len() as u64,
                limit: self.max_bytes,
            });
        }

        debug!(bytes = response.body.len(), "Downloaded stream for tag reading");

        self.extractor
            .extract_from_bytes(&response.body, &request.filename)
    }
}

#[async_trait]
impl TagReader for RemoteTagReader {
    async fn read_cloud_file(&self, request: CloudFileRequest) -> BridgeResult<TagData> {
        Ok(self.read(request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use bridge_traits::http::HttpResponse;
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        pub Http {}

        #[async_trait]
        impl HttpClient for Http {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn request(size: u64) -> CloudFileRequest {
        CloudFileRequest {
            url: "https://dl.dropboxusercontent.com/1/view/abc/song.mp3".to_string(),
            filename: "song.mp3".to_string(),
            size,
            mime_type: "audio/mpeg".to_string(),
            authorization: None,
        }
    }

    #[tokio::test]
    async fn test_refuses_oversized_file_without_fetching() {
        let mut http = MockHttp::new();
        http.expect_execute().times(0);

        let reader = RemoteTagReader::new(Arc::new(http)).with_max_bytes(10);
        let result = reader.read_cloud_file(request(11)).await;

        match result {
            Err(BridgeError::OperationFailed(message)) => assert!(message.contains("too large")),
            other => panic!("expected OperationFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| req.method == HttpMethod::Get && req.url.ends_with("song.mp3"))
            .times(1)
            .returning(|_| {
                Ok(HttpResponse {
                    status: 404,
                    headers: HashMap::new(),
                    body: Bytes::new(),
                })
            });

        let reader = RemoteTagReader::new(Arc::new(http));
        let result = reader.read(request(100)).await;
        assert!(matches!(result, Err(MetadataError::FetchFailed(_))));
    }

    #[tokio::test]
    async fn test_forwards_authorization_header() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| {
                req.headers.get("Authorization").map(String::as_str) == Some("OAuth test")
            })
            .times(1)
            .returning(|_| {
                Ok(HttpResponse {
                    status: 200,
                    headers: HashMap::new(),
                    body: Bytes::from_static(b"not audio"),
                })
            });

        let reader = RemoteTagReader::new(Arc::new(http));
        let mut req = request(9);
        req.authorization = Some("OAuth test".to_string());

        // Bytes are not audio, so extraction fails after the fetch
        assert!(reader.read(req).await.is_err());
    }
}
