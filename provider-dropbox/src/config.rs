//! Dropbox provider configuration

use std::time::Duration;
use url::Url;

use crate::error::{DropboxError, Result};

pub const DEFAULT_API_BASE: &str = "https://api.dropbox.com/1";
pub const DEFAULT_WEB_BASE: &str = "https://www.dropbox.com/1";
pub const DEFAULT_SETTINGS_GROUP: &str = "Dropbox";
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 8;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application keys, endpoints and scan limits.
///
/// # Example
///
/// ```
/// use provider_dropbox::DropboxConfig;
///
/// let config = DropboxConfig::new("app-key", "app-secret")
///     .with_max_concurrent_requests(4);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct DropboxConfig {
    pub app_key: String,
    pub app_secret: String,
    /// API root, without trailing slash
    pub api_base: String,
    /// Root for user-facing pages such as `oauth/authorize`
    pub web_base: String,
    /// Settings group holding the stored token pair
    pub settings_group: String,
    /// Where the browser is sent after the user approves access
    pub oauth_callback: Option<String>,
    /// Upper bound on in-flight requests during a scan
    pub max_concurrent_requests: usize,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for DropboxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropboxConfig")
            .field("app_key", &self.app_key)
            .field("app_secret", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("web_base", &self.web_base)
            .field("settings_group", &self.settings_group)
            .field("oauth_callback", &self.oauth_callback)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl DropboxConfig {
    pub fn new(app_key: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_key: app_key.into(),
            app_secret: app_secret.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            web_base: DEFAULT_WEB_BASE.to_string(),
            settings_group: DEFAULT_SETTINGS_GROUP.to_string(),
            oauth_callback: None,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_web_base(mut self, web_base: impl Into<String>) -> Self {
        self.web_base = web_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_settings_group(mut self, group: impl Into<String>) -> Self {
        self.settings_group = group.into();
        self
    }

    pub fn with_oauth_callback(mut self, callback: impl Into<String>) -> Self {
        self.oauth_callback = Some(callback.into());
        self
    }

    pub fn with_max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = max;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Validates keys, endpoints and limits
    pub fn validate(&self) -> Result<()> {
        if self.app_key.trim().is_empty() {
            return Err(DropboxError::Config("App key cannot be empty".to_string()));
        }

        if self.app_secret.trim().is_empty() {
            return Err(DropboxError::Config(
                "App secret cannot be empty".to_string(),
            ));
        }

        for (name, base) in [("API base", &self.api_base), ("Web base", &self.web_base)] {
            Url::parse(base)
                .map_err(|e| DropboxError::Config(format!("{} '{}' is invalid: {}", name, base, e)))?;
        }

        if let Some(callback) = &self.oauth_callback {
            Url::parse(callback).map_err(|e| {
                DropboxError::Config(format!("OAuth callback '{}' is invalid: {}", callback, e))
            })?;
        }

        if self.max_concurrent_requests == 0 {
            return Err(DropboxError::Config(
                "Max concurrent requests must be at least 1".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(DropboxError::Config(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// `{api_base}/metadata/dropbox/{path}`
    pub fn metadata_url(&self, path: &str) -> String {
        format!("{}/metadata/dropbox/{}", self.api_base, encode_remote_path(path))
    }

    /// `{api_base}/media/dropbox/{path}`
    pub fn media_url(&self, path: &str) -> String {
        format!("{}/media/dropbox/{}", self.api_base, encode_remote_path(path))
    }

    /// `{api_base}/{endpoint}`
    pub fn api_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.api_base, endpoint)
    }

    /// `{web_base}/{endpoint}`
    pub fn web_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.web_base, endpoint)
    }
}

/// Percent-encode each segment of a remote path, dropping the leading `/`.
pub(crate) fn encode_remote_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
