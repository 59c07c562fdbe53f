//! Error types for the Dropbox provider

use thiserror::Error;

/// Dropbox provider errors
#[derive(Error, Debug)]
pub enum DropboxError {
    /// The OAuth exchange was rejected or returned garbage
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// An operation needs credentials and none are stored
    #[error("Not authenticated with Dropbox")]
    NotAuthenticated,

    /// API request returned a non-2xx status
    #[error("Dropbox API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The media endpoint answered without a URL
    #[error("No streaming URL returned for {0}")]
    MissingStreamUrl(String),

    /// A song URL that is not `dropbox://...`
    #[error("Invalid song URL: {0}")]
    InvalidSongUrl(String),

    /// The scan was cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid provider configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bridge error
    #[error(transparent)]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

/// Result type for Dropbox operations
pub type Result<T> = std::result::Result<T, DropboxError>;

impl From<DropboxError> for bridge_traits::error::BridgeError {
    fn from(error: DropboxError) -> Self {
        use bridge_traits::error::BridgeError;

        match error {
            DropboxError::Bridge(inner) => inner,
            DropboxError::NotAuthenticated => {
                BridgeError::NotAvailable("Dropbox account is not connected".to_string())
            }
            DropboxError::ApiError { status, message } => BridgeError::OperationFailed(format!(
                "API error (status {}): {}",
                status, message
            )),
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;

    #[test]
    fn test_error_display() {
        let err = DropboxError::ApiError {
            status: 401,
            message: "Unauthorized".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Dropbox API error (status 401): Unauthorized"
        );
        assert_eq!(DropboxError::Cancelled.to_string(), "Operation cancelled");
    }

    #[test]
    fn test_bridge_error_conversion() {
        let bridge: BridgeError = DropboxError::ApiError {
            status: 500,
            message: "boom".to_string(),
        }
        .into();
        assert!(matches!(bridge, BridgeError::OperationFailed(msg) if msg.contains("500")));

        let bridge: BridgeError = DropboxError::NotAuthenticated.into();
        assert!(matches!(bridge, BridgeError::NotAvailable(_)));

        let original = BridgeError::OperationFailed("timeout".to_string());
        let wrapped = DropboxError::from(original);
        let unwrapped: BridgeError = wrapped.into();
        assert!(matches!(unwrapped, BridgeError::OperationFailed(msg) if msg == "timeout"));
    }
}
