use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_missing_display() {
        let error = Error::CapabilityMissing {
            capability: "TagReader".to_string(),
            message: "inject one".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Capability missing: TagReader - inject one"
        );
    }
}
