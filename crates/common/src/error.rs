//! Common error types.

use thiserror::Error;

/// Main error type for the lazy image workspace.
#[derive(Error, Debug)]
pub enum AfterImageError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

pub type AfterImageResult<T> = Result<T, AfterImageError>;

impl AfterImageError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NodeNotFound(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AfterImageError::invalid("component already mounted");
        assert_eq!(err.to_string(), "Invalid operation: component already mounted");

        let err = AfterImageError::config("threshold out of range");
        assert_eq!(err.to_string(), "Configuration error: threshold out of range");
    }

    #[test]
    fn test_from_url_error() {
        let err: AfterImageError = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, AfterImageError::UrlParse(_)));
    }
}
