use thiserror::Error;

/// Type alias for Result with DigestError
pub type Result<T> = std::result::Result<T, DigestError>;

/// Error types for the email digest pipeline
///
/// Every failure here is fatal for the current run: there is no retry or
/// backoff layer, failures surface directly to the invoking user.
#[derive(Error, Debug)]
pub enum DigestError {
    /// No usable credential and no means to obtain one
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Mail provider rejected or failed a list/get/send call
    #[error("Mail provider error: {0}")]
    Provider(String),

    /// Mail provider returned a non-success HTTP status
    #[error("Mail provider error (HTTP {status}): {message}")]
    ProviderStatus { status: u16, message: String },

    /// Unrecognized summarization method selector
    #[error("Unknown summarization method: {0}")]
    InvalidMethod(String),

    /// A summarization backend call failed
    #[error("Summarization backend error: {0}")]
    Backend(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (token files, config files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let auth = DigestError::Auth("no client secret".to_string());
        assert!(format!("{}", auth).contains("Authentication failed"));

        let status = DigestError::ProviderStatus {
            status: 403,
            message: "insufficient scope".to_string(),
        };
        let display = format!("{}", status);
        assert!(display.contains("403"));
        assert!(display.contains("insufficient scope"));

        let method = DigestError::InvalidMethod("tfidf".to_string());
        assert!(format!("{}", method).contains("tfidf"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: DigestError = io.into();
        assert!(matches!(err, DigestError::Io(_)));
    }
}
