use thiserror::Error;

/// Top-level error type for the docmind pipeline.
///
/// Every failure is surfaced to the caller unmodified; nothing in the
/// pipeline retries. Crates with extra failure modes define their own error
/// types and wrap `DocmindError` so that `?` works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DocmindError {
    /// Rejected before any upstream call was made.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// An external service (embedding provider, vector database, language
    /// model) was unreachable, returned an error, or returned malformed data.
    #[error("Upstream failure from {service}: {message}")]
    Upstream { service: String, message: String },

    /// The language model declined to produce structured output.
    #[error("Model refused: {0}")]
    Refusal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocmindError {
    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        DocmindError::Upstream {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        DocmindError::InvalidInput(message.into())
    }
}

impl From<toml::de::Error> for DocmindError {
    fn from(err: toml::de::Error) -> Self {
        DocmindError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for DocmindError {
    fn from(err: toml::ser::Error) -> Self {
        DocmindError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for DocmindError {
    fn from(err: serde_json::Error) -> Self {
        DocmindError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for docmind operations.
pub type Result<T> = std::result::Result<T, DocmindError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let cases: Vec<(DocmindError, &str)> = vec![
            (
                DocmindError::InvalidInput("text is empty".to_string()),
                "Invalid input: text is empty",
            ),
            (
                DocmindError::NotFound("collection docs".to_string()),
                "Not found: collection docs",
            ),
            (
                DocmindError::upstream("qdrant", "connection refused"),
                "Upstream failure from qdrant: connection refused",
            ),
            (
                DocmindError::Refusal("unsafe content".to_string()),
                "Model refused: unsafe content",
            ),
            (
                DocmindError::Config("bad key".to_string()),
                "Configuration error: bad key",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_upstream_helper_fields() {
        match DocmindError::upstream("openai", "HTTP 500") {
            DocmindError::Upstream { service, message } => {
                assert_eq!(service, "openai");
                assert_eq!(message, "HTTP 500");
            }
            other => panic!("Expected Upstream, got {other:?}"),
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DocmindError = io_err.into();
        assert!(matches!(err, DocmindError::Io(_)));
        assert!(err.to_string().starts_with("I/O error:"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let err: DocmindError = err.unwrap_err().into();
        assert!(matches!(err, DocmindError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let err: DocmindError = err.unwrap_err().into();
        assert!(matches!(err, DocmindError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let parsed: serde_json::Value = serde_json::from_str("{\"a\":1}")?;
            Ok(parsed["a"].to_string())
        }

        assert_eq!(inner().unwrap(), "1");
    }
}
