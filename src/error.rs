//! Error types for the litfuse application layer.

/// Errors raised while loading configuration or fixtures.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration could not be parsed, serialized or validated.
    #[error("config error: {0}")]
    Config(String),

    /// A fixture file is malformed.
    #[error("fixture error: {0}")]
    Fixture(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the aggregation pipeline.
    #[error(transparent)]
    Aggregate(#[from] litfuse_core::AggregateError),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: AppError = io.into();
        assert!(err.to_string().starts_with("I/O error"));
    }

    #[test]
    fn aggregate_error_is_transparent() {
        let err: AppError = litfuse_core::AggregateError::InvalidQuery("blank".into()).into();
        assert_eq!(err.to_string(), "invalid query: blank");
    }
}
