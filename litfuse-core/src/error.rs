//! Error types for the litfuse-core crate.
//!
//! Only [`AggregateError`] ever crosses the aggregation boundary. Provider
//! failures are captured as [`ProviderError`] values and reported through
//! diagnostics instead of being returned to the caller.

/// Errors returned by [`crate::Aggregator`].
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    /// The query was empty or contained only whitespace.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The requested number of results was zero.
    #[error("invalid target count: {0}")]
    InvalidTargetCount(String),

    /// Invalid aggregator configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Errors a provider adapter can report for a single search call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The call did not settle within the allowed time.
    #[error("provider timed out: {0}")]
    Timeout(String),

    /// The upstream request failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The upstream response could not be parsed into records.
    #[error("parse error: {0}")]
    Parse(String),

    /// The provider is disabled, misconfigured or not reachable.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider future panicked while running.
    #[error("provider panicked: {0}")]
    Panicked(String),
}

/// Convenience type alias for litfuse-core results.
pub type Result<T> = std::result::Result<T, AggregateError>;
