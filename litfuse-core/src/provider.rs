//! Trait definition for pluggable literature provider adapters.
//!
//! Each external source (PubMed, Semantic Scholar, openFDA, …) is wrapped
//! by an adapter implementing [`LiteratureProvider`]. Adapters live outside
//! this crate; the aggregator only sees this interface.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{RawRecord, Source};

/// Per-call options passed to a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Upper bound on the number of records to return.
    pub max_results: usize,
    /// Domain tags detected from the user query, for adapters that can use them.
    pub domain_hints: Vec<String>,
}

/// A pluggable literature search backend.
///
/// Implementors handle their own:
///
/// - query encoding for the upstream API
/// - HTTP request and per-request timeout
/// - response parsing into [`RawRecord`] values tagged with [`Self::source`]
///
/// The aggregator wraps every call in its own timeout and panic boundary,
/// so a misbehaving adapter cannot fail the whole aggregation.
///
/// All implementations must be `Send + Sync` for concurrent queries.
#[async_trait]
pub trait LiteratureProvider: Send + Sync {
    /// Run one search and return parsed records.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the request fails, times out, or the
    /// response cannot be parsed.
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<RawRecord>, ProviderError>;

    /// Which [`Source`] this adapter queries.
    fn source(&self) -> Source;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// A mock provider for testing trait bounds and async execution.
    struct MockProvider {
        source: Source,
        records: Vec<RawRecord>,
    }

    #[async_trait]
    impl LiteratureProvider for MockProvider {
        async fn search(
            &self,
            _query: &str,
            options: &SearchOptions,
        ) -> Result<Vec<RawRecord>, ProviderError> {
            if self.records.is_empty() {
                return Err(ProviderError::Parse("mock provider failure".into()));
            }
            Ok(self.records.iter().take(options.max_results).cloned().collect())
        }

        fn source(&self) -> Source {
            self.source
        }
    }

    #[test]
    fn mock_provider_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MockProvider>();
        assert_send_sync::<Arc<dyn LiteratureProvider>>();
    }

    #[tokio::test]
    async fn provider_respects_max_results_through_trait_object() {
        let provider: Arc<dyn LiteratureProvider> = Arc::new(MockProvider {
            source: Source::PubMed,
            records: vec![
                RawRecord::new("First", Source::PubMed),
                RawRecord::new("Second", Source::PubMed),
            ],
        });
        let options = SearchOptions {
            max_results: 1,
            domain_hints: vec![],
        };
        let records = provider.search("query", &options).await.expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "First");
        assert_eq!(provider.source(), Source::PubMed);
    }

    #[tokio::test]
    async fn provider_errors_propagate() {
        let provider = MockProvider {
            source: Source::OpenFda,
            records: vec![],
        };
        let err = provider
            .search("query", &SearchOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("mock provider failure"));
    }
}
