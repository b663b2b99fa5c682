//! # litfuse-core
//!
//! Federated medical literature aggregation.
//!
//! A single query is sent to many bibliographic providers at once. The
//! returned records are classified for domain relevance, scored, merged
//! across sources, and narrowed to a ranked result set of the requested
//! size.
//!
//! ## Design
//!
//! - Providers are external collaborators behind [`LiteratureProvider`];
//!   this crate never opens a network connection itself
//! - All provider calls of a round run concurrently, each behind its own
//!   timeout and panic boundary
//! - A provider failure costs only that provider's records and is reported
//!   in [`Diagnostics`]
//! - Records sharing a DOI or PMID, or with near-identical titles, are
//!   collapsed to one canonical record
//! - When too few records pass the strict filters, the finalizer relaxes
//!   them one level at a time and reports the level it needed
//! - No state survives a request; the same inputs give the same output
//!
//! ## Logging
//!
//! Queries are logged only at `trace` and `debug` level.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod provider;
pub mod text;
pub mod types;
pub mod vocabulary;

use std::sync::Arc;

use chrono::Datelike;

pub use config::AggregatorConfig;
pub use error::{AggregateError, ProviderError, Result};
pub use orchestrator::classify::{LexicalClassifier, RelevanceClassifier};
pub use provider::{LiteratureProvider, SearchOptions};
pub use types::{
    AggregationReport, CanonicalRecord, Diagnostics, EmptyReason, RawRecord, RelaxationLevel, Source,
};

use orchestrator::{dedup, expand, finalize, gather, scoring};

/// Entry point: a validated configuration plus the providers to query.
///
/// Cheap to clone and safe to share between tasks. Each call to
/// [`Aggregator::run_aggregation`] is independent of every other.
#[derive(Clone)]
pub struct Aggregator {
    config: Arc<AggregatorConfig>,
    providers: Vec<Arc<dyn LiteratureProvider>>,
    classifier: Arc<dyn RelevanceClassifier>,
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sources: Vec<Source> = self.providers.iter().map(|p| p.source()).collect();
        f.debug_struct("Aggregator")
            .field("config", &self.config)
            .field("providers", &sources)
            .finish_non_exhaustive()
    }
}

impl Aggregator {
    /// Build an aggregator using the [`LexicalClassifier`].
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::Config`] if `config` fails validation.
    pub fn new(config: AggregatorConfig, providers: Vec<Arc<dyn LiteratureProvider>>) -> Result<Self> {
        config.validate()?;
        let classifier = Arc::new(LexicalClassifier::new(&config));
        Ok(Self {
            config: Arc::new(config),
            providers,
            classifier,
        })
    }

    /// Replace the relevance classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn RelevanceClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Run the full pipeline for one query.
    ///
    /// Returns at most `target_count` canonical records in rank order, with
    /// diagnostics describing how they were obtained. Provider failures are
    /// never returned as errors.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::InvalidQuery`] for a blank query and
    /// [`AggregateError::InvalidTargetCount`] when `target_count` is zero.
    /// Both are raised before any provider is called.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn example(providers: Vec<std::sync::Arc<dyn litfuse_core::LiteratureProvider>>) -> litfuse_core::Result<()> {
    /// let aggregator = litfuse_core::Aggregator::new(Default::default(), providers)?;
    /// let report = aggregator.run_aggregation("statins in heart failure", 10).await?;
    /// for record in &report.results {
    ///     println!("{:.3} {}", record.composite_score(), record.title());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run_aggregation(&self, query: &str, target_count: usize) -> Result<AggregationReport> {
        if query.trim().is_empty() {
            return Err(AggregateError::InvalidQuery("query must not be blank".into()));
        }
        if target_count == 0 {
            return Err(AggregateError::InvalidTargetCount(
                "target_count must be at least 1".into(),
            ));
        }

        let config = self.config.as_ref();
        let expanded = expand::expand(query, config);
        tracing::debug!(query = %expanded.original, tags = ?expanded.domain_tags, target_count, "starting aggregation");

        let gathered = gather::gather(&expanded, &self.providers, config).await;
        let raw_record_count = gathered.records.len() + gathered.malformed;
        let had_records = !gathered.records.is_empty();

        let reference_year = config
            .scoring
            .reference_year
            .unwrap_or_else(|| chrono::Utc::now().year());
        let scored: Vec<_> = gathered
            .records
            .into_iter()
            .map(|record| {
                let classification = self.classifier.classify(&record, &expanded);
                scoring::score_record(record, classification, &expanded, config, reference_year)
            })
            .collect();

        let canonical = dedup::deduplicate(scored, config);
        let canonical_count = canonical.len();
        let admitted_count = canonical.iter().filter(|c| c.admitted).count();

        let outcome = finalize::finalize(canonical, target_count, config);

        let empty_reason = match (outcome.results.is_empty(), had_records) {
            (false, _) => None,
            (true, false) => Some(EmptyReason::NoRecords),
            (true, true) => Some(EmptyReason::AllFiltered),
        };
        let diagnostics = Diagnostics {
            providers_queried: gathered.queried,
            providers_skipped: gathered.skipped,
            providers_failed: gathered.failures,
            raw_record_count,
            malformed_record_count: gathered.malformed,
            admitted_count,
            canonical_count,
            gap_fill_triggered: gathered.gap_fill_triggered,
            relaxation_level_used: outcome.level_used,
            level_fills: outcome.fills,
            insufficient_results: outcome.results.len() < target_count,
            empty_reason,
        };

        tracing::info!(
            results = outcome.results.len(),
            target_count,
            raw = diagnostics.raw_record_count,
            canonical = canonical_count,
            admitted = admitted_count,
            failed = diagnostics.providers_failed.len(),
            level = %diagnostics.relaxation_level_used,
            "aggregation complete"
        );

        Ok(AggregationReport {
            results: outcome.results,
            diagnostics,
        })
    }
}
