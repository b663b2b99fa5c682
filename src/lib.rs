//! # litfuse
//!
//! Application layer around [`litfuse_core`]: TOML configuration, offline
//! fixture providers, and the `litfuse` command-line binary.

pub mod config;
pub mod error;
pub mod fixture;

pub use config::{AppConfig, FixtureConfig};
pub use error::{AppError, Result};
pub use fixture::FixtureProvider;

use std::path::Path;

use litfuse_core::{AggregationReport, Aggregator};

/// Build an aggregator over the fixtures in `fixture_dir` and run one query.
///
/// # Errors
///
/// Returns an error if the fixtures cannot be loaded, the configuration is
/// invalid, or the query or count is rejected by the pipeline.
pub async fn search_fixtures(
    config: &AppConfig,
    fixture_dir: &Path,
    query: &str,
    target_count: usize,
) -> Result<AggregationReport> {
    config.validate()?;
    let providers = FixtureProvider::load_dir(fixture_dir)?;
    tracing::info!(providers = providers.len(), dir = %fixture_dir.display(), "loaded fixture providers");
    let aggregator = Aggregator::new(config.aggregator.clone(), providers)?;
    Ok(aggregator.run_aggregation(query, target_count).await?)
}
