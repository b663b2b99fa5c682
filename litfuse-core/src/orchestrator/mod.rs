//! Aggregation pipeline stages.
//!
//! A request flows through the stages in order:
//!
//! 1. [`expand`] derives keywords, variants and domain tags from the query.
//! 2. [`gather`] fans the query out to every provider concurrently.
//! 3. [`classify`] admits or rejects each record for the query's domain.
//! 4. [`scoring`] attaches sub-scores and a composite score.
//! 5. [`dedup`] merges records describing the same work.
//! 6. [`finalize`] selects the result set, relaxing filters as needed.
//!
//! [`crate::Aggregator::run_aggregation`] wires the stages together.

pub mod classify;
pub mod dedup;
pub mod expand;
pub mod finalize;
pub mod gather;
pub mod identifiers;
pub mod scoring;
