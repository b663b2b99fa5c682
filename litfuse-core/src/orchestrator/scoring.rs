//! Weighted composite scoring for classified records.
//!
//! Assigns scores based on:
//! - Semantic relevance (query keyword containment in the record text)
//! - Domain relevance (from the relevance classifier)
//! - Evidence quality (study design, citation band, recency band)
//! - Citation weight (log-scaled citation count)
//!
//! Formula:
//!
//! ```text
//! composite = w_sem * semantic + w_dom * domain + w_evi * evidence + w_cit * citation
//!           + trusted_source_bonus   (source in trusted_sources)
//! ```
//!
//! Every sub-score is clamped to `[0, 1]` before weighting.

use crate::config::AggregatorConfig;
use crate::text::TokenText;
use crate::types::{Classification, RawRecord, ScoredRecord, StudyType};

use super::expand::ExpandedQuery;

const META_ANALYSIS_TERMS: &[&str] = &[
    "meta-analysis",
    "meta-analyses",
    "metaanalysis",
    "pooled analysis",
    "network meta-analysis",
];
const SYSTEMATIC_REVIEW_TERMS: &[&str] = &[
    "systematic review",
    "systematic reviews",
    "systematic literature review",
    "umbrella review",
];
const RANDOMIZED_TRIAL_TERMS: &[&str] = &[
    "randomized",
    "randomised",
    "randomly assigned",
    "rct",
    "controlled trial",
];
const COHORT_TERMS: &[&str] = &[
    "cohort",
    "prospective study",
    "longitudinal study",
    "retrospective study",
    "registry study",
];

/// Classify the study design from title and abstract text.
pub fn detect_study_type(text: &TokenText) -> StudyType {
    let any = |terms: &[&str]| terms.iter().any(|term| text.contains(term));
    if any(META_ANALYSIS_TERMS) {
        StudyType::MetaAnalysis
    } else if any(SYSTEMATIC_REVIEW_TERMS) {
        StudyType::SystematicReview
    } else if any(RANDOMIZED_TRIAL_TERMS) {
        StudyType::RandomizedTrial
    } else if any(COHORT_TERMS) {
        StudyType::Cohort
    } else {
        StudyType::Other
    }
}

/// Fixed evidence increment for each study design.
pub fn study_type_increment(study: StudyType) -> f64 {
    match study {
        StudyType::MetaAnalysis => 0.40,
        StudyType::SystematicReview => 0.35,
        StudyType::RandomizedTrial => 0.30,
        StudyType::Cohort => 0.20,
        StudyType::Other => 0.05,
    }
}

fn citation_band(citations: Option<u32>) -> f64 {
    match citations.unwrap_or(0) {
        c if c >= 100 => 0.30,
        c if c >= 50 => 0.20,
        c if c >= 10 => 0.10,
        _ => 0.0,
    }
}

// Future years and ages that overflow i32 land in the zero band.
fn recency_band(year: Option<i32>, reference_year: i32) -> f64 {
    match year.and_then(|y| reference_year.checked_sub(y)) {
        Some(age) if age < 0 => 0.0,
        Some(age) if age <= 5 => 0.20,
        Some(age) if age <= 10 => 0.10,
        _ => 0.0,
    }
}

/// Evidence quality: study design + citation band + recency band, clamped.
pub fn evidence_quality(
    study: StudyType,
    citations: Option<u32>,
    year: Option<i32>,
    reference_year: i32,
) -> f64 {
    (study_type_increment(study) + citation_band(citations) + recency_band(year, reference_year))
        .clamp(0.0, 1.0)
}

/// Fraction of query keywords present as whole words in the record text.
pub fn semantic_relevance(keywords: &[String], text: &TokenText) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let hits = keywords.iter().filter(|kw| text.contains(kw)).count();
    (hits as f64 / keywords.len() as f64).clamp(0.0, 1.0)
}

/// `ln(1 + citations) / ln(1 + saturation)`, clamped to `[0, 1]`.
///
/// Log scaling keeps a handful of landmark papers from drowning out
/// recent, less-cited work.
pub fn citation_weight(citations: Option<u32>, saturation: u32) -> f64 {
    let Some(count) = citations else {
        return 0.0;
    };
    let denominator = (1.0 + f64::from(saturation.max(1))).ln();
    ((1.0 + f64::from(count)).ln() / denominator).clamp(0.0, 1.0)
}

/// Combine a record and its classification into a [`ScoredRecord`].
///
/// Deterministic for the same inputs and `reference_year`.
pub fn score_record(
    record: RawRecord,
    classification: Classification,
    query: &ExpandedQuery,
    config: &AggregatorConfig,
    reference_year: i32,
) -> ScoredRecord {
    let scoring = &config.scoring;
    let weights = &scoring.weights;

    let relevance_text = TokenText::new(&record.combined_text());
    let design_text = TokenText::new(&record.title_and_abstract());

    let study_type = detect_study_type(&design_text);
    let relevance_score = semantic_relevance(&query.keywords, &relevance_text);
    let domain_score = classification.domain_score.clamp(0.0, 1.0);
    let evidence = evidence_quality(
        study_type,
        record.citation_count,
        record.year,
        reference_year,
    );
    let citation = citation_weight(record.citation_count, scoring.citation_saturation);

    let mut composite = weights.semantic * relevance_score
        + weights.domain * domain_score
        + weights.evidence * evidence
        + weights.citation * citation;
    if scoring.trusted_sources.contains(&record.source) {
        composite += scoring.trusted_source_bonus;
    }

    ScoredRecord {
        record,
        relevance_score,
        domain_score,
        evidence_quality: evidence,
        citation_weight: citation,
        composite_score: composite,
        study_type,
        classification,
    }
}
