//! Aggregator configuration with tuned defaults.
//!
//! [`AggregatorConfig`] holds every constant the pipeline uses: provider
//! routing, scoring weights, classifier thresholds, dedup threshold and the
//! term lists. It is built once, validated, and shared read-only behind an
//! `Arc` for the lifetime of an [`crate::Aggregator`].
//!
//! The numeric defaults were tuned by hand against sample queries and have
//! not been calibrated against a labelled relevance set.

use serde::{Deserialize, Serialize};

use crate::error::AggregateError;
use crate::types::Source;
use crate::vocabulary::{default_topics, TermLists, TopicConfig};

/// Whether a provider counts towards the primary-record threshold that
/// triggers gap-fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderRole {
    Primary,
    Secondary,
}

/// How the base query is enriched before it is sent to a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryEnhancement {
    /// Send the user query unchanged.
    Plain,
    /// Append detected-topic synonyms as boolean `OR` clauses.
    BooleanSynonyms,
    /// Append detected-topic MeSH-style terms.
    MeshTerms,
}

/// Precondition a provider must satisfy before it is called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "terms", rename_all = "snake_case")]
pub enum ProviderGate {
    Always,
    /// Only call when the query mentions one of these terms.
    QueryTerms(Vec<String>),
    /// Only call when one of these domain tags was detected.
    DomainTags(Vec<String>),
}

/// Routing settings for one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub source: Source,
    pub enabled: bool,
    pub role: ProviderRole,
    pub enhancement: QueryEnhancement,
    pub gate: ProviderGate,
    /// Re-query this provider with broadened terms when results are thin.
    pub gap_fill: bool,
    /// Overrides [`AggregatorConfig::default_max_results`].
    pub max_results: Option<usize>,
}

impl ProviderSettings {
    /// Plain, ungated, primary settings for `source`.
    pub fn new(source: Source) -> Self {
        Self {
            source,
            enabled: true,
            role: ProviderRole::Primary,
            enhancement: QueryEnhancement::Plain,
            gate: ProviderGate::Always,
            gap_fill: false,
            max_results: None,
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self::new(Source::SemanticScholar)
    }
}

/// Thresholds for the second, broadened round of provider calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapFillConfig {
    /// Trigger when primary providers return fewer records than this.
    pub min_primary_records: usize,
    /// Trigger when all providers together return fewer records than this.
    pub min_total_records: usize,
    /// Per-provider result limit for the gap-fill round.
    pub max_results: usize,
}

impl Default for GapFillConfig {
    fn default() -> Self {
        Self {
            min_primary_records: 2,
            min_total_records: 10,
            max_results: 25,
        }
    }
}

/// Weights of the composite score. Must sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub semantic: f64,
    pub domain: f64,
    pub evidence: f64,
    pub citation: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            semantic: 0.45,
            domain: 0.25,
            evidence: 0.20,
            citation: 0.10,
        }
    }
}

impl ScoringWeights {
    pub fn total(&self) -> f64 {
        self.semantic + self.domain + self.evidence + self.citation
    }
}

/// Composite scorer constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    /// Added to the composite score of records from `trusted_sources`.
    pub trusted_source_bonus: f64,
    pub trusted_sources: Vec<Source>,
    /// Citation count at which the citation weight reaches 1.
    pub citation_saturation: u32,
    /// Year used for recency banding. `None` means the current UTC year.
    pub reference_year: Option<i32>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            trusted_source_bonus: 0.05,
            trusted_sources: vec![Source::PubMed, Source::SemanticScholar],
            citation_saturation: 1000,
            reference_year: None,
        }
    }
}

/// Lexical relevance classifier constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Minimum inclusion points for admission.
    pub min_admission_score: f64,
    pub venue_bonus: f64,
    pub topic_bonus: f64,
    pub off_domain_penalty: f64,
    /// Cap on points earned from on-domain vocabulary occurrences.
    pub max_vocabulary_points: f64,
    /// Points at which the domain score reaches 1.
    pub domain_saturation: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_admission_score: 3.0,
            venue_bonus: 2.0,
            topic_bonus: 2.0,
            off_domain_penalty: 2.0,
            max_vocabulary_points: 6.0,
            domain_saturation: 10.0,
        }
    }
}

/// Configuration for one aggregation pipeline.
///
/// Use [`Default::default()`] for the tuned defaults, or construct with
/// field overrides for custom behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Per-source routing. Providers registered without an entry here use
    /// [`ProviderSettings::new`].
    pub providers: Vec<ProviderSettings>,
    /// Dedup tie-break order, most preferred first.
    pub source_preference: Vec<Source>,
    /// Per-provider call timeout in milliseconds.
    pub provider_timeout_ms: u64,
    /// Default per-provider result limit.
    pub default_max_results: usize,
    /// Cap on synonyms or MeSH terms appended to an enhanced query.
    pub max_enhancement_terms: usize,
    pub gap_fill: GapFillConfig,
    pub scoring: ScoringConfig,
    pub classifier: ClassifierConfig,
    /// Normalised-title similarity at or above which two records are the same work.
    pub title_similarity_threshold: f64,
    pub terms: TermLists,
    pub topics: Vec<TopicConfig>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        let drug_safety_terms = [
            "drug",
            "drugs",
            "device",
            "devices",
            "safety",
            "adverse",
            "recall",
            "label",
            "labeling",
            "dose",
            "dosage",
            "toxicity",
            "medication",
            "side effect",
            "side effects",
        ];
        let trial_terms = [
            "trial",
            "trials",
            "randomized",
            "randomised",
            "intervention",
            "treatment",
            "therapy",
            "placebo",
        ];
        Self {
            providers: vec![
                ProviderSettings {
                    gap_fill: true,
                    ..ProviderSettings::new(Source::SemanticScholar)
                },
                ProviderSettings {
                    enhancement: QueryEnhancement::MeshTerms,
                    gap_fill: true,
                    ..ProviderSettings::new(Source::PubMed)
                },
                ProviderSettings {
                    role: ProviderRole::Secondary,
                    enhancement: QueryEnhancement::BooleanSynonyms,
                    gap_fill: true,
                    ..ProviderSettings::new(Source::EuropePmc)
                },
                ProviderSettings {
                    role: ProviderRole::Secondary,
                    enhancement: QueryEnhancement::BooleanSynonyms,
                    gap_fill: true,
                    ..ProviderSettings::new(Source::OpenAlex)
                },
                ProviderSettings {
                    role: ProviderRole::Secondary,
                    ..ProviderSettings::new(Source::Crossref)
                },
                ProviderSettings {
                    role: ProviderRole::Secondary,
                    gate: ProviderGate::QueryTerms(
                        trial_terms.iter().map(|t| t.to_string()).collect(),
                    ),
                    ..ProviderSettings::new(Source::ClinicalTrials)
                },
                ProviderSettings {
                    role: ProviderRole::Secondary,
                    gate: ProviderGate::QueryTerms(
                        drug_safety_terms.iter().map(|t| t.to_string()).collect(),
                    ),
                    ..ProviderSettings::new(Source::OpenFda)
                },
            ],
            source_preference: vec![
                Source::SemanticScholar,
                Source::PubMed,
                Source::EuropePmc,
                Source::OpenAlex,
                Source::Crossref,
                Source::ClinicalTrials,
                Source::OpenFda,
            ],
            provider_timeout_ms: 8_000,
            default_max_results: 20,
            max_enhancement_terms: 4,
            gap_fill: GapFillConfig::default(),
            scoring: ScoringConfig::default(),
            classifier: ClassifierConfig::default(),
            title_similarity_threshold: 0.95,
            terms: TermLists::default(),
            topics: default_topics(),
        }
    }
}

impl AggregatorConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - scoring weights are each in `[0, 1]` and sum to 1
    /// - `title_similarity_threshold` is in `(0, 1]`
    /// - `provider_timeout_ms` and `default_max_results` are greater than 0
    /// - `source_preference` is not empty and has no repeats
    /// - at most one settings entry per source
    /// - classifier and citation saturation points are positive
    pub fn validate(&self) -> Result<(), AggregateError> {
        let weights = &self.scoring.weights;
        for (name, value) in [
            ("semantic", weights.semantic),
            ("domain", weights.domain),
            ("evidence", weights.evidence),
            ("citation", weights.citation),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AggregateError::Config(format!(
                    "{name} weight must be within [0, 1], got {value}"
                )));
            }
        }
        if (weights.total() - 1.0).abs() > 1e-6 {
            return Err(AggregateError::Config(format!(
                "scoring weights must sum to 1, got {:.4}",
                weights.total()
            )));
        }
        if !(self.title_similarity_threshold > 0.0 && self.title_similarity_threshold <= 1.0) {
            return Err(AggregateError::Config(
                "title_similarity_threshold must be within (0, 1]".into(),
            ));
        }
        if self.provider_timeout_ms == 0 {
            return Err(AggregateError::Config(
                "provider_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.default_max_results == 0 {
            return Err(AggregateError::Config(
                "default_max_results must be greater than 0".into(),
            ));
        }
        if self.source_preference.is_empty() {
            return Err(AggregateError::Config(
                "source_preference must list at least one source".into(),
            ));
        }
        for (i, source) in self.source_preference.iter().enumerate() {
            if self.source_preference[..i].contains(source) {
                return Err(AggregateError::Config(format!(
                    "source_preference lists {source} more than once"
                )));
            }
        }
        for (i, settings) in self.providers.iter().enumerate() {
            if self.providers[..i].iter().any(|s| s.source == settings.source) {
                return Err(AggregateError::Config(format!(
                    "duplicate provider settings for {}",
                    settings.source
                )));
            }
        }
        if self.classifier.domain_saturation <= 0.0 {
            return Err(AggregateError::Config(
                "classifier domain_saturation must be greater than 0".into(),
            ));
        }
        if self.scoring.citation_saturation == 0 {
            return Err(AggregateError::Config(
                "citation_saturation must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Routing settings for `source`, falling back to plain primary settings.
    pub fn settings_for(&self, source: Source) -> ProviderSettings {
        self.providers
            .iter()
            .find(|s| s.source == source)
            .cloned()
            .unwrap_or_else(|| ProviderSettings::new(source))
    }

    /// Position of `source` in the preference list; unlisted sources rank last.
    pub fn source_rank(&self, source: Source) -> usize {
        self.source_preference
            .iter()
            .position(|s| *s == source)
            .unwrap_or(self.source_preference.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(AggregatorConfig::default().validate().is_ok());
    }

    #[test]
    fn default_weights_sum_to_one() {
        let weights = ScoringWeights::default();
        assert!((weights.total() - 1.0).abs() < 1e-9);
        assert!((weights.semantic - 0.45).abs() < f64::EPSILON);
    }

    #[test]
    fn default_thresholds() {
        let config = AggregatorConfig::default();
        assert!((config.title_similarity_threshold - 0.95).abs() < f64::EPSILON);
        assert!((config.classifier.min_admission_score - 3.0).abs() < f64::EPSILON);
        assert_eq!(config.gap_fill.min_primary_records, 2);
    }

    #[test]
    fn preference_ranks_semantic_index_above_citation_graph_above_regulatory() {
        let config = AggregatorConfig::default();
        assert!(config.source_rank(Source::SemanticScholar) < config.source_rank(Source::OpenAlex));
        assert!(config.source_rank(Source::OpenAlex) < config.source_rank(Source::OpenFda));
    }

    #[test]
    fn unlisted_source_ranks_last() {
        let config = AggregatorConfig {
            source_preference: vec![Source::PubMed],
            ..Default::default()
        };
        assert_eq!(config.source_rank(Source::PubMed), 0);
        assert_eq!(config.source_rank(Source::Crossref), 1);
    }

    #[test]
    fn regulatory_provider_is_gated() {
        let config = AggregatorConfig::default();
        let fda = config.settings_for(Source::OpenFda);
        assert!(matches!(fda.gate, ProviderGate::QueryTerms(ref terms) if terms.iter().any(|t| t == "drug")));
    }

    #[test]
    fn settings_for_unknown_entry_falls_back() {
        let config = AggregatorConfig {
            providers: vec![],
            ..Default::default()
        };
        let settings = config.settings_for(Source::Crossref);
        assert_eq!(settings, ProviderSettings::new(Source::Crossref));
    }

    #[test]
    fn weights_not_summing_to_one_rejected() {
        let mut config = AggregatorConfig::default();
        config.scoring.weights.semantic = 0.9;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sum to 1"));
    }

    #[test]
    fn negative_weight_rejected() {
        let mut config = AggregatorConfig::default();
        config.scoring.weights.semantic = -0.1;
        config.scoring.weights.domain = 0.8;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("semantic"));
    }

    #[test]
    fn zero_similarity_threshold_rejected() {
        let config = AggregatorConfig {
            title_similarity_threshold: 0.0,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("title_similarity"));
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = AggregatorConfig {
            provider_timeout_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("timeout"));
    }

    #[test]
    fn empty_preference_rejected() {
        let config = AggregatorConfig {
            source_preference: vec![],
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("source_preference"));
    }

    #[test]
    fn repeated_preference_rejected() {
        let config = AggregatorConfig {
            source_preference: vec![Source::PubMed, Source::PubMed],
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("more than once"));
    }

    #[test]
    fn duplicate_provider_settings_rejected() {
        let config = AggregatorConfig {
            providers: vec![
                ProviderSettings::new(Source::PubMed),
                ProviderSettings::new(Source::PubMed),
            ],
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("duplicate"));
    }

    #[test]
    fn config_serde_round_trip_with_partial_input() {
        let json = r#"{"provider_timeout_ms": 1500, "scoring": {"reference_year": 2024}}"#;
        let config: AggregatorConfig = serde_json::from_str(json).expect("deserialize");
        assert_eq!(config.provider_timeout_ms, 1500);
        assert_eq!(config.scoring.reference_year, Some(2024));
        assert!((config.scoring.weights.domain - 0.25).abs() < f64::EPSILON);
        assert!(!config.terms.off_domain.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn gate_serializes_with_terms() {
        let gate = ProviderGate::QueryTerms(vec!["drug".into()]);
        let json = serde_json::to_string(&gate).expect("serialize");
        assert_eq!(json, r#"{"kind":"query_terms","terms":["drug"]}"#);
        let always = serde_json::to_string(&ProviderGate::Always).expect("serialize");
        assert_eq!(always, r#"{"kind":"always"}"#);
    }
}
