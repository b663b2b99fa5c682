//! Two-phase lexical relevance classification.
//!
//! # Phases
//!
//! 1. **Exclusion**: a record whose title, abstract or venue mentions an
//!    off-domain term and no clinical context term is rejected outright.
//! 2. **Inclusion**: surviving records earn points for on-domain
//!    vocabulary, a known venue and topic synonyms, lose points for
//!    off-domain mentions, and are admitted at the configured threshold.
//!
//! ```text
//! points = min(vocab_hits, max_vocabulary_points)
//!        + venue_bonus        (venue in known list)
//!        + topic_bonus        (synonym of a detected topic present)
//!        - off_domain_penalty (off-domain term present, not excluded)
//! admit  = points >= min_admission_score
//! ```

use crate::config::{AggregatorConfig, ClassifierConfig};
use crate::text::TokenText;
use crate::types::{Classification, RawRecord, Verdict};
use crate::vocabulary::TopicConfig;

use super::expand::ExpandedQuery;

/// Decides whether a record belongs to the query's domain.
///
/// The pipeline only depends on this trait, so the keyword heuristics in
/// [`LexicalClassifier`] can be replaced by a learned model.
pub trait RelevanceClassifier: Send + Sync {
    fn classify(&self, record: &RawRecord, query: &ExpandedQuery) -> Classification;
}

/// Keyword-list classifier built from [`AggregatorConfig`] term lists.
#[derive(Debug, Clone)]
pub struct LexicalClassifier {
    off_domain: Vec<String>,
    context: Vec<String>,
    vocabulary: Vec<String>,
    venues: Vec<String>,
    topics: Vec<TopicConfig>,
    settings: ClassifierConfig,
}

impl LexicalClassifier {
    /// Build the classifier, resolving overlaps between the off-domain and
    /// context lists in favour of context.
    pub fn new(config: &AggregatorConfig) -> Self {
        let terms = &config.terms;
        let off_domain: Vec<String> = terms
            .off_domain
            .iter()
            .filter(|term| {
                let overlaps = terms.on_domain_context.contains(term);
                if overlaps {
                    tracing::debug!(%term, "off-domain term also listed as context; treating as context");
                }
                !overlaps
            })
            .cloned()
            .collect();

        Self {
            off_domain,
            context: terms.on_domain_context.clone(),
            vocabulary: terms.on_domain.clone(),
            venues: terms.known_venues.clone(),
            topics: config.topics.clone(),
            settings: config.classifier.clone(),
        }
    }

    fn topic_terms_present(&self, text: &TokenText, query: &ExpandedQuery) -> bool {
        self.topics
            .iter()
            .filter(|topic| query.domain_tags.contains(&topic.tag))
            .any(|topic| text.contains_any(&topic.synonyms) || text.contains_any(&topic.triggers))
    }
}

impl RelevanceClassifier for LexicalClassifier {
    fn classify(&self, record: &RawRecord, query: &ExpandedQuery) -> Classification {
        let text = TokenText::new(&record.combined_text());

        // Phase 1: exclusion.
        let off_domain_hit = text.first_match(&self.off_domain);
        if let Some(term) = off_domain_hit {
            if !text.contains_any(&self.context) {
                return Classification {
                    admit: false,
                    domain_score: 0.0,
                    points: 0.0,
                    verdict: Verdict::Excluded {
                        term: term.to_string(),
                    },
                };
            }
        }

        // Phase 2: inclusion.
        let vocab_hits: usize = self.vocabulary.iter().map(|term| text.count(term)).sum();
        let mut points = (vocab_hits as f64).min(self.settings.max_vocabulary_points);

        let venue_known = record
            .venue
            .as_deref()
            .is_some_and(|venue| TokenText::new(venue).contains_any(&self.venues));
        if venue_known {
            points += self.settings.venue_bonus;
        }
        if self.topic_terms_present(&text, query) {
            points += self.settings.topic_bonus;
        }
        if off_domain_hit.is_some() {
            points -= self.settings.off_domain_penalty;
        }

        let admit = points >= self.settings.min_admission_score;
        Classification {
            admit,
            domain_score: (points / self.settings.domain_saturation).clamp(0.0, 1.0),
            points,
            verdict: if admit {
                Verdict::Admitted
            } else {
                Verdict::BelowThreshold
            },
        }
    }
}
