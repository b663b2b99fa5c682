//! Query expansion: keywords, query variants and domain tags.

use serde::{Deserialize, Serialize};

use crate::config::AggregatorConfig;
use crate::text::{tokenize, TokenText};
use crate::vocabulary::TopicConfig;

/// Synonyms appended per topic in the synonym-expanded variant.
const VARIANT_SYNONYMS_PER_TOPIC: usize = 2;

/// A user query with everything derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedQuery {
    /// The trimmed user query.
    pub original: String,
    /// Content words of the query, lowercased and de-duplicated.
    pub keywords: Vec<String>,
    /// Alternative phrasings, original first.
    pub variants: Vec<String>,
    /// Tags of the topics detected in the query.
    pub domain_tags: Vec<String>,
}

impl ExpandedQuery {
    /// Keyword query joined with `OR`, used for the gap-fill round.
    pub fn broadened(&self) -> String {
        if self.keywords.is_empty() {
            self.original.clone()
        } else {
            self.keywords.join(" OR ")
        }
    }

    /// Queries for the gap-fill round: the broadened query first, then the
    /// remaining variants other than the original.
    pub fn gap_fill_queries(&self) -> Vec<String> {
        let mut queries = vec![self.broadened()];
        for variant in self.variants.iter().skip(1) {
            if !queries.contains(variant) {
                queries.push(variant.clone());
            }
        }
        queries
    }

    /// Detected topics, in configuration order.
    pub fn topics<'a>(&self, config: &'a AggregatorConfig) -> Vec<&'a TopicConfig> {
        config
            .topics
            .iter()
            .filter(|topic| self.domain_tags.contains(&topic.tag))
            .collect()
    }
}

/// Expand a user query into keywords, variants and domain tags.
///
/// The caller is expected to have rejected blank queries already; a blank
/// query here simply produces empty keyword and tag lists.
pub fn expand(query: &str, config: &AggregatorConfig) -> ExpandedQuery {
    let original = query.trim().to_string();

    let mut keywords: Vec<String> = Vec::new();
    for token in tokenize(&original) {
        let is_stopword = config.terms.stopwords.iter().any(|s| *s == token);
        if token.chars().count() > 1 && !is_stopword && !keywords.contains(&token) {
            keywords.push(token);
        }
    }

    let text = TokenText::new(&original);
    let detected: Vec<&TopicConfig> = config
        .topics
        .iter()
        .filter(|topic| text.contains_any(&topic.triggers))
        .collect();
    let domain_tags: Vec<String> = detected.iter().map(|t| t.tag.clone()).collect();

    let keyword_query = keywords.join(" ");
    let mut variants: Vec<String> = Vec::new();
    let mut push_variant = |variant: String| {
        if !variant.is_empty() && !variants.contains(&variant) {
            variants.push(variant);
        }
    };
    push_variant(original.clone());
    push_variant(keyword_query.clone());
    for topic in &detected {
        let synonyms: Vec<&str> = topic
            .synonyms
            .iter()
            .filter(|syn| !text.contains(syn))
            .take(VARIANT_SYNONYMS_PER_TOPIC)
            .map(String::as_str)
            .collect();
        if !synonyms.is_empty() {
            push_variant(format!("{keyword_query} {}", synonyms.join(" ")));
        }
    }
    if keywords.len() > 1 {
        push_variant(keywords.join(" OR "));
    }

    tracing::trace!(query = %original, ?domain_tags, variants = variants.len(), "expanded query");

    ExpandedQuery {
        original,
        keywords,
        variants,
        domain_tags,
    }
}
