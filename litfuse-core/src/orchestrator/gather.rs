//! Source orchestration: concurrent provider fan-out with failure isolation.
//!
//! Every enabled, ungated provider is queried concurrently with its own
//! enhanced query. Each call runs behind a timeout and a panic boundary, so
//! one broken provider only ever costs its own records. When the first
//! round comes back thin, a second bounded round re-queries the gap-fill
//! providers, spreading the broadened query and the other query variants
//! across them.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use crate::config::{AggregatorConfig, ProviderGate, ProviderRole, ProviderSettings, QueryEnhancement};
use crate::error::ProviderError;
use crate::provider::{LiteratureProvider, SearchOptions};
use crate::text::TokenText;
use crate::types::{ProviderFailure, QueryRound, RawRecord, Source};

use super::expand::ExpandedQuery;
use super::identifiers::{normalize_doi, normalize_pmid};

/// Everything the orchestrator learned while collecting records.
#[derive(Debug, Clone, Default)]
pub struct GatherOutcome {
    /// Sanitised records from every successful call, in no particular order.
    pub records: Vec<RawRecord>,
    /// Sources called at least once.
    pub queried: Vec<Source>,
    /// Sources not called because they were disabled or gated out.
    pub skipped: Vec<Source>,
    pub failures: Vec<ProviderFailure>,
    pub gap_fill_triggered: bool,
    /// Records dropped for having no usable title.
    pub malformed: usize,
}

/// Whether `gate` lets a provider run for this query.
pub fn gate_allows(gate: &ProviderGate, expanded: &ExpandedQuery) -> bool {
    match gate {
        ProviderGate::Always => true,
        ProviderGate::QueryTerms(terms) => TokenText::new(&expanded.original).contains_any(terms),
        ProviderGate::DomainTags(tags) => tags.iter().any(|tag| expanded.domain_tags.contains(tag)),
    }
}

/// Build the query string sent to a provider with the given enhancement.
pub fn build_provider_query(
    expanded: &ExpandedQuery,
    enhancement: QueryEnhancement,
    config: &AggregatorConfig,
) -> String {
    if enhancement == QueryEnhancement::Plain {
        return expanded.original.clone();
    }
    let topics = expanded.topics(config);
    let query_text = TokenText::new(&expanded.original);
    let mut terms: Vec<&str> = Vec::new();
    let candidates = topics.iter().flat_map(|topic| match enhancement {
        QueryEnhancement::MeshTerms => topic.mesh_terms.iter(),
        _ => topic.synonyms.iter(),
    });
    for term in candidates {
        if terms.len() >= config.max_enhancement_terms {
            break;
        }
        if !terms.contains(&term.as_str()) && !query_text.contains(term) {
            terms.push(term);
        }
    }
    if terms.is_empty() {
        return expanded.original.clone();
    }

    let clauses: Vec<String> = match enhancement {
        QueryEnhancement::MeshTerms => terms.iter().map(|t| format!("\"{t}\"[MeSH Terms]")).collect(),
        _ => terms.iter().map(|t| format!("\"{t}\"")).collect(),
    };
    format!("({}) OR {}", expanded.original, clauses.join(" OR "))
}

/// Clean up provider output: tag the source, trim text, normalise
/// identifiers, and drop records without a title.
fn sanitize(records: Vec<RawRecord>, source: Source) -> (Vec<RawRecord>, usize) {
    let mut malformed = 0;
    let mut clean = Vec::with_capacity(records.len());
    for mut record in records {
        record.title = record.title.trim().to_string();
        if record.title.is_empty() {
            malformed += 1;
            continue;
        }
        record.source = source;
        record.doi = record.doi.as_deref().and_then(normalize_doi);
        record.pmid = record.pmid.as_deref().and_then(normalize_pmid);
        record.authors.retain(|a| !a.trim().is_empty());
        record.abstract_text = record
            .abstract_text
            .take()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        clean.push(record);
    }
    (clean, malformed)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run one provider call inside the timeout and panic boundary.
async fn call_provider(
    provider: Arc<dyn LiteratureProvider>,
    query: String,
    options: SearchOptions,
    timeout: Duration,
) -> Result<Vec<RawRecord>, ProviderError> {
    let guarded = AssertUnwindSafe(provider.search(&query, &options)).catch_unwind();
    match tokio::time::timeout(timeout, guarded).await {
        Err(_) => Err(ProviderError::Timeout(format!(
            "no response within {}ms",
            timeout.as_millis()
        ))),
        Ok(Err(payload)) => Err(ProviderError::Panicked(panic_message(payload.as_ref()))),
        Ok(Ok(result)) => result,
    }
}

/// A provider scheduled for one round, with the query it will receive.
struct PlannedCall {
    provider: Arc<dyn LiteratureProvider>,
    settings: ProviderSettings,
    query: String,
    max_results: usize,
}

/// Per-round tallies.
#[derive(Default)]
struct RoundResult {
    records: Vec<RawRecord>,
    primary_records: usize,
}

async fn run_round(
    calls: Vec<PlannedCall>,
    round: QueryRound,
    expanded: &ExpandedQuery,
    config: &AggregatorConfig,
    outcome: &mut GatherOutcome,
) -> RoundResult {
    let timeout = Duration::from_millis(config.provider_timeout_ms);
    let futures: Vec<_> = calls
        .into_iter()
        .map(|call| {
            let options = SearchOptions {
                max_results: call.max_results,
                domain_hints: expanded.domain_tags.clone(),
            };
            let source = call.provider.source();
            tracing::trace!(%source, query = %call.query, ?round, "querying provider");
            async move {
                let result = call_provider(call.provider, call.query, options, timeout).await;
                (source, call.settings.role, result)
            }
        })
        .collect();

    let settled = futures::future::join_all(futures).await;

    let mut result = RoundResult::default();
    for (source, role, settled_call) in settled {
        if !outcome.queried.contains(&source) {
            outcome.queried.push(source);
        }
        match settled_call {
            Ok(records) => {
                let (clean, malformed) = sanitize(records, source);
                tracing::debug!(%source, ?round, count = clean.len(), malformed, "provider returned records");
                outcome.malformed += malformed;
                if role == ProviderRole::Primary {
                    result.primary_records += clean.len();
                }
                result.records.extend(clean);
            }
            Err(err) => {
                tracing::warn!(%source, ?round, error = %err, "provider query failed");
                outcome.failures.push(ProviderFailure {
                    source,
                    round,
                    reason: err.to_string(),
                });
            }
        }
    }
    result
}

/// Query every enabled provider concurrently and collect their records.
///
/// Never fails: provider errors, timeouts and panics are recorded in
/// [`GatherOutcome::failures`] and contribute zero records.
pub async fn gather(
    expanded: &ExpandedQuery,
    providers: &[Arc<dyn LiteratureProvider>],
    config: &AggregatorConfig,
) -> GatherOutcome {
    let mut outcome = GatherOutcome::default();

    let mut active: Vec<(Arc<dyn LiteratureProvider>, ProviderSettings)> = Vec::new();
    for provider in providers {
        let source = provider.source();
        let settings = config.settings_for(source);
        if !settings.enabled {
            tracing::debug!(%source, "provider disabled");
            outcome.skipped.push(source);
        } else if !gate_allows(&settings.gate, expanded) {
            tracing::debug!(%source, "provider gated out for this query");
            outcome.skipped.push(source);
        } else {
            active.push((Arc::clone(provider), settings));
        }
    }

    // 1. Primary round.
    let calls = active
        .iter()
        .map(|(provider, settings)| PlannedCall {
            provider: Arc::clone(provider),
            query: build_provider_query(expanded, settings.enhancement, config),
            max_results: settings.max_results.unwrap_or(config.default_max_results),
            settings: settings.clone(),
        })
        .collect();
    let primary = run_round(calls, QueryRound::Primary, expanded, config, &mut outcome).await;

    let thin = primary.primary_records < config.gap_fill.min_primary_records
        || primary.records.len() < config.gap_fill.min_total_records;
    outcome.records = primary.records;

    // 2. Gap-fill round. Providers take the variants round-robin, broadest first.
    if thin {
        let queries = expanded.gap_fill_queries();
        let calls: Vec<PlannedCall> = active
            .iter()
            .filter(|(_, settings)| settings.gap_fill)
            .zip(queries.iter().cycle())
            .map(|((provider, settings), query)| PlannedCall {
                provider: Arc::clone(provider),
                query: query.clone(),
                max_results: config.gap_fill.max_results,
                settings: settings.clone(),
            })
            .collect();
        if !calls.is_empty() {
            tracing::debug!(
                records = outcome.records.len(),
                providers = calls.len(),
                "results thin; running gap-fill round"
            );
            outcome.gap_fill_triggered = true;
            let extra = run_round(calls, QueryRound::GapFill, expanded, config, &mut outcome).await;
            outcome.records.extend(extra.records);
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::expand::expand;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedProvider {
        source: Source,
        records: Vec<RawRecord>,
        fail: bool,
        seen_queries: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(source: Source, records: Vec<RawRecord>) -> Arc<Self> {
            Arc::new(Self {
                source,
                records,
                fail: false,
                seen_queries: Mutex::new(Vec::new()),
            })
        }

        fn failing(source: Source) -> Arc<Self> {
            Arc::new(Self {
                source,
                records: vec![],
                fail: true,
                seen_queries: Mutex::new(Vec::new()),
            })
        }

        fn queries(&self) -> Vec<String> {
            self.seen_queries.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl LiteratureProvider for ScriptedProvider {
        async fn search(&self, query: &str, _options: &SearchOptions) -> Result<Vec<RawRecord>, ProviderError> {
            self.seen_queries.lock().expect("lock").push(query.to_string());
            if self.fail {
                return Err(ProviderError::Http("503 service unavailable".into()));
            }
            Ok(self.records.clone())
        }

        fn source(&self) -> Source {
            self.source
        }
    }

    struct PanickingProvider;

    #[async_trait]
    impl LiteratureProvider for PanickingProvider {
        async fn search(&self, _query: &str, _options: &SearchOptions) -> Result<Vec<RawRecord>, ProviderError> {
            panic!("adapter bug");
        }

        fn source(&self) -> Source {
            Source::Crossref
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl LiteratureProvider for SlowProvider {
        async fn search(&self, _query: &str, _options: &SearchOptions) -> Result<Vec<RawRecord>, ProviderError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(vec![RawRecord::new("Too late", Source::OpenAlex)])
        }

        fn source(&self) -> Source {
            Source::OpenAlex
        }
    }

    fn records(n: usize, source: Source) -> Vec<RawRecord> {
        (0..n)
            .map(|i| RawRecord::new(format!("{source} record {i}"), source))
            .collect()
    }

    fn quiet_config() -> AggregatorConfig {
        AggregatorConfig {
            gap_fill: crate::config::GapFillConfig {
                min_primary_records: 0,
                min_total_records: 0,
                max_results: 25,
            },
            ..Default::default()
        }
    }

    #[test]
    fn gate_checks_query_terms_and_tags() {
        let config = AggregatorConfig::default();
        let drug_query = expand("adverse effects of statin drugs", &config);
        let plain_query = expand("exercise and sleep", &config);
        let fda_gate = config.settings_for(Source::OpenFda).gate;
        assert!(gate_allows(&fda_gate, &drug_query));
        assert!(!gate_allows(&fda_gate, &plain_query));

        let tag_gate = ProviderGate::DomainTags(vec!["cardiology".into()]);
        assert!(gate_allows(&tag_gate, &drug_query));
        assert!(!gate_allows(&tag_gate, &plain_query));
        assert!(gate_allows(&ProviderGate::Always, &plain_query));
    }

    #[test]
    fn plain_query_is_unchanged() {
        let config = AggregatorConfig::default();
        let expanded = expand("statins in heart failure", &config);
        assert_eq!(
            build_provider_query(&expanded, QueryEnhancement::Plain, &config),
            "statins in heart failure"
        );
    }

    #[test]
    fn boolean_synonyms_appended_without_repeating_query_terms() {
        let config = AggregatorConfig::default();
        let expanded = expand("statins in heart failure", &config);
        let query = build_provider_query(&expanded, QueryEnhancement::BooleanSynonyms, &config);
        assert!(query.starts_with("(statins in heart failure) OR \"myocardial infarction\""));
        assert!(!query.contains("\"heart failure\""));
    }

    #[test]
    fn mesh_terms_appended() {
        let config = AggregatorConfig::default();
        let expanded = expand("metformin dosing", &config);
        let query = build_provider_query(&expanded, QueryEnhancement::MeshTerms, &config);
        assert_eq!(
            query,
            "(metformin dosing) OR \"Diabetes Mellitus\"[MeSH Terms] OR \"Insulin\"[MeSH Terms] OR \"Obesity\"[MeSH Terms]"
        );
    }

    #[test]
    fn enhancement_respects_term_cap() {
        let config = AggregatorConfig {
            max_enhancement_terms: 1,
            ..Default::default()
        };
        let expanded = expand("depression in cancer patients", &config);
        let query = build_provider_query(&expanded, QueryEnhancement::BooleanSynonyms, &config);
        assert_eq!(query.matches(" OR ").count(), 1);
    }

    #[test]
    fn untagged_query_gets_no_enhancement() {
        let config = AggregatorConfig::default();
        let expanded = expand("hand washing compliance", &config);
        assert_eq!(
            build_provider_query(&expanded, QueryEnhancement::MeshTerms, &config),
            "hand washing compliance"
        );
    }

    #[test]
    fn sanitize_normalises_and_drops_untitled() {
        let input = vec![
            RawRecord::new("  Valid  ", Source::Crossref)
                .with_doi("https://doi.org/10.1000/ABC")
                .with_pmid("PMID: 0042")
                .with_authors(["Smith", " "])
                .with_abstract("   "),
            RawRecord::new("   ", Source::Crossref),
        ];
        let (clean, malformed) = sanitize(input, Source::PubMed);
        assert_eq!(malformed, 1);
        assert_eq!(clean.len(), 1);
        let record = &clean[0];
        assert_eq!(record.title, "Valid");
        assert_eq!(record.source, Source::PubMed);
        assert_eq!(record.doi.as_deref(), Some("10.1000/abc"));
        assert_eq!(record.pmid.as_deref(), Some("42"));
        assert_eq!(record.authors, vec!["Smith"]);
        assert!(record.abstract_text.is_none());
    }

    #[tokio::test]
    async fn failures_are_isolated() {
        let config = quiet_config();
        let expanded = expand("statins", &config);
        let providers: Vec<Arc<dyn LiteratureProvider>> = vec![
            ScriptedProvider::new(Source::SemanticScholar, records(3, Source::SemanticScholar)),
            ScriptedProvider::failing(Source::PubMed),
            ScriptedProvider::new(Source::EuropePmc, records(2, Source::EuropePmc)),
        ];
        let outcome = gather(&expanded, &providers, &config).await;
        assert_eq!(outcome.records.len(), 5);
        assert_eq!(outcome.queried.len(), 3);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].source, Source::PubMed);
        assert_eq!(outcome.failures[0].round, QueryRound::Primary);
        assert!(outcome.failures[0].reason.contains("503"));
        assert!(!outcome.gap_fill_triggered);
    }

    #[tokio::test]
    async fn panicking_provider_is_contained() {
        let config = quiet_config();
        let expanded = expand("statins", &config);
        let providers: Vec<Arc<dyn LiteratureProvider>> = vec![
            Arc::new(PanickingProvider),
            ScriptedProvider::new(Source::PubMed, records(2, Source::PubMed)),
        ];
        let outcome = gather(&expanded, &providers, &config).await;
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].reason.contains("adapter bug"));
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let config = AggregatorConfig {
            provider_timeout_ms: 50,
            ..quiet_config()
        };
        let expanded = expand("statins", &config);
        let providers: Vec<Arc<dyn LiteratureProvider>> = vec![
            Arc::new(SlowProvider),
            ScriptedProvider::new(Source::PubMed, records(2, Source::PubMed)),
        ];
        let outcome = gather(&expanded, &providers, &config).await;
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].source, Source::OpenAlex);
        assert!(outcome.failures[0].reason.contains("timed out"));
    }

    #[tokio::test]
    async fn gated_provider_is_skipped() {
        let config = quiet_config();
        let expanded = expand("exercise and sleep quality", &config);
        let fda = ScriptedProvider::new(Source::OpenFda, records(3, Source::OpenFda));
        let providers: Vec<Arc<dyn LiteratureProvider>> = vec![
            fda.clone(),
            ScriptedProvider::new(Source::PubMed, records(2, Source::PubMed)),
        ];
        let outcome = gather(&expanded, &providers, &config).await;
        assert_eq!(outcome.skipped, vec![Source::OpenFda]);
        assert!(fda.queries().is_empty());
        assert_eq!(outcome.records.len(), 2);
    }

    #[tokio::test]
    async fn disabled_provider_is_skipped() {
        let mut config = quiet_config();
        for settings in &mut config.providers {
            if settings.source == Source::Crossref {
                settings.enabled = false;
            }
        }
        let expanded = expand("statins", &config);
        let crossref = ScriptedProvider::new(Source::Crossref, records(3, Source::Crossref));
        let providers: Vec<Arc<dyn LiteratureProvider>> = vec![crossref.clone()];
        let outcome = gather(&expanded, &providers, &config).await;
        assert_eq!(outcome.skipped, vec![Source::Crossref]);
        assert!(outcome.records.is_empty());
        assert!(crossref.queries().is_empty());
    }

    #[tokio::test]
    async fn thin_primary_results_trigger_gap_fill() {
        let config = AggregatorConfig::default();
        let expanded = expand("aspirin stroke prevention", &config);
        let semantic = ScriptedProvider::new(Source::SemanticScholar, records(1, Source::SemanticScholar));
        let europe = ScriptedProvider::new(Source::EuropePmc, records(2, Source::EuropePmc));
        let crossref = ScriptedProvider::new(Source::Crossref, records(2, Source::Crossref));
        let providers: Vec<Arc<dyn LiteratureProvider>> =
            vec![semantic.clone(), europe.clone(), crossref.clone()];

        let outcome = gather(&expanded, &providers, &config).await;

        assert!(outcome.gap_fill_triggered);
        // Semantic Scholar and Europe PMC are gap-fill providers; Crossref is not.
        assert_eq!(semantic.queries().len(), 2);
        assert_eq!(europe.queries().len(), 2);
        assert_eq!(crossref.queries().len(), 1);
        assert_eq!(semantic.queries()[1], "aspirin OR stroke OR prevention");
        assert_eq!(outcome.records.len(), 1 + 2 + 2 + 1 + 2);
        assert_eq!(outcome.queried.len(), 3);
    }

    #[tokio::test]
    async fn gap_fill_spreads_query_variants_across_providers() {
        let config = AggregatorConfig::default();
        let expanded = expand("aspirin stroke prevention", &config);
        let semantic = ScriptedProvider::new(Source::SemanticScholar, vec![]);
        let pubmed = ScriptedProvider::new(Source::PubMed, vec![]);
        let europe = ScriptedProvider::new(Source::EuropePmc, vec![]);
        let providers: Vec<Arc<dyn LiteratureProvider>> =
            vec![semantic.clone(), pubmed.clone(), europe.clone()];

        let outcome = gather(&expanded, &providers, &config).await;

        assert!(outcome.gap_fill_triggered);
        let gap_fill: Vec<String> = [&semantic, &pubmed, &europe]
            .iter()
            .map(|p| p.queries()[1].clone())
            .collect();
        assert_eq!(gap_fill[0], "aspirin OR stroke OR prevention");
        // The synonym-expanded variant reaches the second gap-fill provider.
        assert_eq!(gap_fill[1], expanded.gap_fill_queries()[1]);
        assert!(gap_fill[1].starts_with("aspirin stroke prevention "));
        assert!(gap_fill[1].contains("myocardial infarction"));
        // More providers than variants wraps around.
        assert_eq!(expanded.gap_fill_queries().len(), 2);
        assert_eq!(gap_fill[2], gap_fill[0]);
    }

    #[tokio::test]
    async fn gap_fill_failures_are_recorded_per_round() {
        let config = AggregatorConfig::default();
        let expanded = expand("aspirin", &config);
        let providers: Vec<Arc<dyn LiteratureProvider>> = vec![ScriptedProvider::failing(Source::PubMed)];
        let outcome = gather(&expanded, &providers, &config).await;
        assert!(outcome.gap_fill_triggered);
        let rounds: Vec<QueryRound> = outcome.failures.iter().map(|f| f.round).collect();
        assert_eq!(rounds, vec![QueryRound::Primary, QueryRound::GapFill]);
        assert_eq!(outcome.queried, vec![Source::PubMed]);
    }

    #[tokio::test]
    async fn no_providers_yields_empty_outcome() {
        let config = AggregatorConfig::default();
        let expanded = expand("anything", &config);
        let outcome = gather(&expanded, &[], &config).await;
        assert!(outcome.records.is_empty());
        assert!(outcome.queried.is_empty());
        assert!(!outcome.gap_fill_triggered);
    }
}
