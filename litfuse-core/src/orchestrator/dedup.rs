//! Record deduplication by identifier and normalised title.
//!
//! Groups scored records that describe the same work into clusters and
//! elects one representative per cluster. Matching is tried in priority
//! order:
//!
//! 1. a shared DOI or PMID with any cluster (identifiers are transitive, so
//!    a record bridging two clusters merges them)
//! 2. normalised-title similarity at or above the configured threshold
//!    against a cluster's **current representative** only
//!
//! Titles never chain: if A matches B and B matches C, C joins A's cluster
//! only if it also matches whichever record currently represents it.
//!
//! The representative is elected by source preference; equal preference
//! falls back to composite score, then title, then identifiers, so the
//! outcome does not depend on input order.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use similar::TextDiff;

use crate::config::AggregatorConfig;
use crate::text::normalize_title;
use crate::types::{CanonicalRecord, ScoredRecord, Source};

/// Character-level similarity ratio of two normalised titles, in `[0, 1]`.
///
/// Two empty titles are never considered similar.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    f64::from(TextDiff::from_chars(a, b).ratio())
}

/// Whether two normalised titles are similar enough to be the same work.
pub fn titles_match(a: &str, b: &str, threshold: f64) -> bool {
    let (len_a, len_b) = (a.chars().count(), b.chars().count());
    if len_a == 0 || len_b == 0 {
        return false;
    }
    // The ratio can never exceed 2 * min / (len_a + len_b).
    let upper_bound = 2.0 * len_a.min(len_b) as f64 / (len_a + len_b) as f64;
    upper_bound >= threshold && title_similarity(a, b) >= threshold
}

/// Total order deciding which record represents a cluster.
///
/// Returns [`Ordering::Less`] when `a` should be preferred over `b`.
pub fn preference_order(config: &AggregatorConfig, a: &ScoredRecord, b: &ScoredRecord) -> Ordering {
    config
        .source_rank(a.record.source)
        .cmp(&config.source_rank(b.record.source))
        .then_with(|| b.composite_score.total_cmp(&a.composite_score))
        .then_with(|| a.record.title.cmp(&b.record.title))
        .then_with(|| a.record.doi.cmp(&b.record.doi))
        .then_with(|| a.record.pmid.cmp(&b.record.pmid))
}

#[derive(Debug, Clone)]
struct Cluster {
    representative: ScoredRecord,
    normalized_title: String,
    dois: BTreeSet<String>,
    pmids: BTreeSet<String>,
    sources: BTreeSet<Source>,
    member_count: usize,
    admitted: bool,
}

impl Cluster {
    fn new(record: ScoredRecord) -> Self {
        Self {
            normalized_title: normalize_title(&record.record.title),
            dois: record.record.doi.iter().cloned().collect(),
            pmids: record.record.pmid.iter().cloned().collect(),
            sources: BTreeSet::from([record.record.source]),
            member_count: 1,
            admitted: record.is_admitted(),
            representative: record,
        }
    }

    fn own_identifiers(&mut self, record: &ScoredRecord) {
        if let Some(doi) = &record.record.doi {
            self.dois.insert(doi.clone());
        }
        if let Some(pmid) = &record.record.pmid {
            self.pmids.insert(pmid.clone());
        }
        self.sources.insert(record.record.source);
    }

    fn shares_identifier(&self, record: &ScoredRecord) -> bool {
        record
            .record
            .doi
            .as_ref()
            .is_some_and(|doi| self.dois.contains(doi))
            || record
                .record
                .pmid
                .as_ref()
                .is_some_and(|pmid| self.pmids.contains(pmid))
    }

    fn shares_identifier_with(&self, other: &Cluster) -> bool {
        !self.dois.is_disjoint(&other.dois) || !self.pmids.is_disjoint(&other.pmids)
    }

    fn elect(&mut self, candidate: ScoredRecord, config: &AggregatorConfig) {
        if preference_order(config, &candidate, &self.representative) == Ordering::Less {
            self.normalized_title = normalize_title(&candidate.record.title);
            self.representative = candidate;
        }
    }

    fn absorb(&mut self, record: ScoredRecord, config: &AggregatorConfig) {
        self.own_identifiers(&record);
        self.member_count += 1;
        self.admitted |= record.is_admitted();
        self.elect(record, config);
    }

    fn merge(&mut self, other: Cluster, config: &AggregatorConfig) {
        self.dois.extend(other.dois);
        self.pmids.extend(other.pmids);
        self.sources.extend(other.sources);
        self.member_count += other.member_count;
        self.admitted |= other.admitted;
        self.elect(other.representative, config);
    }

    fn into_canonical(self) -> CanonicalRecord {
        CanonicalRecord {
            best: self.representative,
            dois: self.dois.into_iter().collect(),
            pmids: self.pmids.into_iter().collect(),
            sources: self.sources.into_iter().collect(),
            member_count: self.member_count,
            admitted: self.admitted,
        }
    }
}

/// Merge every cluster in `indices` (ascending) into the first one.
/// Returns the index of the surviving cluster.
fn merge_into_first(clusters: &mut Vec<Cluster>, indices: &[usize], config: &AggregatorConfig) -> usize {
    let target = indices[0];
    for &idx in indices[1..].iter().rev() {
        let other = clusters.remove(idx);
        clusters[target].merge(other, config);
    }
    target
}

/// Merge clusters whose representatives drifted into matching each other.
fn consolidate(clusters: &mut Vec<Cluster>, config: &AggregatorConfig) {
    let threshold = config.title_similarity_threshold;
    loop {
        let mut pair = None;
        'search: for i in 0..clusters.len() {
            for j in (i + 1)..clusters.len() {
                if clusters[i].shares_identifier_with(&clusters[j])
                    || titles_match(
                        &clusters[i].normalized_title,
                        &clusters[j].normalized_title,
                        threshold,
                    )
                {
                    pair = Some((i, j));
                    break 'search;
                }
            }
        }
        let Some((i, j)) = pair else {
            break;
        };
        let other = clusters.remove(j);
        clusters[i].merge(other, config);
    }
}

/// Deduplicate scored records into canonical records.
///
/// Every input record ends up in exactly one cluster. The output order
/// follows cluster creation order and carries no ranking meaning; the
/// finalizer sorts by score.
pub fn deduplicate(records: Vec<ScoredRecord>, config: &AggregatorConfig) -> Vec<CanonicalRecord> {
    let threshold = config.title_similarity_threshold;
    let input_count = records.len();
    let mut clusters: Vec<Cluster> = Vec::new();

    for record in records {
        let id_matches: Vec<usize> = clusters
            .iter()
            .enumerate()
            .filter(|(_, cluster)| cluster.shares_identifier(&record))
            .map(|(idx, _)| idx)
            .collect();
        if !id_matches.is_empty() {
            let target = merge_into_first(&mut clusters, &id_matches, config);
            clusters[target].absorb(record, config);
            continue;
        }

        let title = normalize_title(&record.record.title);
        match clusters
            .iter()
            .position(|cluster| titles_match(&cluster.normalized_title, &title, threshold))
        {
            Some(idx) => clusters[idx].absorb(record, config),
            None => clusters.push(Cluster::new(record)),
        }
    }

    consolidate(&mut clusters, config);

    tracing::debug!(
        input = input_count,
        canonical = clusters.len(),
        "deduplicated records"
    );

    clusters.into_iter().map(Cluster::into_canonical).collect()
}
