//! Core types for literature records, scoring output and diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Literature sources that litfuse knows how to rank and label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Semantic Scholar: specialised semantic paper index.
    SemanticScholar,
    /// PubMed: biomedical citation database.
    PubMed,
    /// Europe PMC: biomedical full-text and abstract index.
    EuropePmc,
    /// OpenAlex: general open citation graph.
    OpenAlex,
    /// Crossref: DOI registration metadata.
    Crossref,
    /// ClinicalTrials.gov: trial registry.
    ClinicalTrials,
    /// openFDA: regulatory database (labels, adverse events, recalls).
    OpenFda,
}

impl Source {
    /// Returns the human-readable name of this source.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SemanticScholar => "Semantic Scholar",
            Self::PubMed => "PubMed",
            Self::EuropePmc => "Europe PMC",
            Self::OpenAlex => "OpenAlex",
            Self::Crossref => "Crossref",
            Self::ClinicalTrials => "ClinicalTrials.gov",
            Self::OpenFda => "openFDA",
        }
    }

    /// Returns the stable snake_case key used in configuration files.
    pub fn key(&self) -> &'static str {
        match self {
            Self::SemanticScholar => "semantic_scholar",
            Self::PubMed => "pub_med",
            Self::EuropePmc => "europe_pmc",
            Self::OpenAlex => "open_alex",
            Self::Crossref => "crossref",
            Self::ClinicalTrials => "clinical_trials",
            Self::OpenFda => "open_fda",
        }
    }

    /// Returns all available source variants.
    pub fn all() -> &'static [Source] {
        &[
            Self::SemanticScholar,
            Self::PubMed,
            Self::EuropePmc,
            Self::OpenAlex,
            Self::Crossref,
            Self::ClinicalTrials,
            Self::OpenFda,
        ]
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Source {
    type Err = String;

    /// Accepts either the display name or the config key, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::all()
            .iter()
            .copied()
            .find(|src| {
                src.name().eq_ignore_ascii_case(wanted) || src.key().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| format!("unknown source: {wanted}"))
    }
}

/// One result from one provider, as returned by the adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Title of the work.
    pub title: String,
    /// Abstract text, when the provider returns one.
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    /// Author names in publication order.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Journal or venue name.
    #[serde(default)]
    pub venue: Option<String>,
    /// Publication year.
    #[serde(default)]
    pub year: Option<i32>,
    /// Digital Object Identifier.
    #[serde(default)]
    pub doi: Option<String>,
    /// PubMed identifier.
    #[serde(default)]
    pub pmid: Option<String>,
    /// Citation count reported by the provider.
    #[serde(default)]
    pub citation_count: Option<u32>,
    /// Landing page URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Which source returned this record.
    pub source: Source,
}

impl RawRecord {
    /// Create a record with only a title and a source label.
    pub fn new(title: impl Into<String>, source: Source) -> Self {
        Self {
            title: title.into(),
            abstract_text: None,
            authors: Vec::new(),
            venue: None,
            year: None,
            doi: None,
            pmid: None,
            citation_count: None,
            url: None,
            source,
        }
    }

    pub fn with_abstract(mut self, text: impl Into<String>) -> Self {
        self.abstract_text = Some(text.into());
        self
    }

    pub fn with_authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_venue(mut self, venue: impl Into<String>) -> Self {
        self.venue = Some(venue.into());
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_doi(mut self, doi: impl Into<String>) -> Self {
        self.doi = Some(doi.into());
        self
    }

    pub fn with_pmid(mut self, pmid: impl Into<String>) -> Self {
        self.pmid = Some(pmid.into());
        self
    }

    pub fn with_citations(mut self, count: u32) -> Self {
        self.citation_count = Some(count);
        self
    }

    /// Title, abstract and venue joined for lexical matching.
    pub fn combined_text(&self) -> String {
        let mut text = self.title.clone();
        for part in [self.abstract_text.as_deref(), self.venue.as_deref()]
            .into_iter()
            .flatten()
        {
            text.push(' ');
            text.push_str(part);
        }
        text
    }

    /// Title and abstract only, without the venue.
    pub fn title_and_abstract(&self) -> String {
        match self.abstract_text.as_deref() {
            Some(abs) => format!("{} {abs}", self.title),
            None => self.title.clone(),
        }
    }
}

/// Study design detected from the title and abstract, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyType {
    MetaAnalysis,
    SystematicReview,
    RandomizedTrial,
    Cohort,
    Other,
}

/// Why the relevance classifier admitted or rejected a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
    /// Passed both phases.
    Admitted,
    /// Rejected in the exclusion phase because of an off-domain term.
    Excluded { term: String },
    /// Reached the inclusion phase but scored below the admission threshold.
    BelowThreshold,
}

/// Output of a [`crate::RelevanceClassifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub admit: bool,
    /// Domain fit in `[0, 1]`.
    pub domain_score: f64,
    /// Raw inclusion points before normalisation.
    pub points: f64,
    pub verdict: Verdict,
}

/// A raw record after classification and composite scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub record: RawRecord,
    /// Lexical overlap between query keywords and record text, `[0, 1]`.
    pub relevance_score: f64,
    /// Domain fit from the classifier, `[0, 1]`.
    pub domain_score: f64,
    /// Study type, citation and recency evidence, `[0, 1]`.
    pub evidence_quality: f64,
    /// Log-scaled citation count, `[0, 1]`.
    pub citation_weight: f64,
    /// Weighted combination of the above plus any trusted-source bonus.
    pub composite_score: f64,
    pub study_type: StudyType,
    pub classification: Classification,
}

impl ScoredRecord {
    pub fn is_admitted(&self) -> bool {
        self.classification.admit
    }
}

/// Representative of a cluster of records describing the same work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// The chosen best record for the cluster.
    pub best: ScoredRecord,
    /// Every DOI owned by the cluster.
    pub dois: Vec<String>,
    /// Every PMID owned by the cluster.
    pub pmids: Vec<String>,
    /// Sources that contributed at least one member.
    pub sources: Vec<Source>,
    /// Number of raw records merged into this cluster.
    pub member_count: usize,
    /// Whether any member passed the relevance classifier.
    pub admitted: bool,
}

impl CanonicalRecord {
    pub fn title(&self) -> &str {
        &self.best.record.title
    }

    pub fn composite_score(&self) -> f64 {
        self.best.composite_score
    }

    pub fn source(&self) -> Source {
        self.best.record.source
    }
}

/// Steps of the result finalizer, from strictest to loosest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum RelaxationLevel {
    /// Classifier-admitted records that hit no hard-exclusion pattern.
    Strict,
    /// Admitted records that were held back only by hard-exclusion patterns.
    DropHardExclusions,
    /// Non-admitted records that mention a generic domain term.
    BroadenPool,
    /// Any remaining titled record outside the blacklist.
    LastResort,
}

impl RelaxationLevel {
    pub fn index(self) -> u8 {
        match self {
            Self::Strict => 0,
            Self::DropHardExclusions => 1,
            Self::BroadenPool => 2,
            Self::LastResort => 3,
        }
    }

    /// The next looser level, or `None` once the last resort is reached.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Strict => Some(Self::DropHardExclusions),
            Self::DropHardExclusions => Some(Self::BroadenPool),
            Self::BroadenPool => Some(Self::LastResort),
            Self::LastResort => None,
        }
    }
}

impl From<RelaxationLevel> for u8 {
    fn from(level: RelaxationLevel) -> Self {
        level.index()
    }
}

impl TryFrom<u8> for RelaxationLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Strict),
            1 => Ok(Self::DropHardExclusions),
            2 => Ok(Self::BroadenPool),
            3 => Ok(Self::LastResort),
            other => Err(format!("relaxation level out of range: {other}")),
        }
    }
}

impl fmt::Display for RelaxationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Strict => "strict",
            Self::DropHardExclusions => "drop-hard-exclusions",
            Self::BroadenPool => "broaden-pool",
            Self::LastResort => "last-resort",
        };
        f.write_str(name)
    }
}

/// Which round of provider calls a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryRound {
    Primary,
    GapFill,
}

/// A provider call that contributed no records because it failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderFailure {
    pub source: Source,
    pub round: QueryRound,
    pub reason: String,
}

/// How many records a relaxation level added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelFill {
    pub level: RelaxationLevel,
    pub added: usize,
}

/// Why a result set came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// No provider returned any usable record.
    NoRecords,
    /// Records were found but none survived every relaxation level.
    AllFiltered,
}

/// Per-invocation facts about how the result set was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub providers_queried: Vec<Source>,
    pub providers_skipped: Vec<Source>,
    pub providers_failed: Vec<ProviderFailure>,
    pub raw_record_count: usize,
    pub malformed_record_count: usize,
    /// Canonical records that passed the relevance classifier.
    pub admitted_count: usize,
    pub canonical_count: usize,
    pub gap_fill_triggered: bool,
    pub relaxation_level_used: RelaxationLevel,
    pub level_fills: Vec<LevelFill>,
    /// Fewer results than requested were available.
    pub insufficient_results: bool,
    pub empty_reason: Option<EmptyReason>,
}

/// Final output of [`crate::Aggregator::run_aggregation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationReport {
    pub results: Vec<CanonicalRecord>,
    pub diagnostics: Diagnostics,
}
