//! Offline provider backed by JSON fixture files.
//!
//! A fixture directory holds one file per source, named after the source key
//! (`pub_med.json`, `semantic_scholar.json`, ...). Each file is a JSON array
//! of record objects using the [`RawRecord`] field names; the `source` field
//! may be omitted and defaults to the file's source.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use litfuse_core::text::{TokenText, tokenize};
use litfuse_core::{LiteratureProvider, ProviderError, RawRecord, SearchOptions, Source};

use crate::error::{AppError, Result};

/// Words of an enhanced provider query that carry no search meaning.
const QUERY_SYNTAX: &[&str] = &["or", "and", "not", "mesh", "terms"];

/// A provider that answers from a fixed set of records.
#[derive(Debug, Clone)]
pub struct FixtureProvider {
    source: Source,
    records: Vec<RawRecord>,
}

impl FixtureProvider {
    pub fn new(source: Source, records: Vec<RawRecord>) -> Self {
        Self { source, records }
    }

    /// Load the records for `source` from a JSON array file.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if the file cannot be read and
    /// [`AppError::Fixture`] if it is not an array of record objects.
    pub fn from_file(source: Source, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let values: Vec<serde_json::Value> = serde_json::from_str(&content)
            .map_err(|e| AppError::Fixture(format!("{}: {e}", path.display())))?;

        let mut records = Vec::with_capacity(values.len());
        for (index, mut value) in values.into_iter().enumerate() {
            let Some(object) = value.as_object_mut() else {
                return Err(AppError::Fixture(format!(
                    "{}: entry {index} is not an object",
                    path.display()
                )));
            };
            object
                .entry("source")
                .or_insert_with(|| serde_json::Value::String(source.key().to_string()));
            let record: RawRecord = serde_json::from_value(value)
                .map_err(|e| AppError::Fixture(format!("{}: entry {index}: {e}", path.display())))?;
            records.push(record);
        }

        tracing::debug!(%source, count = records.len(), path = %path.display(), "loaded fixture records");
        Ok(Self::new(source, records))
    }

    /// Load every `<source>.json` file in `dir` as a provider.
    ///
    /// Files whose stem is not a known source are skipped with a warning.
    /// Providers are returned in file-name order.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read or any fixture file
    /// is malformed.
    pub fn load_dir(dir: &Path) -> Result<Vec<Arc<dyn LiteratureProvider>>> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut providers: Vec<Arc<dyn LiteratureProvider>> = Vec::new();
        for path in paths {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            match stem.parse::<Source>() {
                Ok(source) => providers.push(Arc::new(Self::from_file(source, &path)?)),
                Err(_) => tracing::warn!(path = %path.display(), "fixture file does not name a known source; skipping"),
            }
        }
        Ok(providers)
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }
}

#[async_trait]
impl LiteratureProvider for FixtureProvider {
    /// Returns records mentioning at least one query word, in file order.
    /// A query with no usable words matches every record.
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> std::result::Result<Vec<RawRecord>, ProviderError> {
        let words: Vec<String> = tokenize(query)
            .into_iter()
            .filter(|w| w.chars().count() > 2 && !QUERY_SYNTAX.contains(&w.as_str()))
            .collect();

        Ok(self
            .records
            .iter()
            .filter(|record| words.is_empty() || TokenText::new(&record.combined_text()).contains_any(&words))
            .take(options.max_results)
            .cloned()
            .collect())
    }

    fn source(&self) -> Source {
        self.source
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn options(max_results: usize) -> SearchOptions {
        SearchOptions {
            max_results,
            ..Default::default()
        }
    }

    #[test]
    fn from_file_fills_missing_source() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pub_med.json");
        std::fs::write(
            &path,
            r#"[
                {"title": "Statins after stroke", "doi": "10.1/a", "year": 2020},
                {"title": "Aspirin for prevention", "source": "crossref"}
            ]"#,
        )
        .expect("write");

        let provider = FixtureProvider::from_file(Source::PubMed, &path).expect("load");
        assert_eq!(provider.records().len(), 2);
        assert_eq!(provider.records()[0].source, Source::PubMed);
        assert_eq!(provider.records()[0].year, Some(2020));
        // An explicit source is kept; the orchestrator relabels it anyway.
        assert_eq!(provider.records()[1].source, Source::Crossref);
    }

    #[test]
    fn from_file_rejects_non_objects() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pub_med.json");
        std::fs::write(&path, r#"[{"title": "ok"}, 42]"#).expect("write");
        let err = FixtureProvider::from_file(Source::PubMed, &path).unwrap_err();
        assert!(err.to_string().contains("entry 1"));
    }

    #[test]
    fn from_file_rejects_invalid_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pub_med.json");
        std::fs::write(&path, "{not json").expect("write");
        assert!(matches!(
            FixtureProvider::from_file(Source::PubMed, &path),
            Err(AppError::Fixture(_))
        ));
    }

    #[test]
    fn load_dir_maps_file_names_to_sources() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("semantic_scholar.json"), r#"[{"title": "A"}]"#).expect("write");
        std::fs::write(dir.path().join("pub_med.json"), r#"[{"title": "B"}]"#).expect("write");
        std::fs::write(dir.path().join("scopus.json"), r#"[{"title": "C"}]"#).expect("write");
        std::fs::write(dir.path().join("notes.txt"), "ignored").expect("write");

        let providers = FixtureProvider::load_dir(dir.path()).expect("load");
        let sources: Vec<Source> = providers.iter().map(|p| p.source()).collect();
        assert_eq!(sources, vec![Source::PubMed, Source::SemanticScholar]);
    }

    #[tokio::test]
    async fn search_filters_by_query_words_and_limit() {
        let provider = FixtureProvider::new(
            Source::PubMed,
            vec![
                RawRecord::new("Statins after stroke", Source::PubMed),
                RawRecord::new("Knee replacement outcomes", Source::PubMed),
                RawRecord::new("Statin intolerance", Source::PubMed).with_abstract("Muscle symptoms with statins."),
            ],
        );

        let hits = provider.search("(statins) OR \"stroke\"", &options(10)).await.expect("search");
        let titles: Vec<&str> = hits.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Statins after stroke", "Statin intolerance"]);

        let limited = provider.search("statins", &options(1)).await.expect("search");
        assert_eq!(limited.len(), 1);

        let everything = provider.search("OR", &options(10)).await.expect("search");
        assert_eq!(everything.len(), 3);
    }
}
