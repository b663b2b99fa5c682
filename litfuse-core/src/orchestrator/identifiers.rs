//! Identifier normalisation for record deduplication.
//!
//! Canonicalises DOIs and PMIDs so the same work reported by different
//! providers (as a bare DOI, a `doi:` string or a resolver URL; as a PMID
//! with or without a prefix) compares as equal.

use url::Url;

/// Hosts that resolve DOIs; their URL paths carry the DOI itself.
const DOI_RESOLVER_HOSTS: &[&str] = &["doi.org", "dx.doi.org", "www.doi.org"];

/// Normalise a DOI for deduplication comparison.
///
/// 1. Resolver URLs (`https://doi.org/…`) are reduced to their path.
/// 2. A leading `doi:` prefix is removed.
/// 3. The DOI is lowercased (DOIs are case-insensitive).
/// 4. Trailing sentence punctuation is trimmed.
///
/// Returns `None` when the value is blank or does not look like a DOI
/// (every DOI starts with the `10.` directory indicator).
///
/// # Examples
///
/// ```
/// use litfuse_core::orchestrator::identifiers::normalize_doi;
///
/// let a = normalize_doi("https://doi.org/10.1056/NEJMoa2034577");
/// let b = normalize_doi("doi:10.1056/nejmoa2034577");
/// assert_eq!(a, b);
/// ```
pub fn normalize_doi(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut doi = match Url::parse(trimmed) {
        Ok(parsed)
            if parsed
                .host_str()
                .is_some_and(|host| DOI_RESOLVER_HOSTS.contains(&host)) =>
        {
            parsed.path().trim_start_matches('/').to_string()
        }
        _ => trimmed.to_string(),
    };

    if doi.get(..4).is_some_and(|prefix| prefix.eq_ignore_ascii_case("doi:")) {
        doi = doi[4..].trim_start().to_string();
    }

    let doi = doi
        .trim_end_matches(['.', ',', ';'])
        .to_lowercase();

    if doi.starts_with("10.") && doi.contains('/') {
        Some(doi)
    } else {
        None
    }
}

/// Normalise a PubMed identifier.
///
/// Strips a `PMID:` prefix and leading zeros. Returns `None` for blank or
/// non-numeric values.
pub fn normalize_pmid(raw: &str) -> Option<String> {
    let mut pmid = raw.trim();
    if pmid.get(..5).is_some_and(|prefix| prefix.eq_ignore_ascii_case("pmid:")) {
        pmid = pmid[5..].trim_start();
    }
    if pmid.is_empty() || !pmid.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let stripped = pmid.trim_start_matches('0');
    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_doi_is_lowercased() {
        assert_eq!(
            normalize_doi("10.1056/NEJMoa2034577").as_deref(),
            Some("10.1056/nejmoa2034577")
        );
    }

    #[test]
    fn resolver_urls_reduce_to_doi() {
        let expected = Some("10.1001/jama.2020.1166".to_string());
        assert_eq!(normalize_doi("https://doi.org/10.1001/jama.2020.1166"), expected);
        assert_eq!(normalize_doi("http://dx.doi.org/10.1001/JAMA.2020.1166"), expected);
        assert_eq!(normalize_doi("https://www.doi.org/10.1001/jama.2020.1166"), expected);
    }

    #[test]
    fn doi_prefix_removed() {
        assert_eq!(
            normalize_doi("DOI: 10.1136/bmj.m1234").as_deref(),
            Some("10.1136/bmj.m1234")
        );
    }

    #[test]
    fn trailing_punctuation_trimmed() {
        assert_eq!(
            normalize_doi("10.1136/bmj.m1234.").as_deref(),
            Some("10.1136/bmj.m1234")
        );
    }

    #[test]
    fn non_doi_values_rejected() {
        assert_eq!(normalize_doi(""), None);
        assert_eq!(normalize_doi("   "), None);
        assert_eq!(normalize_doi("not a doi"), None);
        assert_eq!(normalize_doi("https://example.com/10.1000/x"), None);
        assert_eq!(normalize_doi("10.1000"), None);
    }

    #[test]
    fn pmid_prefix_and_zeros_stripped() {
        assert_eq!(normalize_pmid("PMID: 00123456").as_deref(), Some("123456"));
        assert_eq!(normalize_pmid(" 31415926 ").as_deref(), Some("31415926"));
    }

    #[test]
    fn invalid_pmids_rejected() {
        assert_eq!(normalize_pmid(""), None);
        assert_eq!(normalize_pmid("0000"), None);
        assert_eq!(normalize_pmid("PMC12345"), None);
        assert_eq!(normalize_pmid("12a45"), None);
    }

    #[test]
    fn non_ascii_identifiers_rejected_without_panic() {
        assert_eq!(normalize_doi("ab€x/10"), None);
        assert_eq!(normalize_doi("do€"), None);
        assert_eq!(normalize_doi("10.1000/café").as_deref(), Some("10.1000/café"));
        assert_eq!(normalize_pmid("1234é"), None);
        assert_eq!(normalize_pmid("pmi€"), None);
    }
}
