//! Word tokenisation and whole-word term matching.
//!
//! Text is split on Unicode word boundaries (UAX #29), lowercased, and
//! stored as a space-padded token string so multi-word phrases can be
//! matched without partial-word hits.

use unicode_segmentation::UnicodeSegmentation;

/// Lowercased word tokens of `text`, with possessive `'s` removed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words()
        .map(|word| {
            let lower = word.to_lowercase();
            match lower
                .strip_suffix("'s")
                .or_else(|| lower.strip_suffix("\u{2019}s"))
            {
                Some(stem) if !stem.is_empty() => stem.to_string(),
                _ => lower,
            }
        })
        .collect()
}

/// Case-folded, punctuation-free form of a title with single spaces.
pub fn normalize_title(title: &str) -> String {
    tokenize(title).join(" ")
}

/// Tokenised text that supports whole-word and phrase lookups.
#[derive(Debug, Clone)]
pub struct TokenText {
    padded: String,
}

impl TokenText {
    pub fn new(text: &str) -> Self {
        Self {
            padded: format!(" {} ", tokenize(text).join(" ")),
        }
    }

    /// Number of (possibly overlapping) occurrences of `term` as whole words.
    pub fn count(&self, term: &str) -> usize {
        let Some(needle) = needle(term) else {
            return 0;
        };
        let mut count = 0;
        let mut start = 0;
        while let Some(pos) = self.padded[start..].find(&needle) {
            count += 1;
            // The trailing space of this match may lead the next one.
            start += pos + needle.len() - 1;
        }
        count
    }

    pub fn contains(&self, term: &str) -> bool {
        needle(term).is_some_and(|n| self.padded.contains(&n))
    }

    /// First term of `terms` present in this text.
    pub fn first_match<'a>(&self, terms: &'a [String]) -> Option<&'a str> {
        terms
            .iter()
            .find(|term| self.contains(term))
            .map(String::as_str)
    }

    pub fn contains_any(&self, terms: &[String]) -> bool {
        self.first_match(terms).is_some()
    }
}

/// Space-padded token form of a term, or `None` if it has no words.
fn needle(term: &str) -> Option<String> {
    let tokens = tokenize(term);
    if tokens.is_empty() {
        None
    } else {
        Some(format!(" {} ", tokens.join(" ")))
    }
}
