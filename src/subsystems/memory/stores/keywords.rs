//! `keywords` — tokenizer, per-chunk keyword sets and the inverted index.
//!
//! The same [`KeywordExtractor::tokenize`] pipeline is applied to chunk text
//! at index time and to query text at retrieval time.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

/// Words that never become index keys.
pub const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "this", "that", "from", "have", "were", "been", "they", "what", "when", "where",
    "who", "whom", "which", "why", "how", "did", "does", "was", "are", "is", "its", "not",
    "you", "your", "his", "her", "hers", "she", "him", "them", "their", "there", "then",
    "than", "also", "into", "about", "will", "would", "can", "could", "should", "has",
    "had", "all", "any", "some", "our", "out", "these", "those", "being", "such", "only",
    "over", "under", "after", "before", "just", "very", "more", "most", "other", "here",
];

/// Shortest token that can become an index key.
pub const MIN_TOKEN_LEN: usize = 3;

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    min_token_len: usize,
    max_keywords: usize,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self { min_token_len: MIN_TOKEN_LEN, max_keywords: 10 }
    }
}

impl KeywordExtractor {
    pub fn new(min_token_len: usize, max_keywords: usize) -> Self {
        Self {
            min_token_len: min_token_len.max(MIN_TOKEN_LEN),
            max_keywords: max_keywords.max(1),
        }
    }

    /// Lowercase alphanumeric runs, minus short tokens and stopwords. Order and
    /// repetitions are preserved.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .filter(|t| t.chars().count() >= self.min_token_len && !is_stopword(t))
            .map(str::to_string)
            .collect()
    }

    /// Distinct query terms in first-seen order.
    pub fn query_terms(&self, text: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.tokenize(text)
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .collect()
    }

    /// Frequency of every token in `text`.
    pub fn term_frequencies(&self, text: &str) -> BTreeMap<String, usize> {
        let mut tf = BTreeMap::new();
        for tok in self.tokenize(text) {
            *tf.entry(tok).or_insert(0) += 1;
        }
        tf
    }

    /// The top `max_keywords` entries of `tf` by frequency; ties are broken
    /// alphabetically so the result is deterministic.
    pub fn top_keywords(&self, tf: &BTreeMap<String, usize>) -> Vec<(String, usize)> {
        let mut terms: Vec<(String, usize)> = tf.iter().map(|(t, n)| (t.clone(), *n)).collect();
        terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        terms.truncate(self.max_keywords);
        terms
    }

    pub fn extract(&self, text: &str) -> Vec<(String, usize)> {
        self.top_keywords(&self.term_frequencies(text))
    }
}

// ── InvertedIndex ─────────────────────────────────────────────────────────────

/// keyword → (chunk id → term frequency).
///
/// Only a chunk's keyword set is indexed. A keyword's entry disappears when
/// its last chunk is removed.
#[derive(Debug, Default, Clone, Serialize)]
pub struct InvertedIndex {
    postings: HashMap<String, HashMap<String, usize>>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_chunk(&mut self, chunk_id: &str, keywords: &[(String, usize)]) {
        for (term, tf) in keywords {
            *self
                .postings
                .entry(term.clone())
                .or_default()
                .entry(chunk_id.to_string())
                .or_insert(0) += tf;
        }
    }

    pub fn remove_chunk(&mut self, chunk_id: &str, keywords: &[(String, usize)]) {
        for (term, _) in keywords {
            if let Some(chunks) = self.postings.get_mut(term) {
                chunks.remove(chunk_id);
                if chunks.is_empty() {
                    self.postings.remove(term);
                }
            }
        }
    }

    pub fn postings(&self, term: &str) -> Option<&HashMap<String, usize>> {
        self.postings.get(term)
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.postings.keys().map(String::as_str)
    }

    /// True if any entry still points at `chunk_id`.
    pub fn references_chunk(&self, chunk_id: &str) -> bool {
        self.postings.values().any(|c| c.contains_key(chunk_id))
    }

    /// Number of distinct keywords.
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_filters_short_and_stopwords() {
        let ex = KeywordExtractor::default();
        let toks = ex.tokenize("The cat and the DOG ran to Paris, with 42 friends!");
        assert_eq!(toks, vec!["cat", "dog", "ran", "paris", "friends"]);
    }

    #[test]
    fn query_terms_are_distinct() {
        let ex = KeywordExtractor::default();
        assert_eq!(ex.query_terms("Bob bob BOB betray"), vec!["bob", "betray"]);
    }

    #[test]
    fn extract_keeps_top_terms_deterministically() {
        let ex = KeywordExtractor::new(3, 2);
        let kw = ex.extract("zeta alpha beta beta alpha gamma");
        assert_eq!(kw, vec![("alpha".to_string(), 2), ("beta".to_string(), 2)]);
    }

    #[test]
    fn extract_caps_at_ten_by_default() {
        let ex = KeywordExtractor::default();
        let text = (0..20).map(|i| format!("word{i:02}")).collect::<Vec<_>>().join(" ");
        assert_eq!(ex.extract(&text).len(), 10);
    }

    #[test]
    fn keys_are_lowercase_and_long_enough() {
        let ex = KeywordExtractor::default();
        for (k, _) in ex.extract("Rust IS a Systems language; Go is Another one of them") {
            assert_eq!(k, k.to_lowercase());
            assert!(k.chars().count() >= 3);
            assert!(!is_stopword(&k));
        }
    }

    #[test]
    fn short_min_len_never_yields_empty_or_short_keys() {
        let ex = KeywordExtractor::new(0, 10);
        let kw = ex.extract("Hi, Bo!  ok  river");
        assert_eq!(kw, vec![("river".to_string(), 1)]);
    }

    #[test]
    fn term_frequencies_cover_every_token() {
        let ex = KeywordExtractor::new(3, 2);
        let text = "alpha alpha beta beta gamma lighthouse";
        let tf = ex.term_frequencies(text);
        assert_eq!(tf.len(), 4);
        assert_eq!(tf["lighthouse"], 1);
        let top = ex.top_keywords(&tf);
        assert_eq!(top.len(), 2);
        assert!(top.iter().all(|(k, _)| k != "lighthouse"));
    }

    #[test]
    fn index_add_and_remove_drops_empty_entries() {
        let mut idx = InvertedIndex::new();
        let kw_a = vec![("river".to_string(), 2), ("stone".to_string(), 1)];
        let kw_b = vec![("river".to_string(), 1)];
        idx.add_chunk("a", &kw_a);
        idx.add_chunk("b", &kw_b);
        assert_eq!(idx.len(), 2);
        assert_eq!(idx.postings("river").unwrap()["a"], 2);

        idx.remove_chunk("a", &kw_a);
        assert!(idx.postings("stone").is_none());
        assert_eq!(idx.postings("river").unwrap().len(), 1);
        assert!(!idx.references_chunk("a"));

        idx.remove_chunk("b", &kw_b);
        assert!(idx.is_empty());
    }
}
