//! Basic keyword retrieval.
//!
//! raw = 2 × exact + 0.5 × partial, where `exact` sums the chunk's frequency
//! of every query term and `partial` counts (query term, chunk token) pairs in
//! which one is a proper substring of the other. Both are counted over every
//! token of the chunk, not only its indexed keyword set. Scores are divided
//! by the best raw score among the candidates.

use std::collections::HashMap;

use super::{QueryContext, RagVariant, Retriever, normalize};
use crate::subsystems::memory::stores::docstore::Chunk;

pub const EXACT_WEIGHT: f32 = 2.0;
pub const PARTIAL_WEIGHT: f32 = 0.5;

pub fn raw_score(exact: usize, partial: usize) -> f32 {
    EXACT_WEIGHT * exact as f32 + PARTIAL_WEIGHT * partial as f32
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BasicRetriever;

impl BasicRetriever {
    /// `(exact, partial)` counts for one chunk. Chunks without any match
    /// yield `(0, 0)`.
    pub fn chunk_counts(chunk: &Chunk, terms: &[String]) -> (usize, usize) {
        let mut exact = 0;
        let mut partial = 0;
        for term in terms {
            exact += chunk.term_frequency(term);
            partial += chunk
                .terms
                .keys()
                .filter(|tok| {
                    tok.as_str() != term.as_str()
                        && (tok.contains(term.as_str()) || term.contains(tok.as_str()))
                })
                .count();
        }
        (exact, partial)
    }

    /// Per-chunk `(exact, partial)` counts over the selected documents. Only
    /// chunks with at least one match appear.
    pub fn match_counts(&self, ctx: &QueryContext<'_>) -> HashMap<String, (usize, usize)> {
        if ctx.terms.is_empty() {
            return HashMap::new();
        }
        ctx.documents
            .iter()
            .filter_map(|doc_id| ctx.corpus.document(doc_id))
            .flat_map(|doc| doc.chunks.iter())
            .filter_map(|chunk| {
                let counts = Self::chunk_counts(chunk, &ctx.terms);
                (counts != (0, 0)).then(|| (chunk.id.clone(), counts))
            })
            .collect()
    }
}

impl Retriever for BasicRetriever {
    fn variant(&self) -> RagVariant {
        RagVariant::Basic
    }

    fn score(&self, ctx: &QueryContext<'_>) -> HashMap<String, f32> {
        let raw = self
            .match_counts(ctx)
            .into_iter()
            .map(|(id, (exact, partial))| (id, raw_score(exact, partial)))
            .collect();
        normalize(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsystems::memory::stores::docstore::DocumentStore;

    #[test]
    fn raw_score_monotonic_in_exact() {
        for partial in 0..5 {
            for exact in 0..20 {
                assert!(raw_score(exact + 1, partial) >= raw_score(exact, partial));
            }
        }
    }

    #[test]
    fn exact_and_partial_counted() {
        let store = DocumentStore::default();
        let id = store
            .upload("Alice met Bob in Paris. Bob later betrayed Alice.", "a.txt", "text/plain")
            .unwrap();
        let terms = store.keywords().query_terms("Who did Bob betray?");
        store
            .read(|corpus| {
                let ctx = QueryContext::new(terms, corpus, std::slice::from_ref(&id));
                let counts = BasicRetriever.match_counts(&ctx);
                let chunk_id = format!("{id}_chunk_0");
                assert_eq!(counts[&chunk_id], (2, 1));
                let scores = BasicRetriever.score(&ctx);
                assert_eq!(scores[&chunk_id], 1.0);
            })
            .unwrap();
    }

    #[test]
    fn zero_match_chunks_absent() {
        let store = DocumentStore::default();
        let a = store.upload("rivers and lakes", "a.txt", "text/plain").unwrap();
        let b = store.upload("mountains and hills", "b.txt", "text/plain").unwrap();
        let terms = store.keywords().query_terms("lakes");
        store
            .read(|corpus| {
                let ctx = QueryContext::new(terms, corpus, &[a.clone(), b.clone()]);
                let scores = BasicRetriever.score(&ctx);
                assert_eq!(scores.len(), 1);
                assert!(scores.contains_key(&format!("{a}_chunk_0")));
            })
            .unwrap();
    }

    #[test]
    fn term_outside_keyword_set_still_matches() {
        let store = DocumentStore::default();
        let filler: String = (0..10)
            .map(|i| format!("filler{i:02} filler{i:02} "))
            .collect();
        let text = format!("{filler}The lighthouse stood there.");
        let id = store.upload(&text, "coast.txt", "text/plain").unwrap();
        let terms = store.keywords().query_terms("lighthouse");
        store
            .read(|corpus| {
                let chunk = corpus.chunk(&format!("{id}_chunk_0")).unwrap();
                assert!(!chunk.has_keyword("lighthouse"));
                assert!(corpus.index().postings("lighthouse").is_none());

                let ctx = QueryContext::new(terms, corpus, std::slice::from_ref(&id));
                let counts = BasicRetriever.match_counts(&ctx);
                assert_eq!(counts[&chunk.id], (1, 0));
                assert_eq!(BasicRetriever.score(&ctx)[&chunk.id], 1.0);
            })
            .unwrap();
    }

    #[test]
    fn more_exact_matches_never_score_lower() {
        let store = DocumentStore::default();
        let one = store.upload("harbour lighthouse", "one.txt", "text/plain").unwrap();
        let two = store.upload("harbour lighthouse lighthouse", "two.txt", "text/plain").unwrap();
        let terms = store.keywords().query_terms("lighthouse");
        store
            .read(|corpus| {
                let ctx = QueryContext::new(terms, corpus, &[one.clone(), two.clone()]);
                let s = BasicRetriever.score(&ctx);
                assert!(s[&format!("{two}_chunk_0")] >= s[&format!("{one}_chunk_0")]);
            })
            .unwrap();
    }
}
