//! Hybrid retrieval: per-chunk maximum of the Basic and Knowledge-Graph
//! scores. Taking the maximum keeps a chunk found by both strategies from
//! being counted twice.

use std::collections::HashMap;

use super::basic::BasicRetriever;
use super::knowledge_graph::KnowledgeGraphRetriever;
use super::{QueryContext, RagVariant, Retriever};

#[derive(Debug, Clone, Default)]
pub struct HybridRetriever {
    basic: BasicRetriever,
    knowledge_graph: KnowledgeGraphRetriever,
}

impl HybridRetriever {
    pub fn new(knowledge_graph: KnowledgeGraphRetriever) -> Self {
        Self { basic: BasicRetriever, knowledge_graph }
    }
}

impl Retriever for HybridRetriever {
    fn variant(&self) -> RagVariant {
        RagVariant::Hybrid
    }

    fn score(&self, ctx: &QueryContext<'_>) -> HashMap<String, f32> {
        let basic = self.basic.score(ctx);
        let graph = self.knowledge_graph.score_from_basic(ctx, &basic);
        let mut merged = basic;
        for (chunk_id, g) in graph {
            let entry = merged.entry(chunk_id).or_insert(0.0);
            *entry = entry.max(g);
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsystems::memory::stores::docstore::DocumentStore;

    #[test]
    fn hybrid_dominates_both_strategies() {
        let store = DocumentStore::default();
        let ids = vec![
            store.upload("Alice met Bob in Paris. Bob later betrayed Alice.", "a.txt", "text/plain").unwrap(),
            store.upload("Bob sailed to Lisbon with Carol.", "b.txt", "text/plain").unwrap(),
            store.upload("Carol painted the harbour of Lisbon.", "c.txt", "text/plain").unwrap(),
            store.upload("Bread recipes from the village bakery.", "d.txt", "text/plain").unwrap(),
        ];
        for query in ["Who did Bob betray?", "Lisbon harbour", "Carol", "recipes Alice"] {
            let terms = store.keywords().query_terms(query);
            store
                .read(|corpus| {
                    let ctx = QueryContext::new(terms, corpus, &ids);
                    let b = BasicRetriever.score(&ctx);
                    let k = KnowledgeGraphRetriever::default().score(&ctx);
                    let h = HybridRetriever::default().score(&ctx);
                    for (id, score) in &h {
                        let floor = b.get(id).copied().unwrap_or(0.0).max(k.get(id).copied().unwrap_or(0.0));
                        assert!(*score >= floor, "{query}: {id}");
                        assert!(*score <= 1.0);
                    }
                    for id in b.keys().chain(k.keys()) {
                        assert!(h.contains_key(id), "{query}: {id} missing from hybrid");
                    }
                })
                .unwrap();
        }
    }
}
