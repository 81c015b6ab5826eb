//! Knowledge-graph retrieval: Basic scores plus one-hop entity expansion.
//!
//! The best Basic chunks act as seeds. Every entity they mention is expanded
//! one hop in the entity graph (edges counted only within the selected
//! documents), and each chunk mentioning a neighbour collects that edge's
//! weight. The summed weights are normalised and added to the Basic score:
//! `min(1, basic + boost × graph)`.

use std::collections::{HashMap, HashSet};

use super::basic::BasicRetriever;
use super::{QueryContext, RagVariant, Retriever, normalize, rank};

#[derive(Debug, Clone)]
pub struct KnowledgeGraphRetriever {
    seed_chunks: usize,
    boost: f32,
    basic: BasicRetriever,
}

impl Default for KnowledgeGraphRetriever {
    fn default() -> Self {
        Self::new(3, 0.3)
    }
}

impl KnowledgeGraphRetriever {
    pub fn new(seed_chunks: usize, boost: f32) -> Self {
        Self { seed_chunks: seed_chunks.max(1), boost, basic: BasicRetriever }
    }

    /// Normalised graph weight per chunk, seeded from `basic`.
    pub fn graph_weights(
        &self,
        ctx: &QueryContext<'_>,
        basic: &HashMap<String, f32>,
    ) -> HashMap<String, f32> {
        let graph = ctx.corpus.graph();
        let seeds = rank(basic, ctx, self.seed_chunks);
        let seed_entities: HashSet<&str> = seeds
            .iter()
            .flat_map(|s| graph.entities_of(&s.chunk.id))
            .map(String::as_str)
            .collect();

        let mut raw: HashMap<String, f32> = HashMap::new();
        for entity in &seed_entities {
            for (neighbour, weight) in graph.neighbors(entity, Some(&ctx.documents)) {
                for chunk_id in graph.mentions(neighbour) {
                    if ctx.candidate(chunk_id).is_some() {
                        *raw.entry(chunk_id.to_string()).or_insert(0.0) += weight as f32;
                    }
                }
            }
        }
        normalize(raw)
    }

    /// Combine precomputed Basic scores with graph expansion.
    pub fn score_from_basic(
        &self,
        ctx: &QueryContext<'_>,
        basic: &HashMap<String, f32>,
    ) -> HashMap<String, f32> {
        let graph = self.graph_weights(ctx, basic);
        let mut out: HashMap<String, f32> = basic.clone();
        for (chunk_id, g) in graph {
            let entry = out.entry(chunk_id).or_insert(0.0);
            *entry = (*entry + self.boost * g).min(1.0);
        }
        out
    }
}

impl Retriever for KnowledgeGraphRetriever {
    fn variant(&self) -> RagVariant {
        RagVariant::KnowledgeGraph
    }

    fn score(&self, ctx: &QueryContext<'_>) -> HashMap<String, f32> {
        let basic = self.basic.score(ctx);
        self.score_from_basic(ctx, &basic)
    }
}
