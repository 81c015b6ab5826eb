//! Retrieval subsystem — three interchangeable strategies behind one contract.
//!
//! Every strategy implements [`Retriever::score`], returning a score in
//! `[0, 1]` for each candidate chunk of the selected documents. The shared
//! [`Retriever::process_query`] turns those scores into a ranked, truncated
//! list. [`RetrievalEngine`] owns one instance of each strategy and picks one
//! per request by [`RagVariant`].

pub mod basic;
pub mod hybrid;
pub mod knowledge_graph;

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::RetrievalConfig;
use crate::error::AppError;
use crate::subsystems::memory::stores::docstore::{Chunk, Corpus, DocumentStore};

pub use basic::BasicRetriever;
pub use hybrid::HybridRetriever;
pub use knowledge_graph::KnowledgeGraphRetriever;

// ── Variant ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RagVariant {
    Basic,
    KnowledgeGraph,
    Hybrid,
}

impl RagVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            RagVariant::Basic => "basic",
            RagVariant::KnowledgeGraph => "knowledge_graph",
            RagVariant::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for RagVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RagVariant {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "basic" => Ok(RagVariant::Basic),
            "knowledge_graph" | "kg" => Ok(RagVariant::KnowledgeGraph),
            "hybrid" => Ok(RagVariant::Hybrid),
            other => Err(AppError::Validation(format!("unknown rag variant '{other}'"))),
        }
    }
}

// ── Request / result ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RetrievalRequest {
    pub query: String,
    pub session_id: String,
    pub selected_document_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedChunk {
    pub chunk: Chunk,
    pub document_name: String,
    pub score: f32,
}

/// Everything a strategy may look at while scoring one query.
pub struct QueryContext<'a> {
    /// Distinct query terms, tokenized like the index.
    pub terms: Vec<String>,
    pub corpus: &'a Corpus,
    /// Selected ids that exist in the corpus.
    pub documents: HashSet<String>,
}

impl<'a> QueryContext<'a> {
    pub fn new(terms: Vec<String>, corpus: &'a Corpus, selected: &[String]) -> Self {
        let documents = selected
            .iter()
            .filter(|id| corpus.contains_document(id))
            .cloned()
            .collect();
        Self { terms, corpus, documents }
    }

    /// Distinct ids in `selected` that are not in the corpus.
    pub fn unknown_ids(&self, selected: &[String]) -> usize {
        selected
            .iter()
            .filter(|id| !self.documents.contains(*id))
            .collect::<HashSet<_>>()
            .len()
    }

    /// The chunk, if it exists and belongs to a selected document.
    pub fn candidate(&self, chunk_id: &str) -> Option<&'a Chunk> {
        self.corpus
            .chunk(chunk_id)
            .filter(|c| self.documents.contains(&c.doc_id))
    }
}

/// Descending score, then earliest offset, then document id, then chunk id.
fn rank_order(a: (&Chunk, f32), b: (&Chunk, f32)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.start.cmp(&b.0.start))
        .then_with(|| a.0.doc_id.cmp(&b.0.doc_id))
        .then_with(|| a.0.id.cmp(&b.0.id))
}

/// Sort non-zero scores and keep the best `top_k`.
pub fn rank(scores: &HashMap<String, f32>, ctx: &QueryContext<'_>, top_k: usize) -> Vec<RankedChunk> {
    let mut hits: Vec<(&Chunk, f32)> = scores
        .iter()
        .filter(|(_, s)| **s > 0.0)
        .filter_map(|(id, s)| ctx.candidate(id).map(|c| (c, s.clamp(0.0, 1.0))))
        .collect();
    hits.sort_by(|a, b| rank_order(*a, *b));
    hits.truncate(top_k);
    hits.into_iter()
        .map(|(chunk, score)| RankedChunk {
            document_name: ctx
                .corpus
                .document(&chunk.doc_id)
                .map(|d| d.filename.clone())
                .unwrap_or_default(),
            chunk: chunk.clone(),
            score,
        })
        .collect()
}

/// Divide by the largest value so the best entry scores 1.0.
pub(crate) fn normalize(raw: HashMap<String, f32>) -> HashMap<String, f32> {
    let max = raw.values().copied().fold(0.0_f32, f32::max);
    if max <= 0.0 {
        return HashMap::new();
    }
    raw.into_iter()
        .filter(|(_, v)| *v > 0.0)
        .map(|(k, v)| (k, (v / max).min(1.0)))
        .collect()
}

// ── Retriever ─────────────────────────────────────────────────────────────────

pub trait Retriever: Send + Sync {
    fn variant(&self) -> RagVariant;

    /// Score every candidate chunk. Chunks absent from the map score 0.
    fn score(&self, ctx: &QueryContext<'_>) -> HashMap<String, f32>;

    fn process_query(&self, ctx: &QueryContext<'_>, top_k: usize) -> Vec<RankedChunk> {
        if ctx.documents.is_empty() || ctx.terms.is_empty() {
            return Vec::new();
        }
        rank(&self.score(ctx), ctx, top_k)
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

pub struct RetrievalEngine {
    top_k: usize,
    basic: BasicRetriever,
    knowledge_graph: KnowledgeGraphRetriever,
    hybrid: HybridRetriever,
}

impl Default for RetrievalEngine {
    fn default() -> Self {
        Self::new(5, 3, 0.3)
    }
}

impl RetrievalEngine {
    pub fn new(top_k: usize, kg_seed_chunks: usize, kg_boost: f32) -> Self {
        let kg = KnowledgeGraphRetriever::new(kg_seed_chunks, kg_boost);
        Self {
            top_k: top_k.max(1),
            basic: BasicRetriever,
            hybrid: HybridRetriever::new(kg.clone()),
            knowledge_graph: kg,
        }
    }

    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self::new(config.top_k, config.kg_seed_chunks, config.kg_boost)
    }

    pub fn retriever(&self, variant: RagVariant) -> &dyn Retriever {
        match variant {
            RagVariant::Basic => &self.basic,
            RagVariant::KnowledgeGraph => &self.knowledge_graph,
            RagVariant::Hybrid => &self.hybrid,
        }
    }

    /// Rank chunks of the selected documents for `request.query`.
    ///
    /// Unknown document ids are skipped. No selection, no usable query terms
    /// or no matching chunk all yield an empty list.
    pub fn process_query(
        &self,
        store: &DocumentStore,
        variant: RagVariant,
        request: &RetrievalRequest,
    ) -> Result<Vec<RankedChunk>, AppError> {
        let terms = store.keywords().query_terms(&request.query);
        let retriever = self.retriever(variant);
        store.read(|corpus| {
            let ctx = QueryContext::new(terms, corpus, &request.selected_document_ids);
            let skipped = ctx.unknown_ids(&request.selected_document_ids);
            if skipped > 0 {
                warn!(session_id = %request.session_id, skipped, "retrieval: unknown document ids skipped");
            }
            let ranked = retriever.process_query(&ctx, self.top_k);
            debug!(
                session_id = %request.session_id,
                variant = %variant,
                terms = ctx.terms.len(),
                hits = ranked.len(),
                "retrieval: query scored"
            );
            ranked
        })
    }
}
