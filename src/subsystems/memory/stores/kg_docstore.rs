//! `kg_docstore` — entity co-occurrence graph over indexed chunks.
//!
//! Nodes are entity strings, edges are unordered entity pairs. Each edge
//! carries a per-document count of the chunks in which the pair co-occurs,
//! so deleting a document subtracts exactly its contribution. A node lives as
//! long as at least one chunk mentions it.
//!
//! Entity candidates come from an [`EntityExtractor`]. The shipped
//! [`CapitalizedEntityExtractor`] is a plain capitalization heuristic; a real
//! recogniser can be dropped in behind the same trait.

use std::collections::{HashMap, HashSet};

use super::keywords::is_stopword;

// ── Extraction ────────────────────────────────────────────────────────────────

/// Produces the distinct entity candidates of one chunk.
pub trait EntityExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Vec<String>;
}

/// Short capitalized words that open sentences but never name anything.
const NON_ENTITY_WORDS: &[&str] = &[
    "i", "he", "it", "we", "me", "my", "us", "if", "so", "as", "no", "yes", "do", "be",
];

fn is_non_entity(word: &str) -> bool {
    let lower = word.to_lowercase();
    is_stopword(&lower) || NON_ENTITY_WORDS.contains(&lower.as_str())
}

/// Runs of consecutive capitalized words become one entity (`"New York"`).
/// Punctuation after a word ends the run. Leading filler words (`"The"`) are
/// trimmed from a run.
#[derive(Debug, Default, Clone)]
pub struct CapitalizedEntityExtractor;

impl CapitalizedEntityExtractor {
    fn flush(run: &mut Vec<String>, out: &mut Vec<String>, seen: &mut HashSet<String>) {
        let first_real = run.iter().position(|w| !is_non_entity(w));
        if let Some(i) = first_real {
            let name = run[i..].join(" ");
            if name.chars().count() > 1 && seen.insert(name.clone()) {
                out.push(name);
            }
        }
        run.clear();
    }
}

impl EntityExtractor for CapitalizedEntityExtractor {
    fn extract(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut run: Vec<String> = Vec::new();

        for raw in text.split_whitespace() {
            let word = raw.trim_matches(|c: char| !c.is_alphanumeric());
            let capitalized = word.chars().next().is_some_and(char::is_uppercase);
            if !capitalized {
                Self::flush(&mut run, &mut out, &mut seen);
                continue;
            }
            run.push(word.to_string());
            let breaks = raw.chars().last().is_some_and(|c| !c.is_alphanumeric());
            if breaks {
                Self::flush(&mut run, &mut out, &mut seen);
            }
        }
        Self::flush(&mut run, &mut out, &mut seen);
        out
    }
}

// ── Graph ─────────────────────────────────────────────────────────────────────

type Pair = (String, String);

fn pair(a: &str, b: &str) -> Pair {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[derive(Debug, Default, Clone)]
pub struct EntityGraph {
    /// entity → chunk ids mentioning it.
    mentions: HashMap<String, HashSet<String>>,
    /// chunk id → entities found in it.
    chunk_entities: HashMap<String, Vec<String>>,
    /// pair → (doc id → co-occurrence count).
    edges: HashMap<Pair, HashMap<String, usize>>,
    adjacency: HashMap<String, HashSet<String>>,
    /// doc id → pairs it contributed to.
    doc_edges: HashMap<String, HashSet<Pair>>,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one chunk's entities and bump every co-occurring pair.
    pub fn add_chunk(&mut self, doc_id: &str, chunk_id: &str, entities: &[String]) {
        if entities.is_empty() {
            return;
        }
        for e in entities {
            self.mentions.entry(e.clone()).or_default().insert(chunk_id.to_string());
        }
        for (i, a) in entities.iter().enumerate() {
            for b in &entities[i + 1..] {
                if a == b {
                    continue;
                }
                let key = pair(a, b);
                *self
                    .edges
                    .entry(key.clone())
                    .or_default()
                    .entry(doc_id.to_string())
                    .or_insert(0) += 1;
                self.adjacency.entry(a.clone()).or_default().insert(b.clone());
                self.adjacency.entry(b.clone()).or_default().insert(a.clone());
                self.doc_edges.entry(doc_id.to_string()).or_default().insert(key);
            }
        }
        self.chunk_entities.insert(chunk_id.to_string(), entities.to_vec());
    }

    /// Remove everything `doc_id` contributed. Nodes left without mentions are
    /// dropped along with their adjacency entries.
    pub fn remove_document(&mut self, doc_id: &str, chunk_ids: &[String]) {
        for chunk_id in chunk_ids {
            let Some(entities) = self.chunk_entities.remove(chunk_id) else {
                continue;
            };
            for e in entities {
                if let Some(chunks) = self.mentions.get_mut(&e) {
                    chunks.remove(chunk_id);
                    if chunks.is_empty() {
                        self.mentions.remove(&e);
                    }
                }
            }
        }

        for key in self.doc_edges.remove(doc_id).unwrap_or_default() {
            let Some(per_doc) = self.edges.get_mut(&key) else {
                continue;
            };
            per_doc.remove(doc_id);
            if per_doc.is_empty() {
                self.edges.remove(&key);
                self.unlink(&key.0, &key.1);
                self.unlink(&key.1, &key.0);
            }
        }
    }

    fn unlink(&mut self, from: &str, to: &str) {
        if let Some(adj) = self.adjacency.get_mut(from) {
            adj.remove(to);
            if adj.is_empty() {
                self.adjacency.remove(from);
            }
        }
    }

    pub fn entities_of(&self, chunk_id: &str) -> &[String] {
        self.chunk_entities.get(chunk_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn mentions(&self, entity: &str) -> impl Iterator<Item = &str> {
        self.mentions.get(entity).into_iter().flatten().map(String::as_str)
    }

    /// Co-occurrence count of `a` and `b`, summed over `docs` (all documents
    /// when `None`).
    pub fn edge_weight(&self, a: &str, b: &str, docs: Option<&HashSet<String>>) -> usize {
        let Some(per_doc) = self.edges.get(&pair(a, b)) else {
            return 0;
        };
        per_doc
            .iter()
            .filter(|(doc, _)| docs.is_none_or(|d| d.contains(*doc)))
            .map(|(_, n)| *n)
            .sum()
    }

    /// One-hop neighbours with non-zero weight inside `docs`.
    pub fn neighbors(&self, entity: &str, docs: Option<&HashSet<String>>) -> Vec<(&str, usize)> {
        let Some(adj) = self.adjacency.get(entity) else {
            return Vec::new();
        };
        adj.iter()
            .map(|n| (n.as_str(), self.edge_weight(entity, n, docs)))
            .filter(|(_, w)| *w > 0)
            .collect()
    }

    pub fn contains_node(&self, entity: &str) -> bool {
        self.mentions.contains_key(entity)
    }

    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        self.edges.contains_key(&pair(a, b))
    }

    pub fn references_document(&self, doc_id: &str) -> bool {
        self.doc_edges.contains_key(doc_id)
            || self.edges.values().any(|per_doc| per_doc.contains_key(doc_id))
    }

    pub fn references_chunk(&self, chunk_id: &str) -> bool {
        self.chunk_entities.contains_key(chunk_id)
            || self.mentions.values().any(|c| c.contains(chunk_id))
    }

    pub fn node_count(&self) -> usize {
        self.mentions.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
