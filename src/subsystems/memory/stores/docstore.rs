//! `docstore` — in-memory document + chunk store with keyword index and
//! entity graph.
//!
//! All shared state lives in one [`Corpus`] behind a `RwLock`. Upload does the
//! expensive work (chunking, keyword and entity extraction) before taking the
//! write lock, then inserts the document, its chunks, their index postings and
//! their graph contributions in one critical section. Delete removes all of
//! them in one critical section. Readers go through [`DocumentStore::read`]
//! and always see either the state before or after a mutation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use crate::error::AppError;

use super::chunker::Chunker;
use super::docstore_core::{content_preview, now_iso8601, sha256_hex};
use super::keywords::{InvertedIndex, KeywordExtractor};
use super::kg_docstore::{CapitalizedEntityExtractor, EntityExtractor, EntityGraph};

// Re-export the shared types so callers can use a single import.
pub use super::docstore_core::{Chunk, DocMetadata, Document, StoreStats};

// ── Corpus ────────────────────────────────────────────────────────────────────

/// Consistent view over every document, chunk, index entry and graph edge.
#[derive(Debug, Default)]
pub struct Corpus {
    documents: HashMap<String, Document>,
    /// Document ids in upload order.
    order: Vec<String>,
    /// chunk id → (doc id, position in `Document::chunks`).
    chunk_owner: HashMap<String, (String, usize)>,
    index: InvertedIndex,
    graph: EntityGraph,
}

impl Corpus {
    pub fn document(&self, doc_id: &str) -> Option<&Document> {
        self.documents.get(doc_id)
    }

    pub fn contains_document(&self, doc_id: &str) -> bool {
        self.documents.contains_key(doc_id)
    }

    /// Documents in upload order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.order.iter().filter_map(|id| self.documents.get(id))
    }

    pub fn chunk(&self, chunk_id: &str) -> Option<&Chunk> {
        let (doc_id, pos) = self.chunk_owner.get(chunk_id)?;
        self.documents.get(doc_id)?.chunks.get(*pos)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_owner.len()
    }

    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }

    pub fn graph(&self) -> &EntityGraph {
        &self.graph
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            documents: self.documents.len(),
            chunks: self.chunk_owner.len(),
            index_terms: self.index.len(),
            graph_nodes: self.graph.node_count(),
            graph_edges: self.graph.edge_count(),
        }
    }

    fn insert(&mut self, doc: Document, entities: Vec<Vec<String>>) {
        for (pos, (chunk, ents)) in doc.chunks.iter().zip(entities).enumerate() {
            self.index.add_chunk(&chunk.id, &chunk.keywords);
            self.graph.add_chunk(&doc.id, &chunk.id, &ents);
            self.chunk_owner.insert(chunk.id.clone(), (doc.id.clone(), pos));
        }
        self.order.push(doc.id.clone());
        self.documents.insert(doc.id.clone(), doc);
    }

    fn remove(&mut self, doc_id: &str) -> Option<Document> {
        let doc = self.documents.remove(doc_id)?;
        let chunk_ids: Vec<String> = doc.chunks.iter().map(|c| c.id.clone()).collect();
        for chunk in &doc.chunks {
            self.index.remove_chunk(&chunk.id, &chunk.keywords);
            self.chunk_owner.remove(&chunk.id);
        }
        self.graph.remove_document(doc_id, &chunk_ids);
        self.order.retain(|id| id != doc_id);
        Some(doc)
    }
}

// ── DocumentStore ─────────────────────────────────────────────────────────────

pub struct DocumentStore {
    chunker: Chunker,
    keywords: KeywordExtractor,
    entities: Arc<dyn EntityExtractor>,
    corpus: RwLock<Corpus>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new(
            Chunker::default(),
            KeywordExtractor::default(),
            Arc::new(CapitalizedEntityExtractor),
        )
    }
}

impl DocumentStore {
    pub fn new(
        chunker: Chunker,
        keywords: KeywordExtractor,
        entities: Arc<dyn EntityExtractor>,
    ) -> Self {
        Self {
            chunker,
            keywords,
            entities,
            corpus: RwLock::new(Corpus::default()),
        }
    }

    /// The tokenizer queries must share with the index.
    pub fn keywords(&self) -> &KeywordExtractor {
        &self.keywords
    }

    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    fn read_lock(&self) -> Result<RwLockReadGuard<'_, Corpus>, AppError> {
        self.corpus
            .read()
            .map_err(|_| AppError::Memory("docstore: corpus lock poisoned".into()))
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<'_, Corpus>, AppError> {
        self.corpus
            .write()
            .map_err(|_| AppError::Memory("docstore: corpus lock poisoned".into()))
    }

    /// Chunk, index and graph a document. Returns the new document id.
    ///
    /// Blank text is rejected and leaves the store untouched.
    pub fn upload(&self, text: &str, filename: &str, mime: &str) -> Result<String, AppError> {
        if text.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "docstore: document '{filename}' has no text"
            )));
        }

        let doc_id = uuid::Uuid::now_v7().to_string();
        let mut chunks = self.chunker.chunk(&doc_id, text);
        let mut entities = Vec::with_capacity(chunks.len());
        for chunk in &mut chunks {
            chunk.terms = self.keywords.term_frequencies(&chunk.text);
            chunk.keywords = self.keywords.top_keywords(&chunk.terms);
            entities.push(self.entities.extract(&chunk.text));
        }

        let doc = Document {
            id: doc_id.clone(),
            filename: filename.to_string(),
            mime: mime.to_string(),
            content: text.to_string(),
            content_hash: sha256_hex(text),
            uploaded_at: now_iso8601(),
            content_preview: content_preview(text),
            chunks,
        };
        let chunk_count = doc.chunks.len();

        self.write_lock()?.insert(doc, entities);

        info!(doc_id = %doc_id, filename, chunks = chunk_count, "docstore: document uploaded");
        Ok(doc_id)
    }

    /// Remove a document with its chunks, index postings and graph
    /// contributions. Returns `false` if the id is unknown.
    pub fn delete(&self, doc_id: &str) -> Result<bool, AppError> {
        let removed = self.write_lock()?.remove(doc_id);
        match removed {
            Some(doc) => {
                info!(doc_id, chunks = doc.chunks.len(), "docstore: document deleted");
                Ok(true)
            }
            None => {
                debug!(doc_id, "docstore: delete of unknown document");
                Ok(false)
            }
        }
    }

    /// Documents in upload order.
    pub fn list_documents(&self) -> Result<Vec<DocMetadata>, AppError> {
        Ok(self.read_lock()?.documents().map(Document::metadata).collect())
    }

    pub fn get_document(&self, doc_id: &str) -> Result<Option<Document>, AppError> {
        Ok(self.read_lock()?.document(doc_id).cloned())
    }

    /// Run `f` against a consistent snapshot of the corpus.
    pub fn read<R>(&self, f: impl FnOnce(&Corpus) -> R) -> Result<R, AppError> {
        let corpus = self.read_lock()?;
        Ok(f(&corpus))
    }

    pub fn stats(&self) -> Result<StoreStats, AppError> {
        Ok(self.read_lock()?.stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> DocumentStore {
        DocumentStore::new(
            Chunker::new(120, 20, 30).expect("chunker"),
            KeywordExtractor::default(),
            Arc::new(CapitalizedEntityExtractor),
        )
    }

    fn long_text() -> String {
        (0..20)
            .map(|i| format!("Chapter {i} follows Alice through Paris and the river. "))
            .collect()
    }

    #[test]
    fn upload_chunks_and_indexes() {
        let store = make_store();
        let id = store.upload(&long_text(), "alice.txt", "text/plain").expect("upload");

        let doc = store.get_document(&id).expect("get").expect("present");
        assert!(doc.chunks.len() > 1);
        assert_eq!(doc.chunks[0].id, format!("{id}_chunk_0"));
        assert!(!doc.chunks[0].keywords.is_empty());

        store
            .read(|corpus| {
                let alice = corpus.index().postings("alice").expect("indexed");
                assert!(alice.keys().all(|cid| cid.starts_with(&id)));
                assert!(corpus.graph().contains_node("Alice"));
            })
            .expect("read");
    }

    #[test]
    fn blank_upload_rejected_without_mutation() {
        let store = make_store();
        let err = store.upload("   \n\t", "blank.txt", "text/plain").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.stats().expect("stats"), StoreStats::default());
    }

    #[test]
    fn list_preserves_upload_order() {
        let store = make_store();
        let a = store.upload("first doc", "a.txt", "text/plain").expect("a");
        let b = store.upload("second doc", "b.txt", "text/plain").expect("b");
        let c = store.upload("third doc", "c.txt", "text/plain").expect("c");
        store.delete(&b).expect("delete");
        let ids: Vec<String> = store.list_documents().expect("list").into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    fn metadata_fields_populated() {
        let store = make_store();
        let id = store.upload("Alice met Bob in Paris.", "a.md", "text/markdown").expect("upload");
        let meta = &store.list_documents().expect("list")[0];
        assert_eq!(meta.id, id);
        assert_eq!(meta.filename, "a.md");
        assert_eq!(meta.mime, "text/markdown");
        assert_eq!(meta.chunk_count, 1);
        assert_eq!(meta.content_preview, "Alice met Bob in Paris.");
        assert_eq!(meta.content_hash.len(), 64);
    }

    #[test]
    fn delete_cascades_everywhere() {
        let store = make_store();
        let keep = store.upload("Rivers of Oslo are cold.", "keep.txt", "text/plain").expect("keep");
        let gone = store.upload(&long_text(), "gone.txt", "text/plain").expect("gone");
        let gone_chunks: Vec<String> = store
            .get_document(&gone)
            .expect("get")
            .expect("present")
            .chunks
            .into_iter()
            .map(|c| c.id)
            .collect();

        assert!(store.delete(&gone).expect("delete"));
        assert!(!store.delete(&gone).expect("second delete"));

        store
            .read(|corpus| {
                for id in &gone_chunks {
                    assert!(corpus.chunk(id).is_none());
                    assert!(!corpus.index().references_chunk(id));
                    assert!(!corpus.graph().references_chunk(id));
                }
                assert!(!corpus.graph().references_document(&gone));
                assert!(!corpus.graph().contains_node("Alice"));
                assert!(corpus.index().postings("chapter").is_none());
                assert!(corpus.contains_document(&keep));
                assert!(corpus.graph().contains_node("Oslo"));
            })
            .expect("read");
    }

    #[test]
    fn stats_track_contents() {
        let store = make_store();
        store.upload("Alice met Bob in Paris.", "a.txt", "text/plain").expect("upload");
        let s = store.stats().expect("stats");
        assert_eq!(s.documents, 1);
        assert_eq!(s.chunks, 1);
        assert_eq!(s.graph_nodes, 3);
        assert_eq!(s.graph_edges, 3);
        assert!(s.index_terms >= 4);
    }
}
