//! `docstore_core` — shared types and internal helpers for the document store.
//!
//! [`DocumentStore`](super::docstore::DocumentStore), the chunker, the keyword
//! index and the entity graph all speak in these types.
//!
//! ## What lives here
//! - **Utilities** — `sha256_hex`, `now_iso8601`, `content_preview`, `chunk_id`.
//! - **Shared public types** — `Document`, `DocMetadata`, `Chunk`, `StoreStats`.

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Characters kept in a document's content preview.
pub(crate) const PREVIEW_CHARS: usize = 200;

// ── Utility functions ─────────────────────────────────────────────────────────

/// Return the lowercase hex-encoded SHA-256 digest of `content`.
pub(crate) fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Return the current UTC time as an RFC 3339 string with second precision, e.g.
/// `"2025-04-01T12:00:00Z"`.
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// First [`PREVIEW_CHARS`] characters of `content`, with `...` appended when
/// anything was cut.
pub(crate) fn content_preview(content: &str) -> String {
    let mut chars = content.char_indices();
    match chars.nth(PREVIEW_CHARS) {
        Some((byte_idx, _)) => format!("{}...", &content[..byte_idx]),
        None => content.to_string(),
    }
}

/// Chunk ids are derived from the owning document id and the chunk ordinal.
pub(crate) fn chunk_id(doc_id: &str, ordinal: usize) -> String {
    format!("{doc_id}_chunk_{ordinal}")
}

// ── Shared public types ───────────────────────────────────────────────────────

/// A document as held by the document store.
///
/// The document owns its chunks; the inverted index and the entity graph only
/// refer to them by id.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    /// Unique document identifier (UUID v7).
    pub id: String,
    pub filename: String,
    pub mime: String,
    /// Full extracted text.
    pub content: String,
    /// SHA-256 hex digest of `content`.
    pub content_hash: String,
    /// RFC 3339 upload timestamp.
    pub uploaded_at: String,
    pub content_preview: String,
    /// Chunks in document order.
    pub chunks: Vec<Chunk>,
}

impl Document {
    pub fn metadata(&self) -> DocMetadata {
        DocMetadata {
            id: self.id.clone(),
            filename: self.filename.clone(),
            mime: self.mime.clone(),
            chunk_count: self.chunks.len(),
            uploaded_at: self.uploaded_at.clone(),
            content_preview: self.content_preview.clone(),
            content_hash: self.content_hash.clone(),
        }
    }
}

/// Lightweight document descriptor (no content, no chunks).
///
/// Returned by `list_documents`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DocMetadata {
    pub id: String,
    pub filename: String,
    pub mime: String,
    pub chunk_count: usize,
    pub uploaded_at: String,
    pub content_preview: String,
    pub content_hash: String,
}

/// A bounded span of a document's text.
///
/// `start` and `len` are measured in characters, not bytes.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Chunk {
    /// `{doc_id}_chunk_{ordinal}`.
    pub id: String,
    /// ID of the parent `Document`.
    pub doc_id: String,
    /// Position of this chunk within its document, starting at 0.
    pub ordinal: usize,
    pub text: String,
    /// Character offset of this chunk in the original document.
    pub start: usize,
    /// Length of `text` in characters.
    pub len: usize,
    /// Top terms of this chunk with their frequency, most frequent first.
    /// These are the chunk's index keys.
    pub keywords: Vec<(String, usize)>,
    /// Frequency of every token in the chunk, used for match counting.
    pub terms: BTreeMap<String, usize>,
}

impl Chunk {
    /// Character offset one past the last character of this chunk.
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn has_keyword(&self, term: &str) -> bool {
        self.keywords.iter().any(|(k, _)| k == term)
    }

    pub fn term_frequency(&self, term: &str) -> usize {
        self.terms.get(term).copied().unwrap_or(0)
    }
}

/// Size counters for the health snapshot.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct StoreStats {
    pub documents: usize,
    pub chunks: usize,
    pub index_terms: usize,
    pub graph_nodes: usize,
    pub graph_edges: usize,
}
