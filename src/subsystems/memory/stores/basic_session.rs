//! `basic_session` store — capped in-memory transcript plus the session's
//! selected document ids.
//!
//! The transcript is capped by entry count (FIFO — oldest entries dropped
//! first). Nothing is written to disk; a session lives as long as the process.

use std::collections::{BTreeSet, VecDeque};

use super::super::types::{Message, Role};

/// Default maximum number of transcript entries before FIFO eviction.
pub const DEFAULT_TRANSCRIPT_CAP: usize = 10;

#[derive(Debug, Clone)]
pub struct BasicSessionStore {
    session_id: String,
    created_at: String,
    transcript_cap: usize,
    transcript: VecDeque<Message>,
    selected_docs: BTreeSet<String>,
}

impl BasicSessionStore {
    pub fn new(session_id: &str, transcript_cap: Option<usize>) -> Self {
        let cap = transcript_cap.unwrap_or(DEFAULT_TRANSCRIPT_CAP).max(1);
        Self {
            session_id: session_id.to_string(),
            created_at: super::docstore_core::now_iso8601(),
            transcript_cap: cap,
            transcript: VecDeque::with_capacity(cap + 1),
            selected_docs: BTreeSet::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    // ── Transcript ────────────────────────────────────────────────────

    pub fn transcript_append(&mut self, role: Role, content: &str) {
        self.transcript.push_back(Message::new(role, content));
        // FIFO cap: drop oldest.
        while self.transcript.len() > self.transcript_cap {
            self.transcript.pop_front();
        }
    }

    /// The last `n` entries in original order.
    pub fn transcript_read_last(&self, n: usize) -> Vec<Message> {
        let skip = self.transcript.len().saturating_sub(n);
        self.transcript.iter().skip(skip).cloned().collect()
    }

    pub fn transcript(&self) -> Vec<Message> {
        self.transcript.iter().cloned().collect()
    }

    pub fn transcript_len(&self) -> usize {
        self.transcript.len()
    }

    // ── Document selection ────────────────────────────────────────────

    pub fn select_documents<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_docs = ids.into_iter().map(Into::into).collect();
    }

    pub fn selected_documents(&self) -> Vec<String> {
        self.selected_docs.iter().cloned().collect()
    }

    /// Drop `doc_id` from the selection. Returns whether it was selected.
    pub fn forget_document(&mut self, doc_id: &str) -> bool {
        self.selected_docs.remove(doc_id)
    }
}
