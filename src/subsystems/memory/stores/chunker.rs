//! `chunker` — sentence-aware, overlap-linked text splitting.
//!
//! Offsets and lengths are in characters. A cut lands just after the last
//! sentence terminator found within `boundary_tolerance` characters before the
//! hard limit; without one the cut is made at the limit. Each chunk after the
//! first starts `overlap` characters before the previous chunk's end, so
//! dropping the leading `overlap` characters of every non-first chunk and
//! concatenating reproduces the input exactly.

use crate::error::AppError;

use super::docstore_core::{Chunk, chunk_id};

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '\n')
}

#[derive(Debug, Clone)]
pub struct Chunker {
    size: usize,
    overlap: usize,
    tolerance: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self { size: 1000, overlap: 100, tolerance: 50 }
    }
}

impl Chunker {
    /// `overlap + tolerance` must stay below `size` so every chunk makes
    /// forward progress and is longer than its overlap.
    pub fn new(size: usize, overlap: usize, tolerance: usize) -> Result<Self, AppError> {
        if size == 0 || overlap + tolerance >= size {
            return Err(AppError::Config(format!(
                "chunker: overlap ({overlap}) + tolerance ({tolerance}) must be < size ({size})"
            )));
        }
        Ok(Self { size, overlap, tolerance })
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into chunks owned by `doc_id`. Keyword sets and term
    /// frequencies are left empty for the indexer to fill.
    pub fn chunk(&self, doc_id: &str, text: &str) -> Vec<Chunk> {
        self.spans(text)
            .into_iter()
            .enumerate()
            .map(|(ordinal, (start, end, body))| Chunk {
                id: chunk_id(doc_id, ordinal),
                doc_id: doc_id.to_string(),
                ordinal,
                text: body,
                start,
                len: end - start,
                keywords: Vec::new(),
                terms: Default::default(),
            })
            .collect()
    }

    /// `(start, end, text)` triples with character offsets.
    fn spans(&self, text: &str) -> Vec<(usize, usize, String)> {
        let chars: Vec<char> = text.chars().collect();
        let n = chars.len();
        let mut out = Vec::new();
        if n == 0 {
            return out;
        }

        let mut start = 0;
        loop {
            let hard_end = (start + self.size).min(n);
            if hard_end == n {
                out.push((start, n, chars[start..n].iter().collect()));
                break;
            }
            // Never cut so early that the next start would not advance.
            let floor = hard_end
                .saturating_sub(self.tolerance)
                .max(start + self.overlap + 1);
            let end = (floor..hard_end)
                .rev()
                .find(|&p| is_terminator(chars[p]))
                .map(|p| p + 1)
                .unwrap_or(hard_end);

            out.push((start, end, chars[start..end].iter().collect()));
            start = end - self.overlap;
        }
        out
    }
}

/// Rebuild the source text from chunks by dropping each non-first chunk's
/// leading overlap.
pub fn reconstruct(chunks: &[Chunk], overlap: usize) -> String {
    let mut out = String::new();
    for (i, c) in chunks.iter().enumerate() {
        if i == 0 {
            out.push_str(&c.text);
        } else {
            out.extend(c.text.chars().skip(overlap));
        }
    }
    out
}
