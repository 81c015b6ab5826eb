//! Prompt assembly for the answering step.
//!
//! Prompts are built from plain-text fragments joined with blank lines.
//! Variable substitution uses `{{key}}` syntax and is applied once at
//! [`build()`](PromptBuilder::build) time, after all fragments are joined.
//! Substitution is a single left-to-right pass: values are copied verbatim
//! and never rescanned, so `{{...}}` inside document text survives as-is.
//!
//! The grounded-answer template ships as `config/prompts/rag_answer.txt` and
//! is compiled into the binary.

use std::collections::HashMap;

use crate::subsystems::memory::types::Message;
use crate::subsystems::retrieval::RankedChunk;

const SEPARATOR: &str = "\n\n";

/// Grounded-answer template. Variables: `{{context}}`, `{{history}}`, `{{question}}`.
pub const RAG_ANSWER_TEMPLATE: &str = include_str!("../../../config/prompts/rag_answer.txt");

pub const NO_HISTORY: &str = "No previous conversation.";

/// Fluent builder that assembles a prompt from text fragments.
#[derive(Debug, Default)]
pub struct PromptBuilder {
    parts: Vec<String>,
    vars: HashMap<String, String>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text fragment. Blank fragments are skipped.
    pub fn append(mut self, text: impl Into<String>) -> Self {
        let s = text.into();
        let trimmed = s.trim().to_string();
        if !trimmed.is_empty() {
            self.parts.push(trimmed);
        }
        self
    }

    /// Register `{{key}}` → `value` substitution pairs applied at build time.
    pub fn with_vars<'a, I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (k, v) in vars {
            self.vars.insert(k.to_string(), v.to_string());
        }
        self
    }

    /// Register a single variable.
    pub fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    /// Join all fragments with blank lines and apply variable substitution.
    /// Unknown `{{key}}` placeholders are left untouched.
    pub fn build(self) -> String {
        let template = self.parts.join(SEPARATOR);
        let mut out = String::with_capacity(template.len());
        let mut rest = template.as_str();
        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            match after.find("}}").and_then(|close| {
                self.vars.get(&after[..close]).map(|v| (close, v))
            }) {
                Some((close, value)) => {
                    out.push_str(value);
                    rest = &after[close + 2..];
                }
                None => {
                    out.push_str("{{");
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// `--- From {filename} (Chunk {n}) ---` blocks in rank order. Chunk numbers
/// start at 1.
pub fn render_context(chunks: &[RankedChunk]) -> String {
    chunks
        .iter()
        .map(|r| {
            format!(
                "--- From {} (Chunk {}) ---\n{}",
                r.document_name,
                r.chunk.ordinal + 1,
                r.chunk.text.trim()
            )
        })
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

pub fn render_history(history: &[Message]) -> String {
    if history.is_empty() {
        return NO_HISTORY.to_string();
    }
    history
        .iter()
        .map(|m| format!("{}: {}", m.role.label(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_rag_prompt(question: &str, chunks: &[RankedChunk], history: &[Message]) -> String {
    PromptBuilder::new()
        .append(RAG_ANSWER_TEMPLATE)
        .var("context", render_context(chunks))
        .var("history", render_history(history))
        .var("question", question.trim())
        .build()
}
