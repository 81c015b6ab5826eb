//! Agents subsystem — the RAG orchestrator.
//!
//! [`RagAgent`] composes the safety guard, the document store, the retrieval
//! engine, session memory and the LLM provider. A query always passes the
//! guard first; a rejected query touches neither the store nor any session.

pub mod prompt;

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::llm::{LlmProvider, providers};
use crate::subsystems::extract;
use crate::subsystems::memory::stores::chunker::Chunker;
use crate::subsystems::memory::stores::docstore::{DocMetadata, DocumentStore, StoreStats};
use crate::subsystems::memory::stores::keywords::KeywordExtractor;
use crate::subsystems::memory::stores::kg_docstore::CapitalizedEntityExtractor;
use crate::subsystems::memory::stores::docstore_core::now_iso8601;
use crate::subsystems::memory::{MemoryConfig, MemorySystem, Message};
use crate::subsystems::retrieval::{RagVariant, RankedChunk, RetrievalEngine, RetrievalRequest};
use crate::subsystems::safety::{ContentSafetyGuard, SafetyVerdict};

/// Reply used when retrieval finds nothing; the provider is not called.
pub const NO_CONTEXT_ANSWER: &str =
    "I cannot answer this question as no relevant information was found in the selected documents.";

// ── Request / response types ──────────────────────────────────────────────────

/// Result of [`RagAgent::query`].
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub ranked_chunks: Vec<RankedChunk>,
    /// Distinct document names in rank order.
    pub sources: Vec<String>,
    pub rejected: bool,
    pub reason: Option<String>,
}

impl QueryOutcome {
    fn rejected(reason: Option<String>) -> Self {
        Self { ranked_chunks: Vec::new(), sources: Vec::new(), rejected: true, reason }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
    /// Empty means "use the session's selection".
    #[serde(default)]
    pub document_ids: Vec<String>,
    #[serde(default)]
    pub variant: Option<RagVariant>,
    /// Base64-encoded image passed through to the provider.
    #[serde(default)]
    pub image_data: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
    pub timestamp: String,
    pub sources: Vec<String>,
    pub variant: RagVariant,
    pub is_rejected: bool,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthReport {
    pub status: &'static str,
    #[serde(flatten)]
    pub store: StoreStats,
    pub sessions: usize,
}

fn distinct_sources(ranked: &[RankedChunk]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for r in ranked {
        if !sources.contains(&r.document_name) {
            sources.push(r.document_name.clone());
        }
    }
    sources
}

// ── RagAgent ──────────────────────────────────────────────────────────────────

pub struct RagAgent {
    store: Arc<DocumentStore>,
    memory: Arc<MemorySystem>,
    guard: ContentSafetyGuard,
    engine: RetrievalEngine,
    llm: LlmProvider,
    default_variant: RagVariant,
    recent_messages: usize,
}

impl RagAgent {
    /// Wire every collaborator from a resolved config.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let chunker = Chunker::new(
            config.chunker.chunk_size,
            config.chunker.chunk_overlap,
            config.chunker.boundary_tolerance,
        )?;
        let keywords = KeywordExtractor::new(
            config.index.min_token_len,
            config.index.max_keywords_per_chunk,
        );
        let store = DocumentStore::new(chunker, keywords, Arc::new(CapitalizedEntityExtractor));
        let memory = MemorySystem::new(MemoryConfig {
            transcript_cap: Some(config.memory.max_messages),
        });
        let guard = ContentSafetyGuard::new(&config.safety)?;
        let llm = providers::build(&config.llm)?;

        Ok(Self {
            store: Arc::new(store),
            memory: Arc::new(memory),
            guard,
            engine: RetrievalEngine::from_config(&config.retrieval),
            llm,
            default_variant: config.retrieval.default_variant,
            recent_messages: config.memory.recent_messages,
        })
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn memory(&self) -> &MemorySystem {
        &self.memory
    }

    pub fn default_variant(&self) -> RagVariant {
        self.default_variant
    }

    // ── Documents ─────────────────────────────────────────────────────

    pub fn upload(&self, text: &str, filename: &str, mime: &str) -> Result<String, AppError> {
        self.store.upload(text, filename, mime)
    }

    /// Extract text from raw bytes, then upload. An extraction failure leaves
    /// the store untouched.
    pub fn upload_bytes(&self, bytes: &[u8], filename: &str, mime: &str) -> Result<String, AppError> {
        let (text, mime) = extract::extract_text(bytes, filename, mime)?;
        self.store.upload(&text, filename, &mime)
    }

    /// Delete a document and drop it from every session's selection.
    pub fn delete(&self, doc_id: &str) -> Result<bool, AppError> {
        let found = self.store.delete(doc_id)?;
        if found {
            let sessions = self.memory.forget_document(doc_id)?;
            debug!(doc_id, sessions, "agent: document removed from selections");
        }
        Ok(found)
    }

    pub fn list_documents(&self) -> Result<Vec<DocMetadata>, AppError> {
        self.store.list_documents()
    }

    // ── Sessions ──────────────────────────────────────────────────────

    pub fn session_history(&self, session_id: &str) -> Result<Vec<Message>, AppError> {
        self.memory.history(session_id)
    }

    pub fn select_documents(&self, session_id: &str, doc_ids: &[String]) -> Result<(), AppError> {
        self.memory.select_documents(session_id, doc_ids)
    }

    pub fn selected_documents(&self, session_id: &str) -> Result<Vec<String>, AppError> {
        self.memory.selected_documents(session_id)
    }

    // ── Query / chat ──────────────────────────────────────────────────

    fn validate(message: &str, session_id: &str) -> Result<(), AppError> {
        if message.trim().is_empty() {
            return Err(AppError::Validation("message must not be empty".into()));
        }
        if session_id.trim().is_empty() {
            return Err(AppError::Validation("session id must not be empty".into()));
        }
        Ok(())
    }

    /// Validate and screen one incoming message.
    fn admit(&self, message: &str, session_id: &str) -> Result<SafetyVerdict, AppError> {
        Self::validate(message, session_id)?;
        let verdict = self.guard.evaluate(message);
        if verdict.is_rejected {
            warn!(
                session_id,
                category = verdict.category.map(|c| c.as_str()).unwrap_or("unknown"),
                "agent: message rejected"
            );
        }
        Ok(verdict)
    }

    /// Retrieval for an already admitted message.
    fn retrieve(
        &self,
        message: &str,
        session_id: &str,
        selected_document_ids: &[String],
        variant: RagVariant,
    ) -> Result<QueryOutcome, AppError> {
        let request = RetrievalRequest {
            query: message.to_string(),
            session_id: session_id.to_string(),
            selected_document_ids: selected_document_ids.to_vec(),
        };
        let ranked = self.engine.process_query(&self.store, variant, &request)?;
        Ok(QueryOutcome {
            sources: distinct_sources(&ranked),
            ranked_chunks: ranked,
            rejected: false,
            reason: None,
        })
    }

    /// Guard, then retrieve. Never touches session memory.
    pub fn query(
        &self,
        message: &str,
        session_id: &str,
        selected_document_ids: &[String],
        variant: RagVariant,
    ) -> Result<QueryOutcome, AppError> {
        let verdict = self.admit(message, session_id)?;
        if verdict.is_rejected {
            return Ok(QueryOutcome::rejected(verdict.reason));
        }
        self.retrieve(message, session_id, selected_document_ids, variant)
    }

    /// Full exchange: guard, retrieve, generate, then record the user message
    /// and the reply together.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, AppError> {
        let variant = request.variant.unwrap_or(self.default_variant);
        let verdict = self.admit(&request.message, &request.session_id)?;
        if verdict.is_rejected {
            return Ok(ChatResponse {
                response: String::new(),
                session_id: request.session_id,
                timestamp: now_iso8601(),
                sources: Vec::new(),
                variant,
                is_rejected: true,
                rejection_reason: verdict.reason,
            });
        }

        let image = request
            .image_data
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| BASE64.decode(s.trim()))
            .transpose()
            .map_err(|e| AppError::Validation(format!("image_data is not valid base64: {e}")))?;

        let document_ids = if request.document_ids.is_empty() {
            self.memory.selected_documents(&request.session_id)?
        } else {
            request.document_ids.clone()
        };

        let outcome = self.retrieve(&request.message, &request.session_id, &document_ids, variant)?;

        let response = if outcome.ranked_chunks.is_empty() {
            NO_CONTEXT_ANSWER.to_string()
        } else {
            let history = self.memory.get_recent(&request.session_id, self.recent_messages)?;
            let prompt = prompt::build_rag_prompt(&request.message, &outcome.ranked_chunks, &history);
            self.llm.complete(&prompt, image.as_deref()).await?
        };

        self.memory
            .append_exchange(&request.session_id, &request.message, &response)?;

        info!(
            session_id = %request.session_id,
            variant = %variant,
            chunks = outcome.ranked_chunks.len(),
            sources = outcome.sources.len(),
            "agent: chat answered"
        );

        Ok(ChatResponse {
            response,
            session_id: request.session_id,
            timestamp: now_iso8601(),
            sources: outcome.sources,
            variant,
            is_rejected: false,
            rejection_reason: None,
        })
    }

    pub fn health(&self) -> Result<HealthReport, AppError> {
        Ok(HealthReport {
            status: "ok",
            store: self.store.stats()?,
            sessions: self.memory.session_count()?,
        })
    }
}
