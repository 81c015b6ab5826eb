//! LLM provider abstraction — the generation collaborator.
//!
//! `LlmProvider` is an enum over concrete provider implementations.
//! Add a new variant + module in `providers/` for each additional backend.
//!
//! Provider instances are shared immutable capabilities — clone them freely.
//! The `complete` method is `async fn` on the enum so callers need no
//! trait-object machinery.

pub mod providers;

use thiserror::Error;

use crate::error::AppError;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

impl From<ProviderError> for AppError {
    fn from(e: ProviderError) -> Self {
        AppError::Llm(e.to_string())
    }
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available provider backends.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Dummy(providers::dummy::DummyProvider),
}

impl LlmProvider {
    /// Send `prompt` (and an optional decoded image) to the provider and
    /// return its text reply.
    pub async fn complete(&self, prompt: &str, image: Option<&[u8]>) -> Result<String, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.complete(prompt, image).await,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::Dummy(_) => "dummy",
        }
    }
}
