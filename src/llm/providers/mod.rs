//! LLM provider implementations.
//!
//! `build(config)` is the factory — called at startup.
//! Adding a new backend = new module + new match arm.

pub mod dummy;

use crate::config::LlmConfig;
use crate::llm::{LlmProvider, ProviderError};

/// Construct a `LlmProvider` from config.
pub fn build(config: &LlmConfig) -> Result<LlmProvider, ProviderError> {
    match config.provider.as_str() {
        "dummy" => Ok(LlmProvider::Dummy(dummy::DummyProvider)),
        _ => Err(ProviderError::UnknownProvider(config.provider.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_dummy() {
        let p = build(&LlmConfig { provider: "dummy".into() }).unwrap();
        assert_eq!(p.name(), "dummy");
    }

    #[test]
    fn unknown_provider_errors() {
        let err = build(&LlmConfig { provider: "gpt-9".into() }).unwrap_err();
        assert!(err.to_string().contains("gpt-9"));
    }
}
