//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies the `DOCCHAT_LOG_LEVEL` env override.

use std::{
    env, fs,
    path::Path,
};

use serde::Deserialize;

use crate::error::AppError;
use crate::logger;
use crate::subsystems::memory::stores::keywords::MIN_TOKEN_LEN;
use crate::subsystems::retrieval::RagVariant;

/// Chunker parameters (`[chunker]`). All lengths are in characters.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// How far back from the hard cut to look for a sentence terminator.
    pub boundary_tolerance: usize,
}

/// Keyword index parameters (`[index]`).
#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub max_keywords_per_chunk: usize,
    pub min_token_len: usize,
}

/// Retrieval parameters (`[retrieval]`).
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub default_variant: RagVariant,
    pub top_k: usize,
    /// Number of Basic results used as seeds for graph expansion.
    pub kg_seed_chunks: usize,
    /// Weight applied to the normalised graph score.
    pub kg_boost: f32,
}

/// Session memory caps (`[memory]`).
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub max_messages: usize,
    /// How many trailing messages go into the prompt's history block.
    pub recent_messages: usize,
}

/// Deployment-specific additions to the built-in safety sets (`[safety]`).
#[derive(Debug, Clone, Default)]
pub struct SafetyConfig {
    pub extra_toxic_terms: Vec<String>,
    pub extra_nsfw_terms: Vec<String>,
    pub extra_allowed_phrases: Vec<String>,
}

/// LLM subsystem configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active. Maps to `default` in `[llm]`.
    pub provider: String,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_name: String,
    /// Plain level name. Per-module directives go in `RUST_LOG`.
    pub log_level: String,
    pub chunker: ChunkerConfig,
    pub index: IndexConfig,
    pub retrieval: RetrievalConfig,
    pub memory: MemoryConfig,
    pub safety: SafetyConfig,
    pub llm: LlmConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_name: "docchat".into(),
            log_level: "info".into(),
            chunker: ChunkerConfig {
                chunk_size: default_chunk_size(),
                chunk_overlap: default_chunk_overlap(),
                boundary_tolerance: default_boundary_tolerance(),
            },
            index: IndexConfig {
                max_keywords_per_chunk: default_max_keywords(),
                min_token_len: default_min_token_len(),
            },
            retrieval: RetrievalConfig {
                default_variant: RagVariant::Basic,
                top_k: default_top_k(),
                kg_seed_chunks: default_kg_seed_chunks(),
                kg_boost: default_kg_boost(),
            },
            memory: MemoryConfig {
                max_messages: default_max_messages(),
                recent_messages: default_recent_messages(),
            },
            safety: SafetyConfig::default(),
            llm: LlmConfig { provider: default_llm_provider() },
        }
    }
}

/// Raw TOML shape: the `serde` target before resolution.
#[derive(Deserialize)]
struct RawConfig {
    supervisor: RawSupervisor,
    #[serde(default)]
    chunker: RawChunker,
    #[serde(default)]
    index: RawIndex,
    #[serde(default)]
    retrieval: RawRetrieval,
    #[serde(default)]
    memory: RawMemory,
    #[serde(default)]
    safety: RawSafety,
    #[serde(default)]
    llm: RawLlm,
}

#[derive(Deserialize)]
struct RawSupervisor {
    bot_name: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

#[derive(Deserialize)]
struct RawChunker {
    #[serde(default = "default_chunk_size")]
    chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    chunk_overlap: usize,
    #[serde(default = "default_boundary_tolerance")]
    boundary_tolerance: usize,
}

impl Default for RawChunker {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            boundary_tolerance: default_boundary_tolerance(),
        }
    }
}

#[derive(Deserialize)]
struct RawIndex {
    #[serde(default = "default_max_keywords")]
    max_keywords_per_chunk: usize,
    #[serde(default = "default_min_token_len")]
    min_token_len: usize,
}

impl Default for RawIndex {
    fn default() -> Self {
        Self {
            max_keywords_per_chunk: default_max_keywords(),
            min_token_len: default_min_token_len(),
        }
    }
}

#[derive(Deserialize)]
struct RawRetrieval {
    #[serde(default = "default_variant")]
    default_variant: String,
    #[serde(default = "default_top_k")]
    top_k: usize,
    #[serde(default = "default_kg_seed_chunks")]
    kg_seed_chunks: usize,
    #[serde(default = "default_kg_boost")]
    kg_boost: f32,
}

impl Default for RawRetrieval {
    fn default() -> Self {
        Self {
            default_variant: default_variant(),
            top_k: default_top_k(),
            kg_seed_chunks: default_kg_seed_chunks(),
            kg_boost: default_kg_boost(),
        }
    }
}

#[derive(Deserialize)]
struct RawMemory {
    #[serde(default = "default_max_messages")]
    max_messages: usize,
    #[serde(default = "default_recent_messages")]
    recent_messages: usize,
}

impl Default for RawMemory {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            recent_messages: default_recent_messages(),
        }
    }
}

#[derive(Deserialize, Default)]
struct RawSafety {
    #[serde(default)]
    extra_toxic_terms: Vec<String>,
    #[serde(default)]
    extra_nsfw_terms: Vec<String>,
    #[serde(default)]
    extra_allowed_phrases: Vec<String>,
}

#[derive(Deserialize)]
struct RawLlm {
    /// Maps to `default = "..."` in `[llm]`.
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self { provider: default_llm_provider() }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_chunk_size() -> usize { 1000 }
fn default_chunk_overlap() -> usize { 100 }
fn default_boundary_tolerance() -> usize { 50 }
fn default_max_keywords() -> usize { 10 }
fn default_min_token_len() -> usize { 3 }
fn default_variant() -> String { "basic".to_string() }
fn default_top_k() -> usize { 5 }
fn default_kg_seed_chunks() -> usize { 3 }
fn default_kg_boost() -> f32 { 0.3 }
fn default_max_messages() -> usize { 10 }
fn default_recent_messages() -> usize { 5 }
fn default_llm_provider() -> String { "dummy".to_string() }

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Load config from `config_path` (default `config/default.toml`), then apply
/// env-var overrides.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let log_level_override = env::var("DOCCHAT_LOG_LEVEL").ok();
    let path = Path::new(config_path.unwrap_or(DEFAULT_CONFIG_PATH));
    load_from(path, log_level_override.as_deref())
}

/// Internal loader. Accepts an explicit path and optional override.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(path: &Path, log_level_override: Option<&str>) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let s = parsed.supervisor;
    let log_level = log_level_override.unwrap_or(&s.log_level).to_string();
    logger::parse_level(&log_level).map_err(|e| AppError::Config(e.to_string()))?;

    let default_variant = parsed
        .retrieval
        .default_variant
        .parse::<RagVariant>()
        .map_err(|e| AppError::Config(format!("[retrieval] default_variant: {e}")))?;

    let cfg = Config {
        bot_name: s.bot_name,
        log_level,
        chunker: ChunkerConfig {
            chunk_size: parsed.chunker.chunk_size,
            chunk_overlap: parsed.chunker.chunk_overlap,
            boundary_tolerance: parsed.chunker.boundary_tolerance,
        },
        index: IndexConfig {
            max_keywords_per_chunk: parsed.index.max_keywords_per_chunk,
            min_token_len: parsed.index.min_token_len,
        },
        retrieval: RetrievalConfig {
            default_variant,
            top_k: parsed.retrieval.top_k,
            kg_seed_chunks: parsed.retrieval.kg_seed_chunks,
            kg_boost: parsed.retrieval.kg_boost,
        },
        memory: MemoryConfig {
            max_messages: parsed.memory.max_messages,
            recent_messages: parsed.memory.recent_messages,
        },
        safety: SafetyConfig {
            extra_toxic_terms: parsed.safety.extra_toxic_terms,
            extra_nsfw_terms: parsed.safety.extra_nsfw_terms,
            extra_allowed_phrases: parsed.safety.extra_allowed_phrases,
        },
        llm: LlmConfig { provider: parsed.llm.provider },
    };

    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    /// Reject combinations the engine cannot honour.
    pub fn validate(&self) -> Result<(), AppError> {
        let c = &self.chunker;
        if c.chunk_size == 0 {
            return Err(AppError::Config("[chunker] chunk_size must be > 0".into()));
        }
        if c.chunk_overlap + c.boundary_tolerance >= c.chunk_size {
            return Err(AppError::Config(format!(
                "[chunker] chunk_overlap ({}) + boundary_tolerance ({}) must be < chunk_size ({})",
                c.chunk_overlap, c.boundary_tolerance, c.chunk_size
            )));
        }
        if self.index.max_keywords_per_chunk == 0 {
            return Err(AppError::Config("[index] max_keywords_per_chunk must be > 0".into()));
        }
        if self.index.min_token_len < MIN_TOKEN_LEN {
            return Err(AppError::Config(format!(
                "[index] min_token_len ({}) must be >= {MIN_TOKEN_LEN}",
                self.index.min_token_len
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(AppError::Config("[retrieval] top_k must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.retrieval.kg_boost) {
            return Err(AppError::Config("[retrieval] kg_boost must be within 0..=1".into()));
        }
        if self.memory.max_messages == 0 || self.memory.recent_messages == 0 {
            return Err(AppError::Config(
                "[memory] max_messages and recent_messages must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL_TOML: &str = r#"
[supervisor]
bot_name = "test-bot"
log_level = "info"
"#;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parse_basic_config() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), None).unwrap();
        assert_eq!(cfg.bot_name, "test-bot");
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), None).unwrap();
        assert_eq!(cfg.chunker.chunk_size, 1000);
        assert_eq!(cfg.chunker.chunk_overlap, 100);
        assert_eq!(cfg.index.max_keywords_per_chunk, 10);
        assert_eq!(cfg.retrieval.top_k, 5);
        assert_eq!(cfg.retrieval.default_variant, RagVariant::Basic);
        assert!((cfg.retrieval.kg_boost - 0.3).abs() < f32::EPSILON);
        assert_eq!(cfg.memory.max_messages, 10);
        assert_eq!(cfg.memory.recent_messages, 5);
        assert_eq!(cfg.llm.provider, "dummy");
        assert!(cfg.safety.extra_toxic_terms.is_empty());
    }

    #[test]
    fn sections_override_defaults() {
        let f = write_toml(
            r#"
[supervisor]
bot_name = "b"

[chunker]
chunk_size = 200
chunk_overlap = 20
boundary_tolerance = 10

[retrieval]
default_variant = "hybrid"
top_k = 3

[safety]
extra_toxic_terms = ["grief"]
"#,
        );
        let cfg = load_from(f.path(), None).unwrap();
        assert_eq!(cfg.chunker.chunk_size, 200);
        assert_eq!(cfg.retrieval.default_variant, RagVariant::Hybrid);
        assert_eq!(cfg.retrieval.top_k, 3);
        assert_eq!(cfg.safety.extra_toxic_terms, vec!["grief".to_string()]);
    }

    #[test]
    fn missing_file_errors() {
        let result = load_from(Path::new("/nonexistent/config.toml"), None);
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("config error"));
    }

    #[test]
    fn env_log_level_override() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), Some("debug")).unwrap();
        assert_eq!(cfg.log_level, "debug");
    }

    #[test]
    fn bad_log_level_rejected() {
        let f = write_toml(MINIMAL_TOML);
        assert!(load_from(f.path(), Some("loud")).is_err());
    }

    #[test]
    fn log_directives_rejected_in_config() {
        let f = write_toml(MINIMAL_TOML);
        let err = load_from(f.path(), Some("docchat=debug,info")).unwrap_err();
        assert!(matches!(err, AppError::Config(ref m) if m.contains("RUST_LOG")), "{err}");
        assert!(logger::init("docchat=debug,info", true).is_err());
    }

    #[test]
    fn overlap_plus_tolerance_must_fit() {
        let f = write_toml(
            r#"
[supervisor]
bot_name = "b"

[chunker]
chunk_size = 100
chunk_overlap = 60
boundary_tolerance = 40
"#,
        );
        let err = load_from(f.path(), None).unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn short_min_token_len_rejected() {
        let f = write_toml(
            r#"
[supervisor]
bot_name = "b"

[index]
min_token_len = 0
"#,
        );
        let err = load_from(f.path(), None).unwrap_err();
        assert!(err.to_string().contains("min_token_len"));

        let mut cfg = Config::default();
        cfg.index.min_token_len = 2;
        assert!(cfg.validate().is_err());
        cfg.index.min_token_len = 4;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn unknown_variant_rejected() {
        let f = write_toml(
            r#"
[supervisor]
bot_name = "b"

[retrieval]
default_variant = "semantic"
"#,
        );
        assert!(load_from(f.path(), None).is_err());
    }

    #[test]
    fn shipped_default_toml_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/default.toml");
        let cfg = load_from(&path, None).unwrap();
        assert_eq!(cfg.bot_name, "docchat");
    }

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }
}
