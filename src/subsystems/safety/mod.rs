//! Safety subsystem — pattern-based gate for incoming queries.
//!
//! Two categories are checked in order: toxicity, then NSFW. Each has a term
//! set and an allow-list of phrases. A term hit that sits entirely inside an
//! allow-listed phrase is ignored; any other hit rejects the text with that
//! category. Matching is case-insensitive and word-bounded, and terms also
//! match their common inflections (`kill` covers `kills`, `killed`,
//! `killing`, `killer`). A term ending in `*` matches any continuation.
//!
//! The guard holds no state beyond its compiled patterns and never records
//! the text it evaluates.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use regex::Regex;
use serde::Serialize;

use crate::config::SafetyConfig;
use crate::error::AppError;

// ── Built-in sets ─────────────────────────────────────────────────────────────

const TOXIC_TERMS: &[&str] = &[
    "kill", "murder", "harm", "hurt", "attack", "destroy", "violence", "weapon",
    "hate", "despise", "loathe", "abhor", "racist", "sexist",
    "stupid", "idiot", "moron", "fool", "retard", "dumb", "shit",
    "fuck", "asshole", "bastard", "bitch", "whore", "piss",
    "terror", "bomb", "shoot", "kill myself", "suicide",
];

const TOXIC_ALLOWED: &[&str] = &[
    "soldiers were killed", "killed in action", "killed in battle", "were killed in the war",
    "kill the process", "kill process", "kill command", "kill switch", "kill time",
    "heart attack", "panic attack", "asthma attack", "attack surface",
    "photo shoot", "bath bomb", "harm reduction", "self-harm prevention",
    "suicide prevention", "april fool", "hate speech",
];

const NSFW_TERMS: &[&str] = &[
    "sex", "sexual", "porn", "pornography", "nude", "naked", "explicit", "xxx",
    "adult", "nsfw", "erotic", "fetish", "masturbat*", "orgasm",
    "rape", "molest", "abuse", "harass", "pedophil*",
    "penis", "vagina", "breast", "genital",
];

const NSFW_ALLOWED: &[&str] = &[
    "sex education", "sexual health", "sexual harassment policy", "breast cancer",
    "breast milk", "breastfeeding", "adult education", "young adult", "adult learners",
    "substance abuse", "child abuse prevention", "explicit permission", "explicit consent",
    "naked eye",
];

// ── Verdict ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyCategory {
    Toxicity,
    Nsfw,
}

impl SafetyCategory {
    pub fn reason(&self) -> &'static str {
        match self {
            SafetyCategory::Toxicity => "Content contains toxic or harmful language",
            SafetyCategory::Nsfw => "Content appears to be NSFW or inappropriate",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyCategory::Toxicity => "toxicity",
            SafetyCategory::Nsfw => "nsfw",
        }
    }
}

impl fmt::Display for SafetyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafetyVerdict {
    pub is_rejected: bool,
    pub category: Option<SafetyCategory>,
    pub reason: Option<String>,
}

impl SafetyVerdict {
    pub fn safe() -> Self {
        Self { is_rejected: false, category: None, reason: None }
    }

    pub fn rejected(category: SafetyCategory) -> Self {
        Self {
            is_rejected: true,
            category: Some(category),
            reason: Some(category.reason().to_string()),
        }
    }
}

// ── Pattern compilation ───────────────────────────────────────────────────────

fn phrase_body(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+")
}

fn term_alternative(term: &str) -> String {
    match term.strip_suffix('*') {
        Some(stem) => format!(r"{}\w*", phrase_body(stem)),
        None => format!("{}(?:s|es|d|ed|ing|er|ers)?", phrase_body(term)),
    }
}

fn alternation<'a>(
    items: impl Iterator<Item = &'a str>,
    render: fn(&str) -> String,
) -> Option<String> {
    let parts: Vec<String> = items
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(render)
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(format!(r"(?i)\b(?:{})\b", parts.join("|")))
    }
}

fn compile(pattern: &str, what: &str) -> Result<Regex, AppError> {
    Regex::new(pattern).map_err(|e| AppError::Config(format!("safety: bad {what} pattern: {e}")))
}

struct CategoryRules {
    category: SafetyCategory,
    terms: Option<Regex>,
    allowed: Option<Regex>,
}

impl CategoryRules {
    fn build(
        category: SafetyCategory,
        terms: &[&str],
        extra_terms: &[String],
        allowed: &[&str],
        extra_allowed: &[String],
    ) -> Result<Self, AppError> {
        let term_pattern = alternation(
            terms.iter().copied().chain(extra_terms.iter().map(String::as_str)),
            term_alternative,
        );
        let allowed_pattern = alternation(
            allowed.iter().copied().chain(extra_allowed.iter().map(String::as_str)),
            phrase_body,
        );
        Ok(Self {
            category,
            terms: term_pattern.map(|p| compile(&p, category.as_str())).transpose()?,
            allowed: allowed_pattern
                .map(|p| compile(&p, "allow-list"))
                .transpose()?,
        })
    }

    /// True if some term hit is not covered by an allow-listed phrase.
    fn violated_by(&self, text: &str) -> bool {
        let Some(terms) = &self.terms else {
            return false;
        };
        let allowed_spans: Vec<(usize, usize)> = self
            .allowed
            .as_ref()
            .map(|re| re.find_iter(text).map(|m| (m.start(), m.end())).collect())
            .unwrap_or_default();

        terms.find_iter(text).any(|hit| {
            !allowed_spans
                .iter()
                .any(|&(start, end)| start <= hit.start() && hit.end() <= end)
        })
    }
}

// ── Guard ─────────────────────────────────────────────────────────────────────

pub struct ContentSafetyGuard {
    rules: Vec<CategoryRules>,
    evaluated: AtomicU64,
}

impl ContentSafetyGuard {
    /// Built-in sets plus the deployment's additions.
    pub fn new(config: &SafetyConfig) -> Result<Self, AppError> {
        let rules = vec![
            CategoryRules::build(
                SafetyCategory::Toxicity,
                TOXIC_TERMS,
                &config.extra_toxic_terms,
                TOXIC_ALLOWED,
                &config.extra_allowed_phrases,
            )?,
            CategoryRules::build(
                SafetyCategory::Nsfw,
                NSFW_TERMS,
                &config.extra_nsfw_terms,
                NSFW_ALLOWED,
                &config.extra_allowed_phrases,
            )?,
        ];
        Ok(Self { rules, evaluated: AtomicU64::new(0) })
    }

    /// First violated category wins.
    pub fn evaluate(&self, text: &str) -> SafetyVerdict {
        self.evaluated.fetch_add(1, Ordering::Relaxed);
        self.rules
            .iter()
            .find(|r| r.violated_by(text))
            .map(|r| SafetyVerdict::rejected(r.category))
            .unwrap_or_else(SafetyVerdict::safe)
    }

    /// Number of texts screened since construction.
    pub fn evaluated(&self) -> u64 {
        self.evaluated.load(Ordering::Relaxed)
    }
}
