//! `logger` — tracing subscriber setup for docchat.
//!
//! Two sources feed the filter: a plain level name coming from config, the
//! `DOCCHAT_LOG_LEVEL` override or the `-v` flags, and the `RUST_LOG`
//! environment variable. Only `RUST_LOG` may carry full `EnvFilter`
//! directives such as `docchat::subsystems::retrieval=debug,info`; the level
//! name is always one of `error`, `warn`, `info`, `debug`, `trace` or `off`.
//! Output goes to stderr so the console channel owns stdout.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Install the global subscriber.
///
/// With `prefer_level` set (explicit `-v` on the command line) the level name
/// wins over `RUST_LOG`. Otherwise a parseable `RUST_LOG` wins and the level
/// name is the fallback.
pub fn init(level: &str, prefer_level: bool) -> Result<(), AppError> {
    let fallback = parse_level(level)?;
    let from_level = || EnvFilter::default().add_directive(fallback.into());

    let filter = if prefer_level {
        from_level()
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| from_level())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("subscriber already installed: {e}")))
}

/// Parse a level name. Directive syntax is rejected here; it belongs in
/// `RUST_LOG`.
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    let trimmed = level.trim();
    if trimmed.is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    trimmed.parse::<LevelFilter>().map_err(|_| {
        AppError::Logger(format!(
            "unrecognised log level '{level}' (expected error|warn|info|debug|trace|off; \
             use RUST_LOG for per-module directives)"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_parse() {
        for l in ["error", "warn", "info", "debug", "trace", "off", " INFO "] {
            assert!(parse_level(l).is_ok(), "'{l}' should parse");
        }
        assert_eq!(parse_level("debug").unwrap(), LevelFilter::DEBUG);
    }

    #[test]
    fn directives_and_junk_rejected() {
        assert!(parse_level("").is_err());
        assert!(parse_level("verbose").is_err());
        let err = parse_level("docchat=debug,info").unwrap_err();
        assert!(err.to_string().contains("RUST_LOG"));
    }

    #[test]
    fn init_rejects_bad_level_before_installing() {
        assert!(matches!(init("loud", true), Err(AppError::Logger(_))));
    }

    #[test]
    fn init_installs_once() {
        // Other tests in this binary may have installed a subscriber already.
        match init("info", false) {
            Ok(()) => assert!(init("info", false).is_err()),
            Err(AppError::Logger(msg)) => assert!(msg.contains("already installed")),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}
