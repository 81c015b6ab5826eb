//! Application-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Caller supplied something the engine refuses to act on (empty query,
    /// blank document, bad base64 image payload).
    #[error("validation error: {0}")]
    Validation(String),

    /// The upstream text-extraction step failed for a single upload.
    #[error("extraction error: {0}")]
    Extraction(String),

    #[error("memory error: {0}")]
    Memory(String),

    #[error("llm error: {0}")]
    Llm(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn config_error_display() {
        let e = AppError::Config("missing field".into());
        assert!(e.to_string().contains("config error"));
        assert!(e.to_string().contains("missing field"));
    }

    #[test]
    fn validation_error_display() {
        let e = AppError::Validation("query must not be empty".into());
        assert!(e.to_string().starts_with("validation error"));
    }

    #[test]
    fn extraction_error_display() {
        let e = AppError::Extraction("not utf-8".into());
        assert!(e.to_string().contains("not utf-8"));
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let e: AppError = io_err.into();
        assert!(e.to_string().contains("io error"));
        let _: &dyn Error = &e;
    }
}
