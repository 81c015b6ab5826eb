//! Plain-text extraction for uploads.
//!
//! Only formats that already are text are accepted. Binary formats (PDF,
//! DOCX, images) are decoded elsewhere and arrive here as text.

use std::path::Path;

use crate::error::AppError;

const TEXT_EXTENSIONS: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("markdown", "text/markdown"),
    ("csv", "text/csv"),
    ("log", "text/plain"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("yaml", "application/x-yaml"),
    ("yml", "application/x-yaml"),
    ("html", "text/html"),
];

const TEXT_APPLICATION_TYPES: &[&str] = &[
    "application/json",
    "application/xml",
    "application/x-yaml",
    "application/yaml",
];

/// Best mime type for `filename` when the caller sent none (or a generic one).
pub fn resolve_mime(filename: &str, mime: &str) -> String {
    let mime = mime.trim().to_ascii_lowercase();
    if !mime.is_empty() && mime != "application/octet-stream" {
        return mime;
    }
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .and_then(|ext| {
            TEXT_EXTENSIONS
                .iter()
                .find(|(e, _)| *e == ext)
                .map(|(_, m)| (*m).to_string())
        })
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

fn is_text_mime(mime: &str) -> bool {
    let base = mime.split(';').next().unwrap_or(mime).trim();
    base.starts_with("text/") || TEXT_APPLICATION_TYPES.contains(&base)
}

/// Decode `bytes` as text. Returns the text and the resolved mime type.
pub fn extract_text(bytes: &[u8], filename: &str, mime: &str) -> Result<(String, String), AppError> {
    let resolved = resolve_mime(filename, mime);
    if !is_text_mime(&resolved) {
        return Err(AppError::Extraction(format!(
            "unsupported file type '{resolved}' for '{filename}'"
        )));
    }
    let text = std::str::from_utf8(bytes)
        .map_err(|e| AppError::Extraction(format!("'{filename}' is not valid UTF-8: {e}")))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    Ok((text.to_string(), resolved))
}
