// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Binary→text normalization ahead of chunking.
//!
//! Text-like content is decoded directly (UTF-8 with lossy fallback).
//! Office formats are normalized through the external Gotenberg conversion
//! service, which returns a PDF; content we cannot turn into text yields a
//! small searchable stub so name/type search still finds the file.

use reqwest::multipart;
use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::warn;

use crate::error::ExtractionError;

const MAX_TEXT_BYTES: usize = 2 * 1024 * 1024;
const CONVERSION_TIMEOUT: Duration = Duration::from_secs(60);

fn extractable_mimes() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| {
        HashSet::from([
            "text/plain",
            "text/markdown",
            "text/html",
            "text/css",
            "text/csv",
            "text/xml",
            "text/x-python",
            "text/x-rust",
            "text/x-go",
            "text/javascript",
            "application/json",
            "application/xml",
            "application/yaml",
            "application/x-yaml",
            "application/toml",
            "application/javascript",
            "application/typescript",
            "application/x-sh",
            "application/sql",
            "application/pdf",
            "application/msword",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "application/vnd.ms-excel",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "application/vnd.ms-powerpoint",
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            "application/vnd.oasis.opendocument.text",
        ])
    })
}

const TEXT_EXTENSIONS: &[&str] = &[
    ".txt", ".md", ".markdown", ".rst", ".py", ".js", ".ts", ".jsx", ".tsx", ".go", ".rs",
    ".java", ".c", ".h", ".cpp", ".hpp", ".cs", ".rb", ".php", ".swift", ".kt", ".scala",
    ".sh", ".bash", ".zsh", ".sql", ".html", ".htm", ".css", ".scss", ".yaml", ".yml",
    ".json", ".toml", ".xml", ".ini", ".cfg", ".conf", ".env", ".tf", ".proto", ".graphql",
];

const TEXT_FILENAMES: &[&str] = &[
    "dockerfile", "makefile", "rakefile", "gemfile", "procfile", "license", "readme",
    "changelog", "authors", "contributing", ".gitignore", ".dockerignore", ".editorconfig",
];

const OFFICE_MIMES: &[&str] = &[
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.oasis.opendocument.text",
];

/// Normalizes stored bytes into indexable text.
pub struct ContentExtractor {
    client: reqwest::Client,
    gotenberg_url: String,
}

impl ContentExtractor {
    pub fn new(gotenberg_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(CONVERSION_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            gotenberg_url: gotenberg_url.into(),
        }
    }

    /// Whether any extraction strategy applies to this file.
    pub fn can_extract(&self, mime_type: &str, file_name: &str) -> bool {
        if mime_type.starts_with("text/") || extractable_mimes().contains(mime_type) {
            return true;
        }
        is_text_by_name(file_name)
    }

    /// Extract text for indexing. Binary formats that cannot be converted
    /// produce a searchable stub instead of failing — indexing should not
    /// lose the file entirely just because its body is opaque.
    pub async fn extract_text(
        &self,
        content: &[u8],
        mime_type: &str,
        file_name: &str,
        size_bytes: u64,
    ) -> Result<String, ExtractionError> {
        if mime_type.starts_with("text/") || is_text_mime(mime_type) || is_text_by_name(file_name) {
            return Ok(truncate_text(decode_text(content)));
        }

        if OFFICE_MIMES.contains(&mime_type) {
            // Normalizing to PDF validates the document is convertible; the
            // conversion service does not return plain text, so indexing
            // falls through to the stub below.
            if let Err(e) = self.convert_to_pdf(content, file_name).await {
                warn!(file_name, error = %e, "office conversion failed");
            }
        }

        if self.can_extract(mime_type, file_name) || mime_type == "application/pdf" {
            return Ok(searchable_stub(file_name, mime_type, size_bytes));
        }

        Err(ExtractionError::Unsupported(mime_type.to_string()))
    }

    /// Convert a document to PDF via the Gotenberg LibreOffice route.
    pub async fn convert_to_pdf(
        &self,
        content: &[u8],
        file_name: &str,
    ) -> Result<Vec<u8>, ExtractionError> {
        let part = multipart::Part::bytes(content.to_vec()).file_name(file_name.to_string());
        let form = multipart::Form::new().part("files", part);

        let url = format!(
            "{}/forms/libreoffice/convert",
            self.gotenberg_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ExtractionError::Conversion(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ExtractionError::Conversion(format!(
                "conversion service returned HTTP {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ExtractionError::Conversion(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

fn is_text_mime(mime_type: &str) -> bool {
    extractable_mimes().contains(mime_type)
        && !OFFICE_MIMES.contains(&mime_type)
        && mime_type != "application/pdf"
}

fn is_text_by_name(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    if TEXT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return true;
    }
    let base = lower.rsplit('/').next().unwrap_or(&lower);
    TEXT_FILENAMES.iter().any(|name| base == *name || base.starts_with(&format!("{name}.")))
}

fn decode_text(content: &[u8]) -> String {
    match std::str::from_utf8(content) {
        Ok(s) => s.to_string(),
        Err(_) => String::from_utf8_lossy(content).into_owned(),
    }
}

fn truncate_text(text: String) -> String {
    if text.len() <= MAX_TEXT_BYTES {
        return text;
    }
    let mut end = MAX_TEXT_BYTES;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

/// Minimal text for files whose body cannot be indexed: enough to make the
/// file findable by name, type, and size.
fn searchable_stub(file_name: &str, mime_type: &str, size_bytes: u64) -> String {
    format!(
        "{file_name}\n{} ({mime_type}), {size_bytes} bytes",
        type_description(mime_type)
    )
}

fn type_description(mime_type: &str) -> &'static str {
    match mime_type {
        "application/pdf" => "PDF document",
        "application/msword"
        | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
            "Word document"
        }
        "application/vnd.ms-excel"
        | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => "Spreadsheet",
        "application/vnd.ms-powerpoint"
        | "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
            "Presentation"
        }
        "application/vnd.oasis.opendocument.text" => "OpenDocument text",
        _ => "Document",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> ContentExtractor {
        ContentExtractor::new("http://localhost:3000")
    }

    #[test]
    fn text_mimes_are_extractable() {
        let e = extractor();
        assert!(e.can_extract("text/plain", "notes.txt"));
        assert!(e.can_extract("application/json", "data.json"));
        assert!(e.can_extract("application/pdf", "doc.pdf"));
    }

    #[test]
    fn filename_allowlist_covers_extensionless_files() {
        let e = extractor();
        assert!(e.can_extract("application/octet-stream", "Dockerfile"));
        assert!(e.can_extract("application/octet-stream", "Makefile"));
        assert!(e.can_extract("application/octet-stream", "src/LICENSE"));
        assert!(!e.can_extract("application/octet-stream", "binary.bin"));
    }

    #[tokio::test]
    async fn utf8_text_round_trips() {
        let text = extractor()
            .extract_text("héllo wörld".as_bytes(), "text/plain", "greeting.txt", 12)
            .await
            .unwrap();
        assert_eq!(text, "héllo wörld");
    }

    #[tokio::test]
    async fn invalid_utf8_is_decoded_lossily() {
        let bytes = vec![b'o', b'k', 0xFF, 0xFE, b'!'];
        let text = extractor()
            .extract_text(&bytes, "text/plain", "weird.txt", 5)
            .await
            .unwrap();
        assert!(text.starts_with("ok"));
        assert!(text.ends_with('!'));
    }

    #[tokio::test]
    async fn pdf_yields_searchable_stub() {
        let text = extractor()
            .extract_text(b"%PDF-1.7 ...", "application/pdf", "report.pdf", 1234)
            .await
            .unwrap();
        assert!(text.contains("report.pdf"));
        assert!(text.contains("PDF document"));
        assert!(text.contains("1234 bytes"));
    }

    #[tokio::test]
    async fn unknown_binary_is_rejected() {
        let result = extractor()
            .extract_text(&[0u8; 16], "application/octet-stream", "blob.bin", 16)
            .await;
        assert!(matches!(result, Err(ExtractionError::Unsupported(_))));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "é".repeat(MAX_TEXT_BYTES);
        let truncated = truncate_text(text);
        assert!(truncated.len() <= MAX_TEXT_BYTES);
        assert!(std::str::from_utf8(truncated.as_bytes()).is_ok());
    }
}
