//! Text Extractor: turns an uploaded document into plain text.
//!
//! Pages are joined with a single `\n` in page order. Pages that yield no text
//! are skipped without a placeholder, so an image-only PDF extracts to `""`
//! rather than failing.

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::errors::AppError;

/// Logical role of an uploaded document. Only used for logging and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentRole {
    Resume,
    JobDescription,
}

impl DocumentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentRole::Resume => "resume",
            DocumentRole::JobDescription => "job_description",
        }
    }
}

/// An uploaded document. Lives for one request only.
#[derive(Debug, Clone)]
pub struct Document {
    pub role: DocumentRole,
    pub bytes: Bytes,
}

impl Document {
    pub fn new(role: DocumentRole, bytes: Bytes) -> Self {
        Self { role, bytes }
    }
}

/// Splits a paginated document into per-page text.
///
/// Blocking: implementations may do CPU-heavy decoding. `TextExtractor` runs
/// them on the blocking pool.
pub trait PageSource: Send + Sync {
    fn pages(&self, bytes: &[u8]) -> Result<Vec<String>, String>;
}

/// `pdf-extract` backed page source.
pub struct PdfPageSource;

impl PageSource for PdfPageSource {
    fn pages(&self, bytes: &[u8]) -> Result<Vec<String>, String> {
        pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| e.to_string())
    }
}

/// Converts documents to `ExtractedText`, off the async runtime.
#[derive(Clone)]
pub struct TextExtractor {
    source: Arc<dyn PageSource>,
}

impl TextExtractor {
    pub fn new(source: Arc<dyn PageSource>) -> Self {
        Self { source }
    }

    pub fn pdf() -> Self {
        Self::new(Arc::new(PdfPageSource))
    }

    /// Extracts the document's text. Decode failures (and panics inside the PDF
    /// library) become `AppError::DocumentParse`; nothing is retried.
    pub async fn extract(&self, document: Document) -> Result<String, AppError> {
        let role = document.role;
        let source = Arc::clone(&self.source);

        let pages = tokio::task::spawn_blocking(move || source.pages(&document.bytes))
            .await
            .map_err(|e| {
                AppError::DocumentParse(format!("{} decoder crashed: {e}", role.as_str()))
            })?
            .map_err(|e| AppError::DocumentParse(format!("{}: {e}", role.as_str())))?;

        let page_count = pages.len();
        let text = join_pages(pages);
        debug!(
            role = role.as_str(),
            pages = page_count,
            chars = text.len(),
            "Extracted document text"
        );
        Ok(text)
    }
}

/// Joins pages with `\n`, skipping pages with no extractable text.
pub fn join_pages(pages: Vec<String>) -> String {
    pages
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Test double: treats the bytes as UTF-8 with form feeds (`\x0c`) as page breaks.
#[cfg(test)]
pub struct FormFeedPageSource;

#[cfg(test)]
impl PageSource for FormFeedPageSource {
    fn pages(&self, bytes: &[u8]) -> Result<Vec<String>, String> {
        let text = std::str::from_utf8(bytes).map_err(|e| format!("not a document: {e}"))?;
        Ok(text.split('\x0c').map(String::from).collect())
    }
}
