//! Text Extractor — turns an uploaded PDF résumé into plain text.
//!
//! Pages are read in document order. A page that fails to yield text contributes an
//! empty fragment; only a document that cannot be parsed at all is an error.

use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to read PDF: {0}")]
    Unreadable(String),
}

/// Plain résumé text: page fragments joined by newlines, surrounding whitespace trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeText(String);

impl ResumeText {
    /// Joins per-page extraction results. Failed pages become empty fragments.
    pub fn from_pages<I, E>(pages: I) -> Self
    where
        I: IntoIterator<Item = Result<String, E>>,
        E: fmt::Display,
    {
        let fragments: Vec<String> = pages
            .into_iter()
            .enumerate()
            .map(|(index, page)| {
                page.unwrap_or_else(|e| {
                    warn!("No text extracted from page {}: {e}", index + 1);
                    String::new()
                })
            })
            .collect();

        ResumeText(fragments.join("\n").trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

/// True when the bytes carry the PDF header. Other formats are rejected at upload.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

/// Extracts résumé text from PDF bytes.
///
/// CPU-bound; call from `tokio::task::spawn_blocking` inside async handlers.
pub fn extract_resume_text(bytes: &[u8]) -> Result<ResumeText, ExtractionError> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| ExtractionError::Unreadable(e.to_string()))?;

    // BTreeMap keys: page numbers in document order
    let pages = doc.get_pages();
    let page_count = pages.len();

    let text = ResumeText::from_pages(pages.keys().map(|page_num| doc.extract_text(&[*page_num])));

    debug!(
        "Extracted {} chars from {} pages",
        text.char_count(),
        page_count
    );

    Ok(text)
}
