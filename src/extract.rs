//! Byte-to-text document parsing.
//!
//! Parsing is a collaborator, not core logic: the ingestion pipeline only
//! needs `bytes -> text`. The production implementation wraps `pdf-extract`;
//! tests inject their own [`DocumentParser`].

use thiserror::Error;

/// The parser could not produce text from the supplied bytes.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ParseError(String);

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Extracts plain UTF-8 text from a document's raw bytes.
pub trait DocumentParser: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<String, ParseError>;
}

/// PDF text extraction backed by `pdf-extract`.
pub struct PdfParser;

impl DocumentParser for PdfParser {
    fn parse(&self, bytes: &[u8]) -> Result<String, ParseError> {
        pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ParseError::new(format!("PDF extraction failed: {e}")))
    }
}
