use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("failed to open PDF: {0}")]
    Open(String),
    #[error("failed to extract text: {0}")]
    Extract(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One page of extracted text. Page numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

/// Trait for PDF text extraction backends.
///
/// Implementors provide the low-level text extraction step only; term
/// matching, resolution and relationship analysis operate on the returned
/// page blocks and live in this crate.
pub trait TextExtractor: Send + Sync {
    /// Extract the text of a PDF as an ordered sequence of pages.
    ///
    /// The sequence must cover every page of the document in reading
    /// order, with 1-based page numbers. Extraction is assumed lossless
    /// with respect to visible text.
    fn extract(&self, path: &Path) -> Result<Vec<PageText>, ExtractionError>;
}
