// PDF text extraction used by the interaction controller.
// Keep this module small and dependency-light.

use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("not a readable PDF document: {0}")]
    InvalidDocument(String),

    #[error("PDF parser aborted on malformed input")]
    Panicked,
}

/// Turns raw document bytes into document text.
pub trait TextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// Extractor backed by the `pdf-extract` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        extract_text_from_pdf_mem(bytes)
    }
}

/// Extracts text from a PDF stored fully in memory.
///
/// Each page's fragments are joined with a single space and pages are joined
/// with `\n` in page order, so an N-page document yields N lines.
/// `pdf-extract` may panic on malformed input; that is reported as an error and
/// no partial text is returned.
pub fn extract_text_from_pdf_mem(bytes: &[u8]) -> Result<String, ExtractionError> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }));

    let pages = match result {
        Ok(Ok(pages)) => pages,
        Ok(Err(e)) => {
            error!("Error extracting text from PDF: {}", e);
            return Err(ExtractionError::InvalidDocument(e.to_string()));
        }
        Err(_) => {
            error!("PDF extraction panicked");
            return Err(ExtractionError::Panicked);
        }
    };

    debug!("Extracted {} page(s) from PDF", pages.len());

    Ok(join_pages(pages.iter().map(String::as_str)))
}

/// Joins page texts: fragments within a page by one space, pages by newline.
pub fn join_pages<'a>(pages: impl IntoIterator<Item = &'a str>) -> String {
    pages
        .into_iter()
        .map(|page| page.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Readers accept a `%PDF-` header anywhere in the first KiB, after junk
/// such as a mail or HTTP preamble.
const HEADER_SEARCH_LIMIT: usize = 1024;

/// Whether `bytes` carries a PDF header, for files whose type is unknown.
pub fn has_pdf_header(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(HEADER_SEARCH_LIMIT)];
    head.windows(5).any(|w| w == b"%PDF-")
}
