//! Text extraction from PDF documents.

use lopdf::Document;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to parse PDF: {0}")]
    Parse(#[from] lopdf::Error),
}

/// Extract the text of each page, in page order.
///
/// Pages whose text cannot be decoded are skipped with a warning; a document
/// that cannot be parsed at all is an error.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, PdfError> {
    let document = Document::load_mem(bytes)?;
    let mut pages = Vec::new();

    for page_number in document.get_pages().keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) => pages.push(text.trim().to_string()),
            Err(e) => tracing::warn!(page = page_number, "Failed to extract page text: {}", e),
        }
    }

    Ok(pages)
}

/// Join page texts with blank lines, dropping empty pages.
pub fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
