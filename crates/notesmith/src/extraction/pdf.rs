//! PDF text extraction using `lopdf`.
//!
//! Pages are read in page order and joined with [`PAGE_SEPARATOR`]. Pages whose
//! content stream cannot be decoded are skipped; a document with no text on any
//! page is rejected as empty. No OCR is attempted.

use crate::Result;

/// Separator inserted between the text of consecutive pages.
pub const PAGE_SEPARATOR: &str = "\n\n";

#[cfg(feature = "pdf")]
pub fn extract_pdf_text(bytes: &[u8], filename: &str) -> Result<String> {
    use crate::error::ExtractionError;
    use crate::types::{DocumentFormat, MediaKind};

    let malformed = |reason: String| ExtractionError::Malformed {
        filename: filename.to_string(),
        byte_len: bytes.len(),
        reason,
    };
    let empty = || ExtractionError::Empty {
        filename: filename.to_string(),
        byte_len: bytes.len(),
        kind: MediaKind::Document(DocumentFormat::Pdf),
    };

    let document = lopdf::Document::load_mem(bytes).map_err(|e| malformed(format!("failed to parse PDF: {}", e)))?;

    if document.is_encrypted() {
        return Err(malformed("PDF is password-protected".to_string()).into());
    }

    let pages = document.get_pages();
    if pages.is_empty() {
        return Err(malformed("PDF has no pages".to_string()).into());
    }

    let mut page_texts = Vec::with_capacity(pages.len());

    for page_number in pages.keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    page_texts.push(text.to_string());
                }
            }
            Err(e) => {
                tracing::warn!(filename, page = page_number, error = %e, "Skipping PDF page without decodable text");
            }
        }
    }

    tracing::debug!(
        filename,
        page_count = pages.len(),
        text_pages = page_texts.len(),
        "Extracted PDF text"
    );

    if page_texts.is_empty() {
        return Err(empty().into());
    }

    Ok(page_texts.join(PAGE_SEPARATOR))
}

#[cfg(not(feature = "pdf"))]
pub fn extract_pdf_text(_bytes: &[u8], filename: &str) -> Result<String> {
    Err(crate::NotesmithError::MissingDependency(format!(
        "PDF support is not enabled (build with the `pdf` feature) to extract '{}'",
        filename
    )))
}
