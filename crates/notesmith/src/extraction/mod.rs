//! Text extraction for document and structured uploads.

pub mod pdf;
pub mod structured;
pub mod text;

pub use pdf::{PAGE_SEPARATOR, extract_pdf_text};
pub use structured::extract_json;
pub use text::decode_text;

use crate::Result;
use crate::types::DocumentFormat;

/// Extract plain text from a PDF or TXT upload.
///
/// The returned text is trimmed and never empty.
pub fn extract_document(bytes: &[u8], format: DocumentFormat, filename: &str) -> Result<String> {
    match format {
        DocumentFormat::Pdf => extract_pdf_text(bytes, filename),
        DocumentFormat::Txt => decode_text(bytes, filename),
    }
}
