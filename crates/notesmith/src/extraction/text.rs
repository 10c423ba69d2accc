//! Plain text decoding.
//!
//! TXT uploads must be valid UTF-8. A leading byte-order mark is dropped and
//! Windows line endings are folded to `\n`.

use crate::error::ExtractionError;
use crate::types::{DocumentFormat, MediaKind};
use crate::Result;

const UTF8_BOM: &str = "\u{feff}";

/// Decode TXT bytes into trimmed text.
///
/// # Errors
///
/// - `ExtractionError::Encoding` when the bytes are not valid UTF-8
/// - `ExtractionError::Empty` when nothing but whitespace remains
pub fn decode_text(bytes: &[u8], filename: &str) -> Result<String> {
    let text = from_utf8(bytes).map_err(|valid_up_to| ExtractionError::Encoding {
        filename: filename.to_string(),
        byte_len: bytes.len(),
        valid_up_to,
    })?;

    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return Err(ExtractionError::Empty {
            filename: filename.to_string(),
            byte_len: bytes.len(),
            kind: MediaKind::Document(DocumentFormat::Txt),
        }
        .into());
    }

    if trimmed.contains('\r') {
        Ok(trimmed.replace("\r\n", "\n"))
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(feature = "simd-utf8")]
fn from_utf8(bytes: &[u8]) -> std::result::Result<&str, usize> {
    simdutf8::compat::from_utf8(bytes).map_err(|e| e.valid_up_to())
}

#[cfg(not(feature = "simd-utf8"))]
fn from_utf8(bytes: &[u8]) -> std::result::Result<&str, usize> {
    std::str::from_utf8(bytes).map_err(|e| e.valid_up_to())
}
