//! Upload classification.
//!
//! Maps an upload's filename (and, for extensionless files, its declared MIME type
//! or magic bytes) onto a [`MediaKind`], then enforces the size limit for the
//! matched category. Classification never touches the filesystem.

use crate::core::config::SizeLimits;
use crate::error::ClassificationError;
use crate::types::{DocumentFormat, MediaKind, StructuredFormat, UploadArtifact, VideoContainer};
use crate::Result;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;

pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const PLAIN_TEXT_MIME_TYPE: &str = "text/plain";
pub const JSON_MIME_TYPE: &str = "application/json";

/// Allow-list of extensions, keyed lowercase without the dot.
static EXT_TO_KIND: Lazy<HashMap<&'static str, MediaKind>> = Lazy::new(|| {
    let mut m = HashMap::new();

    m.insert("pdf", MediaKind::Document(DocumentFormat::Pdf));
    m.insert("txt", MediaKind::Document(DocumentFormat::Txt));

    m.insert("json", MediaKind::Structured(StructuredFormat::Json));

    for container in VideoContainer::ALL {
        m.insert(container.extension(), MediaKind::Video(container));
    }

    m
});

/// MIME types accepted for extensionless uploads, including common aliases.
static MIME_TO_KIND: Lazy<HashMap<&'static str, MediaKind>> = Lazy::new(|| {
    let mut m = HashMap::new();

    m.insert(PDF_MIME_TYPE, MediaKind::Document(DocumentFormat::Pdf));
    m.insert("application/x-pdf", MediaKind::Document(DocumentFormat::Pdf));
    m.insert(PLAIN_TEXT_MIME_TYPE, MediaKind::Document(DocumentFormat::Txt));

    m.insert(JSON_MIME_TYPE, MediaKind::Structured(StructuredFormat::Json));
    m.insert("text/json", MediaKind::Structured(StructuredFormat::Json));

    for container in VideoContainer::ALL {
        m.insert(container.mime_type(), MediaKind::Video(container));
    }
    m.insert("video/avi", MediaKind::Video(VideoContainer::Avi));
    m.insert("video/msvideo", MediaKind::Video(VideoContainer::Avi));
    m.insert("video/x-ms-asf", MediaKind::Video(VideoContainer::Wmv));

    m
});

/// Look up an extension (with or without the leading dot) in the allow-list.
pub fn kind_for_extension(extension: &str) -> Option<MediaKind> {
    let normalized = extension.trim_start_matches('.').to_ascii_lowercase();
    EXT_TO_KIND.get(normalized.as_str()).copied()
}

/// Look up a MIME type, ignoring parameters such as `; charset=utf-8`.
pub fn kind_for_mime(mime_type: &str) -> Option<MediaKind> {
    let essence = mime_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    MIME_TO_KIND.get(essence.as_str()).copied()
}

/// All accepted extensions, sorted.
pub fn supported_extensions() -> Vec<&'static str> {
    let mut extensions: Vec<_> = EXT_TO_KIND.keys().copied().collect();
    extensions.sort_unstable();
    extensions
}

/// Classify an upload by filename and declared size.
///
/// # Errors
///
/// - `ClassificationError::UnsupportedType` if the extension is missing or not allowed
/// - `ClassificationError::TooLarge` if `declared_size` exceeds the category limit
pub fn classify(filename: &str, declared_size: u64, limits: &SizeLimits) -> Result<MediaKind> {
    classify_with_mime(filename, None, declared_size, limits)
}

/// Classify by filename, falling back to the declared MIME type when the filename
/// has no extension.
///
/// An extension always wins over the declared MIME type.
pub fn classify_with_mime(
    filename: &str,
    declared_mime: Option<&str>,
    declared_size: u64,
    limits: &SizeLimits,
) -> Result<MediaKind> {
    let kind = resolve_kind(filename, declared_mime, None)?;
    enforce_limit(filename, kind, declared_size, limits)?;
    Ok(kind)
}

/// Classify a full upload.
///
/// Extensionless uploads are resolved through the declared MIME type and then
/// through magic-byte sniffing. The size check uses
/// [`UploadArtifact::effective_size`].
pub fn classify_artifact(artifact: &UploadArtifact, limits: &SizeLimits) -> Result<MediaKind> {
    let kind = resolve_kind(
        &artifact.filename,
        artifact.declared_mime.as_deref(),
        Some(&artifact.bytes),
    )?;
    enforce_limit(&artifact.filename, kind, artifact.effective_size(), limits)?;
    Ok(kind)
}

fn resolve_kind(filename: &str, declared_mime: Option<&str>, bytes: Option<&[u8]>) -> Result<MediaKind> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    if let Some(ext) = extension {
        return kind_for_extension(&ext).ok_or_else(|| {
            ClassificationError::UnsupportedType {
                filename: filename.to_string(),
                extension: ext,
            }
            .into()
        });
    }

    if let Some(kind) = declared_mime.and_then(kind_for_mime) {
        tracing::debug!(filename, mime = declared_mime, %kind, "Classified extensionless upload by declared MIME type");
        return Ok(kind);
    }

    if let Some(kind) = bytes.and_then(sniff_kind) {
        tracing::debug!(filename, %kind, "Classified extensionless upload by content");
        return Ok(kind);
    }

    Err(ClassificationError::UnsupportedType {
        filename: filename.to_string(),
        extension: declared_mime.unwrap_or("").to_string(),
    }
    .into())
}

fn enforce_limit(filename: &str, kind: MediaKind, size: u64, limits: &SizeLimits) -> Result<()> {
    let category = kind.category();
    let limit = limits.limit_for(category);
    if size > limit {
        return Err(ClassificationError::TooLarge {
            filename: filename.to_string(),
            size,
            limit,
            category,
        }
        .into());
    }
    Ok(())
}

/// Detect the kind of an upload from its content.
///
/// Binary formats are recognized by their magic bytes. Text that parses as a JSON
/// object or array is structured, any other valid UTF-8 is plain text.
pub fn sniff_kind(bytes: &[u8]) -> Option<MediaKind> {
    if bytes.is_empty() {
        return None;
    }

    if let Some(detected) = infer::get(bytes) {
        return kind_for_mime(detected.mime_type());
    }

    let text = std::str::from_utf8(bytes).ok()?;
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde::de::IgnoredAny>(trimmed).is_ok()
    {
        return Some(MediaKind::Structured(StructuredFormat::Json));
    }

    Some(MediaKind::Document(DocumentFormat::Txt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NotesmithError;
    use crate::types::MediaCategory;

    fn limits() -> SizeLimits {
        SizeLimits::default()
    }

    #[test]
    fn test_classify_supported_extensions() {
        let cases = [
            ("notes.pdf", MediaKind::Document(DocumentFormat::Pdf)),
            ("notes.txt", MediaKind::Document(DocumentFormat::Txt)),
            ("changes.json", MediaKind::Structured(StructuredFormat::Json)),
            ("demo.mp4", MediaKind::Video(VideoContainer::Mp4)),
            ("demo.mpeg", MediaKind::Video(VideoContainer::Mpeg)),
            ("demo.m4v", MediaKind::Video(VideoContainer::M4v)),
            ("demo.mov", MediaKind::Video(VideoContainer::Mov)),
            ("demo.avi", MediaKind::Video(VideoContainer::Avi)),
            ("demo.wmv", MediaKind::Video(VideoContainer::Wmv)),
        ];

        for (filename, expected) in cases {
            assert_eq!(classify(filename, 1, &limits()).unwrap(), expected, "{}", filename);
        }
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(
            classify("REPORT.PDF", 1, &limits()).unwrap(),
            MediaKind::Document(DocumentFormat::Pdf)
        );
        assert_eq!(
            classify("Clip.MoV", 1, &limits()).unwrap(),
            MediaKind::Video(VideoContainer::Mov)
        );
    }

    #[test]
    fn test_classify_rejects_unsupported() {
        for filename in ["slides.pptx", "image.png", "archive.tar.gz", "song.mp3", "notes.md", "README"] {
            let result = classify(filename, 1, &limits());
            assert!(
                matches!(
                    result,
                    Err(NotesmithError::Classification(ClassificationError::UnsupportedType { .. }))
                ),
                "{} should be rejected",
                filename
            );
        }
    }

    #[test]
    fn test_classify_size_boundaries() {
        let limits = limits();
        assert!(classify("a.txt", limits.document_bytes, &limits).is_ok());

        let err = classify("a.txt", limits.document_bytes + 1, &limits).unwrap_err();
        match err {
            NotesmithError::Classification(ClassificationError::TooLarge {
                size, limit, category, ..
            }) => {
                assert_eq!(size, limits.document_bytes + 1);
                assert_eq!(limit, limits.document_bytes);
                assert_eq!(category, MediaCategory::Document);
            }
            other => panic!("expected TooLarge, got {:?}", other),
        }

        assert!(classify("a.mp4", 50 * 1024 * 1024, &limits).is_ok());
        assert!(classify("a.json", 50 * 1024 * 1024, &limits).is_err());
    }

    #[test]
    fn test_extension_wins_over_declared_mime() {
        let kind = classify_with_mime("notes.txt", Some("application/pdf"), 1, &limits()).unwrap();
        assert_eq!(kind, MediaKind::Document(DocumentFormat::Txt));
    }

    #[test]
    fn test_declared_mime_for_extensionless_file() {
        let kind = classify_with_mime("upload", Some("application/json; charset=utf-8"), 1, &limits()).unwrap();
        assert_eq!(kind, MediaKind::Structured(StructuredFormat::Json));

        let kind = classify_with_mime("upload", Some("video/quicktime"), 1, &limits()).unwrap();
        assert_eq!(kind, MediaKind::Video(VideoContainer::Mov));

        assert!(classify_with_mime("upload", Some("image/png"), 1, &limits()).is_err());
    }

    #[test]
    fn test_classify_artifact_sniffs_content() {
        let pdf = UploadArtifact::new("upload", b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n".to_vec());
        assert_eq!(
            classify_artifact(&pdf, &limits()).unwrap(),
            MediaKind::Document(DocumentFormat::Pdf)
        );

        let json = UploadArtifact::new("upload", br#"  {"changes": ["a"]}"#.to_vec());
        assert_eq!(
            classify_artifact(&json, &limits()).unwrap(),
            MediaKind::Structured(StructuredFormat::Json)
        );

        let text = UploadArtifact::new("upload", b"Fixed the login page".to_vec());
        assert_eq!(
            classify_artifact(&text, &limits()).unwrap(),
            MediaKind::Document(DocumentFormat::Txt)
        );

        let png = UploadArtifact::new("upload", vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0]);
        assert!(classify_artifact(&png, &limits()).is_err());
    }

    #[test]
    fn test_classify_artifact_uses_effective_size() {
        let limits = SizeLimits {
            document_bytes: 4,
            ..SizeLimits::default()
        };
        let artifact = UploadArtifact::new("a.txt", b"too long".to_vec()).with_declared_size(1);
        assert!(matches!(
            classify_artifact(&artifact, &limits),
            Err(NotesmithError::Classification(ClassificationError::TooLarge { size: 8, .. }))
        ));
    }

    #[test]
    fn test_supported_extensions_list() {
        assert_eq!(
            supported_extensions(),
            vec!["avi", "json", "m4v", "mov", "mp4", "mpeg", "pdf", "txt", "wmv"]
        );
        assert!(kind_for_extension(".JSON").is_some());
    }
}
