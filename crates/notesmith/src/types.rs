//! Core data model: uploads, media kinds, transcripts and normalized output.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::NotesmithError;

/// Size-limit category an upload falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaCategory {
    Document,
    Structured,
    Video,
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaCategory::Document => "document",
            MediaCategory::Structured => "structured",
            MediaCategory::Video => "video",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    Txt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuredFormat {
    Json,
}

/// Video containers accepted for transcription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoContainer {
    Mp4,
    Mpeg,
    M4v,
    Mov,
    Avi,
    Wmv,
}

impl VideoContainer {
    pub const ALL: [VideoContainer; 6] = [
        VideoContainer::Mp4,
        VideoContainer::Mpeg,
        VideoContainer::M4v,
        VideoContainer::Mov,
        VideoContainer::Avi,
        VideoContainer::Wmv,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            VideoContainer::Mp4 => "mp4",
            VideoContainer::Mpeg => "mpeg",
            VideoContainer::M4v => "m4v",
            VideoContainer::Mov => "mov",
            VideoContainer::Avi => "avi",
            VideoContainer::Wmv => "wmv",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            VideoContainer::Mp4 => "video/mp4",
            VideoContainer::Mpeg => "video/mpeg",
            VideoContainer::M4v => "video/x-m4v",
            VideoContainer::Mov => "video/quicktime",
            VideoContainer::Avi => "video/x-msvideo",
            VideoContainer::Wmv => "video/x-ms-wmv",
        }
    }
}

/// Modality of an uploaded artifact. Exactly one is assigned per upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "category", content = "format", rename_all = "snake_case")]
pub enum MediaKind {
    Document(DocumentFormat),
    Structured(StructuredFormat),
    Video(VideoContainer),
}

impl MediaKind {
    pub fn category(&self) -> MediaCategory {
        match self {
            MediaKind::Document(_) => MediaCategory::Document,
            MediaKind::Structured(_) => MediaCategory::Structured,
            MediaKind::Video(_) => MediaCategory::Video,
        }
    }

    /// Canonical file extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Document(DocumentFormat::Pdf) => "pdf",
            MediaKind::Document(DocumentFormat::Txt) => "txt",
            MediaKind::Structured(StructuredFormat::Json) => "json",
            MediaKind::Video(container) => container.extension(),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            MediaKind::Document(DocumentFormat::Pdf) => "application/pdf",
            MediaKind::Document(DocumentFormat::Txt) => "text/plain",
            MediaKind::Structured(StructuredFormat::Json) => "application/json",
            MediaKind::Video(container) => container.mime_type(),
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, MediaKind::Video(_))
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category(), self.extension())
    }
}

/// An uploaded file as delivered by the upload endpoint.
///
/// Owned by the request that created it and dropped once normalization
/// completes or fails.
#[derive(Debug, Clone)]
pub struct UploadArtifact {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub declared_mime: Option<String>,
    pub declared_size: u64,
}

impl UploadArtifact {
    /// Create an artifact whose declared size is the buffer length.
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let declared_size = bytes.len() as u64;
        Self {
            bytes,
            filename: filename.into(),
            declared_mime: None,
            declared_size,
        }
    }

    pub fn with_declared_mime(mut self, mime: impl Into<String>) -> Self {
        self.declared_mime = Some(mime.into());
        self
    }

    /// Override the declared size, e.g. with a `Content-Length` reported by the client.
    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.declared_size = size;
        self
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// The larger of the declared size and the actual buffer length.
    ///
    /// Size limits are checked against this so an understated declaration
    /// cannot slip an oversized buffer past the classifier.
    pub fn effective_size(&self) -> u64 {
        self.declared_size.max(self.bytes.len() as u64)
    }
}

/// The fixed set of natural languages the pipeline resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LanguageCode {
    #[default]
    En,
    Fr,
    De,
    Es,
    It,
    Pt,
    Nl,
    Pl,
}

/// Supported language codes, in display order.
pub const SUPPORTED_LANGUAGES: [LanguageCode; 8] = [
    LanguageCode::En,
    LanguageCode::Fr,
    LanguageCode::De,
    LanguageCode::Es,
    LanguageCode::It,
    LanguageCode::Pt,
    LanguageCode::Nl,
    LanguageCode::Pl,
];

impl LanguageCode {
    /// ISO 639-1 code.
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageCode::En => "en",
            LanguageCode::Fr => "fr",
            LanguageCode::De => "de",
            LanguageCode::Es => "es",
            LanguageCode::It => "it",
            LanguageCode::Pt => "pt",
            LanguageCode::Nl => "nl",
            LanguageCode::Pl => "pl",
        }
    }

    /// ISO 639-3 code.
    pub fn iso639_3(&self) -> &'static str {
        match self {
            LanguageCode::En => "eng",
            LanguageCode::Fr => "fra",
            LanguageCode::De => "deu",
            LanguageCode::Es => "spa",
            LanguageCode::It => "ita",
            LanguageCode::Pt => "por",
            LanguageCode::Nl => "nld",
            LanguageCode::Pl => "pol",
        }
    }

    pub fn english_name(&self) -> &'static str {
        match self {
            LanguageCode::En => "English",
            LanguageCode::Fr => "French",
            LanguageCode::De => "German",
            LanguageCode::Es => "Spanish",
            LanguageCode::It => "Italian",
            LanguageCode::Pt => "Portuguese",
            LanguageCode::Nl => "Dutch",
            LanguageCode::Pl => "Polish",
        }
    }

    /// Lenient lookup accepting ISO 639-1, ISO 639-3 or English names, case-insensitively.
    ///
    /// Region suffixes such as `pt-BR` or `en_US` are ignored.
    pub fn parse(value: &str) -> Option<Self> {
        let lowered = value.trim().to_lowercase();
        let base = lowered.split(['-', '_']).next().unwrap_or("");

        SUPPORTED_LANGUAGES.into_iter().find(|code| {
            base == code.as_str() || base == code.iso639_3() || base == code.english_name().to_lowercase()
        })
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguageCode {
    type Err = NotesmithError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        LanguageCode::parse(s).ok_or_else(|| {
            NotesmithError::validation(format!(
                "Unsupported language '{}'. Supported: {}",
                s,
                SUPPORTED_LANGUAGES.map(|c| c.as_str()).join(", ")
            ))
        })
    }
}

/// How the language of a [`NormalizedInput`] was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageSource {
    /// Reported by the speech-to-text engine.
    Transcript,
    /// Detected from extracted text with sufficient confidence.
    Detected,
    /// The configured default, used when nothing else was conclusive.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start_secs: f64,
    pub end_secs: f64,
    pub text: String,
}

/// Text recognized from an audio track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Ordered segments; may be empty when the engine returns plain text only.
    pub segments: Vec<TranscriptSegment>,
    /// Full recognized text.
    pub text: String,
    /// Language reported by the engine, when it is one of the supported codes.
    pub language: Option<LanguageCode>,
    /// Raw language label reported by the engine.
    pub reported_language: Option<String>,
    /// Duration of the decoded audio.
    pub duration_secs: Option<f64>,
}

/// States of a single normalization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Received,
    Classified,
    Extracted,
    LanguageResolved,
    Ready,
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Received => "received",
            PipelineStage::Classified => "classified",
            PipelineStage::Extracted => "extracted",
            PipelineStage::LanguageResolved => "language_resolved",
            PipelineStage::Ready => "ready",
            PipelineStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Final pipeline output handed to the generation step.
///
/// `text` is never empty and `language` is always one of [`SUPPORTED_LANGUAGES`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedInput {
    pub request_id: Uuid,
    pub kind: MediaKind,
    pub text: String,
    pub language: LanguageCode,
    pub language_source: LanguageSource,
    pub filename: String,
    pub byte_len: u64,
    /// Character count of `text` after bounding.
    pub char_count: usize,
    /// Whether `text` was cut to the configured maximum.
    pub truncated: bool,
    /// Transcript segments, present only for video uploads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<TranscriptSegment>>,
}
