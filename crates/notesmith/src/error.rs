//! Error types for Notesmith.
//!
//! Every fallible operation in the crate returns [`Result<T>`], whose error side is
//! [`NotesmithError`]. Errors raised by a pipeline stage live in their own enums and
//! are wrapped transparently:
//!
//! - [`ClassificationError`] - the upload was rejected before any extraction work
//! - [`ExtractionError`] - a document or JSON payload could not be turned into text
//! - [`TranscriptionError`] - a video could not be demuxed or produced no speech
//!
//! All of them are terminal for the request that raised them. Nothing in the
//! pipeline retries.
//!
//! # Error Handling Philosophy
//!
//! **System errors bubble up unchanged:** `NotesmithError::Io` comes straight from
//! `std::io::Error` and is never wrapped or suppressed.
//!
//! **Content errors carry context:** each stage error names the file, its byte
//! length and (through [`NotesmithError::stage`]) the pipeline stage that failed.
//!
//! # Example
//!
//! ```rust
//! use notesmith::{NotesmithError, Result};
//!
//! fn read_upload(path: &str) -> Result<Vec<u8>> {
//!     let bytes = std::fs::read(path)?;
//!     if bytes.is_empty() {
//!         return Err(NotesmithError::validation(format!("Upload is empty: {}", path)));
//!     }
//!     Ok(bytes)
//! }
//! ```
use crate::types::{MediaCategory, MediaKind, PipelineStage};
use thiserror::Error;

/// Result type alias using `NotesmithError`.
pub type Result<T> = std::result::Result<T, NotesmithError>;

/// Rejections raised by the format classifier.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("Unsupported file type '{extension}' for '{filename}'. Allowed types: PDF, TXT, JSON, MP4, MPEG, M4V, MOV, AVI, WMV")]
    UnsupportedType { filename: String, extension: String },

    #[error("File '{filename}' is {size} bytes, exceeding the {limit} byte limit for {category} uploads")]
    TooLarge {
        filename: String,
        size: u64,
        limit: u64,
        category: MediaCategory,
    },
}

/// Failures turning document or JSON bytes into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("File '{filename}' ({byte_len} bytes) is not valid UTF-8 (first invalid byte at offset {valid_up_to})")]
    Encoding {
        filename: String,
        byte_len: usize,
        valid_up_to: usize,
    },

    #[error("File '{filename}' ({byte_len} bytes) is malformed: {reason}")]
    Malformed {
        filename: String,
        byte_len: usize,
        reason: String,
    },

    #[error("File '{filename}' ({byte_len} bytes, {kind}) contains no extractable text")]
    Empty {
        filename: String,
        byte_len: usize,
        kind: MediaKind,
    },
}

/// Failures turning a video upload into a transcript.
#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("Could not decode an audio stream from '{filename}': {reason}")]
    Decode { filename: String, reason: String },

    #[error("No speech could be recognized in '{filename}'")]
    Empty { filename: String },
}

/// Main error type for all Notesmith operations.
#[derive(Debug, Error)]
pub enum NotesmithError {
    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Transcription(#[from] TranscriptionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Speech-to-text engine error: {message}")]
    Engine {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Generation error: {message}")]
    Generation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Processing '{filename}' timed out after {seconds} seconds")]
    Timeout { filename: String, seconds: u64 },

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for NotesmithError {
    fn from(err: serde_json::Error) -> Self {
        NotesmithError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        pastey::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: Some(Box::new(source)),
                }
            }
        }
    };
}

impl NotesmithError {
    error_constructor!(validation, Validation);
    error_constructor!(serialization, Serialization);
    error_constructor!(engine, Engine);
    error_constructor!(generation, Generation);

    /// The pipeline stage whose transition raised this error.
    ///
    /// Returns `None` for errors that do not originate inside a normalization
    /// request (configuration, generation, ...).
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            NotesmithError::Classification(_) => Some(PipelineStage::Classified),
            NotesmithError::Extraction(_)
            | NotesmithError::Transcription(_)
            | NotesmithError::Engine { .. }
            | NotesmithError::MissingDependency(_)
            | NotesmithError::Timeout { .. } => Some(PipelineStage::Extracted),
            _ => None,
        }
    }

    /// Whether the error was caused by the uploaded content rather than the system.
    pub fn is_content_error(&self) -> bool {
        matches!(
            self,
            NotesmithError::Classification(_) | NotesmithError::Extraction(_) | NotesmithError::Transcription(_)
        )
    }
}
