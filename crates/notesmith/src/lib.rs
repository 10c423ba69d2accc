//! Notesmith - ingestion and normalization for release-note generation.
//!
//! Notesmith accepts a heterogeneous upload (PDF, plain text, JSON or a video
//! recording), turns it into clean text, resolves its natural language and
//! hands a single [`NormalizedInput`] to the generation step.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use notesmith::{Normalizer, PipelineConfig, UploadArtifact};
//! use notesmith::transcription::OpenAiWhisper;
//! use std::sync::Arc;
//!
//! # async fn example() -> notesmith::Result<()> {
//! let config = PipelineConfig::discover()?.unwrap_or_default();
//! let engine = OpenAiWhisper::from_config(&config.transcription.engine, config.request_timeout())?;
//! let normalizer = Normalizer::new(config, Arc::new(engine))?;
//!
//! let bytes = std::fs::read("changes.json")?;
//! let input = normalizer.normalize(UploadArtifact::new("changes.json", bytes)).await?;
//! println!("[{}] {}", input.language, input.text);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Core** (`core`): format classification, configuration and the normalization state machine
//! - **Extraction** (`extraction`): PDF, TXT and JSON to text
//! - **Transcription** (`transcription`): scratch-space audio demuxing and speech-to-text
//! - **Language detection** (`language_detection`): resolution onto the supported language set
//! - **Generation** (`generation`): prompt assembly, LLM client and history records

#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod extraction;
pub mod generation;
pub mod language_detection;
pub mod transcription;
pub mod types;

#[cfg(feature = "api")]
pub mod api;

pub use error::{ClassificationError, ExtractionError, NotesmithError, Result, TranscriptionError};
pub use types::*;

pub use core::classifier::{
    JSON_MIME_TYPE, PDF_MIME_TYPE, PLAIN_TEXT_MIME_TYPE, classify, classify_artifact, classify_with_mime,
    supported_extensions,
};
pub use core::config::{LanguageDetectionConfig, PipelineConfig, SizeLimits, TranscriptionConfig};
pub use core::pipeline::{Normalizer, PipelineObserver};

pub use extraction::{extract_document, extract_json};
pub use language_detection::{LanguageResolution, resolve_language};
pub use transcription::{MediaTranscriber, SpeechToText};
