//! Classification, configuration and request orchestration.
//!
//! [`pipeline::Normalizer`] is the entry point. It classifies an upload with
//! [`classifier`], routes it to the matching extractor or to the transcriber,
//! resolves its language and returns a [`crate::NormalizedInput`].
//!
//! # Example
//!
//! ```rust,no_run
//! use notesmith::core::config::PipelineConfig;
//! use notesmith::core::pipeline::Normalizer;
//! use notesmith::transcription::OpenAiWhisper;
//! use notesmith::UploadArtifact;
//! use std::sync::Arc;
//!
//! # async fn example() -> notesmith::Result<()> {
//! let config = PipelineConfig::default();
//! let engine = OpenAiWhisper::from_config(&config.transcription.engine, config.request_timeout())?;
//! let normalizer = Normalizer::new(config, Arc::new(engine))?;
//!
//! let upload = UploadArtifact::new("CHANGELOG.txt", std::fs::read("CHANGELOG.txt")?);
//! let input = normalizer.normalize(upload).await?;
//! println!("{} ({})", input.text, input.language);
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod config;
pub mod pipeline;

pub use classifier::{classify, classify_artifact, classify_with_mime, sniff_kind, supported_extensions};
pub use config::{
    DemuxerMode, EngineConfig, GenerationConfig, LanguageDetectionConfig, PipelineConfig, SizeLimits,
    TranscriptionConfig,
};
pub use pipeline::{Normalizer, PipelineObserver};
