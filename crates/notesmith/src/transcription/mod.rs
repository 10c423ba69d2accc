//! Video transcription.
//!
//! [`MediaTranscriber::transcribe`] writes the upload into a request-scoped
//! scratch space, demuxes its audio track to a mono WAV, rejects silent audio,
//! and hands the WAV to a [`SpeechToText`] engine. The scratch space is removed
//! on every exit path, including cancellation of the returned future.

pub mod analysis;
pub mod audio;
pub mod backend;
pub mod openai;
pub mod scratch;

pub use analysis::{AudioStats, analyze_wav};
pub use audio::{AudioExtractor, Demuxer, locate_ffmpeg};
pub use backend::{SpeechRecognition, SpeechRequest, SpeechToText, UnconfiguredEngine};
pub use openai::OpenAiWhisper;
pub use scratch::{ScratchArea, ScratchSpace};

use crate::core::config::PipelineConfig;
use crate::error::TranscriptionError;
use crate::types::{LanguageCode, Transcript, VideoContainer};
use crate::{NotesmithError, Result};
use std::sync::Arc;

/// Turns video uploads into transcripts.
pub struct MediaTranscriber {
    scratch: ScratchArea,
    extractor: AudioExtractor,
    engine: Arc<dyn SpeechToText>,
    silence_threshold: f32,
    language_hint: Option<LanguageCode>,
}

impl MediaTranscriber {
    pub fn new(config: &PipelineConfig, engine: Arc<dyn SpeechToText>) -> Result<Self> {
        Ok(Self {
            scratch: ScratchArea::new(config.scratch_root())?,
            extractor: AudioExtractor::new(&config.transcription, config.request_timeout()),
            engine,
            silence_threshold: config.transcription.silence_threshold,
            language_hint: config.transcription.language_hint,
        })
    }

    pub fn scratch(&self) -> &ScratchArea {
        &self.scratch
    }

    /// Transcribe a video upload.
    ///
    /// # Errors
    ///
    /// - `TranscriptionError::Decode` when no audio track can be demuxed
    /// - `TranscriptionError::Empty` for silent audio or an empty transcript
    /// - `NotesmithError::Engine` for speech-to-text failures
    /// - `NotesmithError::MissingDependency` when ffmpeg is required but absent
    pub async fn transcribe(&self, bytes: &[u8], filename: &str, container: VideoContainer) -> Result<Transcript> {
        let space = self.scratch.acquire()?;
        let result = self.transcribe_in(&space, bytes, filename, container).await;
        space.close();
        result
    }

    async fn transcribe_in(
        &self,
        space: &ScratchSpace,
        bytes: &[u8],
        filename: &str,
        container: VideoContainer,
    ) -> Result<Transcript> {
        let input = space.write(&format!("input.{}", container.extension()), bytes).await?;
        let audio_path = self.extractor.extract(space, &input, filename).await?;

        if let Err(e) = tokio::fs::remove_file(&input).await {
            tracing::debug!(filename, error = %e, "Could not remove demuxed input early");
        }

        let stats = {
            let held = space.clone();
            let path = audio_path.clone();
            let name = filename.to_string();
            tokio::task::spawn_blocking(move || {
                let _held = held;
                analyze_wav(&path, &name)
            })
            .await
            .map_err(|e| NotesmithError::Other(format!("Audio analysis task failed: {}", e)))??
        };

        if stats.is_silent(self.silence_threshold) {
            tracing::debug!(filename, rms = stats.rms, frames = stats.frames, "Audio is silent");
            return Err(TranscriptionError::Empty {
                filename: filename.to_string(),
            }
            .into());
        }

        let request = SpeechRequest {
            audio_path,
            filename: filename.to_string(),
            sample_rate: stats.sample_rate,
            duration_secs: stats.duration_secs(),
            language_hint: self.language_hint,
        };

        tracing::debug!(
            filename,
            engine = self.engine.name(),
            duration_secs = request.duration_secs,
            "Sending audio to speech-to-text engine"
        );
        let recognition = self.engine.transcribe(&request).await?;

        let mut text = recognition.text.trim().to_string();
        if text.is_empty() {
            text = recognition
                .segments
                .iter()
                .map(|s| s.text.trim())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
        }
        if text.is_empty() {
            return Err(TranscriptionError::Empty {
                filename: filename.to_string(),
            }
            .into());
        }

        let language = recognition.language.as_deref().and_then(LanguageCode::parse);
        if language.is_none()
            && let Some(reported) = recognition.language.as_deref()
        {
            tracing::warn!(filename, reported, "Engine reported an unsupported language");
        }

        Ok(Transcript {
            segments: recognition.segments,
            text,
            language,
            reported_language: recognition.language,
            duration_secs: Some(stats.duration_secs()),
        })
    }
}
