//! Normalization coordinator.
//!
//! Drives one upload through `Received → Classified → Extracted →
//! LanguageResolved → Ready`. Any stage error moves the request to `Failed` and
//! is returned as-is; nothing is retried and no partial result is produced.

use crate::core::classifier::classify_artifact;
use crate::core::config::PipelineConfig;
use crate::extraction::{extract_document, extract_json};
use crate::language_detection::resolve_language;
use crate::transcription::{MediaTranscriber, ScratchArea, SpeechToText};
use crate::types::{
    DocumentFormat, LanguageCode, LanguageSource, MediaKind, NormalizedInput, PipelineStage, StructuredFormat,
    Transcript, TranscriptSegment, UploadArtifact,
};
use crate::error::ExtractionError;
use crate::{NotesmithError, Result};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Hooks invoked as a request moves between stages.
///
/// Observers are called synchronously on the request's task and must be cheap.
pub trait PipelineObserver: Send + Sync {
    fn on_transition(&self, _request_id: Uuid, _from: PipelineStage, _to: PipelineStage) {}

    /// Called when the transition out of `stage` failed.
    fn on_failure(&self, _request_id: Uuid, _stage: PipelineStage, _error: &NotesmithError) {}
}

/// Records the current stage of one request and notifies the observer.
struct StageTracker<'a> {
    request_id: Uuid,
    stage: PipelineStage,
    observer: Option<&'a dyn PipelineObserver>,
}

impl<'a> StageTracker<'a> {
    fn new(request_id: Uuid, observer: Option<&'a dyn PipelineObserver>) -> Self {
        Self {
            request_id,
            stage: PipelineStage::Received,
            observer,
        }
    }

    fn advance(&mut self, to: PipelineStage) {
        tracing::debug!(from = %self.stage, to = %to, "Stage transition");
        if let Some(observer) = self.observer {
            observer.on_transition(self.request_id, self.stage, to);
        }
        self.stage = to;
    }

    fn step<T>(&mut self, to: PipelineStage, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.advance(to);
                Ok(value)
            }
            Err(error) => {
                tracing::debug!(stage = %self.stage, error = %error, "Normalization failed");
                if let Some(observer) = self.observer {
                    observer.on_failure(self.request_id, self.stage, &error);
                    observer.on_transition(self.request_id, self.stage, PipelineStage::Failed);
                }
                self.stage = PipelineStage::Failed;
                Err(error)
            }
        }
    }
}

enum Extracted {
    Text(String),
    Transcript(Transcript),
}

/// Extracted text after bounding to `max_text_chars`.
struct BoundedText {
    text: String,
    char_count: usize,
    truncated: bool,
    transcript: Option<(Vec<TranscriptSegment>, Option<LanguageCode>)>,
}

impl BoundedText {
    fn new(extracted: Extracted, max_chars: usize, filename: &str, byte_len: u64, kind: MediaKind) -> Result<Self> {
        let (text, transcript) = match extracted {
            Extracted::Text(text) => (text, None),
            Extracted::Transcript(Transcript {
                text,
                segments,
                language,
                ..
            }) => (text, Some((segments, language))),
        };

        let (text, char_count, truncated) = bound_text(text, max_chars);
        if text.is_empty() {
            return Err(ExtractionError::Empty {
                filename: filename.to_string(),
                byte_len: byte_len as usize,
                kind,
            }
            .into());
        }
        if truncated {
            tracing::warn!(max_chars, "Extracted text truncated");
        }

        Ok(Self {
            text,
            char_count,
            truncated,
            transcript,
        })
    }
}

/// Turns uploads into [`NormalizedInput`]s.
///
/// Cheap to clone; clones share configuration, scratch area and engine.
#[derive(Clone)]
pub struct Normalizer {
    config: Arc<PipelineConfig>,
    transcriber: Arc<MediaTranscriber>,
    observer: Option<Arc<dyn PipelineObserver>>,
}

impl Normalizer {
    /// Build a normalizer, validating `config` and creating the scratch area.
    pub fn new(config: PipelineConfig, engine: Arc<dyn SpeechToText>) -> Result<Self> {
        config.validate()?;
        let transcriber = MediaTranscriber::new(&config, engine)?;
        Ok(Self {
            config: Arc::new(config),
            transcriber: Arc::new(transcriber),
            observer: None,
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn scratch(&self) -> &ScratchArea {
        self.transcriber.scratch()
    }

    /// Normalize one upload.
    ///
    /// # Errors
    ///
    /// Returns the first stage error: classification, extraction, transcription,
    /// or `NotesmithError::Timeout` when extraction exceeds `request_timeout_secs`.
    pub async fn normalize(&self, artifact: UploadArtifact) -> Result<NormalizedInput> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "normalize",
            %request_id,
            filename = %artifact.filename,
            byte_len = artifact.byte_len()
        );

        self.run(request_id, artifact).instrument(span).await
    }

    async fn run(&self, request_id: Uuid, artifact: UploadArtifact) -> Result<NormalizedInput> {
        let mut tracker = StageTracker::new(request_id, self.observer.as_deref());

        let kind = tracker.step(
            PipelineStage::Classified,
            classify_artifact(&artifact, &self.config.size_limits),
        )?;
        tracing::debug!(%kind, "Classified upload");

        let UploadArtifact { bytes, filename, .. } = artifact;
        let byte_len = bytes.len() as u64;

        let timeout = self.config.request_timeout();
        let extraction = tokio::time::timeout(timeout, self.extract(bytes, &filename, kind))
            .await
            .unwrap_or_else(|_| {
                Err(NotesmithError::Timeout {
                    filename: filename.clone(),
                    seconds: timeout.as_secs(),
                })
            });
        let extraction = extraction.and_then(|extracted| {
            BoundedText::new(extracted, self.config.max_text_chars, &filename, byte_len, kind)
        });
        let BoundedText {
            text,
            char_count,
            truncated,
            transcript,
        } = tracker.step(PipelineStage::Extracted, extraction)?;

        let detection = &self.config.language_detection;
        let (language, language_source, segments) = match transcript {
            Some((segments, Some(code))) => (code, LanguageSource::Transcript, Some(segments)),
            Some((segments, None)) => (detection.default_language, LanguageSource::Fallback, Some(segments)),
            None => {
                let resolution = resolve_language(&text, detection);
                (resolution.code, resolution.source, None)
            }
        };
        tracker.advance(PipelineStage::LanguageResolved);

        let normalized = NormalizedInput {
            request_id,
            kind,
            text,
            language,
            language_source,
            filename,
            byte_len,
            char_count,
            truncated,
            segments,
        };
        tracker.advance(PipelineStage::Ready);

        tracing::info!(
            kind = %normalized.kind,
            language = %normalized.language,
            language_source = ?normalized.language_source,
            chars = normalized.char_count,
            "Normalized upload"
        );
        Ok(normalized)
    }

    async fn extract(&self, bytes: Vec<u8>, filename: &str, kind: MediaKind) -> Result<Extracted> {
        match kind {
            MediaKind::Document(DocumentFormat::Pdf) => {
                let name = filename.to_string();
                let text = tokio::task::spawn_blocking(move || extract_document(&bytes, DocumentFormat::Pdf, &name))
                    .await
                    .map_err(|e| NotesmithError::Other(format!("PDF extraction task failed: {}", e)))??;
                Ok(Extracted::Text(text))
            }
            MediaKind::Document(format) => Ok(Extracted::Text(extract_document(&bytes, format, filename)?)),
            MediaKind::Structured(StructuredFormat::Json) => Ok(Extracted::Text(extract_json(&bytes, filename)?)),
            MediaKind::Video(container) => Ok(Extracted::Transcript(
                self.transcriber.transcribe(&bytes, filename, container).await?,
            )),
        }
    }

    /// Normalize several uploads concurrently, preserving input order.
    ///
    /// Concurrency is capped by `max_concurrent_normalizations`. Each entry
    /// succeeds or fails independently.
    pub async fn normalize_batch(&self, artifacts: Vec<UploadArtifact>) -> Vec<Result<NormalizedInput>> {
        use tokio::sync::Semaphore;
        use tokio::task::JoinSet;

        if artifacts.is_empty() {
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(self.config.batch_concurrency()));
        let mut tasks = JoinSet::new();
        let count = artifacts.len();

        for (index, artifact) in artifacts.into_iter().enumerate() {
            let normalizer = self.clone();
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => normalizer.normalize(artifact).await,
                    Err(e) => Err(NotesmithError::Other(format!("Batch semaphore closed: {}", e))),
                };
                (index, result)
            });
        }

        let mut results: Vec<Option<Result<NormalizedInput>>> = (0..count).map(|_| None).collect();

        while let Some(task_result) = tasks.join_next().await {
            match task_result {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => tracing::error!(error = %e, "Batch normalization task failed"),
            }
        }

        results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| Err(NotesmithError::Other("Normalization task did not complete".to_string()))))
            .collect()
    }
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
///
/// Returns the bounded text, its character count and whether it was cut. A cut
/// that leaves only whitespace yields an empty string.
pub fn bound_text(text: String, max_chars: usize) -> (String, usize, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => {
            let mut text = text;
            text.truncate(byte_index);
            let trimmed_len = text.trim_end().len();
            text.truncate(trimmed_len);
            let count = text.chars().count();
            (text, count, true)
        }
        None => {
            let count = text.chars().count();
            (text, count, false)
        }
    }
}
