//! Speech-to-text engine interface.

use crate::types::{LanguageCode, TranscriptSegment};
use crate::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// Input handed to a speech-to-text engine.
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    /// Mono WAV inside the request's scratch space
    pub audio_path: PathBuf,
    /// Original upload name, for diagnostics only
    pub filename: String,
    pub sample_rate: u32,
    pub duration_secs: f64,
    /// Optional language hint; engines identify the language themselves otherwise
    pub language_hint: Option<LanguageCode>,
}

/// Raw engine output before language mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeechRecognition {
    pub text: String,
    pub segments: Vec<TranscriptSegment>,
    /// Language label as reported by the engine (code or English name)
    pub language: Option<String>,
}

/// A speech-to-text engine.
///
/// Implementations must identify the spoken language automatically and
/// report it in [`SpeechRecognition::language`].
///
/// # Thread Safety
///
/// Engines are shared across concurrent requests and must be `Send + Sync`.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use notesmith::transcription::{SpeechRecognition, SpeechRequest, SpeechToText};
/// use notesmith::Result;
///
/// struct Canned;
///
/// #[async_trait]
/// impl SpeechToText for Canned {
///     fn name(&self) -> &str {
///         "canned"
///     }
///
///     async fn transcribe(&self, _request: &SpeechRequest) -> Result<SpeechRecognition> {
///         Ok(SpeechRecognition {
///             text: "Bonjour à tous".to_string(),
///             segments: Vec::new(),
///             language: Some("fr".to_string()),
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Unique engine identifier, lowercase with hyphens.
    fn name(&self) -> &str;

    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    /// Recognize speech in `request.audio_path`.
    async fn transcribe(&self, request: &SpeechRequest) -> Result<SpeechRecognition>;
}

/// Placeholder engine for deployments without speech-to-text credentials.
///
/// Every call fails with `NotesmithError::MissingDependency`, so documents and
/// JSON still normalize while video uploads report a clear cause.
#[derive(Debug, Clone)]
pub struct UnconfiguredEngine {
    reason: String,
}

impl UnconfiguredEngine {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl SpeechToText for UnconfiguredEngine {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn transcribe(&self, _request: &SpeechRequest) -> Result<SpeechRecognition> {
        Err(crate::NotesmithError::MissingDependency(format!(
            "speech-to-text engine: {}",
            self.reason
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NotesmithError;

    #[tokio::test]
    async fn test_unconfigured_engine_reports_missing_dependency() {
        let engine = UnconfiguredEngine::new("set OPENAI_API_KEY");
        let request = SpeechRequest {
            audio_path: PathBuf::from("audio.wav"),
            filename: "demo.mp4".to_string(),
            sample_rate: 16_000,
            duration_secs: 1.0,
            language_hint: None,
        };

        let err = engine.transcribe(&request).await.unwrap_err();
        assert!(matches!(err, NotesmithError::MissingDependency(ref m) if m.contains("OPENAI_API_KEY")));
        assert_eq!(engine.name(), "unconfigured");
    }
}
