//! OpenAI-compatible speech-to-text client (`/v1/audio/transcriptions`).

use crate::core::config::{EngineConfig, read_api_key};
use crate::transcription::backend::{SpeechRecognition, SpeechRequest, SpeechToText};
use crate::types::TranscriptSegment;
use crate::{NotesmithError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;

/// Whisper transcription over HTTP.
///
/// Requests `verbose_json` so the response carries the detected language and
/// timed segments.
#[derive(Debug, Clone)]
pub struct OpenAiWhisper {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    #[serde(default)]
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    segments: Vec<VerboseSegment>,
}

#[derive(Debug, Deserialize)]
struct VerboseSegment {
    start: f64,
    end: f64,
    text: String,
}

impl OpenAiWhisper {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotesmithError::engine_with_source("Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Build a client from configuration, reading the key from `api_key_env`.
    pub fn from_config(config: &EngineConfig, timeout: Duration) -> Result<Self> {
        let api_key = read_api_key(&config.api_key_env)?;
        Self::new(config.endpoint.clone(), config.model.clone(), api_key, timeout)
    }
}

#[async_trait]
impl SpeechToText for OpenAiWhisper {
    fn name(&self) -> &str {
        "openai-whisper"
    }

    async fn transcribe(&self, request: &SpeechRequest) -> Result<SpeechRecognition> {
        let audio = tokio::fs::read(&request.audio_path).await?;

        let part = Part::bytes(audio)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| NotesmithError::engine_with_source("Invalid audio part", e))?;

        let mut form = Form::new()
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .part("file", part);
        if let Some(hint) = request.language_hint {
            form = form.text("language", hint.as_str());
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| NotesmithError::engine_with_source("Transcription request failed", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NotesmithError::engine_with_source("Failed to read transcription response", e))?;

        if !status.is_success() {
            return Err(NotesmithError::engine(format!(
                "Transcription endpoint returned {}: {}",
                status,
                body.chars().take(500).collect::<String>()
            )));
        }

        parse_verbose_response(&body)
    }
}

fn parse_verbose_response(body: &str) -> Result<SpeechRecognition> {
    let parsed: VerboseTranscription = serde_json::from_str(body)
        .map_err(|e| NotesmithError::engine_with_source("Malformed transcription response", e))?;

    Ok(SpeechRecognition {
        text: parsed.text.trim().to_string(),
        segments: parsed
            .segments
            .into_iter()
            .map(|s| TranscriptSegment {
                start_secs: s.start,
                end_secs: s.end,
                text: s.text.trim().to_string(),
            })
            .collect(),
        language: parsed.language.filter(|l| !l.trim().is_empty()),
    })
}
