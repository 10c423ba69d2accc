//! Language-model clients for release-notes generation.

use crate::core::config::{GenerationConfig, read_api_key};
use crate::generation::prompt::PromptPayload;
use crate::{NotesmithError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Token accounting reported by the model provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Generated release notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedNotes {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
}

/// A model that turns a [`PromptPayload`] into release notes.
///
/// # Thread Safety
///
/// Generators are shared across requests and must be `Send + Sync`.
#[async_trait]
pub trait ReleaseNotesGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, payload: &PromptPayload) -> Result<GeneratedNotes>;
}

/// OpenAI-compatible `/v1/chat/completions` client.
#[derive(Debug, Clone)]
pub struct OpenAiChatGenerator {
    client: reqwest::Client,
    config: GenerationConfig,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    presence_penalty: f32,
    frequency_penalty: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiChatGenerator {
    pub fn new(config: GenerationConfig, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotesmithError::generation_with_source("Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            config,
            api_key: api_key.into(),
        })
    }

    /// Build a client from configuration, reading the key from `api_key_env`.
    pub fn from_config(config: &GenerationConfig, timeout: Duration) -> Result<Self> {
        let api_key = read_api_key(&config.api_key_env)?;
        Self::new(config.clone(), api_key, timeout)
    }

    fn request<'a>(&'a self, payload: &'a PromptPayload) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &payload.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &payload.user_prompt,
                },
            ],
            temperature: self.config.temperature,
            presence_penalty: self.config.presence_penalty,
            frequency_penalty: self.config.frequency_penalty,
            max_tokens: self.config.max_tokens,
        }
    }
}

#[async_trait]
impl ReleaseNotesGenerator for OpenAiChatGenerator {
    fn name(&self) -> &str {
        "openai-chat"
    }

    async fn generate(&self, payload: &PromptPayload) -> Result<GeneratedNotes> {
        tracing::info!(model = %self.config.model, sources = payload.sources.len(), "Requesting release notes");

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request(payload))
            .send()
            .await
            .map_err(|e| NotesmithError::generation_with_source("Chat completion request failed", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NotesmithError::generation_with_source("Failed to read chat completion response", e))?;

        if !status.is_success() {
            return Err(NotesmithError::generation(format!(
                "Chat completion endpoint returned {}: {}",
                status,
                body.chars().take(500).collect::<String>()
            )));
        }

        parse_chat_response(&body)
    }
}

fn parse_chat_response(body: &str) -> Result<GeneratedNotes> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| NotesmithError::generation_with_source("Malformed chat completion response", e))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| NotesmithError::generation("Model returned no content"))?;

    Ok(GeneratedNotes {
        content,
        token_usage: parsed.usage,
    })
}
