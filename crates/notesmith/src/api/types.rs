//! API request and response types.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::pipeline::Normalizer;
use crate::generation::{HistorySink, ReferenceTemplate, ReleaseNotesGenerator, TokenUsage};
use crate::types::{LanguageCode, NormalizedInput};

const MIB: usize = 1024 * 1024;

/// Request body limits enforced at the router layer.
///
/// Per-category limits are still checked by the classifier; this only caps
/// what the server is willing to buffer.
#[derive(Debug, Clone, Copy)]
pub struct ApiSizeLimits {
    /// Maximum size of an entire request body in bytes.
    pub max_request_body_bytes: usize,
}

impl Default for ApiSizeLimits {
    fn default() -> Self {
        Self {
            max_request_body_bytes: 101 * MIB,
        }
    }
}

impl ApiSizeLimits {
    pub fn new(max_request_body_bytes: usize) -> Self {
        Self { max_request_body_bytes }
    }

    pub fn from_mb(max_request_body_mb: usize) -> Self {
        Self::new(max_request_body_mb * MIB)
    }

    /// Largest per-category limit plus one MiB of multipart framing.
    pub fn for_config(config: &crate::PipelineConfig) -> Self {
        let largest = usize::try_from(config.size_limits.max_upload_bytes()).unwrap_or(usize::MAX);
        Self::new(largest.saturating_add(MIB))
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// One entry of `GET /languages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub code: LanguageCode,
    pub name: String,
}

/// Supported languages response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguagesResponse {
    pub languages: Vec<LanguageInfo>,
    pub default: LanguageCode,
}

/// Normalization response (one entry per uploaded file, in upload order).
pub type NormalizeResponse = Vec<NormalizedInput>;

/// Release-notes generation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    pub sources: Vec<NormalizedSummary>,
}

/// What the generation step received for one upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedSummary {
    pub filename: String,
    pub kind: String,
    pub language: LanguageCode,
    pub char_count: usize,
    pub truncated: bool,
}

impl From<&NormalizedInput> for NormalizedSummary {
    fn from(input: &NormalizedInput) -> Self {
        Self {
            filename: input.filename.clone(),
            kind: input.kind.to_string(),
            language: input.language,
            char_count: input.char_count,
            truncated: input.truncated,
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error type name
    pub error_type: String,
    pub message: String,
    /// Pipeline stage that failed, when the error came from a normalization request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    pub status_code: u16,
}

/// API server state.
#[derive(Clone)]
pub struct ApiState {
    pub normalizer: Normalizer,
    /// `None` disables `POST /generate-release-notes`
    pub generator: Option<Arc<dyn ReleaseNotesGenerator>>,
    pub template: Arc<ReferenceTemplate>,
    pub history: Option<Arc<dyn HistorySink>>,
}

impl ApiState {
    pub fn new(normalizer: Normalizer) -> Self {
        Self {
            normalizer,
            generator: None,
            template: Arc::new(ReferenceTemplate::default()),
            history: None,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn ReleaseNotesGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_template(mut self, template: ReferenceTemplate) -> Self {
        self.template = Arc::new(template);
        self
    }

    pub fn with_history(mut self, history: Arc<dyn HistorySink>) -> Self {
        self.history = Some(history);
        self
    }
}
