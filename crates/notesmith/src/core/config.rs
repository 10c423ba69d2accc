//! Configuration loading and management.
//!
//! This module loads pipeline configuration from TOML, YAML or JSON files and
//! discovers a `notesmith.toml` in the directory hierarchy.

use crate::types::{LanguageCode, MediaCategory};
use crate::{NotesmithError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const MIB: u64 = 1024 * 1024;

/// Main pipeline configuration.
///
/// Every field has a default, so an empty file is a valid configuration.
///
/// # Example
///
/// ```rust
/// use notesmith::core::config::PipelineConfig;
///
/// let config = PipelineConfig::default();
/// assert_eq!(config.size_limits.video_bytes, 100 * 1024 * 1024);
///
/// // let config = PipelineConfig::from_toml_file("notesmith.toml")?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Per-category upload limits
    #[serde(default)]
    pub size_limits: SizeLimits,

    /// Language detection settings
    #[serde(default)]
    pub language_detection: LanguageDetectionConfig,

    /// Video demuxing and speech-to-text settings
    #[serde(default)]
    pub transcription: TranscriptionConfig,

    /// Root of the scratch area used during transcription
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,

    /// Upper bound on `NormalizedInput.text`, in characters
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,

    /// Wall-clock budget for a single normalization request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Concurrency cap for batch normalization (defaults to `num_cpus * 2`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_normalizations: Option<usize>,

    /// Release-notes generation settings
    #[serde(default)]
    pub generation: GenerationConfig,
}

/// Upload size limits, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeLimits {
    #[serde(default = "default_document_bytes")]
    pub document_bytes: u64,

    #[serde(default = "default_document_bytes")]
    pub structured_bytes: u64,

    #[serde(default = "default_video_bytes")]
    pub video_bytes: u64,
}

impl SizeLimits {
    pub fn limit_for(&self, category: MediaCategory) -> u64 {
        match category {
            MediaCategory::Document => self.document_bytes,
            MediaCategory::Structured => self.structured_bytes,
            MediaCategory::Video => self.video_bytes,
        }
    }

    /// Largest limit across all categories, used to bound request bodies.
    pub fn max_upload_bytes(&self) -> u64 {
        self.document_bytes.max(self.structured_bytes).max(self.video_bytes)
    }
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            document_bytes: default_document_bytes(),
            structured_bytes: default_document_bytes(),
            video_bytes: default_video_bytes(),
        }
    }
}

/// Language detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageDetectionConfig {
    /// Enable language detection
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minimum confidence threshold (0.0-1.0)
    #[serde(default = "default_confidence")]
    pub min_confidence: f64,

    /// Language used when nothing else is conclusive
    #[serde(default)]
    pub default_language: LanguageCode,
}

impl Default for LanguageDetectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_confidence: default_confidence(),
            default_language: LanguageCode::default(),
        }
    }
}

/// How audio is pulled out of a video container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemuxerMode {
    /// ffmpeg when it can be located, otherwise the native decoder
    #[default]
    Auto,
    Ffmpeg,
    Native,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    #[serde(default)]
    pub demuxer: DemuxerMode,

    /// Explicit ffmpeg binary; otherwise resolved from `PATH`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffmpeg_path: Option<PathBuf>,

    /// Sample rate of the demuxed mono WAV
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// RMS below which decoded audio counts as silence
    #[serde(default = "default_silence_threshold")]
    pub silence_threshold: f32,

    /// Language passed to the engine as a hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_hint: Option<LanguageCode>,

    #[serde(default)]
    pub engine: EngineConfig,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            demuxer: DemuxerMode::default(),
            ffmpeg_path: None,
            sample_rate: default_sample_rate(),
            silence_threshold: default_silence_threshold(),
            language_hint: None,
            engine: EngineConfig::default(),
        }
    }
}

/// Speech-to-text engine endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_transcription_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_transcription_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoint: default_transcription_endpoint(),
            model: default_transcription_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

/// Chat-completions settings for release-notes generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_chat_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_chat_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_penalty")]
    pub presence_penalty: f32,

    #[serde(default = "default_penalty")]
    pub frequency_penalty: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Reference release-notes document (PDF or TXT) inserted into the template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_path: Option<PathBuf>,

    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_chat_endpoint(),
            model: default_chat_model(),
            temperature: default_temperature(),
            presence_penalty: default_penalty(),
            frequency_penalty: default_penalty(),
            max_tokens: default_max_tokens(),
            template_path: None,
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_confidence() -> f64 {
    0.5
}
fn default_document_bytes() -> u64 {
    10 * MIB
}
fn default_video_bytes() -> u64 {
    100 * MIB
}
fn default_max_text_chars() -> usize {
    200_000
}
fn default_request_timeout_secs() -> u64 {
    600
}
fn default_sample_rate() -> u32 {
    16_000
}
fn default_silence_threshold() -> f32 {
    1e-4
}
fn default_transcription_endpoint() -> String {
    "https://api.openai.com/v1/audio/transcriptions".to_string()
}
fn default_transcription_model() -> String {
    "whisper-1".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_chat_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}
fn default_chat_model() -> String {
    "gpt-4-turbo-preview".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_penalty() -> f32 {
    0.1
}
fn default_max_tokens() -> u32 {
    2000
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            size_limits: SizeLimits::default(),
            language_detection: LanguageDetectionConfig::default(),
            transcription: TranscriptionConfig::default(),
            scratch_dir: None,
            max_text_chars: default_max_text_chars(),
            request_timeout_secs: default_request_timeout_secs(),
            max_concurrent_normalizations: None,
            generation: GenerationConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `NotesmithError::Validation` if the file doesn't exist, is invalid TOML,
    /// or fails [`PipelineConfig::validate`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| NotesmithError::validation(format!("Invalid TOML in {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = serde_yaml_ng::from_str(&content)
            .map_err(|e| NotesmithError::validation(format!("Invalid YAML in {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| NotesmithError::validation(format!("Invalid JSON in {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, choosing the format from the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "toml" => Self::from_toml_file(path),
            "yaml" | "yml" => Self::from_yaml_file(path),
            "json" => Self::from_json_file(path),
            other => Err(NotesmithError::validation(format!(
                "Unsupported config format '{}' for {} (expected .toml, .yaml, .yml or .json)",
                other,
                path.display()
            ))),
        }
    }

    /// Discover configuration file in parent directories.
    ///
    /// Searches for `notesmith.toml` in the current directory and its parents.
    ///
    /// # Returns
    ///
    /// - `Some(config)` if found
    /// - `None` if no config file found
    pub fn discover() -> Result<Option<Self>> {
        let mut current = std::env::current_dir().map_err(NotesmithError::Io)?;

        loop {
            let notesmith_toml = current.join("notesmith.toml");
            if notesmith_toml.exists() {
                return Ok(Some(Self::from_toml_file(notesmith_toml)?));
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(None)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let limits = &self.size_limits;
        if limits.document_bytes == 0 || limits.structured_bytes == 0 || limits.video_bytes == 0 {
            return Err(NotesmithError::validation("size limits must be greater than zero"));
        }

        let confidence = self.language_detection.min_confidence;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(NotesmithError::validation(format!(
                "language_detection.min_confidence must be within 0.0-1.0, got {}",
                confidence
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(NotesmithError::validation("request_timeout_secs must be greater than zero"));
        }

        if self.max_text_chars == 0 {
            return Err(NotesmithError::validation("max_text_chars must be greater than zero"));
        }

        if self.transcription.sample_rate == 0 {
            return Err(NotesmithError::validation("transcription.sample_rate must be greater than zero"));
        }

        if self.max_concurrent_normalizations == Some(0) {
            return Err(NotesmithError::validation(
                "max_concurrent_normalizations must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Scratch root, defaulting to `<tmp>/notesmith-scratch`.
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("notesmith-scratch"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn batch_concurrency(&self) -> usize {
        self.max_concurrent_normalizations
            .unwrap_or_else(|| num_cpus::get() * 2)
            .max(1)
    }
}

/// Read an API key from the named environment variable.
pub fn read_api_key(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(NotesmithError::validation(format!(
            "API key not configured: set the {} environment variable",
            var
        ))),
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| NotesmithError::validation(format!("Failed to read config file {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.size_limits.document_bytes, 10 * MIB);
        assert_eq!(config.size_limits.structured_bytes, 10 * MIB);
        assert_eq!(config.size_limits.video_bytes, 100 * MIB);
        assert!(config.language_detection.enabled);
        assert_eq!(config.language_detection.default_language, LanguageCode::En);
        assert_eq!(config.transcription.engine.model, "whisper-1");
        assert_eq!(config.generation.model, "gpt-4-turbo-preview");
        assert_eq!(config.generation.max_tokens, 2000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("notesmith.toml");

        fs::write(
            &config_path,
            r#"
max_text_chars = 5000

[size_limits]
video_bytes = 2048

[language_detection]
min_confidence = 0.8
default_language = "de"

[transcription]
demuxer = "native"
        "#,
        )
        .unwrap();

        let config = PipelineConfig::from_toml_file(&config_path).unwrap();
        assert_eq!(config.max_text_chars, 5000);
        assert_eq!(config.size_limits.video_bytes, 2048);
        assert_eq!(config.size_limits.document_bytes, 10 * MIB);
        assert_eq!(config.language_detection.default_language, LanguageCode::De);
        assert_eq!(config.transcription.demuxer, DemuxerMode::Native);
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("notesmith.yaml");

        fs::write(
            &config_path,
            "request_timeout_secs: 30\ngeneration:\n  temperature: 0.2\n",
        )
        .unwrap();

        let config = PipelineConfig::from_file(&config_path).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!((config.generation.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("notesmith.json");

        fs::write(&config_path, r#"{"max_concurrent_normalizations": 3}"#).unwrap();

        let config = PipelineConfig::from_file(&config_path).unwrap();
        assert_eq!(config.batch_concurrency(), 3);
    }

    #[test]
    fn test_from_file_rejects_unknown_extension() {
        let result = PipelineConfig::from_file("settings.ini");
        assert!(matches!(result, Err(NotesmithError::Validation { .. })));
    }

    #[test]
    fn test_invalid_confidence_rejected() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("notesmith.toml");
        fs::write(&config_path, "[language_detection]\nmin_confidence = 1.5\n").unwrap();

        let err = PipelineConfig::from_toml_file(&config_path).unwrap_err();
        assert!(err.to_string().contains("min_confidence"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = PipelineConfig {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unsupported_default_language_rejected() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("notesmith.toml");
        fs::write(&config_path, "[language_detection]\ndefault_language = \"ja\"\n").unwrap();

        assert!(PipelineConfig::from_toml_file(&config_path).is_err());
    }

    #[test]
    fn test_scratch_root_default() {
        let config = PipelineConfig::default();
        assert!(config.scratch_root().ends_with("notesmith-scratch"));
    }

    #[test]
    #[serial]
    fn test_discover_notesmith_toml() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("notesmith.toml"), "max_text_chars = 42\n").unwrap();

        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(&nested).unwrap();

        let result = std::panic::catch_unwind(|| {
            let config = PipelineConfig::discover().unwrap();
            assert!(config.is_some());
            assert_eq!(config.unwrap().max_text_chars, 42);
        });

        std::env::set_current_dir(&original_dir).unwrap();

        if let Err(e) = result {
            std::panic::resume_unwind(e);
        }
    }
}
