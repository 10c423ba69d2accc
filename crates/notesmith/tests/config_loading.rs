//! Configuration loading integration tests.

use notesmith::core::config::DemuxerMode;
use notesmith::{LanguageCode, NotesmithError, PipelineConfig};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_from_file_toml() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("notesmith.toml");

    fs::write(
        &config_path,
        r#"
max_text_chars = 5000
request_timeout_secs = 120

[size_limits]
video_bytes = 52428800

[language_detection]
min_confidence = 0.8
default_language = "de"

[transcription]
demuxer = "native"
language_hint = "fr"

[generation]
model = "gpt-4o"
max_tokens = 1200
"#,
    )
    .unwrap();

    let config = PipelineConfig::from_file(&config_path).unwrap();
    assert_eq!(config.max_text_chars, 5000);
    assert_eq!(config.request_timeout_secs, 120);
    assert_eq!(config.size_limits.video_bytes, 50 * 1024 * 1024);
    assert_eq!(config.size_limits.document_bytes, 10 * 1024 * 1024);
    assert_eq!(config.language_detection.default_language, LanguageCode::De);
    assert_eq!(config.transcription.demuxer, DemuxerMode::Native);
    assert_eq!(config.transcription.language_hint, Some(LanguageCode::Fr));
    assert_eq!(config.generation.model, "gpt-4o");
    assert_eq!(config.generation.max_tokens, 1200);
    assert!((config.generation.temperature - 0.7).abs() < f32::EPSILON);
}

#[test]
fn test_from_file_yaml() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("notesmith.yaml");

    fs::write(
        &config_path,
        "language_detection:\n  enabled: false\ntranscription:\n  sample_rate: 8000\n",
    )
    .unwrap();

    let config = PipelineConfig::from_file(&config_path).unwrap();
    assert!(!config.language_detection.enabled);
    assert_eq!(config.transcription.sample_rate, 8000);
}

#[test]
fn test_from_file_json() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("notesmith.json");

    fs::write(&config_path, r#"{"max_concurrent_normalizations": 3}"#).unwrap();

    let config = PipelineConfig::from_file(&config_path).unwrap();
    assert_eq!(config.batch_concurrency(), 3);
}

#[test]
fn test_unknown_language_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("notesmith.toml");
    fs::write(&config_path, "[language_detection]\ndefault_language = \"ja\"\n").unwrap();

    assert!(PipelineConfig::from_file(&config_path).is_err());
}

#[test]
fn test_invalid_values_fail_validation() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("notesmith.toml");
    fs::write(&config_path, "request_timeout_secs = 0\n").unwrap();

    let err = PipelineConfig::from_file(&config_path).unwrap_err();
    assert!(matches!(err, NotesmithError::Validation { .. }));
}

#[test]
fn test_unsupported_extension() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("notesmith.ini");
    fs::write(&config_path, "").unwrap();

    let err = PipelineConfig::from_file(&config_path).unwrap_err();
    assert!(err.to_string().contains("Unsupported config format"));
}

#[test]
fn test_empty_file_is_default() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("notesmith.toml");
    fs::write(&config_path, "").unwrap();

    let config = PipelineConfig::from_file(&config_path).unwrap();
    assert_eq!(config.max_text_chars, PipelineConfig::default().max_text_chars);
    assert_eq!(config.transcription.engine.model, "whisper-1");
}
