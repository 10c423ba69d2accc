//! Language detection using whatlang.
//!
//! Resolves extracted text to one of the supported [`LanguageCode`]s. Detection
//! never fails: low confidence, a language outside the supported set, or a
//! disabled detector all resolve to the configured default.

use crate::core::config::LanguageDetectionConfig;
use crate::types::{LanguageCode, LanguageSource};

/// Outcome of resolving the language of a text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LanguageResolution {
    pub code: LanguageCode,
    pub source: LanguageSource,
    /// Detector confidence, when a detection ran.
    pub confidence: Option<f64>,
}

impl LanguageResolution {
    pub fn fallback(config: &LanguageDetectionConfig, confidence: Option<f64>) -> Self {
        Self {
            code: config.default_language,
            source: LanguageSource::Fallback,
            confidence,
        }
    }
}

/// Detect the dominant language of `text`.
///
/// # Example
///
/// ```rust
/// use notesmith::language_detection::detect_language;
/// use notesmith::core::config::LanguageDetectionConfig;
/// use notesmith::LanguageCode;
///
/// let config = LanguageDetectionConfig::default();
/// let code = detect_language("", &config);
/// assert_eq!(code, LanguageCode::En);
/// ```
pub fn detect_language(text: &str, config: &LanguageDetectionConfig) -> LanguageCode {
    resolve_language(text, config).code
}

/// Detect the dominant language and report how it was resolved.
pub fn resolve_language(text: &str, config: &LanguageDetectionConfig) -> LanguageResolution {
    if !config.enabled || text.trim().is_empty() {
        return LanguageResolution::fallback(config, None);
    }

    detect_supported(text, config)
}

#[cfg(feature = "language-detection")]
fn detect_supported(text: &str, config: &LanguageDetectionConfig) -> LanguageResolution {
    let Some(info) = whatlang::detect(text) else {
        tracing::debug!("Language detection inconclusive, using default");
        return LanguageResolution::fallback(config, None);
    };

    let confidence = info.confidence();
    match lang_to_code(info.lang()) {
        Some(code) if confidence >= config.min_confidence => LanguageResolution {
            code,
            source: LanguageSource::Detected,
            confidence: Some(confidence),
        },
        Some(code) => {
            tracing::debug!(
                detected = code.as_str(),
                confidence,
                min_confidence = config.min_confidence,
                "Language detection below confidence threshold, using default"
            );
            LanguageResolution::fallback(config, Some(confidence))
        }
        None => {
            tracing::debug!(
                detected = info.lang().code(),
                confidence,
                "Detected language is not supported, using default"
            );
            LanguageResolution::fallback(config, Some(confidence))
        }
    }
}

#[cfg(not(feature = "language-detection"))]
fn detect_supported(_text: &str, config: &LanguageDetectionConfig) -> LanguageResolution {
    LanguageResolution::fallback(config, None)
}

/// Map a whatlang language onto the supported set.
#[cfg(feature = "language-detection")]
fn lang_to_code(lang: whatlang::Lang) -> Option<LanguageCode> {
    use whatlang::Lang;

    match lang {
        Lang::Eng => Some(LanguageCode::En),
        Lang::Fra => Some(LanguageCode::Fr),
        Lang::Deu => Some(LanguageCode::De),
        Lang::Spa => Some(LanguageCode::Es),
        Lang::Ita => Some(LanguageCode::It),
        Lang::Por => Some(LanguageCode::Pt),
        Lang::Nld => Some(LanguageCode::Nl),
        Lang::Pol => Some(LanguageCode::Pl),
        _ => None,
    }
}
