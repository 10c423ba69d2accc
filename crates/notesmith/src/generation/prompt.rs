//! Release-notes prompt assembly.

use crate::core::classifier::classify;
use crate::core::config::SizeLimits;
use crate::extraction::extract_document;
use crate::types::{MediaKind, NormalizedInput};
use crate::{NotesmithError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// System prompt with `{template_content}` and `{content}` placeholders.
pub const SYSTEM_TEMPLATE: &str = "\
You are a release-notes assistant for Sales, Product and Customer Success teams. \
Your answers are based exclusively on the content provided below.

**Reference Template - use this exact structure and style for your release notes:**
{template_content}

**Instructions for Release Notes Generation:**
1. Study the reference template carefully. It shows the structure and style to follow.
2. Use the same formatting, heading styles and organization as the template.
3. Match its tone, level of detail and terminology.

**Release Notes Structure:**
- Each function or topic gets a separate point (Point 1, Point 2, ...)
- For each point:
  - \"Previous State\" (what was before?)
  - \"New State\" (what is new?)
  - \"Customer Benefits\"
- Clear, customer-oriented language
- When several sources are provided, treat each one as an individual function and list them separately

Now analyze this content and generate release notes following the template structure:
{content}
";

/// Fixed user turn sent after the system prompt.
pub const USER_INSTRUCTION: &str = "Generate release notes from the learned content";

/// Text of the reference release-notes document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceTemplate {
    text: String,
}

impl ReferenceTemplate {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Load a PDF or TXT reference document through the document extractor.
    ///
    /// # Errors
    ///
    /// - `NotesmithError::Io` when the file cannot be read
    /// - `ClassificationError` when it is not a supported document
    /// - `NotesmithError::Validation` for JSON or video files
    /// - `ExtractionError` when no text can be extracted
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let kind = classify(&filename, bytes.len() as u64, &SizeLimits::default())?;
        let MediaKind::Document(format) = kind else {
            return Err(NotesmithError::validation(format!(
                "Reference template must be a PDF or TXT document, got {}",
                kind
            )));
        };

        let text = extract_document(&bytes, format, &filename)?;
        tracing::debug!(path = %path.display(), chars = text.chars().count(), "Loaded reference template");
        Ok(Self { text })
    }

    /// Load the template, or use an empty one if `path` is absent or unusable.
    pub fn load_or_empty(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match Self::load(path) {
            Ok(template) => template,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Reference template unavailable, continuing without it");
                Self::default()
            }
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Prompt sent to the generation model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptPayload {
    pub system_prompt: String,
    pub user_prompt: String,
    /// Filenames of the inputs, in order
    pub sources: Vec<String>,
}

impl PromptPayload {
    /// Fill [`SYSTEM_TEMPLATE`] from normalized inputs.
    ///
    /// A single input is inserted verbatim. Several inputs are each placed
    /// under their own `### Source n` heading so the model treats them as
    /// separate functions.
    ///
    /// # Errors
    ///
    /// Returns `NotesmithError::Validation` when `inputs` is empty.
    pub fn build(template: &ReferenceTemplate, inputs: &[NormalizedInput]) -> Result<Self> {
        let content = match inputs {
            [] => return Err(NotesmithError::validation("At least one normalized input is required")),
            [single] => single.text.clone(),
            many => many
                .iter()
                .enumerate()
                .map(|(i, input)| {
                    format!(
                        "### Source {}: {} (language: {})\n{}",
                        i + 1,
                        input.filename,
                        input.language,
                        input.text
                    )
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
        };

        Ok(Self {
            system_prompt: render_template(
                SYSTEM_TEMPLATE,
                &[("template_content", template.text()), ("content", &content)],
            ),
            user_prompt: USER_INSTRUCTION.to_string(),
            sources: inputs.iter().map(|i| i.filename.clone()).collect(),
        })
    }
}

/// Substitute `{name}` placeholders in a single pass.
///
/// Inserted values are never rescanned, so user content containing a
/// placeholder is left as written. Only names present in `values` are
/// replaced; other `{...}` sequences are kept.
pub fn render_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + values.iter().map(|(_, v)| v.len()).sum::<usize>());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let replacement = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });

        match replacement {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
