//! Release-notes generation step.
//!
//! Consumes [`NormalizedInput`]s produced by the normalizer: fills the system
//! template, calls a [`ReleaseNotesGenerator`] and hands the result to an
//! optional [`HistorySink`].

pub mod client;
pub mod history;
pub mod prompt;

pub use client::{GeneratedNotes, OpenAiChatGenerator, ReleaseNotesGenerator, TokenUsage};
pub use history::{GenerationRecord, HistorySink, JsonlHistory, MemoryHistory};
pub use prompt::{PromptPayload, ReferenceTemplate, SYSTEM_TEMPLATE, USER_INSTRUCTION, render_template};

use crate::Result;
use crate::types::NormalizedInput;

/// Generate release notes for `inputs` and record them.
///
/// A failing history sink is logged and does not fail the generation.
pub async fn generate_release_notes(
    generator: &dyn ReleaseNotesGenerator,
    template: &ReferenceTemplate,
    inputs: &[NormalizedInput],
    history: Option<&dyn HistorySink>,
    user_id: Option<String>,
) -> Result<GeneratedNotes> {
    let payload = PromptPayload::build(template, inputs)?;
    let notes = generator.generate(&payload).await?;

    tracing::info!(
        generator = generator.name(),
        sources = inputs.len(),
        total_tokens = notes.token_usage.map(|u| u.total_tokens),
        "Generated release notes"
    );

    if let Some(sink) = history {
        let record = GenerationRecord::new(user_id, inputs, &notes);
        if let Err(e) = sink.record(&record).await {
            tracing::warn!(error = %e, "Failed to store generation record");
        }
    }

    Ok(notes)
}
