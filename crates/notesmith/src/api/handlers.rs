//! API request handlers.

use axum::{
    Json,
    extract::{Multipart, State},
};

use crate::generation::generate_release_notes;
use crate::types::{NormalizedInput, SUPPORTED_LANGUAGES, UploadArtifact};

use super::{
    error::ApiError,
    types::{
        ApiState, GenerateResponse, HealthResponse, LanguageInfo, LanguagesResponse, NormalizeResponse,
        NormalizedSummary,
    },
};

/// Uploaded files plus the optional `user_id` form field.
struct UploadForm {
    artifacts: Vec<UploadArtifact>,
    user_id: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut artifacts = Vec::new();
    let mut user_id = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" | "files" => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|name| !name.trim().is_empty())
                    .ok_or_else(|| ApiError::validation("Uploaded file has no filename"))?;
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await?;

                let mut artifact = UploadArtifact::new(filename, data.to_vec());
                if let Some(mime) = content_type {
                    artifact = artifact.with_declared_mime(mime);
                }
                artifacts.push(artifact);
            }
            "user_id" => {
                let value = field.text().await?;
                let value = value.trim();
                if !value.is_empty() {
                    user_id = Some(value.to_string());
                }
            }
            _ => {}
        }
    }

    if artifacts.is_empty() {
        return Err(ApiError::validation("No file provided; send it in the 'file' form field"));
    }

    Ok(UploadForm { artifacts, user_id })
}

async fn normalize_all(state: &ApiState, artifacts: Vec<UploadArtifact>) -> Result<Vec<NormalizedInput>, ApiError> {
    if artifacts.len() == 1 {
        let mut artifacts = artifacts;
        let Some(artifact) = artifacts.pop() else {
            return Ok(Vec::new());
        };
        return Ok(vec![state.normalizer.normalize(artifact).await?]);
    }

    let results = state.normalizer.normalize_batch(artifacts).await;
    results
        .into_iter()
        .collect::<crate::Result<Vec<_>>>()
        .map_err(ApiError::from)
}

/// Normalize endpoint handler.
///
/// POST /normalize
///
/// Accepts multipart form data with one or more `file` fields and returns one
/// [`NormalizedInput`] per file, in upload order. The first failing file
/// determines the error response.
pub async fn normalize_handler(
    State(state): State<ApiState>,
    multipart: Multipart,
) -> Result<Json<NormalizeResponse>, ApiError> {
    let form = read_upload_form(multipart).await?;
    Ok(Json(normalize_all(&state, form.artifacts).await?))
}

/// Release-notes endpoint handler.
///
/// POST /generate-release-notes
///
/// Normalizes every uploaded `file`, then generates release notes from all of
/// them. An optional `user_id` field is attached to the history record.
pub async fn generate_handler(
    State(state): State<ApiState>,
    multipart: Multipart,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Some(generator) = state.generator.clone() else {
        return Err(ApiError::unavailable("Release-notes generation is not configured"));
    };

    let form = read_upload_form(multipart).await?;
    let inputs = normalize_all(&state, form.artifacts).await?;

    let notes = generate_release_notes(
        generator.as_ref(),
        &state.template,
        &inputs,
        state.history.as_deref(),
        form.user_id,
    )
    .await?;

    Ok(Json(GenerateResponse {
        success: true,
        content: notes.content,
        token_usage: notes.token_usage,
        sources: inputs.iter().map(NormalizedSummary::from).collect(),
    }))
}

/// Supported languages endpoint handler.
///
/// GET /languages
pub async fn languages_handler(State(state): State<ApiState>) -> Json<LanguagesResponse> {
    Json(LanguagesResponse {
        languages: SUPPORTED_LANGUAGES
            .iter()
            .map(|code| LanguageInfo {
                code: *code,
                name: code.english_name().to_string(),
            })
            .collect(),
        default: state.normalizer.config().language_detection.default_language,
    })
}

/// Health check endpoint handler.
///
/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
