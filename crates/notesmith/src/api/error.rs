//! Mapping of pipeline errors onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::{ClassificationError, NotesmithError};

use super::types::ErrorResponse;

/// An HTTP error carrying a JSON [`ErrorResponse`].
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, error_type: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error_type: error_type.to_string(),
                message: message.into(),
                stage: None,
                status_code: status.as_u16(),
            },
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "ValidationError", message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "ServiceUnavailable", message)
    }
}

/// HTTP status and error type name for a pipeline error.
pub fn status_for(error: &NotesmithError) -> (StatusCode, &'static str) {
    match error {
        NotesmithError::Classification(ClassificationError::UnsupportedType { .. }) => {
            (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UnsupportedType")
        }
        NotesmithError::Classification(ClassificationError::TooLarge { .. }) => {
            (StatusCode::PAYLOAD_TOO_LARGE, "TooLarge")
        }
        NotesmithError::Extraction(_) => (StatusCode::UNPROCESSABLE_ENTITY, "ExtractionError"),
        NotesmithError::Transcription(_) => (StatusCode::UNPROCESSABLE_ENTITY, "TranscriptionError"),
        NotesmithError::Validation { .. } => (StatusCode::BAD_REQUEST, "ValidationError"),
        NotesmithError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "Timeout"),
        NotesmithError::Engine { .. } => (StatusCode::BAD_GATEWAY, "EngineError"),
        NotesmithError::Generation { .. } => (StatusCode::BAD_GATEWAY, "GenerationError"),
        NotesmithError::MissingDependency(_) => (StatusCode::SERVICE_UNAVAILABLE, "MissingDependency"),
        NotesmithError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IoError"),
        NotesmithError::Serialization { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "SerializationError"),
        NotesmithError::Other(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
    }
}

impl From<NotesmithError> for ApiError {
    fn from(error: NotesmithError) -> Self {
        let (status, error_type) = status_for(&error);
        if status.is_server_error() {
            tracing::error!(error = %error, "Request failed");
        } else {
            tracing::debug!(error = %error, "Request rejected");
        }

        let mut api_error = Self::new(status, error_type, error.to_string());
        api_error.body.stage = error.stage().map(|s| s.to_string());
        api_error
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(error: axum::extract::multipart::MultipartError) -> Self {
        let status = error.status();
        let error_type = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "TooLarge"
        } else {
            "ValidationError"
        };
        Self::new(status, error_type, error.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExtractionError, TranscriptionError};
    use crate::types::{DocumentFormat, MediaCategory, MediaKind};

    #[test]
    fn test_classification_statuses() {
        let unsupported: NotesmithError = ClassificationError::UnsupportedType {
            filename: "a.docx".to_string(),
            extension: "docx".to_string(),
        }
        .into();
        assert_eq!(status_for(&unsupported).0, StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let too_large: NotesmithError = ClassificationError::TooLarge {
            filename: "a.mp4".to_string(),
            size: 2,
            limit: 1,
            category: MediaCategory::Video,
        }
        .into();
        assert_eq!(status_for(&too_large).0, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_content_errors_are_unprocessable() {
        let empty: NotesmithError = ExtractionError::Empty {
            filename: "a.txt".to_string(),
            byte_len: 3,
            kind: MediaKind::Document(DocumentFormat::Txt),
        }
        .into();
        let api_error = ApiError::from(empty);
        assert_eq!(api_error.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(api_error.body.stage.as_deref(), Some("extracted"));

        let silent: NotesmithError = TranscriptionError::Empty {
            filename: "a.mp4".to_string(),
        }
        .into();
        assert_eq!(status_for(&silent).0, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_timeout_is_gateway_timeout() {
        let err = NotesmithError::Timeout {
            filename: "a.mp4".to_string(),
            seconds: 600,
        };
        assert_eq!(status_for(&err).0, StatusCode::GATEWAY_TIMEOUT);
    }
}
