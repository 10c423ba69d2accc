//! HTTP upload surface.
//!
//! # Endpoints
//!
//! - `POST /normalize` - Normalize uploaded files (multipart `file` fields)
//! - `POST /generate-release-notes` - Normalize uploads and generate release notes
//! - `GET /languages` - Supported language codes
//! - `GET /health` - Health check
//!
//! Pipeline errors map onto status codes: unsupported types give 415, oversized
//! uploads 413, undecodable or empty content 422, malformed requests 400 and
//! requests exceeding the processing budget 504.
//!
//! # cURL Examples
//!
//! ```bash
//! curl -F "file=@changes.json" http://localhost:8000/normalize
//! curl -F "file=@demo.mp4" -F "file=@notes.pdf" -F "user_id=42" \
//!      http://localhost:8000/generate-release-notes
//! ```

mod error;
mod handlers;
mod server;
mod types;

pub use error::{ApiError, status_for};
pub use server::{create_router, create_router_with_limits, serve};
pub use types::{
    ApiSizeLimits, ApiState, ErrorResponse, GenerateResponse, HealthResponse, LanguageInfo, LanguagesResponse,
    NormalizeResponse, NormalizedSummary,
};
