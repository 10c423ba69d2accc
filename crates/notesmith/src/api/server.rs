//! API server setup and configuration.

use std::net::{IpAddr, SocketAddr};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::{NotesmithError, Result};

use super::{
    handlers::{generate_handler, health_handler, languages_handler, normalize_handler},
    types::{ApiSizeLimits, ApiState},
};

/// Read `NOTESMITH_MAX_REQUEST_BODY_BYTES`, falling back to `fallback`.
fn size_limits_from_env(fallback: ApiSizeLimits) -> ApiSizeLimits {
    match std::env::var("NOTESMITH_MAX_REQUEST_BODY_BYTES") {
        Ok(value) => match value.parse::<usize>() {
            Ok(bytes) if bytes > 0 => {
                tracing::info!(bytes, "Request body limit configured from environment");
                ApiSizeLimits::new(bytes)
            }
            _ => {
                tracing::warn!(
                    "Ignoring NOTESMITH_MAX_REQUEST_BODY_BYTES='{}', must be a positive integer",
                    value
                );
                fallback
            }
        },
        Err(_) => fallback,
    }
}

fn cors_layer() -> CorsLayer {
    if let Ok(origins_str) = std::env::var("NOTESMITH_CORS_ORIGINS") {
        let origins: Vec<_> = origins_str
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();

        if !origins.is_empty() {
            tracing::info!("CORS configured with {} explicit allowed origin(s)", origins.len());
            return CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any);
        }
        tracing::warn!("NOTESMITH_CORS_ORIGINS set but empty or invalid, allowing all origins");
    }

    CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
}

/// Create the API router with limits derived from the pipeline configuration.
pub fn create_router(state: ApiState) -> Router {
    let limits = ApiSizeLimits::for_config(state.normalizer.config());
    create_router_with_limits(state, limits)
}

/// Create the API router with explicit request body limits.
///
/// ```no_run
/// use notesmith::api::{ApiSizeLimits, ApiState, create_router_with_limits};
/// use notesmith::transcription::UnconfiguredEngine;
/// use notesmith::{Normalizer, PipelineConfig};
/// use std::sync::Arc;
///
/// # fn main() -> notesmith::Result<()> {
/// let normalizer = Normalizer::new(PipelineConfig::default(), Arc::new(UnconfiguredEngine::new("disabled")))?;
/// let router = create_router_with_limits(ApiState::new(normalizer), ApiSizeLimits::from_mb(20));
/// # Ok(())
/// # }
/// ```
pub fn create_router_with_limits(state: ApiState, limits: ApiSizeLimits) -> Router {
    Router::new()
        .route("/normalize", post(normalize_handler))
        .route("/generate-release-notes", post(generate_handler))
        .route("/languages", get(languages_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(limits.max_request_body_bytes))
        .layer(RequestBodyLimitLayer::new(limits.max_request_body_bytes))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the API server.
///
/// # Environment Variables
///
/// ```bash
/// export NOTESMITH_CORS_ORIGINS="https://app.example.com"
/// export NOTESMITH_MAX_REQUEST_BODY_BYTES=104857600
/// ```
pub async fn serve(host: impl AsRef<str>, port: u16, state: ApiState) -> Result<()> {
    let ip: IpAddr = host
        .as_ref()
        .parse()
        .map_err(|e| NotesmithError::validation(format!("Invalid host address: {}", e)))?;

    let addr = SocketAddr::new(ip, port);
    let limits = size_limits_from_env(ApiSizeLimits::for_config(state.normalizer.config()));
    let app = create_router_with_limits(state, limits);

    tracing::info!("Starting Notesmith API server on http://{}:{}", ip, port);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(NotesmithError::Io)?;

    axum::serve(listener, app)
        .await
        .map_err(|e| NotesmithError::Other(e.to_string()))?;

    Ok(())
}
