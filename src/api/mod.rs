//! Read-only HTTP API
//!
//! Serves corpus metadata, diagnostics and theme listings next to the
//! WebSocket server:
//! - `GET /heartbeat` liveness probe
//! - `GET /sources`, `/languages`, `/writers` corpus metadata
//! - `GET /about` version and host diagnostics
//! - `GET /themes/presenter`, `/themes/overlay` theme names

pub mod handlers;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::corpus::SharedCorpus;
use crate::paths::AppPaths;
use crate::PresenterError;

/// Shared state for API handlers
pub struct ApiState {
    pub corpus: SharedCorpus,
    pub paths: AppPaths,
}

impl ApiState {
    pub fn new(corpus: SharedCorpus, paths: AppPaths) -> Self {
        Self { corpus, paths }
    }
}

/// Error response: status code plus plain-text message
pub struct ApiError(PresenterError);

impl From<PresenterError> for ApiError {
    fn from(e: PresenterError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            PresenterError::ContentNotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!("API request failed: {}", self.0);
        (status, self.0.to_string()).into_response()
    }
}

/// Build the API router with all routes.
pub fn router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/heartbeat", get(handlers::about::heartbeat))
        .route("/about", get(handlers::about::about))
        // Corpus metadata
        .route("/sources", get(handlers::corpus::sources))
        .route("/languages", get(handlers::corpus::languages))
        .route("/writers", get(handlers::corpus::writers))
        // Themes
        .route("/themes/presenter", get(handlers::themes::presenter_themes))
        .route("/themes/overlay", get(handlers::themes::overlay_themes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
