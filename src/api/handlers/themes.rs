//! Theme listing handlers.

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::api::ApiState;
use crate::themes::{list_themes, ThemeKind};

async fn themes(state: Arc<ApiState>, kind: ThemeKind) -> Json<Vec<String>> {
    let names = tokio::task::spawn_blocking(move || list_themes(&state.paths, kind))
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Unable to list {:?} themes: {}", kind, e);
            Vec::new()
        });
    Json(names)
}

pub async fn presenter_themes(State(state): State<Arc<ApiState>>) -> Json<Vec<String>> {
    themes(state, ThemeKind::Presenter).await
}

pub async fn overlay_themes(State(state): State<Arc<ApiState>>) -> Json<Vec<String>> {
    themes(state, ThemeKind::Overlay).await
}
