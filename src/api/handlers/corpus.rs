//! Corpus metadata handlers.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::{ApiError, ApiState};
use crate::corpus::{group_sources, query, Language, SourcesResponse, Writer};

#[derive(Serialize)]
pub struct LanguagesResponse {
    pub languages: Vec<Language>,
}

#[derive(Serialize)]
pub struct WritersResponse {
    pub writers: Vec<Writer>,
}

/// Sources with translation sources grouped by language, plus one
/// recommended translation source per language.
pub async fn sources(State(state): State<Arc<ApiState>>) -> Result<Json<SourcesResponse>, ApiError> {
    let sources = query(&state.corpus, |corpus| corpus.sources()).await?;
    Ok(Json(group_sources(sources)))
}

pub async fn languages(State(state): State<Arc<ApiState>>) -> Result<Json<LanguagesResponse>, ApiError> {
    let languages = query(&state.corpus, |corpus| corpus.languages()).await?;
    Ok(Json(LanguagesResponse { languages }))
}

pub async fn writers(State(state): State<Arc<ApiState>>) -> Result<Json<WritersResponse>, ApiError> {
    let writers = query(&state.corpus, |corpus| corpus.writers()).await?;
    Ok(Json(WritersResponse { writers }))
}
