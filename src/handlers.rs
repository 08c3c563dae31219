//! HTTP route handlers for the lookup service.

use crate::models::SearchResponse;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::debug;

#[derive(Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

/// `GET /search?query=...`. Never fails: an absent or empty query gets the
/// same prompt row as a blank search.
pub async fn search(
    Query(params): Query<SearchQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<SearchResponse> {
    let query = params.query.unwrap_or_default();
    let response = state.bible.search(&query);
    debug!(query = %query, items = response.items.len(), "search");
    Json(response)
}

/// Routes with permissive CORS, so the preview can call in from any origin.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/search", get(search))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
