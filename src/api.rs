// src/api.rs
//! HTTP surface of the landing provider: snapshot reads and refresh triggers.

use std::sync::Arc;

use shuttle_axum::axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::feeds::provider::{CategoryRefresh, LandingProvider, LandingSnapshot, RefreshOutcome};
use crate::feeds::types::Item;

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<LandingProvider>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/landing", get(landing_snapshot))
        .route("/landing/main", get(landing_main))
        .route("/landing/{key}", get(landing_by_key))
        .route("/refresh", post(refresh_landing_pages))
        .route("/refresh/{category}", post(refresh_category))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn landing_snapshot(State(state): State<AppState>) -> Json<LandingSnapshot> {
    Json(state.provider.snapshot())
}

async fn landing_main(State(state): State<AppState>) -> Json<Vec<Item>> {
    Json(state.provider.main_list())
}

async fn landing_by_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Vec<Item>>, StatusCode> {
    state
        .provider
        .filtered(&key)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn refresh_landing_pages(State(state): State<AppState>) -> Json<RefreshOutcome> {
    let outcome = state.provider.refresh_all().await;
    tracing::debug!(target: "api", ?outcome, "refresh requested");
    Json(outcome)
}

async fn refresh_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Json<CategoryRefresh> {
    Json(state.provider.refresh_one(&category).await)
}
