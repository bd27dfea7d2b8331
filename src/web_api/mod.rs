//! WebAPI - admin REST endpoints
//!
//! ## Responsibilities
//!
//! - Camera lifecycle (add, remove, restart, bulk, start/stop-all)
//! - Zone replacement for running cameras
//! - Health and status reporting

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (cameras, active_streams) = state.fleet.counts().await;
    let model_loaded = state.detector.is_loaded();

    let response = HealthResponse {
        status: if model_loaded { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cameras,
        active_streams,
        model_loaded,
        uptime_seconds: state.uptime_seconds(),
    };

    Json(response)
}
