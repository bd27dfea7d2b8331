//! API routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::models::{ApiResponse, CameraConfig, CameraInfo, ZonePolygon};
use crate::state::AppState;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Status
        .route("/health", get(super::health_check))
        // Cameras
        .route("/api/cameras", get(list_cameras))
        .route("/api/cameras", post(add_camera))
        .route("/api/cameras/bulk", post(add_cameras_bulk))
        .route("/api/cameras/start-all", post(start_all))
        .route("/api/cameras/stop-all", post(stop_all))
        .route("/api/cameras/:id", get(get_camera))
        .route("/api/cameras/:id", delete(remove_camera))
        .route("/api/cameras/:id/restart", post(restart_camera))
        .route("/api/cameras/:id/zones", put(update_zones))
        .with_state(state)
}

async fn list_cameras(State(state): State<AppState>) -> Json<Vec<CameraInfo>> {
    Json(state.fleet.list_cameras().await)
}

async fn get_camera(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.fleet.camera_info(&id).await {
        Ok(info) => Json(info).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn add_camera(
    State(state): State<AppState>,
    Json(config): Json<CameraConfig>,
) -> impl IntoResponse {
    match state.fleet.add_camera(config).await {
        Ok(info) => (StatusCode::CREATED, Json(info)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn add_cameras_bulk(
    State(state): State<AppState>,
    Json(configs): Json<Vec<CameraConfig>>,
) -> impl IntoResponse {
    let mut added = Vec::new();
    for config in configs {
        // Duplicates are skipped, not fatal, matching single-add semantics
        match state.fleet.add_camera(config).await {
            Ok(info) => added.push(info),
            Err(e) => tracing::warn!(error = %e, "Bulk camera add skipped entry"),
        }
    }
    (StatusCode::CREATED, Json(added)).into_response()
}

async fn remove_camera(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.fleet.remove_camera(&id).await {
        Ok(()) => Json(json!({"message": format!("Camera {id} removed")})).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn restart_camera(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.fleet.restart_camera(&id).await {
        Ok(info) => Json(ApiResponse::success(info)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Zone replacement request
#[derive(Debug, Deserialize)]
struct UpdateZonesRequest {
    #[serde(default)]
    scan_zone: Option<ZonePolygon>,
    #[serde(default)]
    exit_zone: Option<ZonePolygon>,
}

async fn update_zones(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateZonesRequest>,
) -> impl IntoResponse {
    if let Some(zone) = req.scan_zone.as_ref().or(req.exit_zone.as_ref()) {
        if !zone.is_empty() && zone.len() < 3 {
            tracing::warn!(
                camera_id = %id,
                points = zone.len(),
                "Zone has fewer than 3 points and will match nothing"
            );
        }
    }
    match state.fleet.update_zones(&id, req.scan_zone, req.exit_zone).await {
        Ok(()) => Json(json!({"message": format!("Zones updated for camera {id}")})).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn start_all(State(state): State<AppState>) -> impl IntoResponse {
    let n = state.fleet.start_all().await;
    Json(json!({"message": format!("Started {n} cameras")}))
}

async fn stop_all(State(state): State<AppState>) -> impl IntoResponse {
    let n = state.fleet.stop_all().await;
    Json(json!({"message": format!("Stopped {n} cameras")}))
}
