//! Shared models and types
//!
//! Types shared across modules and on the wire (backend events, admin API)
//! to avoid circular dependencies.

use serde::{Deserialize, Serialize};

/// Zone polygon: ordered list of [x, y] points. Fewer than 3 points means
/// the polygon contains nothing.
pub type ZonePolygon = Vec<[i32; 2]>;

/// Camera stream connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraStatus {
    /// Not started or explicitly stopped
    Stopped,
    /// Attempting to open the capture source
    Connecting,
    /// Processing frames
    Running,
    /// Stream fault or reconnect attempts exhausted
    Error,
}

/// Axis-aligned bounding box (pixel coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Box center point
    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }
}

/// A single object detection for one frame. No identity; `track_id` is
/// filled in best-effort after tracker association for outbound events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: i64,
    pub class_name: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
    #[serde(default)]
    pub track_id: Option<u64>,
}

/// Detection event posted to the backend for each processed frame with
/// detections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub camera_id: String,
    pub location_id: String,
    pub timestamp: String,
    pub frame_number: u64,
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub snapshot_b64: Option<String>,
}

/// Loss-prevention alert: a tracked item left the scan area without a scan
/// event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonScanAlert {
    pub camera_id: String,
    pub location_id: String,
    pub timestamp: String,
    pub track_id: u64,
    pub class_name: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
    #[serde(default)]
    pub snapshot_b64: Option<String>,
    pub description: String,
}

/// Periodic engine heartbeat posted to the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heartbeat {
    pub cameras: usize,
    pub active: usize,
    pub uptime_seconds: f64,
}

/// Per-camera configuration consumed at registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    pub camera_id: String,
    pub location_id: String,
    pub rtsp_url: String,
    #[serde(default)]
    pub scan_zone: Option<ZonePolygon>,
    #[serde(default)]
    pub exit_zone: Option<ZonePolygon>,
}

/// Read-only camera status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraInfo {
    pub camera_id: String,
    pub location_id: String,
    pub status: CameraStatus,
    pub fps: f32,
    pub frame_count: u64,
    pub detection_count: u64,
    pub reconnect_attempts: u32,
    #[serde(default)]
    pub last_detection: Option<String>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub cameras: usize,
    pub active_streams: usize,
    pub model_loaded: bool,
    pub uptime_seconds: f64,
}

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
