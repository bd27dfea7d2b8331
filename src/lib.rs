//! ScanGuard CV Engine
//!
//! Per-camera loss-prevention pipeline: ingest live video streams, detect
//! objects frame-by-frame, keep per-object identity across frames, and raise
//! an alert when a tracked item leaves the scan area without a checkout
//! event.
//!
//! ## Architecture
//!
//! 1. Tracker - greedy two-stage IoU multi-object tracking
//! 2. ZoneAlertEngine - per-track scan/exit zone state machine
//! 3. StreamSupervisor - per-camera capture loop with reconnect
//! 4. FleetController - supervisor collection behind the admin surface
//! 5. BackendClient - bounded fire-and-forget outbound reporting
//! 6. Capture / Detector - opaque boundaries to decoding and inference
//! 7. WebApi - admin REST endpoints

pub mod backend_client;
pub mod capture;
pub mod config;
pub mod detector;
pub mod error;
pub mod fleet;
pub mod models;
pub mod state;
pub mod stream_supervisor;
pub mod tracker;
pub mod web_api;
pub mod zone_alert;

pub use config::Settings;
pub use error::{Error, Result};
pub use state::AppState;
