//! Application state
//!
//! Shared components handed to the admin API handlers.

use crate::config::Settings;
use crate::detector::Detector;
use crate::fleet::FleetController;
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Engine settings
    pub settings: Settings,
    /// Camera fleet
    pub fleet: Arc<FleetController>,
    /// Detection model boundary (for health reporting)
    pub detector: Arc<dyn Detector>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    pub fn uptime_seconds(&self) -> f64 {
        let secs = self.started_at.elapsed().as_secs_f64();
        (secs * 10.0).round() / 10.0
    }
}
