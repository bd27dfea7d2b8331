//! Engine configuration
//!
//! Environment-driven settings with defaults. All variables use the `CV_`
//! prefix, e.g. `CV_FRAME_SKIP=5`.

use std::str::FromStr;

/// Engine settings, consumed at construction by every component
#[derive(Debug, Clone)]
pub struct Settings {
    /// Backend base URL for detections/alerts/heartbeats
    pub backend_url: String,
    /// API key sent as `X-API-Key`
    pub api_key: String,
    /// Admin API bind host
    pub host: String,
    /// Admin API bind port
    pub port: u16,

    /// Process every Nth raw frame
    pub frame_skip: u64,
    /// Seconds to wait before reconnecting a dropped stream
    pub reconnect_delay_secs: u64,
    /// Reconnect attempts before a camera goes terminally to error
    pub max_reconnect_attempts: u32,

    /// High-confidence threshold for track association stage 1
    pub track_high_thresh: f32,
    /// Low-confidence floor; detections below are discarded
    pub track_low_thresh: f32,
    /// Association distance threshold (accept when IoU >= 1 - match_thresh)
    pub match_thresh: f32,
    /// Frames a lost track is retained before pruning
    pub track_buffer: u32,

    /// Consecutive frames outside the scan zone before alerting
    pub scan_zone_exit_frames: u32,
    /// Minimum frames observed before a track may alert
    pub min_track_length: u32,
    /// Minimum seconds between alerts for one tracked item
    pub cooldown_seconds: f64,

    /// Bounded depth of the fire-and-forget report queue
    pub report_queue_depth: usize,
    /// Seconds between backend heartbeats
    pub heartbeat_interval_secs: u64,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: std::env::var("CV_BACKEND_URL")
                .unwrap_or_else(|_| "http://backend:3000".to_string()),
            api_key: std::env::var("CV_API_KEY").unwrap_or_default(),
            host: std::env::var("CV_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("CV_PORT", 8090),
            frame_skip: env_or("CV_FRAME_SKIP", 3),
            reconnect_delay_secs: env_or("CV_RECONNECT_DELAY", 5),
            max_reconnect_attempts: env_or("CV_MAX_RECONNECT_ATTEMPTS", 50),
            track_high_thresh: env_or("CV_TRACK_HIGH_THRESH", 0.5),
            track_low_thresh: env_or("CV_TRACK_LOW_THRESH", 0.1),
            match_thresh: env_or("CV_MATCH_THRESH", 0.8),
            track_buffer: env_or("CV_TRACK_BUFFER", 30),
            scan_zone_exit_frames: env_or("CV_SCAN_ZONE_EXIT_FRAMES", 20),
            min_track_length: env_or("CV_MIN_TRACK_LENGTH", 10),
            cooldown_seconds: env_or("CV_COOLDOWN_SECONDS", 5.0),
            report_queue_depth: env_or("CV_REPORT_QUEUE_DEPTH", 256),
            heartbeat_interval_secs: env_or("CV_HEARTBEAT_INTERVAL", 30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.frame_skip, 3);
        assert_eq!(s.track_buffer, 30);
        assert_eq!(s.scan_zone_exit_frames, 20);
        assert!((s.match_thresh - 0.8).abs() < f32::EPSILON);
    }
}
