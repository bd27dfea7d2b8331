//! Zone alert engine
//!
//! ## Responsibilities
//!
//! - Per-track dwell accounting against the scan and exit polygons
//! - Deciding when a tracked item has left the scan area without a scan
//!   event (the non-scan alert condition)
//! - Stale record cleanup, independent of the tracker's own retention
//!
//! The engine is fed once per processed frame with the tracker's active set
//! and the camera's current zones. Degenerate input (no tracks, missing or
//! sub-3-vertex polygons) is normal and never an error.

mod geometry;

pub use geometry::point_in_polygon;

use crate::config::Settings;
use crate::models::{BoundingBox, ZonePolygon};
use crate::tracker::Track;
use std::collections::HashMap;
use std::time::Instant;

/// Records not seen for this long are dropped once their track disappears
const STALE_SECS: u64 = 60;

/// Per-track dwell record, keyed by track id
#[derive(Debug, Clone)]
pub struct TrackedItem {
    pub track_id: u64,
    pub class_name: String,
    pub class_id: i64,
    pub first_seen: Instant,
    pub last_seen: Instant,
    /// Consecutive frames classified inside the scan zone
    pub frames_in_scan_zone: u32,
    /// Consecutive frames classified outside; reset to 0 whenever a frame
    /// lands inside the scan zone
    pub frames_outside_scan_zone: u32,
    pub total_frames: u32,
    /// Once set, this record never alerts again (single alert per record
    /// lifetime; the cooldown only gates the first alert)
    pub alerted: bool,
    pub last_alert: Option<Instant>,
    pub last_bbox: BoundingBox,
    pub last_confidence: f32,
}

/// Zone alert state for one camera
pub struct ZoneAlertEngine {
    scan_zone_exit_frames: u32,
    min_track_length: u32,
    cooldown_seconds: f64,
    tracked_items: HashMap<u64, TrackedItem>,
}

impl ZoneAlertEngine {
    pub fn new(scan_zone_exit_frames: u32, min_track_length: u32, cooldown_seconds: f64) -> Self {
        Self {
            scan_zone_exit_frames,
            min_track_length,
            cooldown_seconds,
            tracked_items: HashMap::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.scan_zone_exit_frames,
            settings.min_track_length,
            settings.cooldown_seconds,
        )
    }

    /// Process the current active tracks and return the records that newly
    /// qualify for an alert this cycle.
    pub fn update(
        &mut self,
        tracks: &[Track],
        scan_zone: Option<&ZonePolygon>,
        exit_zone: Option<&ZonePolygon>,
    ) -> Vec<TrackedItem> {
        self.update_at(Instant::now(), tracks, scan_zone, exit_zone)
    }

    /// Clock-injected variant of [`update`](Self::update); tests drive `now`
    /// to exercise cooldown and staleness without sleeping.
    pub fn update_at(
        &mut self,
        now: Instant,
        tracks: &[Track],
        scan_zone: Option<&ZonePolygon>,
        exit_zone: Option<&ZonePolygon>,
    ) -> Vec<TrackedItem> {
        let mut alerts = Vec::new();

        for track in tracks {
            let item = self
                .tracked_items
                .entry(track.track_id)
                .or_insert_with(|| TrackedItem {
                    track_id: track.track_id,
                    class_name: track.class_name.clone(),
                    class_id: track.class_id,
                    first_seen: now,
                    last_seen: now,
                    frames_in_scan_zone: 0,
                    frames_outside_scan_zone: 0,
                    total_frames: 0,
                    alerted: false,
                    last_alert: None,
                    last_bbox: track.bbox,
                    last_confidence: track.confidence,
                });

            item.last_seen = now;
            item.total_frames += 1;
            item.last_bbox = track.bbox;
            item.last_confidence = track.confidence;

            let center = track.bbox.center();
            // No scan zone configured disables the boundary: everything
            // counts as inside
            let in_scan = scan_zone.map_or(true, |z| point_in_polygon(center, z));
            let in_exit = exit_zone.is_some_and(|z| point_in_polygon(center, z));

            if in_scan {
                item.frames_in_scan_zone += 1;
                item.frames_outside_scan_zone = 0;
            } else if in_exit || (scan_zone.is_none() && exit_zone.is_none()) {
                item.frames_outside_scan_zone += 1;
            }

            let cooldown_ok = item.last_alert.map_or(true, |t| {
                now.duration_since(t).as_secs_f64() >= self.cooldown_seconds
            });

            if item.frames_outside_scan_zone >= self.scan_zone_exit_frames
                && item.total_frames >= self.min_track_length
                && item.frames_in_scan_zone > 0
                && !item.alerted
                && cooldown_ok
            {
                item.alerted = true;
                item.last_alert = Some(now);
                alerts.push(item.clone());
            }
        }

        // Drop records whose track vanished and went stale
        self.tracked_items.retain(|id, item| {
            tracks.iter().any(|t| t.track_id == *id)
                || now.duration_since(item.last_seen).as_secs() <= STALE_SECS
        });

        alerts
    }

    /// Clear all records. Used on camera restart.
    pub fn reset(&mut self) {
        self.tracked_items.clear();
    }

    /// Number of retained records
    pub fn item_count(&self) -> usize {
        self.tracked_items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn track(id: u64, cx: f32, cy: f32) -> Track {
        Track {
            track_id: id,
            bbox: BoundingBox::new(cx - 10.0, cy - 10.0, cx + 10.0, cy + 10.0),
            confidence: 0.9,
            class_id: 0,
            class_name: "item".to_string(),
            age: 0,
            hits: 1,
            time_since_update: 0,
            activated: true,
        }
    }

    fn scan() -> ZonePolygon {
        vec![[0, 0], [100, 0], [100, 100], [0, 100]]
    }

    fn exit() -> ZonePolygon {
        vec![[200, 0], [300, 0], [300, 100], [200, 100]]
    }

    fn engine() -> ZoneAlertEngine {
        // exit after 3 outside frames, min 5 total, 5 s cooldown
        ZoneAlertEngine::new(3, 5, 5.0)
    }

    #[test]
    fn test_scan_then_exit_alerts_exactly_once() {
        let mut e = engine();
        let now = Instant::now();
        let (scan, exit) = (scan(), exit());

        // 4 frames inside the scan zone
        for i in 0..4 {
            let alerts = e.update_at(
                now + Duration::from_millis(i * 100),
                &[track(1, 50.0, 50.0)],
                Some(&scan),
                Some(&exit),
            );
            assert!(alerts.is_empty());
        }

        // Leave to the exit zone
        let mut fired = 0;
        for i in 4..10 {
            let alerts = e.update_at(
                now + Duration::from_millis(i * 100),
                &[track(1, 250.0, 50.0)],
                Some(&scan),
                Some(&exit),
            );
            fired += alerts.len();
        }
        assert_eq!(fired, 1, "exactly one alert per qualifying exit");
    }

    #[test]
    fn test_alerted_record_never_rearms() {
        // The alerted flag is never cleared: this is intentional
        // single-alert-per-record behavior, and the cooldown alone does not
        // re-arm a record even long after it has elapsed.
        let mut e = engine();
        let now = Instant::now();
        let (scan, exit) = (scan(), exit());

        for i in 0..4 {
            e.update_at(
                now + Duration::from_millis(i * 100),
                &[track(1, 50.0, 50.0)],
                Some(&scan),
                Some(&exit),
            );
        }
        let mut fired = 0;
        for i in 4..10 {
            fired += e
                .update_at(
                    now + Duration::from_millis(i * 100),
                    &[track(1, 250.0, 50.0)],
                    Some(&scan),
                    Some(&exit),
                )
                .len();
        }
        assert_eq!(fired, 1);

        // Re-enter the scan zone, then exit again well past the cooldown
        let later = now + Duration::from_secs(60);
        for i in 0..4 {
            e.update_at(
                later + Duration::from_millis(i * 100),
                &[track(1, 50.0, 50.0)],
                Some(&scan),
                Some(&exit),
            );
        }
        for i in 4..10 {
            fired += e
                .update_at(
                    later + Duration::from_millis(i * 100),
                    &[track(1, 250.0, 50.0)],
                    Some(&scan),
                    Some(&exit),
                )
                .len();
        }
        assert_eq!(fired, 1, "a record alerts at most once in its lifetime");
    }

    #[test]
    fn test_never_in_scan_zone_never_alerts() {
        let mut e = engine();
        let now = Instant::now();
        let (scan, exit) = (scan(), exit());

        // Lives in the exit zone from the start; piles up outside frames
        for i in 0..50 {
            let alerts = e.update_at(
                now + Duration::from_millis(i * 100),
                &[track(1, 250.0, 50.0)],
                Some(&scan),
                Some(&exit),
            );
            assert!(alerts.is_empty());
        }
    }

    #[test]
    fn test_reentering_scan_zone_resets_outside_counter() {
        let mut e = engine();
        let now = Instant::now();
        let (scan, exit) = (scan(), exit());

        for i in 0..4 {
            e.update_at(now, &[track(1, 50.0, 50.0)], Some(&scan), Some(&exit));
            let _ = i;
        }
        // Two frames out, then back in; the outside counter must restart
        e.update_at(now, &[track(1, 250.0, 50.0)], Some(&scan), Some(&exit));
        e.update_at(now, &[track(1, 250.0, 50.0)], Some(&scan), Some(&exit));
        e.update_at(now, &[track(1, 50.0, 50.0)], Some(&scan), Some(&exit));

        // Two more outside frames: still below the 3-frame threshold
        for _ in 0..2 {
            let alerts = e.update_at(now, &[track(1, 250.0, 50.0)], Some(&scan), Some(&exit));
            assert!(alerts.is_empty());
        }
    }

    #[test]
    fn test_min_track_length_gates_alert() {
        let mut e = ZoneAlertEngine::new(1, 10, 5.0);
        let now = Instant::now();
        let (scan, exit) = (scan(), exit());

        e.update_at(now, &[track(1, 50.0, 50.0)], Some(&scan), Some(&exit));
        // Qualifying exit, but only 2 total frames observed
        let alerts = e.update_at(now, &[track(1, 250.0, 50.0)], Some(&scan), Some(&exit));
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_no_zones_configured_counts_as_inside() {
        let mut e = engine();
        let now = Instant::now();
        for _ in 0..50 {
            let alerts = e.update_at(now, &[track(1, 250.0, 50.0)], None, None);
            assert!(alerts.is_empty(), "zone logic disabled without a scan zone");
        }
        assert_eq!(e.item_count(), 1);
    }

    #[test]
    fn test_stale_records_collected() {
        let mut e = engine();
        let now = Instant::now();
        e.update_at(now, &[track(1, 50.0, 50.0)], None, None);
        assert_eq!(e.item_count(), 1);

        // Track gone but not yet stale
        e.update_at(now + Duration::from_secs(30), &[], None, None);
        assert_eq!(e.item_count(), 1);

        // Past the 60 s staleness window
        e.update_at(now + Duration::from_secs(61), &[], None, None);
        assert_eq!(e.item_count(), 0);
    }

    #[test]
    fn test_reset_clears_records() {
        let mut e = engine();
        e.update(&[track(1, 50.0, 50.0)], None, None);
        e.reset();
        assert_eq!(e.item_count(), 0);
    }
}
