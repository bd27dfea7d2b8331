//! Multi-object tracker
//!
//! ## Responsibilities
//!
//! - Stable per-object identity across frames
//! - Two-stage greedy IoU association (high-confidence detections first,
//!   low-confidence detections against the leftovers)
//! - Lost-track retention and pruning
//!
//! A bounded greedy IoU tracker in the ByteTrack shape; no motion model or
//! appearance re-identification. Tracks live in an arena keyed by id, with
//! the active and lost sets as derived views over `time_since_update`.

mod association;

pub use association::{associate, iou, Association};

use crate::config::Settings;
use crate::models::{BoundingBox, Detection};
use std::collections::HashMap;

/// A detected object's identity across frames
#[derive(Debug, Clone)]
pub struct Track {
    /// Monotonically assigned id, never reused within a process lifetime
    pub track_id: u64,
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class_id: i64,
    pub class_name: String,
    /// Frames since creation
    pub age: u32,
    /// Frames matched
    pub hits: u32,
    /// Frames since the last successful match; 0 while live
    pub time_since_update: u32,
    /// Ever matched at high confidence
    pub activated: bool,
}

impl Track {
    /// Absorb a matched detection. `with_class` carries the detection's
    /// class over (stage 1 only).
    fn absorb(&mut self, det: &Detection, with_class: bool) {
        self.bbox = det.bbox;
        self.confidence = det.confidence;
        if with_class {
            self.class_id = det.class_id;
            self.class_name = det.class_name.clone();
        }
        self.hits += 1;
        self.age += 1;
        self.time_since_update = 0;
        self.activated = true;
    }
}

/// IoU tracker state for one camera
pub struct IouTracker {
    high_thresh: f32,
    low_thresh: f32,
    match_thresh: f32,
    track_buffer: u32,
    next_id: u64,
    tracks: HashMap<u64, Track>,
}

impl IouTracker {
    pub fn new(high_thresh: f32, low_thresh: f32, match_thresh: f32, track_buffer: u32) -> Self {
        Self {
            high_thresh,
            low_thresh,
            match_thresh,
            track_buffer,
            next_id: 1,
            tracks: HashMap::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.track_high_thresh,
            settings.track_low_thresh,
            settings.match_thresh,
            settings.track_buffer,
        )
    }

    /// Update tracks with one frame's detections and return the active set.
    ///
    /// Ordering of the returned tracks is not significant.
    pub fn update(&mut self, detections: &[Detection]) -> Vec<Track> {
        if detections.is_empty() {
            // Age out live tracks; lost ones keep their counters until a
            // detection cycle touches them
            for track in self.tracks.values_mut() {
                if track.time_since_update == 0 {
                    track.time_since_update += 1;
                }
            }
            self.prune();
            return self.active_snapshot();
        }

        // Partition by confidence; detections below low_thresh are discarded
        let high_idx: Vec<usize> = detections
            .iter()
            .enumerate()
            .filter(|(_, d)| d.confidence >= self.high_thresh)
            .map(|(i, _)| i)
            .collect();
        let low_idx: Vec<usize> = detections
            .iter()
            .enumerate()
            .filter(|(_, d)| d.confidence >= self.low_thresh && d.confidence < self.high_thresh)
            .map(|(i, _)| i)
            .collect();

        // Candidates: active and lost tracks together, so a lost track can
        // be revived by a matching detection
        let mut candidate_ids: Vec<u64> = self.tracks.keys().copied().collect();
        candidate_ids.sort_unstable();
        let candidate_boxes: Vec<BoundingBox> = candidate_ids
            .iter()
            .map(|id| self.tracks[id].bbox)
            .collect();

        // Stage 1: high-confidence detections vs all candidates
        let high_boxes: Vec<BoundingBox> =
            high_idx.iter().map(|&i| detections[i].bbox).collect();
        let stage1 = associate(&candidate_boxes, &high_boxes, self.match_thresh);

        for &(t_i, d_i) in &stage1.matches {
            let id = candidate_ids[t_i];
            let det = &detections[high_idx[d_i]];
            if let Some(track) = self.tracks.get_mut(&id) {
                track.absorb(det, true);
            }
        }

        // Stage 2: low-confidence detections vs the tracks stage 1 left
        // unmatched. Class is not carried over; low-confidence detections
        // never create new tracks.
        let mut remaining_ids: Vec<u64> = stage1
            .unmatched_tracks
            .iter()
            .map(|&i| candidate_ids[i])
            .collect();

        if !low_idx.is_empty() && !remaining_ids.is_empty() {
            let remaining_boxes: Vec<BoundingBox> = remaining_ids
                .iter()
                .map(|id| self.tracks[id].bbox)
                .collect();
            let low_boxes: Vec<BoundingBox> =
                low_idx.iter().map(|&i| detections[i].bbox).collect();
            let stage2 = associate(&remaining_boxes, &low_boxes, self.match_thresh);

            for &(t_i, d_i) in &stage2.matches {
                let id = remaining_ids[t_i];
                let det = &detections[low_idx[d_i]];
                if let Some(track) = self.tracks.get_mut(&id) {
                    track.absorb(det, false);
                }
            }

            remaining_ids = stage2
                .unmatched_tracks
                .iter()
                .map(|&i| remaining_ids[i])
                .collect();
        }

        // Tracks unmatched after both stages age by one
        for id in &remaining_ids {
            if let Some(track) = self.tracks.get_mut(id) {
                track.time_since_update += 1;
            }
        }

        // Unmatched high-confidence detections spawn new tracks
        for &d_i in &stage1.unmatched_detections {
            let det = &detections[high_idx[d_i]];
            let track_id = self.next_id;
            self.next_id += 1;
            self.tracks.insert(
                track_id,
                Track {
                    track_id,
                    bbox: det.bbox,
                    confidence: det.confidence,
                    class_id: det.class_id,
                    class_name: det.class_name.clone(),
                    age: 0,
                    hits: 1,
                    time_since_update: 0,
                    activated: true,
                },
            );
        }

        self.prune();
        self.active_snapshot()
    }

    /// Clear all tracks and restart the id counter. Used on camera restart.
    pub fn reset(&mut self) {
        self.tracks.clear();
        self.next_id = 1;
    }

    /// Number of retained tracks (active and lost)
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    fn prune(&mut self) {
        let buffer = self.track_buffer;
        self.tracks.retain(|_, t| t.time_since_update <= buffer);
    }

    fn active_snapshot(&self) -> Vec<Track> {
        let mut active: Vec<Track> = self
            .tracks
            .values()
            .filter(|t| t.time_since_update == 0 && t.activated)
            .cloned()
            .collect();
        active.sort_unstable_by_key(|t| t.track_id);
        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32) -> Detection {
        Detection {
            class_id: 0,
            class_name: "item".to_string(),
            confidence,
            bbox: BoundingBox::new(x1, y1, x2, y2),
            track_id: None,
        }
    }

    fn tracker() -> IouTracker {
        IouTracker::new(0.5, 0.1, 0.8, 30)
    }

    #[test]
    fn test_high_confidence_detection_creates_track() {
        let mut t = tracker();
        let active = t.update(&[det(10.0, 10.0, 50.0, 50.0, 0.9)]);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].track_id, 1);
        assert_eq!(active[0].hits, 1);
        assert!(active[0].activated);
    }

    #[test]
    fn test_low_confidence_detection_never_creates_track() {
        let mut t = tracker();
        let active = t.update(&[det(10.0, 10.0, 50.0, 50.0, 0.3)]);
        assert!(active.is_empty());
        assert_eq!(t.track_count(), 0);
    }

    #[test]
    fn test_below_low_threshold_discarded() {
        let mut t = tracker();
        t.update(&[det(10.0, 10.0, 50.0, 50.0, 0.9)]);
        // A 0.05-confidence detection must not keep the track alive
        let active = t.update(&[det(10.0, 10.0, 50.0, 50.0, 0.05)]);
        assert!(active.is_empty());
    }

    #[test]
    fn test_stable_id_across_frames() {
        let mut t = tracker();
        let first = t.update(&[det(10.0, 10.0, 50.0, 50.0, 0.9)]);
        let id = first[0].track_id;

        for i in 0..10 {
            let dx = i as f32; // slow drift, IoU stays high
            let active = t.update(&[det(10.0 + dx, 10.0, 50.0 + dx, 50.0, 0.9)]);
            assert_eq!(active.len(), 1);
            assert_eq!(active[0].track_id, id);
        }
    }

    #[test]
    fn test_low_confidence_keeps_track_alive() {
        let mut t = tracker();
        let id = t.update(&[det(10.0, 10.0, 50.0, 50.0, 0.9)])[0].track_id;
        // Confidence drops into the low band; the track survives stage 2
        let active = t.update(&[det(10.0, 10.0, 50.0, 50.0, 0.2)]);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].track_id, id);
        assert_eq!(active[0].hits, 2);
    }

    #[test]
    fn test_lost_track_revived_within_buffer() {
        let mut t = tracker();
        let id = t.update(&[det(10.0, 10.0, 50.0, 50.0, 0.9)])[0].track_id;

        for _ in 0..5 {
            assert!(t.update(&[]).is_empty());
        }

        let active = t.update(&[det(10.0, 10.0, 50.0, 50.0, 0.9)]);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].track_id, id);
    }

    #[test]
    fn test_pruned_track_not_revivable() {
        let mut t = IouTracker::new(0.5, 0.1, 0.8, 3);
        let id = t.update(&[det(10.0, 10.0, 50.0, 50.0, 0.9)])[0].track_id;

        // Age past the retention buffer; update() with a far-away detection
        // so the lost track keeps aging each cycle
        for _ in 0..5 {
            t.update(&[det(500.0, 500.0, 520.0, 520.0, 0.9)]);
        }

        let active = t.update(&[det(10.0, 10.0, 50.0, 50.0, 0.9)]);
        assert_eq!(active.len(), 1);
        assert_ne!(active[0].track_id, id, "pruned id must not come back");
    }

    #[test]
    fn test_ids_strictly_increasing_never_reused() {
        let mut t = IouTracker::new(0.5, 0.1, 0.8, 0);
        let a = t.update(&[det(0.0, 0.0, 10.0, 10.0, 0.9)])[0].track_id;
        // Buffer 0: one empty cycle loses the track, next prunes nothing new
        t.update(&[]);
        t.update(&[]);
        let b = t.update(&[det(0.0, 0.0, 10.0, 10.0, 0.9)])[0].track_id;
        assert!(b > a);
    }

    #[test]
    fn test_disjoint_detections_spawn_distinct_ids() {
        let mut t = tracker();
        let active = t.update(&[
            det(0.0, 0.0, 10.0, 10.0, 0.9),
            det(100.0, 100.0, 110.0, 110.0, 0.9),
        ]);
        assert_eq!(active.len(), 2);
        assert_ne!(active[0].track_id, active[1].track_id);
    }

    #[test]
    fn test_empty_update_ages_out_active_set() {
        let mut t = tracker();
        t.update(&[det(10.0, 10.0, 50.0, 50.0, 0.9)]);
        let active = t.update(&[]);
        assert!(active.is_empty());
        // Still retained as lost
        assert_eq!(t.track_count(), 1);
    }

    #[test]
    fn test_reset_restarts_id_counter() {
        let mut t = tracker();
        t.update(&[det(10.0, 10.0, 50.0, 50.0, 0.9)]);
        t.reset();
        assert_eq!(t.track_count(), 0);
        let active = t.update(&[det(10.0, 10.0, 50.0, 50.0, 0.9)]);
        assert_eq!(active[0].track_id, 1);
    }

    #[test]
    fn test_stage_two_does_not_carry_class() {
        let mut t = tracker();
        t.update(&[det(10.0, 10.0, 50.0, 50.0, 0.9)]);

        let mut low = det(10.0, 10.0, 50.0, 50.0, 0.2);
        low.class_id = 7;
        low.class_name = "other".to_string();
        let active = t.update(&[low]);

        assert_eq!(active[0].class_id, 0);
        assert_eq!(active[0].class_name, "item");
        assert!((active[0].confidence - 0.2).abs() < f32::EPSILON);
    }
}
