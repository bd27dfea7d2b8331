//! Greedy IoU association between track boxes and detection boxes

use crate::models::BoundingBox;

/// Epsilon added to the union denominator so degenerate boxes never divide
/// by zero
const EPSILON: f32 = 1e-6;

/// Result of one association pass
#[derive(Debug, Clone, Default)]
pub struct Association {
    /// Matched (track index, detection index) pairs
    pub matches: Vec<(usize, usize)>,
    /// Track indices left unmatched
    pub unmatched_tracks: Vec<usize>,
    /// Detection indices left unmatched
    pub unmatched_detections: Vec<usize>,
}

/// Intersection-over-Union of two axis-aligned boxes
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);

    inter / (area_a + area_b - inter + EPSILON)
}

/// Pairwise IoU matrix, tracks as rows and detections as columns
fn iou_matrix(tracks: &[BoundingBox], detections: &[BoundingBox]) -> Vec<Vec<f32>> {
    tracks
        .iter()
        .map(|t| detections.iter().map(|d| iou(t, d)).collect())
        .collect()
}

/// Greedy one-to-one matching.
///
/// Repeatedly picks the highest-IoU pair remaining, accepts it while
/// `IoU >= 1 - match_thresh`, and zeroes the matched row and column so
/// neither side can match again. A greedy approximation of optimal
/// assignment; tie order is not stable across calls and callers must not
/// rely on it. Empty input on either side is normal and yields all indices
/// unmatched.
pub fn associate(
    tracks: &[BoundingBox],
    detections: &[BoundingBox],
    match_thresh: f32,
) -> Association {
    if tracks.is_empty() || detections.is_empty() {
        return Association {
            matches: Vec::new(),
            unmatched_tracks: (0..tracks.len()).collect(),
            unmatched_detections: (0..detections.len()).collect(),
        };
    }

    let mut matrix = iou_matrix(tracks, detections);
    let mut used_tracks = vec![false; tracks.len()];
    let mut used_detections = vec![false; detections.len()];
    let mut matches = Vec::new();

    loop {
        let mut best = 0.0f32;
        let mut best_pair = None;
        for (t_idx, row) in matrix.iter().enumerate() {
            for (d_idx, &val) in row.iter().enumerate() {
                if val > best {
                    best = val;
                    best_pair = Some((t_idx, d_idx));
                }
            }
        }

        let Some((t_idx, d_idx)) = best_pair else { break };
        if best < 1.0 - match_thresh {
            break;
        }

        matches.push((t_idx, d_idx));
        used_tracks[t_idx] = true;
        used_detections[d_idx] = true;
        for val in matrix[t_idx].iter_mut() {
            *val = 0.0;
        }
        for row in matrix.iter_mut() {
            row[d_idx] = 0.0;
        }
    }

    Association {
        matches,
        unmatched_tracks: (0..tracks.len()).filter(|&i| !used_tracks[i]).collect(),
        unmatched_detections: (0..detections.len())
            .filter(|&i| !used_detections[i])
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x1: f32, y1: f32, x2: f32, y2: f32) -> BoundingBox {
        BoundingBox::new(x1, y1, x2, y2)
    }

    #[test]
    fn test_iou_identical_boxes() {
        let a = bbox(10.0, 10.0, 50.0, 50.0);
        assert!((iou(&a, &a) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_iou_disjoint_boxes() {
        let a = bbox(0.0, 0.0, 10.0, 10.0);
        let b = bbox(50.0, 50.0, 60.0, 60.0);
        assert!(iou(&a, &b) < 0.001);
    }

    #[test]
    fn test_iou_symmetric() {
        let a = bbox(0.0, 0.0, 50.0, 50.0);
        let b = bbox(25.0, 25.0, 75.0, 75.0);
        assert!((iou(&a, &b) - iou(&b, &a)).abs() < f32::EPSILON);
    }

    #[test]
    fn test_iou_degenerate_box_no_panic() {
        let a = bbox(10.0, 10.0, 10.0, 10.0);
        assert_eq!(iou(&a, &a), 0.0);
    }

    #[test]
    fn test_associate_empty_inputs() {
        let boxes = [bbox(0.0, 0.0, 10.0, 10.0)];
        let result = associate(&boxes, &[], 0.8);
        assert!(result.matches.is_empty());
        assert_eq!(result.unmatched_tracks, vec![0]);

        let result = associate(&[], &boxes, 0.8);
        assert!(result.matches.is_empty());
        assert_eq!(result.unmatched_detections, vec![0]);
    }

    #[test]
    fn test_associate_one_to_one() {
        // Two tracks, two detections, unambiguous pairing
        let tracks = [bbox(0.0, 0.0, 10.0, 10.0), bbox(100.0, 100.0, 110.0, 110.0)];
        let dets = [bbox(101.0, 101.0, 111.0, 111.0), bbox(1.0, 1.0, 11.0, 11.0)];
        let result = associate(&tracks, &dets, 0.8);

        assert_eq!(result.matches.len(), 2);
        assert!(result.matches.contains(&(0, 1)));
        assert!(result.matches.contains(&(1, 0)));
        assert!(result.unmatched_tracks.is_empty());
        assert!(result.unmatched_detections.is_empty());
    }

    #[test]
    fn test_associate_below_threshold_unmatched() {
        let tracks = [bbox(0.0, 0.0, 10.0, 10.0)];
        let dets = [bbox(9.0, 9.0, 19.0, 19.0)]; // tiny overlap
        let result = associate(&tracks, &dets, 0.5);

        assert!(result.matches.is_empty());
        assert_eq!(result.unmatched_tracks, vec![0]);
        assert_eq!(result.unmatched_detections, vec![0]);
    }

    #[test]
    fn test_associate_no_double_match() {
        // One detection overlapping two tracks may only be claimed once
        let tracks = [bbox(0.0, 0.0, 10.0, 10.0), bbox(1.0, 1.0, 11.0, 11.0)];
        let dets = [bbox(0.5, 0.5, 10.5, 10.5)];
        let result = associate(&tracks, &dets, 0.8);

        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.unmatched_tracks.len(), 1);
        assert!(result.unmatched_detections.is_empty());
    }
}
