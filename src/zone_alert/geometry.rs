//! Polygon membership tests for zone classification

use crate::models::ZonePolygon;

/// Ray-casting point-in-polygon test (odd-crossing rule).
///
/// A polygon with fewer than 3 vertices contains nothing.
pub fn point_in_polygon(point: (f32, f32), polygon: &ZonePolygon) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let (x, y) = point;
    let n = polygon.len();
    let mut inside = false;

    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (polygon[i][0] as f32, polygon[i][1] as f32);
        let (xj, yj) = (polygon[j][0] as f32, polygon[j][1] as f32);
        if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }

    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> ZonePolygon {
        vec![[0, 0], [100, 0], [100, 100], [0, 100]]
    }

    #[test]
    fn test_point_inside_quad() {
        assert!(point_in_polygon((50.0, 50.0), &quad()));
    }

    #[test]
    fn test_point_outside_quad() {
        assert!(!point_in_polygon((150.0, 50.0), &quad()));
        assert!(!point_in_polygon((50.0, -10.0), &quad()));
    }

    #[test]
    fn test_two_vertex_polygon_contains_nothing() {
        let line: ZonePolygon = vec![[0, 0], [100, 100]];
        assert!(!point_in_polygon((50.0, 50.0), &line));
    }

    #[test]
    fn test_empty_polygon_contains_nothing() {
        assert!(!point_in_polygon((50.0, 50.0), &ZonePolygon::new()));
    }

    #[test]
    fn test_concave_polygon() {
        // L-shape; (75, 75) sits in the notch
        let l_shape: ZonePolygon =
            vec![[0, 0], [100, 0], [100, 50], [50, 50], [50, 100], [0, 100]];
        assert!(point_in_polygon((25.0, 75.0), &l_shape));
        assert!(!point_in_polygon((75.0, 75.0), &l_shape));
    }
}
