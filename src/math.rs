//! Geometric math utilities: distances, segment projection, polygon area.

use crate::basics::PointD;

// ============================================================================
// Constants
// ============================================================================

/// Coinciding points maximal distance (epsilon).
pub const VERTEX_DIST_EPSILON: f64 = 1e-14;

// ============================================================================
// Distance calculations
// ============================================================================

/// Euclidean distance between two points.
#[inline]
pub fn calc_distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    (dx * dx + dy * dy).sqrt()
}

/// Squared Euclidean distance between two points.
#[inline]
pub fn calc_sq_distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    dx * dx + dy * dy
}

/// Parameter `u` of the projection of (x, y) onto segment (x1,y1)→(x2,y2).
/// Returns 0 if the segment is degenerate.
#[inline]
pub fn calc_segment_point_u(x1: f64, y1: f64, x2: f64, y2: f64, x: f64, y: f64) -> f64 {
    let dx = x2 - x1;
    let dy = y2 - y1;

    if dx == 0.0 && dy == 0.0 {
        return 0.0;
    }

    ((x - x1) * dx + (y - y1) * dy) / (dx * dx + dy * dy)
}

/// Squared distance from point (x, y) to the closest point on segment
/// (x1,y1)→(x2,y2).
#[inline]
pub fn calc_segment_point_sq_distance(x1: f64, y1: f64, x2: f64, y2: f64, x: f64, y: f64) -> f64 {
    let u = calc_segment_point_u(x1, y1, x2, y2, x, y);
    if u <= 0.0 {
        calc_sq_distance(x, y, x1, y1)
    } else if u >= 1.0 {
        calc_sq_distance(x, y, x2, y2)
    } else {
        calc_sq_distance(x, y, x1 + u * (x2 - x1), y1 + u * (y2 - y1))
    }
}

// ============================================================================
// Polygon helpers
// ============================================================================

/// Signed area of a ring (positive for counter-clockwise in y-up space).
pub fn calc_polygon_area(vertices: &[PointD]) -> f64 {
    if vertices.is_empty() {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut x = vertices[0].x;
    let mut y = vertices[0].y;
    let xs = x;
    let ys = y;

    for v in &vertices[1..] {
        sum += x * v.y - y * v.x;
        x = v.x;
        y = v.y;
    }
    (sum + x * ys - y * xs) * 0.5
}

/// Area-weighted centroid of a ring. Falls back to the vertex average for
/// degenerate (zero area) rings.
pub fn calc_polygon_centroid(vertices: &[PointD]) -> Option<PointD> {
    if vertices.is_empty() {
        return None;
    }
    let n = vertices.len();
    let mut area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        let cross = a.x * b.y - b.x * a.y;
        area += cross;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }
    if area.abs() < VERTEX_DIST_EPSILON {
        let sx: f64 = vertices.iter().map(|p| p.x).sum();
        let sy: f64 = vertices.iter().map(|p| p.y).sum();
        return Some(PointD::new(sx / n as f64, sy / n as f64));
    }
    area *= 0.5;
    Some(PointD::new(cx / (6.0 * area), cy / (6.0 * area)))
}

/// Even-odd point in ring test.
pub fn point_in_ring(x: f64, y: f64, ring: &[PointD]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (ring[i], ring[j]);
        if (pi.y > y) != (pj.y > y) && x < (pj.x - pi.x) * (y - pi.y) / (pj.y - pi.y) + pi.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calc_distance() {
        assert!((calc_distance(0.0, 0.0, 3.0, 4.0) - 5.0).abs() < 1e-10);
        assert!((calc_sq_distance(0.0, 0.0, 3.0, 4.0) - 25.0).abs() < 1e-10);
    }

    #[test]
    fn test_calc_segment_point_u() {
        assert!((calc_segment_point_u(0.0, 0.0, 10.0, 0.0, 5.0, 5.0) - 0.5).abs() < 1e-10);
        assert_eq!(calc_segment_point_u(1.0, 1.0, 1.0, 1.0, 5.0, 5.0), 0.0);
    }

    #[test]
    fn test_calc_segment_point_sq_distance() {
        // Perpendicular foot inside the segment
        let d = calc_segment_point_sq_distance(0.0, 0.0, 10.0, 0.0, 5.0, 3.0);
        assert!((d - 9.0).abs() < 1e-10);
        // Beyond the end, distance to endpoint
        assert!(
            (calc_segment_point_sq_distance(0.0, 0.0, 10.0, 0.0, 13.0, 4.0) - 25.0).abs() < 1e-10
        );
    }

    #[test]
    fn test_calc_polygon_area() {
        let sq = [
            PointD::new(0.0, 0.0),
            PointD::new(10.0, 0.0),
            PointD::new(10.0, 10.0),
            PointD::new(0.0, 10.0),
        ];
        assert!((calc_polygon_area(&sq) - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_centroid_and_point_in_ring() {
        let sq = [
            PointD::new(0.0, 0.0),
            PointD::new(10.0, 0.0),
            PointD::new(10.0, 10.0),
            PointD::new(0.0, 10.0),
        ];
        let c = calc_polygon_centroid(&sq).unwrap();
        assert!((c.x - 5.0).abs() < 1e-10);
        assert!((c.y - 5.0).abs() < 1e-10);
        assert!(point_in_ring(5.0, 5.0, &sq));
        assert!(!point_in_ring(15.0, 5.0, &sq));
    }

    #[test]
    fn test_degenerate_centroid_averages() {
        let line = [PointD::new(0.0, 0.0), PointD::new(4.0, 0.0)];
        let c = calc_polygon_centroid(&line).unwrap();
        assert!((c.x - 2.0).abs() < 1e-10);
        assert!(calc_polygon_centroid(&[]).is_none());
    }
}
