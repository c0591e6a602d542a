//! Marker placement: points, first/last vertex, or repeated along lines.
//!
//! Line placement walks every subpath with a [`PathVertexCache`] at the
//! configured spacing and rotates each marker to the local path direction.
//! Candidates that collide are retried at small offsets generated by the
//! [`ToleranceIterator`], the same way line labels are.

use crate::basics::{PointD, RectD};
use crate::geometry::Coordinate;
use crate::label_collision_detector::LabelCollisionDetector;
use crate::placement_finder::apply_direction;
use crate::text_properties::Direction;
use crate::tolerance_iterator::ToleranceIterator;
use crate::transform_chain::TransformChain;
use crate::vertex_cache::PathVertexCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerPlacement {
    #[default]
    Point,
    Interior,
    Line,
    VertexFirst,
    VertexLast,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerPlacementProperties {
    pub placement: MarkerPlacement,
    /// Distance between line markers, pixels.
    pub spacing: f64,
    /// Search range around each line position as a share of the spacing.
    pub max_error: f64,
    pub avoid_edges: bool,
    pub allow_overlap: bool,
    pub ignore_placement: bool,
    pub direction: Direction,
    /// Perpendicular offset of line markers, pixels; positive is to the
    /// left of the path direction.
    pub offset: f64,
}

impl Default for MarkerPlacementProperties {
    fn default() -> Self {
        Self {
            placement: MarkerPlacement::Point,
            spacing: 100.0,
            max_error: 0.2,
            avoid_edges: false,
            allow_overlap: false,
            ignore_placement: false,
            direction: Direction::Right,
            offset: 0.0,
        }
    }
}

/// An accepted marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerInstance {
    pub pos: PointD,
    pub angle: f64,
    pub bbox: RectD,
}

/// Axis-aligned bounds of `shape` (relative to the anchor) rotated by
/// `angle` and moved to `pos`.
pub fn rotated_bounds(shape: &RectD, pos: PointD, angle: f64) -> RectD {
    let mut r = RectD::invalid();
    for (x, y) in [
        (shape.x1, shape.y1),
        (shape.x2, shape.y1),
        (shape.x2, shape.y2),
        (shape.x1, shape.y2),
    ] {
        let p = PointD::new(x, y).rotated(angle);
        r.expand_to_include(pos.x + p.x, pos.y + p.y);
    }
    r
}

pub struct MarkersPlacementFinder<'a> {
    detector: &'a mut LabelCollisionDetector,
    dims: RectD,
    shape: RectD,
    props: &'a MarkerPlacementProperties,
    scale_factor: f64,
    placements: Vec<MarkerInstance>,
}

impl<'a> MarkersPlacementFinder<'a> {
    /// `shape` is the marker's bounding box relative to its anchor, in
    /// device pixels.
    pub fn new(
        detector: &'a mut LabelCollisionDetector,
        shape: RectD,
        props: &'a MarkerPlacementProperties,
        scale_factor: f64,
    ) -> Self {
        let dims = *detector.extent();
        Self {
            detector,
            dims,
            shape,
            props,
            scale_factor,
            placements: Vec::new(),
        }
    }

    pub fn with_dims(mut self, dims: RectD) -> Self {
        self.dims = dims;
        self
    }

    pub fn placements(&self) -> &[MarkerInstance] {
        &self.placements
    }

    pub fn into_placements(self) -> Vec<MarkerInstance> {
        self.placements
    }

    pub fn find_placements<T: Coordinate>(&mut self, chain: &TransformChain<'_, T>) -> bool {
        let geometry = chain.geometry();
        match self.props.placement {
            MarkerPlacement::Point | MarkerPlacement::Interior => {
                let anchors = if self.props.placement == MarkerPlacement::Point {
                    geometry.part_centroids()
                } else {
                    geometry.part_interiors()
                };
                let mut placed = false;
                for p in anchors.into_iter().filter_map(|p| chain.transform_point(p)) {
                    placed |= self.try_place(p, 0.0);
                }
                placed
            }
            MarkerPlacement::VertexFirst | MarkerPlacement::VertexLast => {
                let mut path = PathVertexCache::from_source(&mut chain.build());
                let last = self.props.placement == MarkerPlacement::VertexLast;
                self.find_vertex_placement(&mut path, last)
            }
            MarkerPlacement::Line => {
                let mut path = PathVertexCache::from_source(&mut chain.build());
                self.find_line_placements(&mut path)
            }
        }
    }

    /// Marker at the first (or last) vertex of the path, pointing along
    /// the adjoining segment.
    pub fn find_vertex_placement(&mut self, path: &mut PathVertexCache, last: bool) -> bool {
        path.reset();
        let mut vertices: Vec<PointD> = Vec::new();
        let mut first_sub: Option<Vec<PointD>> = None;
        while path.next_subpath() {
            if first_sub.is_none() {
                first_sub = Some(path.vertices().to_vec());
            }
            vertices = path.vertices().to_vec();
        }
        let v = if last { vertices } else { first_sub.unwrap_or_default() };
        let (pos, angle) = match (v.len(), last) {
            (0, _) => return false,
            (1, _) => (v[0], 0.0),
            (n, true) => {
                let (a, b) = (v[n - 2], v[n - 1]);
                (b, (b.y - a.y).atan2(b.x - a.x))
            }
            (_, false) => {
                let (a, b) = (v[0], v[1]);
                (a, (b.y - a.y).atan2(b.x - a.x))
            }
        };
        match apply_direction(self.props.direction, angle) {
            Some(angle) => self.try_place(pos, angle),
            None => false,
        }
    }

    /// Markers every `spacing` pixels along each subpath, starting half a
    /// spacing in.
    pub fn find_line_placements(&mut self, path: &mut PathVertexCache) -> bool {
        let sf = self.scale_factor;
        let spacing = if self.props.spacing > 0.0 {
            self.props.spacing * sf
        } else {
            MarkerPlacementProperties::default().spacing * sf
        };
        let width = self.shape.width();
        let offset = self.props.offset * sf;
        let mut placed = false;
        path.reset();
        while path.next_subpath() {
            let len = path.length();
            if len < width || len <= 0.0 {
                continue;
            }
            let mut pos = spacing / 2.0;
            while pos <= len {
                for delta in ToleranceIterator::new(spacing * self.props.max_error, spacing) {
                    let cp = path.checkpoint();
                    let ok = self.try_line_position(path, pos + delta, width, offset);
                    path.restore(cp);
                    if ok {
                        placed = true;
                        break;
                    }
                }
                pos += spacing;
            }
        }
        placed
    }

    fn try_line_position(
        &mut self,
        path: &mut PathVertexCache,
        d: f64,
        width: f64,
        offset: f64,
    ) -> bool {
        // the marker must lie on the path over its whole width
        if !path.move_to_distance(d - width / 2.0) {
            return false;
        }
        let angle = path.angle(width);
        if !path.move_to_distance(d) || (!path.is_closed() && d + width / 2.0 > path.length()) {
            return false;
        }
        let Some(angle) = apply_direction(self.props.direction, angle) else {
            return false;
        };
        let p = path.position();
        let (sin, cos) = angle.sin_cos();
        let pos = PointD::new(p.x + sin * offset, p.y - cos * offset);
        self.try_place(pos, angle)
    }

    fn try_place(&mut self, pos: PointD, angle: f64) -> bool {
        let bbox = rotated_bounds(&self.shape, pos, angle);
        if self.props.avoid_edges && !self.dims.contains_rect(&bbox) {
            return false;
        }
        if !self.props.allow_overlap && !self.detector.has_placement(&bbox) {
            return false;
        }
        if !self.props.ignore_placement {
            self.detector.insert(bbox, None);
        }
        self.placements.push(MarkerInstance { pos, angle, bbox });
        true
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn square() -> RectD {
        RectD::new(-2.0, -2.0, 2.0, 2.0)
    }

    #[test]
    fn test_rotated_bounds() {
        let r = rotated_bounds(
            &RectD::new(0.0, -1.0, 10.0, 1.0),
            PointD::new(5.0, 5.0),
            core::f64::consts::FRAC_PI_2,
        );
        assert!(approx(r.x1, 4.0) && approx(r.x2, 6.0));
        assert!(approx(r.y1, 5.0) && approx(r.y2, 15.0));
    }

    #[test]
    fn test_line_markers_every_spacing() {
        let mut det = LabelCollisionDetector::new(RectD::new(0.0, 0.0, 400.0, 100.0));
        let props = MarkerPlacementProperties {
            placement: MarkerPlacement::Line,
            spacing: 50.0,
            ..MarkerPlacementProperties::default()
        };
        let mut path =
            PathVertexCache::from_lines(&[vec![PointD::new(0.0, 50.0), PointD::new(200.0, 50.0)]]);
        let mut f = MarkersPlacementFinder::new(&mut det, square(), &props, 1.0);
        assert!(f.find_line_placements(&mut path));
        let xs: Vec<f64> = f.placements().iter().map(|m| m.pos.x).collect();
        assert_eq!(xs, vec![25.0, 75.0, 125.0, 175.0]);
        assert!(f.placements().iter().all(|m| m.angle == 0.0));
    }

    #[test]
    fn test_line_markers_follow_direction() {
        let mut det = LabelCollisionDetector::new(RectD::new(0.0, 0.0, 400.0, 400.0));
        let props = MarkerPlacementProperties {
            spacing: 40.0,
            ..MarkerPlacementProperties::default()
        };
        let mut path =
            PathVertexCache::from_lines(&[vec![PointD::new(50.0, 0.0), PointD::new(50.0, 100.0)]]);
        let mut f = MarkersPlacementFinder::new(&mut det, square(), &props, 1.0);
        assert!(f.find_line_placements(&mut path));
        assert!(approx(f.placements()[0].angle, core::f64::consts::FRAC_PI_2));
    }

    #[test]
    fn test_tolerance_rescues_blocked_position() {
        let mut det = LabelCollisionDetector::new(RectD::new(0.0, 0.0, 400.0, 100.0));
        // blocks the ideal position at x = 50
        det.insert(RectD::new(49.0, 45.0, 51.0, 55.0), None);
        let props = MarkerPlacementProperties {
            spacing: 100.0,
            max_error: 0.2,
            ..MarkerPlacementProperties::default()
        };
        let mut path =
            PathVertexCache::from_lines(&[vec![PointD::new(0.0, 50.0), PointD::new(100.0, 50.0)]]);
        let mut f = MarkersPlacementFinder::new(&mut det, square(), &props, 1.0);
        assert!(f.find_line_placements(&mut path));
        let x = f.placements()[0].pos.x;
        assert!(x != 50.0 && (x - 50.0).abs() <= 20.0);
    }

    #[test]
    fn test_vertex_first_and_last() {
        let lines = [vec![
            PointD::new(10.0, 10.0),
            PointD::new(20.0, 10.0),
            PointD::new(20.0, 30.0),
        ]];
        let props = MarkerPlacementProperties::default();

        let mut det = LabelCollisionDetector::new(RectD::new(0.0, 0.0, 100.0, 100.0));
        let mut f = MarkersPlacementFinder::new(&mut det, square(), &props, 1.0);
        assert!(f.find_vertex_placement(&mut PathVertexCache::from_lines(&lines), false));
        assert_eq!(f.placements()[0].pos, PointD::new(10.0, 10.0));
        assert_eq!(f.placements()[0].angle, 0.0);

        let mut det = LabelCollisionDetector::new(RectD::new(0.0, 0.0, 100.0, 100.0));
        let mut f = MarkersPlacementFinder::new(&mut det, square(), &props, 1.0);
        assert!(f.find_vertex_placement(&mut PathVertexCache::from_lines(&lines), true));
        assert_eq!(f.placements()[0].pos, PointD::new(20.0, 30.0));
        assert!(approx(f.placements()[0].angle, core::f64::consts::FRAC_PI_2));
    }

    #[test]
    fn test_avoid_edges_and_overlap() {
        let mut det = LabelCollisionDetector::new(RectD::new(0.0, 0.0, 100.0, 100.0));
        let props = MarkerPlacementProperties {
            avoid_edges: true,
            ..MarkerPlacementProperties::default()
        };
        let mut f = MarkersPlacementFinder::new(&mut det, square(), &props, 1.0);
        assert!(!f.try_place(PointD::new(99.0, 50.0), 0.0));
        assert!(f.try_place(PointD::new(50.0, 50.0), 0.0));
        assert!(!f.try_place(PointD::new(51.0, 50.0), 0.0));
    }
}
