//! Group symbolizer layout and placement.
//!
//! Each member is extracted at the origin and reports its bounding box.
//! A [`GroupLayout`] turns those boxes into per-member offsets; the union
//! of the moved boxes is centered on the origin so the group anchor sits in
//! the middle of the whole group. [`GroupPlacementFinder`] then looks for
//! anchors where every member box is free at once.

use crate::basics::{PointD, RectD};
use crate::geometry::Coordinate;
use crate::label_collision_detector::LabelCollisionDetector;
use crate::placement_finder::check_collision;
use crate::text_properties::{LabelPlacement, TextPlacementProperties};
use crate::tolerance_iterator::ToleranceIterator;
use crate::transform_chain::TransformChain;
use crate::vertex_cache::PathVertexCache;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroupLayout {
    /// Members side by side, left to right, vertically centered.
    SimpleRow { item_margin: f64 },
    /// Two members: the second to the right of the first. When their
    /// heights differ by more than `max_difference` (and it is not
    /// negative) the second goes below the first instead.
    Pair { item_margin: f64, max_difference: f64 },
}

impl Default for GroupLayout {
    fn default() -> Self {
        GroupLayout::SimpleRow { item_margin: 0.0 }
    }
}

impl GroupLayout {
    /// Offsets to add to each member, in member order. Invalid boxes
    /// (members that produced nothing) get a zero offset and take no room.
    pub fn offsets(&self, boxes: &[RectD], scale_factor: f64) -> Vec<PointD> {
        let mut offsets = match *self {
            GroupLayout::SimpleRow { item_margin } => row(boxes, item_margin * scale_factor),
            GroupLayout::Pair {
                item_margin,
                max_difference,
            } => pair(boxes, item_margin * scale_factor, max_difference * scale_factor),
        };

        let mut total = RectD::invalid();
        for (b, o) in boxes.iter().zip(&offsets) {
            if b.is_valid() {
                total.expand_to_include_rect(&b.translated(o.x, o.y));
            }
        }
        if total.is_valid() {
            let c = total.center();
            for o in &mut offsets {
                *o = *o - c;
            }
        }
        offsets
    }
}

fn row(boxes: &[RectD], margin: f64) -> Vec<PointD> {
    let mut x = 0.0;
    let mut offsets = Vec::with_capacity(boxes.len());
    for b in boxes {
        if !b.is_valid() {
            offsets.push(PointD::default());
            continue;
        }
        let c = b.center();
        offsets.push(PointD::new(x - b.x1, -c.y));
        x += b.width() + margin;
    }
    offsets
}

fn pair(boxes: &[RectD], margin: f64, max_difference: f64) -> Vec<PointD> {
    let (Some(first), Some(second)) = (boxes.first(), boxes.get(1)) else {
        return row(boxes, margin);
    };
    if !first.is_valid() || !second.is_valid() {
        return row(boxes, margin);
    }
    let mut offsets = vec![PointD::default(); boxes.len()];
    let c0 = first.center();
    let c1 = second.center();
    offsets[0] = PointD::new(-c0.x, -c0.y);
    let stacked =
        max_difference >= 0.0 && (second.height() - first.height()).abs() > max_difference;
    offsets[1] = if stacked {
        PointD::new(-c1.x, first.height() / 2.0 + margin - second.y1)
    } else {
        PointD::new(first.width() / 2.0 + margin - second.x1, -c1.y)
    };
    offsets
}

// ============================================================================
// Group placement
// ============================================================================

/// Finds anchors for a laid-out group. A candidate is accepted only when
/// all member boxes pass the collision rules; accepted boxes go into the
/// detector together.
pub struct GroupPlacementFinder<'a> {
    detector: &'a mut LabelCollisionDetector,
    dims: RectD,
    boxes: &'a [RectD],
    props: &'a TextPlacementProperties,
    scale_factor: f64,
    repeat_key: &'a str,
    anchors: Vec<PointD>,
}

impl<'a> GroupPlacementFinder<'a> {
    /// `boxes` are the member boxes relative to the group anchor, layout
    /// offsets already applied.
    pub fn new(
        detector: &'a mut LabelCollisionDetector,
        boxes: &'a [RectD],
        props: &'a TextPlacementProperties,
        scale_factor: f64,
        repeat_key: &'a str,
    ) -> Self {
        let dims = *detector.extent();
        Self {
            detector,
            dims,
            boxes,
            props,
            scale_factor,
            repeat_key,
            anchors: Vec::new(),
        }
    }

    pub fn with_dims(mut self, dims: RectD) -> Self {
        self.dims = dims;
        self
    }

    /// Accepted anchors, displacement included.
    pub fn anchors(&self) -> &[PointD] {
        &self.anchors
    }

    pub fn into_anchors(self) -> Vec<PointD> {
        self.anchors
    }

    pub fn find_placements<T: Coordinate>(&mut self, chain: &TransformChain<'_, T>) -> bool {
        let geometry = chain.geometry();
        match self.props.placement {
            LabelPlacement::Point | LabelPlacement::Interior => {
                let anchors = if self.props.placement == LabelPlacement::Point {
                    geometry.part_centroids()
                } else {
                    geometry.part_interiors()
                };
                let mut placed = false;
                for p in anchors.into_iter().filter_map(|p| chain.transform_point(p)) {
                    placed |= self.try_anchor(p);
                }
                placed
            }
            LabelPlacement::Vertex => {
                let mut path = PathVertexCache::from_source(&mut chain.build());
                let mut placed = false;
                while path.next_subpath() {
                    let vertices = path.vertices().to_vec();
                    let n = if path.is_closed() { vertices.len() - 1 } else { vertices.len() };
                    for v in &vertices[..n] {
                        placed |= self.try_anchor(*v);
                    }
                }
                placed
            }
            LabelPlacement::Line => {
                let mut path = PathVertexCache::from_source(&mut chain.build());
                self.find_line_placements(&mut path)
            }
        }
    }

    /// Unrotated groups spread along each subpath: one per
    /// `spacing + width`, or one in the middle without spacing.
    pub fn find_line_placements(&mut self, path: &mut PathVertexCache) -> bool {
        let mut extent = RectD::invalid();
        for b in self.boxes {
            extent.expand_to_include_rect(b);
        }
        if !extent.is_valid() {
            return false;
        }
        let width = extent.width();
        let spacing = self.props.spacing * self.scale_factor;
        let tolerance = self.props.label_position_tolerance * self.scale_factor;
        let mut placed = false;
        path.reset();
        while path.next_subpath() {
            let len = path.length();
            if len <= 0.0 || len < width {
                continue;
            }
            let count = if spacing > 0.0 {
                ((len / (spacing + width)).floor() as usize).max(1)
            } else {
                1
            };
            let stride = len / count as f64;
            let mut pos = stride / 2.0;
            while pos <= len {
                for offset in ToleranceIterator::new(tolerance, stride) {
                    if path.move_to_distance(pos + offset) && self.try_anchor(path.position()) {
                        placed = true;
                        break;
                    }
                }
                pos += stride;
            }
        }
        placed
    }

    fn try_anchor(&mut self, pos: PointD) -> bool {
        let sf = self.scale_factor;
        let d = self.props.displacement;
        let anchor = PointD::new(pos.x + d.x * sf, pos.y + d.y * sf);
        let moved: Vec<RectD> = self
            .boxes
            .iter()
            .map(|b| b.translated(anchor.x, anchor.y))
            .collect();
        let free = moved.iter().all(|b| {
            check_collision(
                &*self.detector,
                &self.dims,
                self.props,
                sf,
                b,
                self.repeat_key,
                false,
            )
        });
        if !free {
            return false;
        }
        if !self.props.ignore_placement {
            let key = (!self.repeat_key.is_empty()).then_some(self.repeat_key);
            for b in moved {
                self.detector.insert(b, key);
            }
        }
        self.anchors.push(anchor);
        true
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn moved(b: &RectD, o: PointD) -> RectD {
        b.translated(o.x, o.y)
    }

    #[test]
    fn test_simple_row() {
        let boxes = [
            RectD::new(-5.0, -5.0, 5.0, 5.0),
            RectD::new(-20.0, -4.0, 20.0, 4.0),
        ];
        let offsets = GroupLayout::SimpleRow { item_margin: 2.0 }.offsets(&boxes, 1.0);
        let a = moved(&boxes[0], offsets[0]);
        let b = moved(&boxes[1], offsets[1]);
        // 10 + 2 + 40 wide, centered
        assert_eq!(a, RectD::new(-26.0, -5.0, -16.0, 5.0));
        assert_eq!(b, RectD::new(-14.0, -4.0, 26.0, 4.0));
    }

    #[test]
    fn test_row_skips_empty_members() {
        let boxes = [RectD::invalid(), RectD::new(0.0, 0.0, 10.0, 10.0)];
        let offsets = GroupLayout::SimpleRow { item_margin: 5.0 }.offsets(&boxes, 1.0);
        assert_eq!(moved(&boxes[1], offsets[1]), RectD::new(-5.0, -5.0, 5.0, 5.0));
    }

    #[test]
    fn test_pair_side_by_side_and_stacked() {
        let boxes = [
            RectD::new(-5.0, -5.0, 5.0, 5.0),
            RectD::new(-10.0, -2.0, 10.0, 2.0),
        ];
        let side = GroupLayout::Pair {
            item_margin: 0.0,
            max_difference: -1.0,
        }
        .offsets(&boxes, 1.0);
        assert_eq!(moved(&boxes[0], side[0]), RectD::new(-15.0, -5.0, -5.0, 5.0));
        assert_eq!(moved(&boxes[1], side[1]), RectD::new(-5.0, -2.0, 15.0, 2.0));

        let stacked = GroupLayout::Pair {
            item_margin: 0.0,
            max_difference: 1.0,
        }
        .offsets(&boxes, 1.0);
        assert_eq!(moved(&boxes[0], stacked[0]), RectD::new(-5.0, -7.0, 5.0, 3.0));
        assert_eq!(moved(&boxes[1], stacked[1]), RectD::new(-10.0, 3.0, 10.0, 7.0));
    }

    #[test]
    fn test_group_all_or_nothing() {
        let mut det = LabelCollisionDetector::new(RectD::new(0.0, 0.0, 200.0, 200.0));
        // blocks the right member only
        det.insert(RectD::new(108.0, 98.0, 112.0, 102.0), None);
        let boxes = [RectD::new(-20.0, -5.0, -2.0, 5.0), RectD::new(2.0, -5.0, 20.0, 5.0)];
        let props = TextPlacementProperties::default();
        let mut f = GroupPlacementFinder::new(&mut det, &boxes, &props, 1.0, "");
        assert!(!f.try_anchor(PointD::new(100.0, 100.0)));
        assert!(f.anchors().is_empty());
        // the free left member was not inserted either
        assert!(det.has_placement(&RectD::new(81.0, 96.0, 97.0, 104.0)));
    }

    #[test]
    fn test_group_line_placement() {
        let mut det = LabelCollisionDetector::new(RectD::new(0.0, 0.0, 400.0, 100.0));
        let boxes = [RectD::new(-10.0, -5.0, 10.0, 5.0)];
        let props = TextPlacementProperties {
            placement: LabelPlacement::Line,
            spacing: 80.0,
            ..TextPlacementProperties::default()
        };
        let mut path =
            PathVertexCache::from_lines(&[vec![PointD::new(0.0, 50.0), PointD::new(400.0, 50.0)]]);
        let mut f = GroupPlacementFinder::new(&mut det, &boxes, &props, 1.0, "shield");
        assert!(f.find_line_placements(&mut path));
        let xs: Vec<f64> = f.anchors().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![50.0, 150.0, 250.0, 350.0]);
        assert_eq!(det.len(), 4);
    }
}
