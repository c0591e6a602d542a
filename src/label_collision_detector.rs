//! Label collision detection.
//!
//! Keeps the device-space boxes of every accepted label and marker for one
//! render pass. Queries are conservative box intersection tests. The first
//! box inserted wins; later overlapping candidates are rejected, so callers
//! must insert in feature order.
//!
//! Checking and inserting are separate calls: a caller can probe several
//! candidate positions with `has_placement*` and insert exactly one.

use crate::basics::RectD;
use crate::quad_tree::QuadTree;

/// A placed box with an optional repeat key (usually the label text).
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub bbox: RectD,
    pub repeat_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LabelCollisionDetector {
    tree: QuadTree<Label>,
}

impl LabelCollisionDetector {
    /// `extent` is the render area, usually the image expanded by the
    /// buffer size.
    pub fn new(extent: RectD) -> Self {
        Self {
            tree: QuadTree::new(extent),
        }
    }

    /// No stored box intersects `bbox`.
    pub fn has_placement(&self, bbox: &RectD) -> bool {
        self.tree
            .query(*bbox)
            .all(|(b, _)| !b.intersects(bbox))
    }

    /// No stored box intersects `bbox` grown by `margin`.
    pub fn has_placement_with_margin(&self, bbox: &RectD, margin: f64) -> bool {
        if margin > 0.0 {
            self.has_placement(&bbox.padded(margin))
        } else {
            self.has_placement(bbox)
        }
    }

    /// Like [`has_placement_with_margin`](Self::has_placement_with_margin),
    /// and additionally no box stored under `repeat_key` lies within
    /// `repeat_distance` of `bbox`.
    pub fn has_placement_repeat(
        &self,
        bbox: &RectD,
        margin: f64,
        repeat_key: &str,
        repeat_distance: f64,
    ) -> bool {
        if repeat_distance <= margin || repeat_key.is_empty() {
            return self.has_placement_with_margin(bbox, margin);
        }
        let margin_box = if margin > 0.0 {
            bbox.padded(margin)
        } else {
            *bbox
        };
        let repeat_box = bbox.padded(repeat_distance);
        self.tree.query(repeat_box).all(|(b, label)| {
            if b.intersects(&margin_box) {
                return false;
            }
            !(label.repeat_key.as_deref() == Some(repeat_key) && b.intersects(&repeat_box))
        })
    }

    /// Store a box. Boxes outside the extent are kept too (in the tree
    /// root), so an inserted box always blocks itself.
    pub fn insert(&mut self, bbox: RectD, repeat_key: Option<&str>) {
        self.tree.insert(
            bbox,
            Label {
                bbox,
                repeat_key: repeat_key.map(str::to_string),
            },
        );
    }

    /// Check and insert in one step. Returns whether the box was free.
    pub fn try_insert(&mut self, bbox: RectD, repeat_key: Option<&str>) -> bool {
        if !self.has_placement(&bbox) {
            return false;
        }
        self.insert(bbox, repeat_key);
        true
    }

    pub fn extent(&self) -> &RectD {
        self.tree.extent()
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    pub fn len(&self) -> usize {
        self.tree.count()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Stored labels in insertion order.
    pub fn boxes(&self) -> impl Iterator<Item = &Label> {
        self.tree.iter().map(|(_, label)| label)
    }
}

// ============================================================================
// Tests
// ============================================================================
