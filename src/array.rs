//! Vertex sequences with coincident-point filtering.
//!
//! Both the smoothing converter and the path vertex cache need a subpath as
//! a list of distinct vertices, each knowing the distance to its successor.

use crate::math::{calc_distance, VERTEX_DIST_EPSILON};

// ============================================================================
// VertexDist
// ============================================================================

/// A vertex with coordinates and the distance to the next vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexDist {
    pub x: f64,
    pub y: f64,
    pub dist: f64,
}

impl VertexDist {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, dist: 0.0 }
    }

    /// Calculate distance to `val` and store it. Returns `true` if the
    /// points are not coincident (distance > VERTEX_DIST_EPSILON).
    /// If coincident, sets dist to `1.0 / VERTEX_DIST_EPSILON`.
    pub fn calc_dist(&mut self, val: &VertexDist) -> bool {
        self.dist = calc_distance(self.x, self.y, val.x, val.y);
        let ret = self.dist > VERTEX_DIST_EPSILON;
        if !ret {
            self.dist = 1.0 / VERTEX_DIST_EPSILON;
        }
        ret
    }
}

// ============================================================================
// VertexSequence
// ============================================================================

/// A sequence of vertices that drops coincident points.
///
/// Coincident pairs are cleaned up lazily: when a vertex is added, the
/// previous one is removed if it coincides with the one before it.
/// `close()` finishes the cleanup and fills in every `dist`.
#[derive(Debug, Clone, Default)]
pub struct VertexSequence {
    vertices: Vec<VertexDist>,
}

impl VertexSequence {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn add(&mut self, val: VertexDist) {
        if self.vertices.len() > 1 {
            let len = self.vertices.len();
            let last = self.vertices[len - 1];
            let keep = self.vertices[len - 2].calc_dist(&last);
            if !keep {
                self.vertices.pop();
            }
        }
        self.vertices.push(val);
    }

    /// Replace the last vertex.
    pub fn modify_last(&mut self, val: VertexDist) {
        self.vertices.pop();
        self.add(val);
    }

    /// Remove trailing coincident vertices and compute all distances.
    /// With `closed`, a last vertex equal to the first is dropped too and
    /// the last `dist` measures the closing segment.
    pub fn close(&mut self, closed: bool) {
        while self.vertices.len() > 1 {
            let len = self.vertices.len();
            let mut prev = self.vertices[len - 2];
            let last = self.vertices[len - 1];
            if prev.calc_dist(&last) {
                break;
            }
            let t = self.vertices[len - 1];
            self.vertices.pop();
            self.modify_last(t);
        }

        if closed {
            while self.vertices.len() > 1 {
                let len = self.vertices.len();
                let mut last = self.vertices[len - 1];
                let first = self.vertices[0];
                if last.calc_dist(&first) {
                    break;
                }
                self.vertices.pop();
            }
        }

        let n = self.vertices.len();
        for i in 0..n {
            let next = if i + 1 < n {
                self.vertices[i + 1]
            } else if closed {
                self.vertices[0]
            } else {
                self.vertices[i].dist = 0.0;
                continue;
            };
            self.vertices[i].calc_dist(&next);
        }
    }

    pub fn remove_all(&mut self) {
        self.vertices.clear();
    }

    /// Previous vertex with wrap-around.
    pub fn prev(&self, idx: usize) -> &VertexDist {
        let n = self.vertices.len();
        &self.vertices[(idx + n - 1) % n]
    }

    /// Next vertex with wrap-around.
    pub fn next(&self, idx: usize) -> &VertexDist {
        &self.vertices[(idx + 1) % self.vertices.len()]
    }

    pub fn as_slice(&self) -> &[VertexDist] {
        &self.vertices
    }
}

impl core::ops::Index<usize> for VertexSequence {
    type Output = VertexDist;

    fn index(&self, i: usize) -> &VertexDist {
        &self.vertices[i]
    }
}

// ============================================================================
// Tests
// ============================================================================
