//! Arc-length cursor over a materialized device-space path.
//!
//! The placement finder walks paths by distance: skip to the next subpath,
//! advance by a spacing, nudge back and forth by a tolerance, read the point
//! and tangent under the cursor. All of that is answered here from the
//! cumulative segment lengths of each subpath.
//!
//! Closed rings are cyclic: moving past either end wraps around. Open
//! lines stop hard at both ends and moves that would leave `[0, length]`
//! fail without changing the cursor.
//!
//! Tentative moves are bracketed explicitly:
//!
//! ```ignore
//! let cp = cache.checkpoint();
//! if !(cache.move_by(offset) && try_place(&cache)) {
//!     cache.restore(cp);
//! }
//! ```

use crate::basics::{is_close, is_end_poly, is_move_to, is_stop, is_vertex, PointD, VertexSource};
use crate::math::{calc_distance, VERTEX_DIST_EPSILON};

const LENGTH_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Default)]
struct SubPath {
    points: Vec<PointD>,
    /// `dists[i]` is the arc length from `points[0]` to `points[i]`.
    dists: Vec<f64>,
    closed: bool,
}

impl SubPath {
    fn push(&mut self, p: PointD) {
        match self.points.last() {
            Some(last) => {
                let d = calc_distance(last.x, last.y, p.x, p.y);
                if d <= VERTEX_DIST_EPSILON {
                    return;
                }
                let total = self.length() + d;
                self.points.push(p);
                self.dists.push(total);
            }
            None => {
                self.points.push(p);
                self.dists.push(0.0);
            }
        }
    }

    fn close(&mut self) {
        if self.points.len() > 2 {
            let first = self.points[0];
            self.push(first);
            self.closed = true;
        }
    }

    fn length(&self) -> f64 {
        self.dists.last().copied().unwrap_or(0.0)
    }

    /// Index of the segment containing arc length `d` (already in range).
    fn segment_at(&self, d: f64) -> usize {
        let n = self.points.len();
        if n < 2 {
            return 0;
        }
        let i = self.dists.partition_point(|&c| c <= d);
        i.saturating_sub(1).min(n - 2)
    }

    fn point_at(&self, d: f64) -> PointD {
        if self.points.len() < 2 {
            return self.points.first().copied().unwrap_or_default();
        }
        let i = self.segment_at(d);
        let (p0, p1) = (self.points[i], self.points[i + 1]);
        let seg = self.dists[i + 1] - self.dists[i];
        let t = if seg > 0.0 { (d - self.dists[i]) / seg } else { 0.0 };
        PointD::new(p0.x + (p1.x - p0.x) * t, p0.y + (p1.y - p0.y) * t)
    }

    fn segment_angle(&self, d: f64) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        let i = self.segment_at(d);
        let (p0, p1) = (self.points[i], self.points[i + 1]);
        (p1.y - p0.y).atan2(p1.x - p0.x)
    }
}

/// Point under the cursor and the path direction there (radians, device
/// space, y down).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathPosition {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
}

/// Saved cursor, see [`PathVertexCache::checkpoint`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheState {
    subpath: Option<usize>,
    distance: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PathVertexCache {
    subpaths: Vec<SubPath>,
    current: Option<usize>,
    distance: f64,
}

impl PathVertexCache {
    /// Drain `vs` (rewound to path 0) into the cache. Duplicate consecutive
    /// points are dropped; a CLOSE makes the subpath a ring.
    pub fn from_source(vs: &mut dyn VertexSource) -> Self {
        let mut subpaths = Vec::new();
        let mut sp = SubPath::default();
        let (mut x, mut y) = (0.0, 0.0);
        vs.rewind(0);
        loop {
            let cmd = vs.vertex(&mut x, &mut y);
            if is_stop(cmd) {
                break;
            }
            if is_move_to(cmd) {
                if !sp.points.is_empty() {
                    subpaths.push(core::mem::take(&mut sp));
                }
                sp.push(PointD::new(x, y));
            } else if is_vertex(cmd) {
                sp.push(PointD::new(x, y));
            } else if is_end_poly(cmd) && is_close(cmd) {
                sp.close();
            }
        }
        if !sp.points.is_empty() {
            subpaths.push(sp);
        }
        Self {
            subpaths,
            current: None,
            distance: 0.0,
        }
    }

    /// A cache over explicit open polylines.
    pub fn from_lines(lines: &[Vec<PointD>]) -> Self {
        let subpaths = lines
            .iter()
            .filter(|l| !l.is_empty())
            .map(|l| {
                let mut sp = SubPath::default();
                l.iter().for_each(|p| sp.push(*p));
                sp
            })
            .collect();
        Self {
            subpaths,
            current: None,
            distance: 0.0,
        }
    }

    pub fn subpath_count(&self) -> usize {
        self.subpaths.len()
    }

    /// Move the cursor before the first subpath.
    pub fn reset(&mut self) {
        self.current = None;
        self.distance = 0.0;
    }

    /// Advance to the start of the next subpath. Returns false when all
    /// subpaths have been visited.
    pub fn next_subpath(&mut self) -> bool {
        let next = self.current.map_or(0, |c| c + 1);
        if next >= self.subpaths.len() {
            self.current = Some(self.subpaths.len());
            return false;
        }
        self.current = Some(next);
        self.distance = 0.0;
        true
    }

    fn sub(&self) -> Option<&SubPath> {
        self.current.and_then(|c| self.subpaths.get(c))
    }

    /// Total length of the current subpath.
    pub fn length(&self) -> f64 {
        self.sub().map_or(0.0, SubPath::length)
    }

    pub fn is_closed(&self) -> bool {
        self.sub().is_some_and(|s| s.closed)
    }

    /// Distance traveled from the subpath start.
    pub fn linear_position(&self) -> f64 {
        self.distance
    }

    /// Distance left until the end of the current subpath.
    pub fn remaining(&self) -> f64 {
        (self.length() - self.distance).max(0.0)
    }

    pub fn position(&self) -> PointD {
        self.sub()
            .map_or_else(PointD::default, |s| s.point_at(self.distance))
    }

    /// Direction of the segment under the cursor.
    pub fn current_segment_angle(&self) -> f64 {
        self.sub().map_or(0.0, |s| s.segment_angle(self.distance))
    }

    pub fn current_position(&self) -> PathPosition {
        let p = self.position();
        PathPosition {
            x: p.x,
            y: p.y,
            angle: self.current_segment_angle(),
        }
    }

    /// Vertices of the current subpath (a closed ring repeats its first
    /// point at the end).
    pub fn vertices(&self) -> &[PointD] {
        self.sub().map_or(&[], |s| s.points.as_slice())
    }

    /// Resolve `d` against the current subpath: wrapped for rings, `None`
    /// when an open line would be left.
    fn resolve(&self, d: f64) -> Option<f64> {
        let sub = self.sub()?;
        let len = sub.length();
        if sub.closed && len > 0.0 {
            Some(d.rem_euclid(len))
        } else if d < -LENGTH_EPSILON || d > len + LENGTH_EPSILON {
            None
        } else {
            Some(d.clamp(0.0, len))
        }
    }

    /// Jump to arc length `d` from the subpath start.
    pub fn move_to_distance(&mut self, d: f64) -> bool {
        match self.resolve(d) {
            Some(d) => {
                self.distance = d;
                true
            }
            None => false,
        }
    }

    /// Relative move; negative values go backward.
    pub fn move_by(&mut self, offset: f64) -> bool {
        self.move_to_distance(self.distance + offset)
    }

    pub fn forward(&mut self, length: f64) -> bool {
        self.move_by(length.abs())
    }

    pub fn backward(&mut self, length: f64) -> bool {
        self.move_by(-length.abs())
    }

    /// Direction of the chord from the cursor to the point `width` further
    /// along the path. Falls back to the segment direction for a zero
    /// chord. On open lines the chord end is clamped to the path end.
    pub fn angle(&self, width: f64) -> f64 {
        let Some(sub) = self.sub() else {
            return 0.0;
        };
        let start = sub.point_at(self.distance);
        let end_d = if sub.closed && sub.length() > 0.0 {
            (self.distance + width).rem_euclid(sub.length())
        } else {
            (self.distance + width).clamp(0.0, sub.length())
        };
        let end = sub.point_at(end_d);
        let (dx, dy) = (end.x - start.x, end.y - start.y);
        if width == 0.0 || dx.hypot(dy) <= VERTEX_DIST_EPSILON {
            return sub.segment_angle(self.distance);
        }
        if width < 0.0 {
            (-dy).atan2(-dx)
        } else {
            dy.atan2(dx)
        }
    }

    pub fn checkpoint(&self) -> CacheState {
        CacheState {
            subpath: self.current,
            distance: self.distance,
        }
    }

    pub fn restore(&mut self, state: CacheState) {
        self.current = state.subpath;
        self.distance = state.distance;
    }

    /// A new single-subpath cache running parallel to the current subpath
    /// at `offset` pixels to its left (above a left-to-right line in y-down
    /// device space). The returned cache is positioned on its subpath.
    pub fn offset_subpath(&self, offset: f64) -> PathVertexCache {
        let points = self.vertices();
        let mut sp = SubPath::default();
        let closed = self.is_closed();
        let n = points.len();
        let normal = |a: PointD, b: PointD| {
            let d = calc_distance(a.x, a.y, b.x, b.y);
            PointD::new((b.y - a.y) / d, -(b.x - a.x) / d)
        };
        for i in 0..n {
            let prev = if i > 0 {
                Some(normal(points[i - 1], points[i]))
            } else if closed && n > 2 {
                Some(normal(points[n - 2], points[0]))
            } else {
                None
            };
            let next = if i + 1 < n {
                Some(normal(points[i], points[i + 1]))
            } else if closed && n > 2 {
                Some(normal(points[0], points[1]))
            } else {
                None
            };
            let nrm = match (prev, next) {
                (Some(a), Some(b)) => {
                    let m = PointD::new(a.x + b.x, a.y + b.y);
                    let len = m.x.hypot(m.y);
                    if len <= VERTEX_DIST_EPSILON {
                        b
                    } else {
                        // miter: scale so both adjacent segments move by offset
                        let m = PointD::new(m.x / len, m.y / len);
                        let cos = (m.x * b.x + m.y * b.y).max(0.25);
                        PointD::new(m.x / cos, m.y / cos)
                    }
                }
                (Some(a), None) => a,
                (None, Some(b)) => b,
                (None, None) => PointD::default(),
            };
            sp.push(PointD::new(points[i].x + nrm.x * offset, points[i].y + nrm.y * offset));
        }
        sp.closed = closed;
        let mut out = PathVertexCache {
            subpaths: if sp.points.is_empty() { Vec::new() } else { vec![sp] },
            current: None,
            distance: 0.0,
        };
        out.next_subpath();
        out
    }
}

// ============================================================================
// Tests
// ============================================================================
