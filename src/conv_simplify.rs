//! Douglas-Peucker simplification stage.
//!
//! Buffers one subpath at a time and drops vertices closer than
//! `tolerance` to the simplified line. Endpoints are always kept; a closed
//! ring keeps at least three vertices and its CLOSE.

use crate::basics::{
    is_close, is_end_poly, is_move_to, is_stop, is_vertex, PointD, VertexD, VertexSource,
    PATH_CMD_CLOSE, PATH_CMD_LINE_TO, PATH_CMD_MOVE_TO, PATH_CMD_STOP,
};
use crate::math::calc_segment_point_sq_distance;

pub struct ConvSimplify<VS: VertexSource> {
    source: VS,
    tolerance: f64,
    subpath: Vec<PointD>,
    closed: bool,
    out: Vec<VertexD>,
    out_idx: usize,
    pending_move: Option<PointD>,
    done: bool,
}

impl<VS: VertexSource> ConvSimplify<VS> {
    /// `tolerance` is in the coordinate units of `source`.
    pub fn new(source: VS, tolerance: f64) -> Self {
        Self {
            source,
            tolerance,
            subpath: Vec::new(),
            closed: false,
            out: Vec::new(),
            out_idx: 0,
            pending_move: None,
            done: false,
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn read_subpath(&mut self) -> bool {
        self.subpath.clear();
        self.closed = false;
        if let Some(p) = self.pending_move.take() {
            self.subpath.push(p);
        }
        loop {
            let (mut x, mut y) = (0.0, 0.0);
            let cmd = self.source.vertex(&mut x, &mut y);
            if is_stop(cmd) {
                self.done = true;
                return !self.subpath.is_empty();
            }
            if is_move_to(cmd) && !self.subpath.is_empty() {
                self.pending_move = Some(PointD::new(x, y));
                return true;
            }
            if is_vertex(cmd) {
                self.subpath.push(PointD::new(x, y));
            } else if is_end_poly(cmd) && !self.subpath.is_empty() {
                self.closed = is_close(cmd);
                return true;
            }
        }
    }

    fn emit(&mut self) {
        self.out.clear();
        self.out_idx = 0;
        let mut kept = if self.closed {
            let mut ring = self.subpath.clone();
            ring.push(self.subpath[0]);
            let mut kept = douglas_peucker(&ring, self.tolerance);
            kept.pop();
            if kept.len() < 3 {
                self.subpath.clone()
            } else {
                kept
            }
        } else {
            douglas_peucker(&self.subpath, self.tolerance)
        };
        for (i, p) in kept.drain(..).enumerate() {
            let cmd = if i == 0 {
                PATH_CMD_MOVE_TO
            } else {
                PATH_CMD_LINE_TO
            };
            self.out.push(VertexD::new(p.x, p.y, cmd));
        }
        if self.closed {
            self.out.push(VertexD::new(0.0, 0.0, PATH_CMD_CLOSE));
        }
    }
}

/// Iterative Douglas-Peucker. Keeps the first and last points.
pub fn douglas_peucker(points: &[PointD], tolerance: f64) -> Vec<PointD> {
    let n = points.len();
    if n < 3 || tolerance <= 0.0 {
        return points.to_vec();
    }
    let sq_tol = tolerance * tolerance;
    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;
    let mut stack = vec![(0usize, n - 1)];
    while let Some((first, last)) = stack.pop() {
        let (a, b) = (points[first], points[last]);
        let mut max_d = 0.0;
        let mut index = first;
        for (i, p) in points.iter().enumerate().take(last).skip(first + 1) {
            let d = calc_segment_point_sq_distance(a.x, a.y, b.x, b.y, p.x, p.y);
            if d > max_d {
                max_d = d;
                index = i;
            }
        }
        if max_d > sq_tol {
            keep[index] = true;
            stack.push((first, index));
            stack.push((index, last));
        }
    }
    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

impl<VS: VertexSource> VertexSource for ConvSimplify<VS> {
    fn rewind(&mut self, path_id: u32) {
        self.source.rewind(path_id);
        self.subpath.clear();
        self.out.clear();
        self.out_idx = 0;
        self.pending_move = None;
        self.done = false;
    }

    fn vertex(&mut self, x: &mut f64, y: &mut f64) -> u32 {
        loop {
            if let Some(v) = self.out.get(self.out_idx) {
                self.out_idx += 1;
                *x = v.x;
                *y = v.y;
                return v.cmd;
            }
            if self.done || !self.read_subpath() {
                return PATH_CMD_STOP;
            }
            self.emit();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
