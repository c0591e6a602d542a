//! Corner smoothing stage.
//!
//! Every segment v1→v2 becomes a cubic curve whose control points come from
//! the neighbouring vertices v0 and v3, scaled by `smooth_value` (0 keeps
//! the polyline, 1 rounds corners fully). Curves are flattened into a fixed
//! number of line segments so downstream stages still see MOVETO/LINETO.

use crate::array::{VertexDist, VertexSequence};
use crate::basics::{
    is_close, is_end_poly, is_move_to, is_stop, is_vertex, PointD, VertexD, VertexSource,
    PATH_CMD_CLOSE, PATH_CMD_LINE_TO, PATH_CMD_MOVE_TO, PATH_CMD_STOP,
};

const DEFAULT_STEPS: u32 = 8;

pub struct ConvSmooth<VS: VertexSource> {
    source: VS,
    smooth_value: f64,
    steps: u32,
    seq: VertexSequence,
    closed: bool,
    out: Vec<VertexD>,
    out_idx: usize,
    pending_move: Option<PointD>,
    done: bool,
}

impl<VS: VertexSource> ConvSmooth<VS> {
    /// `smooth_value` is clamped to 0..=1.
    pub fn new(source: VS, smooth_value: f64) -> Self {
        Self {
            source,
            smooth_value: smooth_value.clamp(0.0, 1.0) * 0.5,
            steps: DEFAULT_STEPS,
            seq: VertexSequence::new(),
            closed: false,
            out: Vec::new(),
            out_idx: 0,
            pending_move: None,
            done: false,
        }
    }

    /// Line segments per smoothed source segment.
    pub fn set_approximation_steps(&mut self, steps: u32) {
        self.steps = steps.max(1);
    }

    pub fn smooth_value(&self) -> f64 {
        self.smooth_value * 2.0
    }

    fn read_subpath(&mut self) -> bool {
        self.seq.remove_all();
        self.closed = false;
        if let Some(p) = self.pending_move.take() {
            self.seq.add(VertexDist::new(p.x, p.y));
        }
        loop {
            let (mut x, mut y) = (0.0, 0.0);
            let cmd = self.source.vertex(&mut x, &mut y);
            if is_stop(cmd) {
                self.done = true;
                break;
            }
            if is_move_to(cmd) && !self.seq.is_empty() {
                self.pending_move = Some(PointD::new(x, y));
                break;
            }
            if is_vertex(cmd) {
                self.seq.add(VertexDist::new(x, y));
            } else if is_end_poly(cmd) && !self.seq.is_empty() {
                self.closed = is_close(cmd);
                break;
            }
        }
        let had_input = !self.seq.is_empty();
        self.seq.close(self.closed);
        had_input
    }

    fn control_points(
        &self,
        v0: &VertexDist,
        v1: &VertexDist,
        v2: &VertexDist,
        v3: &VertexDist,
    ) -> (PointD, PointD) {
        let k1 = ratio(v0.dist, v1.dist);
        let k2 = ratio(v1.dist, v2.dist);

        let xm1 = v0.x + (v2.x - v0.x) * k1;
        let ym1 = v0.y + (v2.y - v0.y) * k1;
        let xm2 = v1.x + (v3.x - v1.x) * k2;
        let ym2 = v1.y + (v3.y - v1.y) * k2;

        (
            PointD::new(
                v1.x + self.smooth_value * (v2.x - xm1),
                v1.y + self.smooth_value * (v2.y - ym1),
            ),
            PointD::new(
                v2.x + self.smooth_value * (v1.x - xm2),
                v2.y + self.smooth_value * (v1.y - ym2),
            ),
        )
    }

    fn emit(&mut self) {
        self.out.clear();
        self.out_idx = 0;
        let n = self.seq.size();
        if n == 0 {
            return;
        }
        let first = self.seq[0];
        self.out.push(VertexD::new(first.x, first.y, PATH_CMD_MOVE_TO));
        if n < 3 || self.smooth_value == 0.0 {
            for v in &self.seq.as_slice()[1..] {
                self.out.push(VertexD::new(v.x, v.y, PATH_CMD_LINE_TO));
            }
        } else {
            let segments = if self.closed { n } else { n - 1 };
            for i in 0..segments {
                let v1 = self.seq[i];
                let v2 = *self.seq.next(i);
                let v0 = if self.closed || i > 0 {
                    *self.seq.prev(i)
                } else {
                    VertexDist { dist: 0.0, ..v1 }
                };
                let v3 = if self.closed || i + 2 < n {
                    *self.seq.next(i + 1)
                } else {
                    VertexDist { dist: 0.0, ..v2 }
                };
                let (c1, c2) = self.control_points(&v0, &v1, &v2, &v3);
                self.flatten(&v1, c1, c2, &v2);
            }
        }
        if self.closed {
            self.out.push(VertexD::new(0.0, 0.0, PATH_CMD_CLOSE));
        }
    }

    fn flatten(&mut self, p1: &VertexDist, c1: PointD, c2: PointD, p2: &VertexDist) {
        for s in 1..=self.steps {
            let t = s as f64 / self.steps as f64;
            let mt = 1.0 - t;
            let a = mt * mt * mt;
            let b = 3.0 * mt * mt * t;
            let c = 3.0 * mt * t * t;
            let d = t * t * t;
            let x = a * p1.x + b * c1.x + c * c2.x + d * p2.x;
            let y = a * p1.y + b * c1.y + c * c2.y + d * p2.y;
            self.out.push(VertexD::new(x, y, PATH_CMD_LINE_TO));
        }
    }
}

fn ratio(a: f64, b: f64) -> f64 {
    if a + b == 0.0 {
        0.0
    } else {
        a / (a + b)
    }
}

impl<VS: VertexSource> VertexSource for ConvSmooth<VS> {
    fn rewind(&mut self, path_id: u32) {
        self.source.rewind(path_id);
        self.seq.remove_all();
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basics::collect_vertices;
    use crate::path_storage::PathStorage;

    fn corner() -> PathStorage {
        let mut p = PathStorage::new();
        p.move_to(0.0, 0.0);
        p.line_to(10.0, 0.0);
        p.line_to(10.0, 10.0);
        p
    }

    #[test]
    fn test_zero_smooth_keeps_polyline() {
        let mut p = corner();
        let v = collect_vertices(&mut ConvSmooth::new(&mut p, 0.0));
        assert_eq!(v, p.vertices().to_vec());
    }

    #[test]
    fn test_curve_passes_through_vertices() {
        let mut p = corner();
        let mut s = ConvSmooth::new(&mut p, 1.0);
        s.set_approximation_steps(4);
        let v = collect_vertices(&mut s);
        assert_eq!(v.len(), 1 + 2 * 4);
        assert_eq!((v[0].x, v[0].y), (0.0, 0.0));
        let last = v.last().unwrap();
        assert!((last.x - 10.0).abs() < 1e-12 && (last.y - 10.0).abs() < 1e-12);
        // the curve passes through the corner and bows around it
        assert!((v[4].x - 10.0).abs() < 1e-12 && v[4].y.abs() < 1e-12);
        assert!(v[3].y < 0.0);
        assert!(v[5].x > 10.0);
    }

    #[test]
    fn test_closed_ring_stays_closed() {
        let mut p = PathStorage::new();
        p.move_to(0.0, 0.0);
        p.line_to(10.0, 0.0);
        p.line_to(10.0, 10.0);
        p.line_to(0.0, 10.0);
        p.close_polygon();
        let v = collect_vertices(&mut ConvSmooth::new(&mut p, 0.5));
        assert_eq!(v.len(), 1 + 4 * DEFAULT_STEPS as usize + 1);
        assert_eq!(v.last().map(|v| v.cmd), Some(PATH_CMD_CLOSE));
        // curve ends back at the ring start
        let end = v[v.len() - 2];
        assert!(end.x.abs() < 1e-9 && end.y.abs() < 1e-9);
    }
}
