//! Clip-to-extent stages.
//!
//! [`ConvClipLine`] streams: each segment is clipped as it arrives and a
//! MOVETO is emitted whenever the path re-enters the box. A ring that
//! leaves the box is no longer closed, so its closing segment is emitted as
//! an ordinary clipped segment instead of a CLOSE.
//!
//! [`ConvClipPolygon`] buffers one ring at a time and clips it with
//! Sutherland-Hodgman, keeping rings closed. Rings that vanish are dropped.

use std::collections::VecDeque;

use crate::basics::{
    is_close, is_end_poly, is_move_to, is_stop, is_vertex, PointD, RectD, VertexD, VertexSource,
    PATH_CMD_CLOSE, PATH_CMD_LINE_TO, PATH_CMD_MOVE_TO, PATH_CMD_STOP,
};
use crate::clip_liang_barsky::{clip_segment, clipping_flags};

// ============================================================================
// ConvClipLine
// ============================================================================

pub struct ConvClipLine<VS: VertexSource> {
    source: VS,
    clip_box: RectD,
    queue: VecDeque<VertexD>,
    start: PointD,
    prev: PointD,
    has_prev: bool,
    pen_down: bool,
    ring_clipped: bool,
}

impl<VS: VertexSource> ConvClipLine<VS> {
    pub fn new(source: VS, clip_box: RectD) -> Self {
        Self {
            source,
            clip_box,
            queue: VecDeque::with_capacity(2),
            start: PointD::default(),
            prev: PointD::default(),
            has_prev: false,
            pen_down: false,
            ring_clipped: false,
        }
    }

    fn line_to(&mut self, x: f64, y: f64) {
        if !self.has_prev {
            self.move_to(x, y);
            return;
        }
        let (px, py) = (self.prev.x, self.prev.y);
        self.prev = PointD::new(x, y);
        match clip_segment(px, py, x, y, &self.clip_box) {
            None => {
                self.pen_down = false;
                self.ring_clipped = true;
            }
            Some(s) => {
                if !self.pen_down || s.start_moved {
                    self.queue
                        .push_back(VertexD::new(s.x1, s.y1, PATH_CMD_MOVE_TO));
                }
                self.queue
                    .push_back(VertexD::new(s.x2, s.y2, PATH_CMD_LINE_TO));
                self.pen_down = !s.end_moved;
                if s.start_moved || s.end_moved {
                    self.ring_clipped = true;
                }
            }
        }
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.start = PointD::new(x, y);
        self.prev = self.start;
        self.has_prev = true;
        self.pen_down = clipping_flags(x, y, &self.clip_box) == 0;
        self.ring_clipped = !self.pen_down;
        if self.pen_down {
            self.queue.push_back(VertexD::new(x, y, PATH_CMD_MOVE_TO));
        }
    }
}

impl<VS: VertexSource> VertexSource for ConvClipLine<VS> {
    fn rewind(&mut self, path_id: u32) {
        self.source.rewind(path_id);
        self.queue.clear();
        self.has_prev = false;
        self.pen_down = false;
        self.ring_clipped = false;
    }

    fn vertex(&mut self, x: &mut f64, y: &mut f64) -> u32 {
        loop {
            if let Some(v) = self.queue.pop_front() {
                *x = v.x;
                *y = v.y;
                return v.cmd;
            }
            let (mut vx, mut vy) = (0.0, 0.0);
            let cmd = self.source.vertex(&mut vx, &mut vy);
            if is_stop(cmd) {
                return PATH_CMD_STOP;
            }
            if is_move_to(cmd) {
                self.move_to(vx, vy);
            } else if is_vertex(cmd) {
                self.line_to(vx, vy);
            } else if is_close(cmd) && self.has_prev {
                if self.ring_clipped {
                    let s = self.start;
                    self.line_to(s.x, s.y);
                } else if self.pen_down {
                    *x = 0.0;
                    *y = 0.0;
                    self.pen_down = false;
                    return PATH_CMD_CLOSE;
                }
            }
        }
    }
}

// ============================================================================
// ConvClipPolygon
// ============================================================================

pub struct ConvClipPolygon<VS: VertexSource> {
    source: VS,
    clip_box: RectD,
    ring: Vec<PointD>,
    out: Vec<VertexD>,
    out_idx: usize,
    pending_move: Option<PointD>,
    done: bool,
}

impl<VS: VertexSource> ConvClipPolygon<VS> {
    pub fn new(source: VS, clip_box: RectD) -> Self {
        Self {
            source,
            clip_box,
            ring: Vec::new(),
            out: Vec::new(),
            out_idx: 0,
            pending_move: None,
            done: false,
        }
    }

    /// Read the next ring into `self.ring`. Returns false at end of input.
    fn read_ring(&mut self) -> bool {
        self.ring.clear();
        if let Some(p) = self.pending_move.take() {
            self.ring.push(p);
        }
        loop {
            let (mut x, mut y) = (0.0, 0.0);
            let cmd = self.source.vertex(&mut x, &mut y);
            if is_stop(cmd) {
                self.done = true;
                return !self.ring.is_empty();
            }
            if is_move_to(cmd) {
                if self.ring.is_empty() {
                    self.ring.push(PointD::new(x, y));
                    continue;
                }
                self.pending_move = Some(PointD::new(x, y));
                return true;
            }
            if is_vertex(cmd) {
                self.ring.push(PointD::new(x, y));
            } else if is_end_poly(cmd) && !self.ring.is_empty() {
                return true;
            }
        }
    }

    fn emit_clipped_ring(&mut self) {
        self.out.clear();
        self.out_idx = 0;
        let clipped = clip_ring(&self.ring, &self.clip_box);
        if clipped.len() < 3 {
            return;
        }
        for (i, p) in clipped.iter().enumerate() {
            let cmd = if i == 0 {
                PATH_CMD_MOVE_TO
            } else {
                PATH_CMD_LINE_TO
            };
            self.out.push(VertexD::new(p.x, p.y, cmd));
        }
        self.out.push(VertexD::new(0.0, 0.0, PATH_CMD_CLOSE));
    }
}

/// Sutherland-Hodgman against the four box edges.
pub fn clip_ring(ring: &[PointD], b: &RectD) -> Vec<PointD> {
    type Inside = fn(&PointD, &RectD) -> bool;
    type Cross = fn(&PointD, &PointD, &RectD) -> PointD;
    let edges: [(Inside, Cross); 4] = [
        (|p, b| p.x >= b.x1, |a, c, b| at_x(a, c, b.x1)),
        (|p, b| p.x <= b.x2, |a, c, b| at_x(a, c, b.x2)),
        (|p, b| p.y >= b.y1, |a, c, b| at_y(a, c, b.y1)),
        (|p, b| p.y <= b.y2, |a, c, b| at_y(a, c, b.y2)),
    ];
    let mut input: Vec<PointD> = ring.to_vec();
    if input.len() > 1 && input.first() == input.last() {
        input.pop();
    }
    for (inside, cross) in edges {
        if input.is_empty() {
            break;
        }
        let mut output = Vec::with_capacity(input.len() + 4);
        let mut prev = input[input.len() - 1];
        for &cur in &input {
            let (cur_in, prev_in) = (inside(&cur, b), inside(&prev, b));
            if cur_in {
                if !prev_in {
                    output.push(cross(&prev, &cur, b));
                }
                output.push(cur);
            } else if prev_in {
                output.push(cross(&prev, &cur, b));
            }
            prev = cur;
        }
        input = output;
    }
    input
}

fn at_x(a: &PointD, c: &PointD, x: f64) -> PointD {
    let t = (x - a.x) / (c.x - a.x);
    PointD::new(x, a.y + t * (c.y - a.y))
}

fn at_y(a: &PointD, c: &PointD, y: f64) -> PointD {
    let t = (y - a.y) / (c.y - a.y);
    PointD::new(a.x + t * (c.x - a.x), y)
}

impl<VS: VertexSource> VertexSource for ConvClipPolygon<VS> {
    fn rewind(&mut self, path_id: u32) {
        self.source.rewind(path_id);
        self.ring.clear();
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
            if self.done || !self.read_ring() {
                return PATH_CMD_STOP;
            }
            self.emit_clipped_ring();
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

    fn bbox() -> RectD {
        RectD::new(0.0, 0.0, 100.0, 100.0)
    }

    fn cmds(v: &[VertexD]) -> Vec<u32> {
        v.iter().map(|v| v.cmd).collect()
    }

    #[test]
    fn test_line_inside_unchanged() {
        let mut p = PathStorage::new();
        p.move_to(10.0, 10.0);
        p.line_to(50.0, 50.0);
        let v = collect_vertices(&mut ConvClipLine::new(&mut p, bbox()));
        assert_eq!(v, p.vertices().to_vec());
    }

    #[test]
    fn test_line_leaves_and_reenters() {
        let mut p = PathStorage::new();
        p.move_to(50.0, 50.0);
        p.line_to(150.0, 50.0);
        p.line_to(150.0, 80.0);
        p.line_to(50.0, 80.0);
        let v = collect_vertices(&mut ConvClipLine::new(&mut p, bbox()));
        assert_eq!(
            cmds(&v),
            vec![
                PATH_CMD_MOVE_TO,
                PATH_CMD_LINE_TO,
                PATH_CMD_MOVE_TO,
                PATH_CMD_LINE_TO
            ]
        );
        assert_eq!((v[1].x, v[1].y), (100.0, 50.0));
        assert_eq!((v[2].x, v[2].y), (100.0, 80.0));
        assert_eq!((v[3].x, v[3].y), (50.0, 80.0));
    }

    #[test]
    fn test_line_starts_outside() {
        let mut p = PathStorage::new();
        p.move_to(-50.0, 50.0);
        p.line_to(50.0, 50.0);
        let v = collect_vertices(&mut ConvClipLine::new(&mut p, bbox()));
        assert_eq!(cmds(&v), vec![PATH_CMD_MOVE_TO, PATH_CMD_LINE_TO]);
        assert_eq!((v[0].x, v[0].y), (0.0, 50.0));
    }

    #[test]
    fn test_closed_ring_inside_keeps_close() {
        let mut p = PathStorage::new();
        p.move_to(10.0, 10.0);
        p.line_to(20.0, 10.0);
        p.line_to(20.0, 20.0);
        p.close_polygon();
        let v = collect_vertices(&mut ConvClipLine::new(&mut p, bbox()));
        assert_eq!(v.last().map(|v| v.cmd), Some(PATH_CMD_CLOSE));
    }

    #[test]
    fn test_clipped_ring_emits_closing_segment() {
        let mut p = PathStorage::new();
        p.move_to(50.0, 50.0);
        p.line_to(150.0, 50.0);
        p.line_to(150.0, 60.0);
        p.line_to(50.0, 60.0);
        p.close_polygon();
        let v = collect_vertices(&mut ConvClipLine::new(&mut p, bbox()));
        assert!(v.iter().all(|v| v.cmd != PATH_CMD_CLOSE));
        let last = v.last().unwrap();
        assert_eq!((last.x, last.y), (50.0, 50.0));
        for v in &v {
            assert!(bbox().contains_point(v.x, v.y));
        }
    }

    #[test]
    fn test_polygon_clip_square() {
        let mut p = PathStorage::new();
        p.move_to(50.0, 50.0);
        p.line_to(150.0, 50.0);
        p.line_to(150.0, 150.0);
        p.line_to(50.0, 150.0);
        p.close_polygon();
        let v = collect_vertices(&mut ConvClipPolygon::new(&mut p, bbox()));
        assert_eq!(v.len(), 5);
        assert_eq!(v[0].cmd, PATH_CMD_MOVE_TO);
        assert_eq!(v[4].cmd, PATH_CMD_CLOSE);
        let mut env = RectD::invalid();
        for v in &v[..4] {
            env.expand_to_include(v.x, v.y);
        }
        assert_eq!(env, RectD::new(50.0, 50.0, 100.0, 100.0));
    }

    #[test]
    fn test_polygon_outside_ring_dropped() {
        let mut p = PathStorage::new();
        p.move_to(200.0, 200.0);
        p.line_to(300.0, 200.0);
        p.line_to(300.0, 300.0);
        p.close_polygon();
        p.move_to(10.0, 10.0);
        p.line_to(20.0, 10.0);
        p.line_to(20.0, 20.0);
        let v = collect_vertices(&mut ConvClipPolygon::new(&mut p, bbox()));
        assert_eq!(
            cmds(&v),
            vec![
                PATH_CMD_MOVE_TO,
                PATH_CMD_LINE_TO,
                PATH_CMD_LINE_TO,
                PATH_CMD_CLOSE
            ]
        );
    }

    #[test]
    fn test_clip_ring_covering_box() {
        let ring = [
            PointD::new(-10.0, -10.0),
            PointD::new(110.0, -10.0),
            PointD::new(110.0, 110.0),
            PointD::new(-10.0, 110.0),
        ];
        let out = clip_ring(&ring, &bbox());
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|p| bbox().contains_point(p.x, p.y)));
    }
}
