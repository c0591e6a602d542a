//! Path storage: a materialized list of path commands.
//!
//! Marker shapes, recorded backend paths and test fixtures are stored here.
//! Geometry never is: feature geometry streams through the transform chain.

use crate::basics::{
    is_stop, is_vertex, RectD, VertexD, VertexSource, PATH_CMD_CLOSE, PATH_CMD_LINE_TO,
    PATH_CMD_MOVE_TO, PATH_CMD_STOP,
};
use crate::trans_affine::TransAffine;

/// Ordered vertices with commands. Implements `VertexSource`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathStorage {
    vertices: Vec<VertexD>,
    iterator: usize,
}

impl PathStorage {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            iterator: 0,
        }
    }

    pub fn remove_all(&mut self) {
        self.vertices.clear();
        self.iterator = 0;
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.vertices.push(VertexD::new(x, y, PATH_CMD_MOVE_TO));
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        self.vertices.push(VertexD::new(x, y, PATH_CMD_LINE_TO));
    }

    /// Close the current ring. No-op when the last command is not a vertex.
    pub fn close_polygon(&mut self) {
        if self.vertices.last().map_or(false, |v| is_vertex(v.cmd)) {
            self.vertices.push(VertexD::new(0.0, 0.0, PATH_CMD_CLOSE));
        }
    }

    pub fn total_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertices(&self) -> &[VertexD] {
        &self.vertices
    }

    /// Append every vertex of `vs` (path 0) as-is.
    pub fn concat_path(&mut self, vs: &mut dyn VertexSource) {
        let (mut x, mut y) = (0.0, 0.0);
        vs.rewind(0);
        loop {
            let cmd = vs.vertex(&mut x, &mut y);
            if is_stop(cmd) {
                break;
            }
            self.vertices.push(VertexD::new(x, y, cmd));
        }
    }

    pub fn translate_all_paths(&mut self, dx: f64, dy: f64) {
        for v in self.vertices.iter_mut().filter(|v| is_vertex(v.cmd)) {
            v.x += dx;
            v.y += dy;
        }
    }

    pub fn transform_all_paths(&mut self, trans: &TransAffine) {
        for v in self.vertices.iter_mut().filter(|v| is_vertex(v.cmd)) {
            trans.transform(&mut v.x, &mut v.y);
        }
    }

    /// Bounds of all vertex coordinates; invalid when there are none.
    pub fn bounding_rect(&self) -> RectD {
        let mut r = RectD::invalid();
        for v in self.vertices.iter().filter(|v| is_vertex(v.cmd)) {
            r.expand_to_include(v.x, v.y);
        }
        r
    }
}

impl VertexSource for PathStorage {
    fn rewind(&mut self, _path_id: u32) {
        self.iterator = 0;
    }

    fn vertex(&mut self, x: &mut f64, y: &mut f64) -> u32 {
        match self.vertices.get(self.iterator) {
            Some(v) => {
                self.iterator += 1;
                *x = v.x;
                *y = v.y;
                v.cmd
            }
            None => PATH_CMD_STOP,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
