//! Reprojection stage.
//!
//! Moves layer coordinates into the map's CRS through
//! [`ProjTransform::backward`]. A vertex that cannot be transformed is
//! dropped; the next vertex that can be transformed after a drop starts a
//! new subpath (LINETO becomes MOVETO) so no segment is drawn across the
//! gap. A CLOSE whose ring lost every vertex is dropped as well.

use crate::basics::{
    is_close, is_end_poly, is_line_to, is_move_to, is_stop, VertexSource, PATH_CMD_MOVE_TO,
};
use crate::projection::ProjTransform;

pub struct ConvReproject<'a, VS: VertexSource> {
    source: VS,
    trans: &'a ProjTransform,
    gap: bool,
    ring_has_vertex: bool,
    skipped: usize,
}

impl<'a, VS: VertexSource> ConvReproject<'a, VS> {
    pub fn new(source: VS, trans: &'a ProjTransform) -> Self {
        Self {
            source,
            trans,
            gap: false,
            ring_has_vertex: false,
            skipped: 0,
        }
    }

    /// Vertices dropped since the last rewind.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<'a, VS: VertexSource> VertexSource for ConvReproject<'a, VS> {
    fn rewind(&mut self, path_id: u32) {
        self.source.rewind(path_id);
        self.gap = false;
        self.ring_has_vertex = false;
        self.skipped = 0;
    }

    fn vertex(&mut self, x: &mut f64, y: &mut f64) -> u32 {
        loop {
            let mut cmd = self.source.vertex(x, y);
            if is_stop(cmd) {
                return cmd;
            }
            if is_end_poly(cmd) {
                if is_close(cmd) && !self.ring_has_vertex {
                    continue;
                }
                return cmd;
            }
            if is_move_to(cmd) {
                self.ring_has_vertex = false;
            }
            if self.trans.backward(x, y) {
                if self.gap && is_line_to(cmd) {
                    cmd = PATH_CMD_MOVE_TO;
                }
                self.gap = false;
                self.ring_has_vertex = true;
                return cmd;
            }
            self.skipped += 1;
            self.gap = true;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basics::{collect_vertices, PATH_CMD_CLOSE, PATH_CMD_LINE_TO};
    use crate::path_storage::PathStorage;
    use crate::projection::Projection;

    fn merc_from_lonlat() -> ProjTransform {
        // map: mercator, layer: lon/lat
        ProjTransform::new(Projection::WebMercator, Projection::LonLat)
    }

    fn cmds(path: &mut dyn VertexSource) -> Vec<u32> {
        collect_vertices(path).iter().map(|v| v.cmd).collect()
    }

    #[test]
    fn test_interior_failure_breaks_line() {
        let t = merc_from_lonlat();
        let mut p = PathStorage::new();
        p.move_to(0.0, 0.0);
        p.line_to(10.0, 10.0);
        p.line_to(20.0, 89.0); // outside the mercator domain
        p.line_to(30.0, 10.0);
        p.line_to(40.0, 0.0);
        let mut conv = ConvReproject::new(&mut p, &t);
        assert_eq!(
            cmds(&mut conv),
            vec![
                PATH_CMD_MOVE_TO,
                PATH_CMD_LINE_TO,
                PATH_CMD_MOVE_TO,
                PATH_CMD_LINE_TO
            ]
        );
        assert_eq!(conv.skipped(), 1);
    }

    #[test]
    fn test_consecutive_failures_at_subpath_start() {
        let t = merc_from_lonlat();
        let mut p = PathStorage::new();
        p.move_to(0.0, 89.0);
        p.line_to(0.0, 88.0);
        p.line_to(0.0, 10.0);
        p.line_to(0.0, 20.0);
        p.move_to(5.0, 5.0);
        p.line_to(6.0, 6.0);
        let mut conv = ConvReproject::new(&mut p, &t);
        assert_eq!(
            cmds(&mut conv),
            vec![
                PATH_CMD_MOVE_TO,
                PATH_CMD_LINE_TO,
                PATH_CMD_MOVE_TO,
                PATH_CMD_LINE_TO
            ]
        );
    }

    #[test]
    fn test_fully_failed_ring_drops_close() {
        let t = merc_from_lonlat();
        let mut p = PathStorage::new();
        p.move_to(0.0, 87.0);
        p.line_to(1.0, 87.0);
        p.line_to(1.0, 88.0);
        p.close_polygon();
        p.move_to(0.0, 0.0);
        p.line_to(1.0, 0.0);
        p.line_to(1.0, 1.0);
        p.close_polygon();
        let mut conv = ConvReproject::new(&mut p, &t);
        assert_eq!(
            cmds(&mut conv),
            vec![
                PATH_CMD_MOVE_TO,
                PATH_CMD_LINE_TO,
                PATH_CMD_LINE_TO,
                PATH_CMD_CLOSE
            ]
        );
    }

    #[test]
    fn test_same_crs_passes_through() {
        let t = ProjTransform::new(Projection::LonLat, Projection::LonLat);
        let mut p = PathStorage::new();
        p.move_to(0.1, 95.0);
        p.line_to(200.0, -95.0);
        let before = p.vertices().to_vec();
        let mut conv = ConvReproject::new(&mut p, &t);
        assert_eq!(collect_vertices(&mut conv), before);
    }
}
