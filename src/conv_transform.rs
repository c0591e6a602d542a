//! Affine transform stage.
//!
//! Applies a symbolizer's geometry `transform` to every vertex. Only vertex
//! commands are transformed; CLOSE and STOP coordinates pass through.

use crate::basics::{is_vertex, VertexSource};
use crate::trans_affine::TransAffine;

/// Applies an affine transform to each vertex from a source.
/// Owns the source; use `ConvTransform<&mut S>` to borrow.
pub struct ConvTransform<VS: VertexSource> {
    source: VS,
    trans: TransAffine,
}

impl<VS: VertexSource> ConvTransform<VS> {
    pub fn new(source: VS, trans: TransAffine) -> Self {
        Self { source, trans }
    }

    pub fn transform(&self) -> &TransAffine {
        &self.trans
    }
}

impl<VS: VertexSource> VertexSource for ConvTransform<VS> {
    fn rewind(&mut self, path_id: u32) {
        self.source.rewind(path_id);
    }

    fn vertex(&mut self, x: &mut f64, y: &mut f64) -> u32 {
        let cmd = self.source.vertex(x, y);
        if is_vertex(cmd) {
            self.trans.transform(x, y);
        }
        cmd
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basics::{collect_vertices, PATH_CMD_CLOSE, PATH_CMD_LINE_TO, PATH_CMD_MOVE_TO};
    use crate::path_storage::PathStorage;

    #[test]
    fn test_translation() {
        let mut path = PathStorage::new();
        path.move_to(10.0, 20.0);
        path.line_to(30.0, 40.0);

        let mut ct = ConvTransform::new(path, TransAffine::new_translation(100.0, 200.0));
        let v = collect_vertices(&mut ct);
        assert_eq!(v[0].cmd, PATH_CMD_MOVE_TO);
        assert!((v[0].x - 110.0).abs() < 1e-10 && (v[0].y - 220.0).abs() < 1e-10);
        assert_eq!(v[1].cmd, PATH_CMD_LINE_TO);
        assert!((v[1].x - 130.0).abs() < 1e-10 && (v[1].y - 240.0).abs() < 1e-10);
    }

    #[test]
    fn test_close_not_transformed() {
        let mut path = PathStorage::new();
        path.move_to(1.0, 1.0);
        path.line_to(2.0, 1.0);
        path.line_to(2.0, 2.0);
        path.close_polygon();

        let mut ct = ConvTransform::new(&mut path, TransAffine::new_translation(5.0, 5.0));
        let v = collect_vertices(&mut ct);
        assert_eq!(v.len(), 4);
        assert_eq!(v[3].cmd, PATH_CMD_CLOSE);
        assert_eq!((v[3].x, v[3].y), (0.0, 0.0));
    }

    #[test]
    fn test_empty_source() {
        let mut ct = ConvTransform::new(PathStorage::new(), TransAffine::new_scaling(2.0, 2.0));
        assert!(collect_vertices(&mut ct).is_empty());
    }
}
