//! Raster backend interface.
//!
//! Placement never looks at pixels: it hands device-space paths, glyph
//! positions and markers to a [`RasterBackend`]. [`RecordingBackend`]
//! keeps the calls as [`DrawOp`]s, which is all tests and headless callers
//! need.

use crate::basics::{collect_vertices, PointD, RectD, VertexD, VertexSource};
use crate::color::Rgba8;
use crate::errors::{Error, Result};
use crate::marker_cache::Marker;
use crate::markers_placement::rotated_bounds;
use crate::placement_finder::GlyphPositions;
use crate::text_properties::TextFormat;

pub trait RasterBackend {
    fn fill_path(&mut self, path: &mut dyn VertexSource, fill: Rgba8) -> Result<()>;

    fn stroke_path(&mut self, path: &mut dyn VertexSource, stroke: Rgba8, width: f64) -> Result<()>;

    fn draw_glyphs(&mut self, glyphs: &GlyphPositions, format: &TextFormat) -> Result<()>;

    /// Draw `marker` scaled by `scale`, rotated by `angle` and with its
    /// anchor at `pos`.
    fn draw_marker(
        &mut self,
        marker: &Marker,
        pos: PointD,
        angle: f64,
        scale: f64,
        opacity: f64,
    ) -> Result<()>;
}

impl<B: RasterBackend + ?Sized> RasterBackend for &mut B {
    fn fill_path(&mut self, path: &mut dyn VertexSource, fill: Rgba8) -> Result<()> {
        (**self).fill_path(path, fill)
    }

    fn stroke_path(
        &mut self,
        path: &mut dyn VertexSource,
        stroke: Rgba8,
        width: f64,
    ) -> Result<()> {
        (**self).stroke_path(path, stroke, width)
    }

    fn draw_glyphs(&mut self, glyphs: &GlyphPositions, format: &TextFormat) -> Result<()> {
        (**self).draw_glyphs(glyphs, format)
    }

    fn draw_marker(
        &mut self,
        marker: &Marker,
        pos: PointD,
        angle: f64,
        scale: f64,
        opacity: f64,
    ) -> Result<()> {
        (**self).draw_marker(marker, pos, angle, scale, opacity)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Fill {
        vertices: Vec<VertexD>,
        color: Rgba8,
    },
    Stroke {
        vertices: Vec<VertexD>,
        color: Rgba8,
        width: f64,
    },
    Glyphs {
        text: String,
        /// Baseline start and angle of every glyph.
        positions: Vec<(PointD, f64)>,
        bbox: RectD,
        fill: Rgba8,
    },
    Marker {
        name: String,
        pos: PointD,
        angle: f64,
        bbox: RectD,
        opacity: f64,
    },
}

/// Records every call in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    ops: Vec<DrawOp>,
    limit: Option<usize>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call after `n` recorded operations, as a backend that
    /// ran out of room would.
    pub fn with_limit(n: usize) -> Self {
        Self {
            ops: Vec::new(),
            limit: Some(n),
        }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<DrawOp> {
        self.ops
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }

    fn record(&mut self, op: DrawOp) -> Result<()> {
        if self.limit.is_some_and(|n| self.ops.len() >= n) {
            return Err(Error::Backend {
                message: format!("operation limit of {} reached", self.ops.len()),
            });
        }
        self.ops.push(op);
        Ok(())
    }
}

impl RasterBackend for RecordingBackend {
    fn fill_path(&mut self, path: &mut dyn VertexSource, fill: Rgba8) -> Result<()> {
        let vertices = collect_vertices(path);
        self.record(DrawOp::Fill { vertices, color: fill })
    }

    fn stroke_path(
        &mut self,
        path: &mut dyn VertexSource,
        stroke: Rgba8,
        width: f64,
    ) -> Result<()> {
        let vertices = collect_vertices(path);
        self.record(DrawOp::Stroke {
            vertices,
            color: stroke,
            width,
        })
    }

    fn draw_glyphs(&mut self, glyphs: &GlyphPositions, format: &TextFormat) -> Result<()> {
        self.record(DrawOp::Glyphs {
            text: glyphs.glyphs.iter().map(|g| g.glyph.ch).collect(),
            positions: glyphs.glyphs.iter().map(|g| (g.pos, g.angle)).collect(),
            bbox: glyphs.bbox(),
            fill: format.fill.with_opacity(format.opacity),
        })
    }

    fn draw_marker(
        &mut self,
        marker: &Marker,
        pos: PointD,
        angle: f64,
        scale: f64,
        opacity: f64,
    ) -> Result<()> {
        self.record(DrawOp::Marker {
            name: marker.name().to_string(),
            pos,
            angle,
            bbox: rotated_bounds(&marker.scaled_bbox(scale), pos, angle),
            opacity,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_storage::PathStorage;

    #[test]
    fn test_records_in_order() {
        let mut b = RecordingBackend::new();
        let mut p = PathStorage::new();
        p.move_to(0.0, 0.0);
        p.line_to(5.0, 5.0);
        b.stroke_path(&mut p, Rgba8::BLACK, 2.0).unwrap();
        let marker = Marker::from_ring(
            "m",
            &[PointD::new(0.0, 0.0), PointD::new(1.0, 0.0), PointD::new(1.0, 1.0)],
        );
        b.draw_marker(&marker, PointD::new(3.0, 4.0), 0.5, 1.0, 1.0).unwrap();

        assert_eq!(b.ops().len(), 2);
        assert!(matches!(
            &b.ops()[0],
            DrawOp::Stroke { vertices, width, .. } if vertices.len() == 2 && *width == 2.0
        ));
        assert!(matches!(&b.ops()[1], DrawOp::Marker { name, .. } if name == "m"));
    }

    #[test]
    fn test_limit_reports_backend_error() {
        let mut b = RecordingBackend::with_limit(1);
        let mut p = PathStorage::new();
        p.move_to(0.0, 0.0);
        p.line_to(5.0, 0.0);
        p.line_to(5.0, 5.0);
        p.close_polygon();
        b.fill_path(&mut p, Rgba8::WHITE).unwrap();
        assert!(matches!(b.fill_path(&mut p, Rgba8::WHITE), Err(Error::Backend { .. })));
        assert_eq!(b.ops().len(), 1);
    }
}
