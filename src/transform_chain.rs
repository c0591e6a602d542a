//! Composition of the geometry transform stages.
//!
//! Stages are applied in a fixed order:
//!
//! 1. clip to the query extent (layer CRS, optional line or polygon clip)
//! 2. reproject layer CRS → map CRS
//! 3. symbolizer geometry transform (affine)
//! 4. simplify (tolerance given in device pixels)
//! 5. smooth
//! 6. view transform (world → device pixels)
//!
//! The result is a single lazy [`VertexSource`]; nothing is materialized
//! except the per-subpath buffers of the simplify and smooth stages.

use crate::basics::{PointD, RectD, VertexSource};
use crate::conv_clip::{ConvClipLine, ConvClipPolygon};
use crate::conv_reproject::ConvReproject;
use crate::conv_simplify::ConvSimplify;
use crate::conv_smooth::ConvSmooth;
use crate::conv_transform::ConvTransform;
use crate::conv_view::ConvView;
use crate::geometry::{Coordinate, Geometry};
use crate::geometry_adapter::GeometryVertexAdapter;
use crate::projection::ProjTransform;
use crate::trans_affine::{TransAffine, AFFINE_EPSILON};
use crate::trans_view::ViewTransform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClipMode {
    #[default]
    None,
    Line,
    Polygon,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformOptions {
    pub clip: ClipMode,
    /// Clip box in the layer CRS. Ignored when `clip` is `None`.
    pub clip_box: RectD,
    pub geometry_transform: Option<TransAffine>,
    /// Douglas-Peucker tolerance in device pixels; 0 disables.
    pub simplify_tolerance: f64,
    /// Corner smoothing 0..=1; 0 disables.
    pub smooth: f64,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            clip: ClipMode::None,
            clip_box: RectD::invalid(),
            geometry_transform: None,
            simplify_tolerance: 0.0,
            smooth: 0.0,
        }
    }
}

pub struct TransformChain<'a, T: Coordinate = f64> {
    geometry: &'a Geometry<T>,
    proj: &'a ProjTransform,
    view: &'a ViewTransform,
    options: &'a TransformOptions,
}

impl<'a, T: Coordinate + 'a> TransformChain<'a, T> {
    pub fn new(
        geometry: &'a Geometry<T>,
        proj: &'a ProjTransform,
        view: &'a ViewTransform,
        options: &'a TransformOptions,
    ) -> Self {
        Self {
            geometry,
            proj,
            view,
            options,
        }
    }

    pub fn geometry(&self) -> &'a Geometry<T> {
        self.geometry
    }

    pub fn view(&self) -> &'a ViewTransform {
        self.view
    }

    /// Run one world point through reprojection, the geometry transform and
    /// the view. Clipping, simplification and smoothing do not apply.
    pub fn transform_point(&self, p: PointD) -> Option<PointD> {
        let (mut x, mut y) = (p.x, p.y);
        if !self.proj.backward(&mut x, &mut y) {
            return None;
        }
        if let Some(m) = &self.options.geometry_transform {
            m.transform(&mut x, &mut y);
        }
        self.view.forward(&mut x, &mut y);
        Some(PointD::new(x, y))
    }

    /// Compose the enabled stages into one restartable vertex source.
    pub fn build(&self) -> Box<dyn VertexSource + 'a> {
        let opts = self.options;
        let mut vs: Box<dyn VertexSource + 'a> =
            Box::new(GeometryVertexAdapter::new(self.geometry));

        if opts.clip_box.is_valid() {
            vs = match opts.clip {
                ClipMode::None => vs,
                ClipMode::Line => Box::new(ConvClipLine::new(vs, opts.clip_box)),
                ClipMode::Polygon => Box::new(ConvClipPolygon::new(vs, opts.clip_box)),
            };
        }
        if !self.proj.equal() {
            vs = Box::new(ConvReproject::new(vs, self.proj));
        }
        if let Some(m) = opts.geometry_transform {
            if !m.is_identity(AFFINE_EPSILON) {
                vs = Box::new(ConvTransform::new(vs, m));
            }
        }
        if opts.simplify_tolerance > 0.0 {
            let tolerance = opts.simplify_tolerance / self.view.scale();
            vs = Box::new(ConvSimplify::new(vs, tolerance));
        }
        if opts.smooth > 0.0 {
            vs = Box::new(ConvSmooth::new(vs, opts.smooth));
        }
        vs = Box::new(ConvView::new(vs, *self.view));
        vs.rewind(0);
        vs
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basics::{collect_vertices, PATH_CMD_LINE_TO, PATH_CMD_MOVE_TO};
    use crate::geometry::Point;
    use crate::projection::Projection;

    fn view() -> ViewTransform {
        ViewTransform::new(100, 100, RectD::new(0.0, 0.0, 100.0, 100.0))
    }

    fn identity_proj() -> ProjTransform {
        ProjTransform::new(Projection::LonLat, Projection::LonLat)
    }

    #[test]
    fn test_plain_chain_is_view_only() {
        let g = Geometry::LineString(vec![Point::new(10.0, 10.0), Point::new(90.0, 10.0)]);
        let proj = identity_proj();
        let view = view();
        let opts = TransformOptions::default();
        let mut vs = TransformChain::new(&g, &proj, &view, &opts).build();
        let v = collect_vertices(&mut vs);
        assert_eq!((v[0].x, v[0].y), (10.0, 90.0));
        assert_eq!((v[1].x, v[1].y), (90.0, 90.0));
    }

    #[test]
    fn test_clip_runs_before_affine() {
        // clip in source units, then shift by 1000: output lies past the
        // clip box, proving the order
        let g = Geometry::LineString(vec![Point::new(-50.0, 50.0), Point::new(50.0, 50.0)]);
        let proj = identity_proj();
        let view = view();
        let opts = TransformOptions {
            clip: ClipMode::Line,
            clip_box: RectD::new(0.0, 0.0, 100.0, 100.0),
            geometry_transform: Some(TransAffine::new_translation(1000.0, 0.0)),
            ..TransformOptions::default()
        };
        let v = collect_vertices(&mut TransformChain::new(&g, &proj, &view, &opts).build());
        assert_eq!(v[0].x, 1000.0);
        assert_eq!(v[1].x, 1050.0);
    }

    #[test]
    fn test_reprojection_gap_survives_chain() {
        let g = Geometry::LineString(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 89.5),
            Point::new(3.0, 1.0),
            Point::new(4.0, 0.0),
        ]);
        let proj = ProjTransform::new(Projection::WebMercator, Projection::LonLat);
        let view = ViewTransform::new(256, 256, RectD::new(-1e6, -1e6, 1e6, 1e6));
        let opts = TransformOptions::default();
        let v = collect_vertices(&mut TransformChain::new(&g, &proj, &view, &opts).build());
        let cmds: Vec<u32> = v.iter().map(|v| v.cmd).collect();
        assert_eq!(
            cmds,
            vec![
                PATH_CMD_MOVE_TO,
                PATH_CMD_LINE_TO,
                PATH_CMD_MOVE_TO,
                PATH_CMD_LINE_TO
            ]
        );
    }

    #[test]
    fn test_transform_point() {
        let g = Geometry::<f64>::Empty;
        let proj = identity_proj();
        let view = view();
        let opts = TransformOptions {
            geometry_transform: Some(TransAffine::new_translation(5.0, 0.0)),
            ..TransformOptions::default()
        };
        let chain = TransformChain::new(&g, &proj, &view, &opts);
        assert_eq!(chain.transform_point(PointD::new(10.0, 10.0)), Some(PointD::new(15.0, 90.0)));

        let merc = ProjTransform::new(Projection::WebMercator, Projection::LonLat);
        let chain = TransformChain::new(&g, &merc, &view, &opts);
        assert_eq!(chain.transform_point(PointD::new(0.0, 89.9)), None);
    }

    #[test]
    fn test_simplify_tolerance_in_pixels() {
        // 10 px per world unit: a 0.05 unit wiggle is 0.5 px
        let g = Geometry::LineString(vec![
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.05),
            Point::new(10.0, 0.0),
        ]);
        let proj = identity_proj();
        let view = ViewTransform::new(100, 100, RectD::new(0.0, 0.0, 10.0, 10.0));
        let keep = TransformOptions {
            simplify_tolerance: 0.25,
            ..TransformOptions::default()
        };
        let drop = TransformOptions {
            simplify_tolerance: 1.0,
            ..TransformOptions::default()
        };
        let kept = collect_vertices(&mut TransformChain::new(&g, &proj, &view, &keep).build());
        assert_eq!(kept.len(), 3);
        let dropped = collect_vertices(&mut TransformChain::new(&g, &proj, &view, &drop).build());
        assert_eq!(dropped.len(), 2);
    }
}
