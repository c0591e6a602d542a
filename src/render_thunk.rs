//! Deferred rendering for group symbolizers.
//!
//! Group members are placed once at the origin against a throwaway
//! detector. What they would draw is kept as [`RenderThunk`]s together with
//! their boxes; once the group layout and the group position are known,
//! the thunks are moved and replayed on the real backend. Text is never
//! shaped twice and expressions are never evaluated twice.

use std::sync::Arc;

use tracing::debug;

use crate::backend::RasterBackend;
use crate::basics::{PointD, RectD};
use crate::color::Rgba8;
use crate::errors::Result;
use crate::feature::Feature;
use crate::font::FontFaceCache;
use crate::label_collision_detector::LabelCollisionDetector;
use crate::marker_cache::{Marker, MarkerCache};
use crate::markers_placement::{rotated_bounds, MarkerInstance};
use crate::path_storage::PathStorage;
use crate::placement_finder::{GlyphPositions, PlacementFinder};
use crate::symbolizer::Symbolizer;
use crate::text_layout::TextLayout;
use crate::text_properties::{TextFormat, TextPlacementProperties};

/// Half size of the detector members are placed against.
const VIRTUAL_EXTENT: f64 = 1.0e6;

#[derive(Debug, Clone, PartialEq)]
pub enum RenderThunk {
    Text {
        placement: GlyphPositions,
        format: Arc<TextFormat>,
        shield: Option<Arc<Marker>>,
        scale: f64,
    },
    Marker {
        marker: Arc<Marker>,
        instance: MarkerInstance,
        scale: f64,
        opacity: f64,
    },
    /// A filled outline already in device space.
    Path { path: PathStorage, fill: Rgba8 },
}

impl RenderThunk {
    pub fn translated(&self, dx: f64, dy: f64) -> RenderThunk {
        let shift = PointD::new(dx, dy);
        match self {
            RenderThunk::Text {
                placement,
                format,
                shield,
                scale,
            } => RenderThunk::Text {
                placement: placement.translated(dx, dy),
                format: Arc::clone(format),
                shield: shield.clone(),
                scale: *scale,
            },
            RenderThunk::Marker {
                marker,
                instance,
                scale,
                opacity,
            } => RenderThunk::Marker {
                marker: Arc::clone(marker),
                instance: MarkerInstance {
                    pos: instance.pos + shift,
                    angle: instance.angle,
                    bbox: instance.bbox.translated(dx, dy),
                },
                scale: *scale,
                opacity: *opacity,
            },
            RenderThunk::Path { path, fill } => {
                let mut path = path.clone();
                path.translate_all_paths(dx, dy);
                RenderThunk::Path { path, fill: *fill }
            }
        }
    }

    pub fn bbox(&self) -> RectD {
        match self {
            RenderThunk::Text { placement, .. } => placement.bbox(),
            RenderThunk::Marker { instance, .. } => instance.bbox,
            RenderThunk::Path { path, .. } => path.bounding_rect(),
        }
    }

    pub fn render(&self, backend: &mut dyn RasterBackend) -> Result<()> {
        match self {
            RenderThunk::Text {
                placement,
                format,
                shield,
                scale,
            } => {
                if let (Some(marker), Some(pos)) = (shield, &placement.marker) {
                    backend.draw_marker(marker, pos.pos, 0.0, *scale, format.opacity)?;
                }
                backend.draw_glyphs(placement, format)
            }
            RenderThunk::Marker {
                marker,
                instance,
                scale,
                opacity,
            } => backend.draw_marker(marker, instance.pos, instance.angle, *scale, *opacity),
            RenderThunk::Path { path, fill } => {
                let mut path = path.clone();
                backend.fill_path(&mut path, *fill)
            }
        }
    }
}

/// One group member placed at the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedMember {
    pub thunk: RenderThunk,
    /// Collision boxes relative to the origin.
    pub boxes: Vec<RectD>,
}

impl ExtractedMember {
    pub fn bbox(&self) -> RectD {
        let mut r = RectD::invalid();
        for b in &self.boxes {
            r.expand_to_include_rect(b);
        }
        r
    }
}

pub struct RenderThunkExtractor<'c> {
    fonts: &'c FontFaceCache,
    markers: &'c MarkerCache,
    scale_factor: f64,
}

impl<'c> RenderThunkExtractor<'c> {
    pub fn new(fonts: &'c FontFaceCache, markers: &'c MarkerCache, scale_factor: f64) -> Self {
        Self {
            fonts,
            markers,
            scale_factor,
        }
    }

    /// Place `symbolizer` for `feature` at the origin. `None` when it
    /// draws nothing (empty text, or a kind groups do not support).
    pub fn extract(
        &self,
        symbolizer: &Symbolizer,
        feature: &Feature,
    ) -> Result<Option<ExtractedMember>> {
        let sf = self.scale_factor;
        match symbolizer {
            Symbolizer::Text(text) => {
                let label = text.name.evaluate(feature);
                if label.is_empty() {
                    return Ok(None);
                }
                let shield = text.shield.as_deref().map(|uri| self.markers.load(uri)).transpose()?;
                let format = Arc::new(text.format.clone());
                let face = self.fonts.get_or_monospace(&format.face_name);
                // edges and padding belong to the group as a whole
                let props = TextPlacementProperties {
                    avoid_edges: false,
                    minimum_padding: 0.0,
                    ..text.placement.clone()
                };
                let layout = TextLayout::new(&label, Arc::clone(&format), face, &props, sf);
                let mut detector = virtual_detector();
                let mut finder = PlacementFinder::new(&mut detector, &layout, &props, sf);
                if let Some(marker) = &shield {
                    finder.set_marker(marker.scaled_bbox(sf));
                }
                if !finder.find_point_placement(PointD::default()) {
                    debug!(text = label.as_str(), "group member text not extracted");
                    return Ok(None);
                }
                let Some(placement) = finder.into_placements().into_iter().next() else {
                    return Ok(None);
                };
                let boxes = placement
                    .boxes
                    .iter()
                    .copied()
                    .chain(placement.marker.map(|m| m.bbox))
                    .collect();
                Ok(Some(ExtractedMember {
                    thunk: RenderThunk::Text {
                        placement,
                        format,
                        shield,
                        scale: sf,
                    },
                    boxes,
                }))
            }
            Symbolizer::Point(point) => {
                let marker = self.markers.load(&point.file)?;
                let bbox = marker.scaled_bbox(sf);
                Ok(Some(ExtractedMember {
                    thunk: RenderThunk::Marker {
                        marker,
                        instance: MarkerInstance {
                            pos: PointD::default(),
                            angle: 0.0,
                            bbox,
                        },
                        scale: sf,
                        opacity: point.opacity,
                    },
                    boxes: vec![bbox],
                }))
            }
            Symbolizer::Markers(markers) => {
                let marker = self.markers.load(&markers.file)?;
                let path = marker.placed_path(PointD::default(), 0.0, sf);
                let bbox = rotated_bounds(&marker.scaled_bbox(sf), PointD::default(), 0.0);
                Ok(Some(ExtractedMember {
                    thunk: RenderThunk::Path {
                        path,
                        fill: markers.fill.with_opacity(markers.opacity),
                    },
                    boxes: vec![bbox],
                }))
            }
            Symbolizer::Line(_) | Symbolizer::Polygon(_) | Symbolizer::Group(_) => {
                debug!(kind = symbolizer.name(), "symbolizer kind not supported in groups");
                Ok(None)
            }
        }
    }
}

fn virtual_detector() -> LabelCollisionDetector {
    LabelCollisionDetector::new(RectD::new(
        -VIRTUAL_EXTENT,
        -VIRTUAL_EXTENT,
        VIRTUAL_EXTENT,
        VIRTUAL_EXTENT,
    ))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DrawOp, RecordingBackend};
    use crate::expression::Expression;
    use crate::geometry::{Geometry, Point};
    use crate::symbolizer::{LineSymbolizer, MarkersSymbolizer, PointSymbolizer, TextSymbolizer};

    fn feature() -> Feature {
        Feature::new(1, Geometry::Point(Point::new(0.0, 0.0))).with_attribute("ref", "66")
    }

    #[test]
    fn test_text_member_at_origin() {
        let fonts = FontFaceCache::new();
        let markers = MarkerCache::new();
        let ex = RenderThunkExtractor::new(&fonts, &markers, 1.0);
        let sym = Symbolizer::Text(TextSymbolizer::new(Expression::parse("[ref]").unwrap()));
        let m = ex.extract(&sym, &feature()).unwrap().unwrap();
        // two monospace glyphs of 6 x 10 px
        assert_eq!(m.bbox(), RectD::new(-6.0, -5.0, 6.0, 5.0));
        assert_eq!(m.thunk.bbox(), m.bbox());
    }

    #[test]
    fn test_empty_text_and_unsupported_kinds() {
        let fonts = FontFaceCache::new();
        let markers = MarkerCache::new();
        let ex = RenderThunkExtractor::new(&fonts, &markers, 1.0);
        let empty = Symbolizer::Text(TextSymbolizer::new(Expression::parse("[missing]").unwrap()));
        assert!(ex.extract(&empty, &feature()).unwrap().is_none());
        let line = Symbolizer::Line(LineSymbolizer::default());
        assert!(ex.extract(&line, &feature()).unwrap().is_none());
    }

    #[test]
    fn test_translated_replay() {
        let fonts = FontFaceCache::new();
        let markers = MarkerCache::new();
        let ex = RenderThunkExtractor::new(&fonts, &markers, 2.0);
        let point = Symbolizer::Point(PointSymbolizer::default());
        let m = ex.extract(&point, &feature()).unwrap().unwrap();
        assert_eq!(m.bbox(), RectD::new(-10.0, -10.0, 10.0, 10.0));

        let moved = m.thunk.translated(100.0, 50.0);
        assert_eq!(moved.bbox(), RectD::new(90.0, 40.0, 110.0, 60.0));
        let mut backend = RecordingBackend::new();
        moved.render(&mut backend).unwrap();
        assert!(matches!(
            &backend.ops()[0],
            DrawOp::Marker { pos, bbox, .. }
                if *pos == PointD::new(100.0, 50.0) && *bbox == RectD::new(90.0, 40.0, 110.0, 60.0)
        ));
    }

    #[test]
    fn test_vector_marker_member_is_path() {
        let fonts = FontFaceCache::new();
        let markers = MarkerCache::new();
        let ex = RenderThunkExtractor::new(&fonts, &markers, 1.0);
        let sym = Symbolizer::Markers(MarkersSymbolizer {
            file: "shape://square".to_string(),
            ..MarkersSymbolizer::default()
        });
        let m = ex.extract(&sym, &feature()).unwrap().unwrap();
        let mut backend = RecordingBackend::new();
        m.thunk.translated(10.0, 0.0).render(&mut backend).unwrap();
        match &backend.ops()[0] {
            DrawOp::Fill { vertices, .. } => {
                assert_eq!(vertices[0].x, 5.0);
                assert_eq!(vertices[0].y, -5.0);
            }
            other => panic!("unexpected op {other:?}"),
        }
    }
}
