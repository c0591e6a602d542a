//! Symbolizers: what to draw for a feature and how to place it.
//!
//! The set of kinds is closed, so it is an enum and every consumer
//! matches on it exhaustively.

use crate::basics::RectD;
use crate::color::Rgba8;
use crate::expression::Expression;
use crate::group_layout::GroupLayout;
use crate::markers_placement::{MarkerPlacement, MarkerPlacementProperties};
use crate::text_properties::{TextFormat, TextPlacementProperties};
use crate::trans_affine::TransAffine;
use crate::transform_chain::{ClipMode, TransformOptions};

/// Geometry conditioning shared by the vector symbolizers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeometryOptions {
    pub clip: bool,
    pub simplify_tolerance: f64,
    pub smooth: f64,
    pub transform: Option<TransAffine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonSymbolizer {
    pub fill: Rgba8,
    pub opacity: f64,
    pub geometry: GeometryOptions,
}

impl Default for PolygonSymbolizer {
    fn default() -> Self {
        Self {
            fill: Rgba8::new_opaque(128, 128, 128),
            opacity: 1.0,
            geometry: GeometryOptions {
                clip: true,
                ..GeometryOptions::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineSymbolizer {
    pub stroke: Rgba8,
    pub width: f64,
    pub opacity: f64,
    pub geometry: GeometryOptions,
}

impl Default for LineSymbolizer {
    fn default() -> Self {
        Self {
            stroke: Rgba8::BLACK,
            width: 1.0,
            opacity: 1.0,
            geometry: GeometryOptions {
                clip: true,
                ..GeometryOptions::default()
            },
        }
    }
}

/// A marker image at the feature's point.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSymbolizer {
    pub file: String,
    pub opacity: f64,
    pub allow_overlap: bool,
    pub ignore_placement: bool,
    /// Use the interior point of polygons instead of the centroid.
    pub interior: bool,
}

impl Default for PointSymbolizer {
    fn default() -> Self {
        Self {
            file: "shape://square".to_string(),
            opacity: 1.0,
            allow_overlap: false,
            ignore_placement: false,
            interior: false,
        }
    }
}

/// Vector markers placed at points, vertices or along lines.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkersSymbolizer {
    pub file: String,
    pub fill: Rgba8,
    pub opacity: f64,
    pub placement: MarkerPlacementProperties,
    pub geometry: GeometryOptions,
}

impl Default for MarkersSymbolizer {
    fn default() -> Self {
        Self {
            file: "shape://ellipse".to_string(),
            fill: Rgba8::new_opaque(0, 0, 255),
            opacity: 1.0,
            placement: MarkerPlacementProperties::default(),
            geometry: GeometryOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextSymbolizer {
    pub name: Expression,
    pub format: TextFormat,
    pub placement: TextPlacementProperties,
    /// Marker drawn under every point label (a shield).
    pub shield: Option<String>,
    pub geometry: GeometryOptions,
}

impl TextSymbolizer {
    pub fn new(name: Expression) -> Self {
        Self {
            name,
            format: TextFormat::default(),
            placement: TextPlacementProperties::default(),
            shield: None,
            geometry: GeometryOptions::default(),
        }
    }
}

/// Several point-like symbolizers placed as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSymbolizer {
    /// Text, point and markers members. Other kinds are ignored.
    pub members: Vec<Symbolizer>,
    pub layout: GroupLayout,
    /// Collision rules and placement of the whole group.
    pub placement: TextPlacementProperties,
    /// Evaluated per feature; groups with equal keys keep
    /// `repeat_distance` apart.
    pub repeat_key: Option<Expression>,
}

impl GroupSymbolizer {
    pub fn new(members: Vec<Symbolizer>, layout: GroupLayout) -> Self {
        Self {
            members,
            layout,
            placement: TextPlacementProperties::default(),
            repeat_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Symbolizer {
    Point(PointSymbolizer),
    Line(LineSymbolizer),
    Polygon(PolygonSymbolizer),
    Text(TextSymbolizer),
    Markers(MarkersSymbolizer),
    Group(GroupSymbolizer),
}

impl Symbolizer {
    /// Transform chain settings for a feature queried with `query_box`
    /// (layer CRS).
    pub fn transform_options(&self, query_box: RectD) -> TransformOptions {
        let (geometry, clip) = match self {
            Symbolizer::Polygon(s) => (Some(&s.geometry), ClipMode::Polygon),
            Symbolizer::Line(s) => (Some(&s.geometry), ClipMode::Line),
            Symbolizer::Markers(s) => (Some(&s.geometry), ClipMode::Line),
            Symbolizer::Text(s) => (Some(&s.geometry), ClipMode::Line),
            Symbolizer::Point(_) | Symbolizer::Group(_) => (None, ClipMode::None),
        };
        match geometry {
            Some(g) => TransformOptions {
                clip: if g.clip { clip } else { ClipMode::None },
                clip_box: query_box,
                geometry_transform: g.transform,
                simplify_tolerance: g.simplify_tolerance,
                smooth: g.smooth,
            },
            None => TransformOptions::default(),
        }
    }

    /// Marker URIs this symbolizer needs, members included.
    pub fn marker_files(&self) -> Vec<&str> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(s) = stack.pop() {
            match s {
                Symbolizer::Point(p) => out.push(p.file.as_str()),
                Symbolizer::Markers(m) => out.push(m.file.as_str()),
                Symbolizer::Text(t) => out.extend(t.shield.as_deref()),
                Symbolizer::Group(g) => stack.extend(g.members.iter().rev()),
                Symbolizer::Line(_) | Symbolizer::Polygon(_) => {}
            }
        }
        out
    }

    pub fn name(&self) -> &'static str {
        match self {
            Symbolizer::Point(_) => "point",
            Symbolizer::Line(_) => "line",
            Symbolizer::Polygon(_) => "polygon",
            Symbolizer::Text(_) => "text",
            Symbolizer::Markers(_) => "markers",
            Symbolizer::Group(_) => "group",
        }
    }
}

/// Marker placement properties of a point symbolizer.
pub(crate) fn point_marker_properties(p: &PointSymbolizer) -> MarkerPlacementProperties {
    MarkerPlacementProperties {
        placement: if p.interior {
            MarkerPlacement::Interior
        } else {
            MarkerPlacement::Point
        },
        allow_overlap: p.allow_overlap,
        ignore_placement: p.ignore_placement,
        ..MarkerPlacementProperties::default()
    }
}

impl From<TextSymbolizer> for Symbolizer {
    fn from(s: TextSymbolizer) -> Self {
        Symbolizer::Text(s)
    }
}

impl From<PointSymbolizer> for Symbolizer {
    fn from(s: PointSymbolizer) -> Self {
        Symbolizer::Point(s)
    }
}

impl From<MarkersSymbolizer> for Symbolizer {
    fn from(s: MarkersSymbolizer) -> Self {
        Symbolizer::Markers(s)
    }
}

impl From<LineSymbolizer> for Symbolizer {
    fn from(s: LineSymbolizer) -> Self {
        Symbolizer::Line(s)
    }
}

impl From<PolygonSymbolizer> for Symbolizer {
    fn from(s: PolygonSymbolizer) -> Self {
        Symbolizer::Polygon(s)
    }
}

impl From<GroupSymbolizer> for Symbolizer {
    fn from(s: GroupSymbolizer) -> Self {
        Symbolizer::Group(s)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_options() {
        let q = RectD::new(0.0, 0.0, 10.0, 10.0);
        let poly = Symbolizer::Polygon(PolygonSymbolizer::default()).transform_options(q);
        assert_eq!(poly.clip, ClipMode::Polygon);
        assert_eq!(poly.clip_box, q);

        let line = Symbolizer::Line(LineSymbolizer {
            geometry: GeometryOptions {
                clip: false,
                simplify_tolerance: 2.0,
                ..GeometryOptions::default()
            },
            ..LineSymbolizer::default()
        })
        .transform_options(q);
        assert_eq!(line.clip, ClipMode::None);
        assert_eq!(line.simplify_tolerance, 2.0);
    }

    #[test]
    fn test_marker_files_in_order() {
        let mut text = TextSymbolizer::new(Expression::parse("[name]").unwrap());
        text.shield = Some("shape://square".to_string());
        let group = Symbolizer::Group(GroupSymbolizer::new(
            vec![
                Symbolizer::Point(PointSymbolizer {
                    file: "shape://triangle".to_string(),
                    ..PointSymbolizer::default()
                }),
                text.into(),
            ],
            GroupLayout::SimpleRow { item_margin: 0.0 },
        ));
        assert_eq!(group.marker_files(), vec!["shape://triangle", "shape://square"]);
        assert_eq!(group.name(), "group");
    }
}
