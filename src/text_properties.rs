//! Placement and formatting properties for labels.
//!
//! Plain configuration structs. `Default` carries the conventional
//! cartographic defaults; callers override fields with struct update
//! syntax.

use crate::basics::{deg2rad, PointD};
use crate::color::Rgba8;

/// Reading-direction policy for rotated labels and markers.
///
/// Angles are in device space with y pointing down, so a positive angle
/// turns clockwise on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Keep the path direction.
    Right,
    /// Always turn 180°.
    Left,
    /// Turn when the text would read right to left.
    #[default]
    Auto,
    /// Turn when the text would read left to right.
    AutoDown,
    /// Reject candidates reading right to left.
    RightOnly,
    /// Reject candidates reading left to right, turn the rest.
    LeftOnly,
    /// Turn when the baseline points down the screen.
    Up,
    /// Turn when the baseline points up the screen.
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelPlacement {
    /// At the geometry centroid.
    #[default]
    Point,
    /// At a point guaranteed inside polygons.
    Interior,
    /// Along lines and polygon outlines.
    Line,
    /// At every vertex.
    Vertex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalAlignment {
    Left,
    Middle,
    Right,
    /// Middle for point labels; spread evenly for line labels.
    #[default]
    Auto,
    /// Line labels only: one label centered on the subpath.
    Adjust,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAlignment {
    Top,
    Middle,
    Bottom,
    #[default]
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JustifyAlignment {
    Left,
    Middle,
    Right,
    /// Follows the horizontal alignment.
    #[default]
    Auto,
}

/// How a run of text looks: face, size, spacing and colors.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFormat {
    pub face_name: String,
    pub size: f64,
    pub fill: Rgba8,
    pub halo_fill: Rgba8,
    pub halo_radius: f64,
    pub opacity: f64,
    /// Extra pixels after every glyph.
    pub character_spacing: f64,
    /// Extra pixels between lines.
    pub line_spacing: f64,
}

impl Default for TextFormat {
    fn default() -> Self {
        Self {
            face_name: "monospace".to_string(),
            size: 10.0,
            fill: Rgba8::BLACK,
            halo_fill: Rgba8::WHITE,
            halo_radius: 0.0,
            opacity: 1.0,
            character_spacing: 0.0,
            line_spacing: 0.0,
        }
    }
}

/// Where and how a label may be placed. Distances are in pixels before
/// the map scale factor is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPlacementProperties {
    pub placement: LabelPlacement,
    /// Distance between repeated line labels; 0 places one per subpath.
    pub spacing: f64,
    /// Search range around each ideal line position; 0 means spacing / 2.
    pub label_position_tolerance: f64,
    /// Largest turn between neighbouring glyphs, radians.
    pub max_char_angle_delta: f64,
    pub minimum_distance: f64,
    pub minimum_padding: f64,
    pub minimum_path_length: f64,
    pub margin: f64,
    pub repeat_distance: f64,
    pub avoid_edges: bool,
    pub allow_overlap: bool,
    pub ignore_placement: bool,
    pub upright: Direction,
    pub displacement: PointD,
    /// Fallback displacements tried in order after `displacement`.
    pub alternative_displacements: Vec<PointD>,
    /// Rotation of point labels, radians.
    pub orientation: f64,
    pub halign: HorizontalAlignment,
    pub valign: VerticalAlignment,
    pub jalign: JustifyAlignment,
    /// Wrap at this many pixels; 0 disables wrapping.
    pub wrap_width: f64,
}

impl Default for TextPlacementProperties {
    fn default() -> Self {
        Self {
            placement: LabelPlacement::Point,
            spacing: 0.0,
            label_position_tolerance: 0.0,
            max_char_angle_delta: deg2rad(22.5),
            minimum_distance: 0.0,
            minimum_padding: 0.0,
            minimum_path_length: 0.0,
            margin: 0.0,
            repeat_distance: 0.0,
            avoid_edges: false,
            allow_overlap: false,
            ignore_placement: false,
            upright: Direction::Auto,
            displacement: PointD::new(0.0, 0.0),
            alternative_displacements: Vec::new(),
            orientation: 0.0,
            halign: HorizontalAlignment::Auto,
            valign: VerticalAlignment::Auto,
            jalign: JustifyAlignment::Auto,
            wrap_width: 0.0,
        }
    }
}
