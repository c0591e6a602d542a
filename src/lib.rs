//! # carto-place
//!
//! Label placement and collision handling for 2D map rendering, together
//! with the geometry pipeline that brings features from their source
//! coordinate system to device pixels.
//!
//! ## Architecture
//!
//! Rendering a map runs every feature through two stages:
//!
//! 1. **Transform chain**: reproject, clip, apply a geometry transform,
//!    map to the view, simplify and smooth. Every stage is a
//!    [`VertexSource`](basics::VertexSource) adaptor wrapping the previous
//!    one, so vertices are pulled one at a time.
//! 2. **Placement**: text, markers and groups look for candidate positions
//!    on the transformed geometry and test their boxes against a shared
//!    [`LabelCollisionDetector`](label_collision_detector::LabelCollisionDetector).
//!    The first feature to claim space keeps it.
//!
//! [`MapRenderer`](map_renderer::MapRenderer) drives both stages and hands
//! the results to a [`RasterBackend`](backend::RasterBackend).
//!
//! ## Feature flags
//!
//! - `font`: TrueType metrics through `ttf-parser`. Without it every face
//!   falls back to fixed monospace metrics.

// Foundation
pub mod array;
pub mod basics;
pub mod color;
pub mod errors;
pub mod math;

// Geometry and features
pub mod ellipse;
pub mod expression;
pub mod feature;
pub mod geometry;
pub mod geometry_adapter;
pub mod path_storage;

// Transform pipeline
pub mod clip_liang_barsky;
pub mod conv_clip;
pub mod conv_reproject;
pub mod conv_simplify;
pub mod conv_smooth;
pub mod conv_transform;
pub mod conv_view;
pub mod projection;
pub mod trans_affine;
pub mod trans_view;
pub mod transform_chain;

// Collision and placement
pub mod group_layout;
pub mod label_collision_detector;
pub mod markers_placement;
pub mod placement_finder;
pub mod quad_tree;
pub mod tolerance_iterator;
pub mod vertex_cache;

// Text
pub mod font;
#[cfg(feature = "font")]
pub mod font_engine;
pub mod text_layout;
pub mod text_properties;

// Styling and rendering
pub mod backend;
pub mod map_renderer;
pub mod marker_cache;
pub mod render_thunk;
pub mod symbolizer;

pub use errors::{Error, Result};
