//! Label placement.
//!
//! A [`PlacementFinder`] takes one shaped [`TextLayout`] and tries to put
//! it on the map for one feature: at a point, at every vertex, or along
//! the feature's lines. Each candidate is tested against the
//! [`LabelCollisionDetector`]; accepted candidates are inserted into it
//! (unless `ignore_placement` is set) and recorded as [`GlyphPositions`].
//!
//! Failing to place is the normal outcome under crowding. It is reported
//! as `false` and never as an error.

use tracing::debug;

use crate::basics::{normalize_angle, rotated_box, PointD, RectD};
use crate::geometry::{Coordinate, GeometryType};
use crate::label_collision_detector::LabelCollisionDetector;
use crate::text_layout::{GlyphInfo, TextLayout};
use crate::text_properties::{
    Direction, HorizontalAlignment, LabelPlacement, TextPlacementProperties,
};
use crate::tolerance_iterator::ToleranceIterator;
use crate::transform_chain::TransformChain;
use crate::vertex_cache::PathVertexCache;

/// Paths shorter than this carry no line label.
const MIN_PATH_LENGTH: f64 = 0.001;

#[derive(Debug, Clone, PartialEq)]
pub struct PositionedGlyph {
    pub glyph: GlyphInfo,
    /// Baseline start, device pixels.
    pub pos: PointD,
    /// Baseline direction, radians.
    pub angle: f64,
}

/// A marker placed together with a label (shield).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerPosition {
    pub pos: PointD,
    pub bbox: RectD,
}

/// One accepted label.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GlyphPositions {
    pub base_point: PointD,
    pub glyphs: Vec<PositionedGlyph>,
    /// Collision boxes, one per label (point) or per glyph (line).
    pub boxes: Vec<RectD>,
    pub marker: Option<MarkerPosition>,
}

impl GlyphPositions {
    /// Union of all boxes.
    pub fn bbox(&self) -> RectD {
        let mut r = RectD::invalid();
        for b in &self.boxes {
            r.expand_to_include_rect(b);
        }
        if let Some(m) = &self.marker {
            r.expand_to_include_rect(&m.bbox);
        }
        r
    }

    pub fn translated(&self, dx: f64, dy: f64) -> GlyphPositions {
        let shift = PointD::new(dx, dy);
        GlyphPositions {
            base_point: self.base_point + shift,
            glyphs: self
                .glyphs
                .iter()
                .map(|g| PositionedGlyph {
                    pos: g.pos + shift,
                    ..g.clone()
                })
                .collect(),
            boxes: self.boxes.iter().map(|b| b.translated(dx, dy)).collect(),
            marker: self.marker.map(|m| MarkerPosition {
                pos: m.pos + shift,
                bbox: m.bbox.translated(dx, dy),
            }),
        }
    }
}

/// Resolve the reading direction of a label rotated by `angle`.
///
/// Returns the angle to render with (possibly turned by 180°) or `None`
/// when the direction forbids the candidate.
pub fn apply_direction(direction: Direction, angle: f64) -> Option<f64> {
    let angle = normalize_angle(angle);
    let flipped = normalize_angle(angle + core::f64::consts::PI);
    // cos < 0 means |angle| > 90°
    let leftward = angle.cos() < 0.0;
    match direction {
        Direction::Right => Some(angle),
        Direction::Left => Some(flipped),
        Direction::Auto => Some(if leftward { flipped } else { angle }),
        Direction::AutoDown => Some(if leftward { angle } else { flipped }),
        Direction::RightOnly => (!leftward).then_some(angle),
        Direction::LeftOnly => leftward.then_some(flipped),
        Direction::Up => Some(if angle.sin() > 0.0 { flipped } else { angle }),
        Direction::Down => Some(if angle.sin() < 0.0 { flipped } else { angle }),
    }
}

/// Whether a line-following run must be laid out reversed, from the share
/// of upside-down glyphs and the overall chord angle. `None` rejects.
fn line_flip(direction: Direction, upside_down: bool, chord_angle: f64) -> Option<bool> {
    match direction {
        Direction::Right => Some(false),
        Direction::Left => Some(true),
        Direction::Auto => Some(upside_down),
        Direction::AutoDown => Some(!upside_down),
        Direction::RightOnly => (!upside_down).then_some(false),
        Direction::LeftOnly => upside_down.then_some(true),
        Direction::Up => Some(chord_angle.sin() > 0.0),
        Direction::Down => Some(chord_angle.sin() < 0.0),
    }
}

struct GlyphRun {
    glyphs: Vec<PositionedGlyph>,
    boxes: Vec<RectD>,
    upside_down: usize,
    chord_angle: f64,
}

fn point_at(path: &mut PathVertexCache, d: f64) -> Option<PointD> {
    path.move_to_distance(d).then(|| path.position())
}

/// Test `bbox` against edges, padding and placed labels. Line labels
/// fall back to `minimum_distance` for the repeat distance, point labels
/// for the margin.
pub(crate) fn check_collision(
    detector: &LabelCollisionDetector,
    dims: &RectD,
    props: &TextPlacementProperties,
    scale_factor: f64,
    bbox: &RectD,
    repeat_key: &str,
    line: bool,
) -> bool {
    let p = props;
    let sf = scale_factor;
    let (margin, repeat_distance) = if line {
        let repeat = if p.repeat_distance > 0.0 {
            p.repeat_distance
        } else {
            p.minimum_distance
        };
        (p.margin * sf, repeat * sf)
    } else {
        let margin = if p.margin > 0.0 { p.margin } else { p.minimum_distance };
        (margin * sf, p.repeat_distance * sf)
    };

    if p.avoid_edges && !dims.contains_rect(bbox) {
        return false;
    }
    if p.minimum_padding > 0.0 && !dims.padded(-p.minimum_padding * sf).contains_rect(bbox) {
        return false;
    }
    if p.allow_overlap {
        return true;
    }
    detector.has_placement_repeat(bbox, margin, repeat_key, repeat_distance)
}

pub struct PlacementFinder<'a> {
    detector: &'a mut LabelCollisionDetector,
    dims: RectD,
    layout: &'a TextLayout,
    props: &'a TextPlacementProperties,
    scale_factor: f64,
    marker: Option<RectD>,
    placements: Vec<GlyphPositions>,
}

impl<'a> PlacementFinder<'a> {
    pub fn new(
        detector: &'a mut LabelCollisionDetector,
        layout: &'a TextLayout,
        props: &'a TextPlacementProperties,
        scale_factor: f64,
    ) -> Self {
        let dims = *detector.extent();
        Self {
            detector,
            dims,
            layout,
            props,
            scale_factor,
            marker: None,
            placements: Vec::new(),
        }
    }

    /// Area `avoid_edges` and `minimum_padding` refer to. Defaults to the
    /// detector extent.
    pub fn with_dims(mut self, dims: RectD) -> Self {
        self.dims = dims;
        self
    }

    /// Place a marker with every point label. `bbox` is relative to the
    /// anchor and must be free as well.
    pub fn set_marker(&mut self, bbox: RectD) {
        self.marker = Some(bbox);
    }

    pub fn placements(&self) -> &[GlyphPositions] {
        &self.placements
    }

    pub fn into_placements(self) -> Vec<GlyphPositions> {
        self.placements
    }

    fn repeat_key(&self) -> &str {
        self.layout.text()
    }

    fn collision(&self, bbox: &RectD, line: bool) -> bool {
        check_collision(
            &*self.detector,
            &self.dims,
            self.props,
            self.scale_factor,
            bbox,
            self.repeat_key(),
            line,
        )
    }

    /// Dispatch on the configured [`LabelPlacement`] for one feature.
    pub fn find_placements<T: Coordinate>(&mut self, chain: &TransformChain<'_, T>) -> bool {
        let geometry = chain.geometry();
        match self.props.placement {
            LabelPlacement::Point | LabelPlacement::Interior => {
                let anchors = if self.props.placement == LabelPlacement::Point {
                    geometry.part_centroids()
                } else {
                    geometry.part_interiors()
                };
                let mut placed = false;
                for p in anchors.into_iter().filter_map(|p| chain.transform_point(p)) {
                    placed |= self.find_point_placement_with_displacements(p);
                }
                placed
            }
            LabelPlacement::Vertex => {
                let mut path = PathVertexCache::from_source(&mut chain.build());
                let mut placed = false;
                while path.next_subpath() {
                    let vertices = path.vertices().to_vec();
                    let n = if path.is_closed() { vertices.len() - 1 } else { vertices.len() };
                    for v in &vertices[..n] {
                        placed |= self.find_point_placement(*v);
                    }
                }
                placed
            }
            LabelPlacement::Line => {
                let points = matches!(
                    geometry.geometry_type(),
                    GeometryType::Point | GeometryType::MultiPoint
                );
                let mut path = PathVertexCache::from_source(&mut chain.build());
                self.find_line_placements(&mut path, points)
            }
        }
    }

    /// Place the layout at `pos` with its own displacement.
    pub fn find_point_placement(&mut self, pos: PointD) -> bool {
        self.try_point_placement(pos, self.layout.displacement())
    }

    /// Like [`find_point_placement`](Self::find_point_placement), then
    /// retry with each alternative displacement. First success wins.
    pub fn find_point_placement_with_displacements(&mut self, pos: PointD) -> bool {
        if self.find_point_placement(pos) {
            return true;
        }
        let sf = self.scale_factor;
        let props = self.props;
        for d in &props.alternative_displacements {
            if self.try_point_placement(pos, PointD::new(d.x * sf, d.y * sf)) {
                return true;
            }
        }
        false
    }

    fn try_point_placement(&mut self, pos: PointD, displacement: PointD) -> bool {
        let layout = self.layout;
        if layout.is_empty() {
            return false;
        }
        let Some(angle) = apply_direction(self.props.upright, layout.orientation()) else {
            debug!(text = layout.text(), "point label rejected by direction");
            return false;
        };
        let center = pos + layout.alignment_offset() + displacement;
        let bbox = rotated_box(layout.width(), layout.height(), center, angle);
        let marker_box = self.marker.map(|m| m.translated(pos.x, pos.y));

        if !self.collision(&bbox, false) {
            return false;
        }
        if let Some(mb) = &marker_box {
            if !self.collision(mb, false) {
                return false;
            }
        }
        if !self.props.ignore_placement {
            self.detector.insert(bbox, Some(layout.text()));
            if let Some(mb) = marker_box {
                self.detector.insert(mb, None);
            }
        }

        let glyphs = layout
            .glyphs()
            .iter()
            .zip(layout.glyph_offsets())
            .map(|(g, o)| PositionedGlyph {
                glyph: g.clone(),
                pos: center + o.rotated(angle),
                angle,
            })
            .collect();
        self.placements.push(GlyphPositions {
            base_point: pos,
            glyphs,
            boxes: vec![bbox],
            marker: marker_box.map(|bbox| MarkerPosition { pos, bbox }),
        });
        true
    }

    /// Place repeated labels along every subpath of `path`.
    ///
    /// With `points` set, zero-length subpaths (point geometries) get a
    /// point placement instead.
    pub fn find_line_placements(&mut self, path: &mut PathVertexCache, points: bool) -> bool {
        if self.layout.is_empty() {
            return false;
        }
        let dy = self.layout.displacement().y;
        let mut placed = false;
        path.reset();
        while path.next_subpath() {
            let len = path.length();
            if points && len <= MIN_PATH_LENGTH {
                placed |= self.find_point_placement(path.position());
                continue;
            }
            if len <= MIN_PATH_LENGTH
                || len < self.props.minimum_path_length * self.scale_factor
                || len < self.layout.width()
            {
                debug!(length = len, text = self.layout.text(), "subpath too short for label");
                continue;
            }
            let mut offset_path;
            let walker = if dy != 0.0 {
                // positive dy moves labels down the screen
                offset_path = path.offset_subpath(-dy);
                &mut offset_path
            } else {
                &mut *path
            };
            placed |= self.place_along_subpath(walker);
        }
        placed
    }

    fn place_along_subpath(&mut self, path: &mut PathVertexCache) -> bool {
        let len = path.length();
        let width = self.layout.width();
        let spacing = self.props.spacing * self.scale_factor;
        let num_labels = if spacing > 0.0 {
            ((len / (spacing + width)).floor() as usize).max(1)
        } else {
            1
        };
        let stride = len / num_labels as f64;

        // cursor is the label center
        let (mut pos, step) = match self.props.halign {
            HorizontalAlignment::Left => (width / 2.0, stride),
            HorizontalAlignment::Right => (len - width / 2.0, -stride),
            HorizontalAlignment::Adjust => (len / 2.0, 0.0),
            HorizontalAlignment::Middle | HorizontalAlignment::Auto => {
                let start = if spacing > 0.0 { spacing / 2.0 } else { stride / 2.0 };
                (start, stride)
            }
        };

        let tolerance = self.props.label_position_tolerance * self.scale_factor;
        let mut placed = false;
        while (0.0..=len).contains(&pos) {
            for offset in ToleranceIterator::new(tolerance, stride) {
                let cp = path.checkpoint();
                let ok = path.move_to_distance(pos + offset)
                    && self.single_line_placement(path, self.props.upright);
                path.restore(cp);
                if ok {
                    placed = true;
                    break;
                }
            }
            if step == 0.0 {
                break;
            }
            pos += step;
        }
        placed
    }

    /// Lay the glyphs along the path centered on the cursor. The whole run
    /// is rejected when neighbouring glyphs turn by more than
    /// `max_char_angle_delta` or when any glyph box collides.
    pub fn single_line_placement(
        &mut self,
        path: &mut PathVertexCache,
        direction: Direction,
    ) -> bool {
        let widths = self.layout.cluster_widths();
        if widths.is_empty() {
            return false;
        }
        let center_d = path.linear_position();
        let cp = path.checkpoint();
        let base_point = path.position();

        let run = self.glyph_run(path, center_d, &widths, false).and_then(|run| {
            let upside_down = run.upside_down * 2 > widths.len();
            match line_flip(direction, upside_down, run.chord_angle)? {
                false => Some(run),
                true => self.glyph_run(path, center_d, &widths, true),
            }
        });
        path.restore(cp);
        let Some(run) = run else {
            return false;
        };

        if !run.boxes.iter().all(|b| self.collision(b, true)) {
            return false;
        }
        if !self.props.ignore_placement {
            for b in &run.boxes {
                self.detector.insert(*b, Some(self.layout.text()));
            }
        }
        self.placements.push(GlyphPositions {
            base_point,
            glyphs: run.glyphs,
            boxes: run.boxes,
            marker: None,
        });
        true
    }

    fn glyph_run(
        &self,
        path: &mut PathVertexCache,
        center_d: f64,
        widths: &[f64],
        reversed: bool,
    ) -> Option<GlyphRun> {
        let total: f64 = widths.iter().sum();
        let sign = if reversed { -1.0 } else { 1.0 };
        let height = self.layout.line_height();
        // baseline sits below the path so the band is centered on it
        let baseline_shift = self.layout.ascender() - height / 2.0;
        let max_delta = self.props.max_char_angle_delta;

        let start_d = center_d - sign * total / 2.0;
        let start = point_at(path, start_d)?;
        let mut d = start_d;
        let mut prev_angle: Option<f64> = None;
        let mut run = GlyphRun {
            glyphs: Vec::with_capacity(widths.len()),
            boxes: Vec::with_capacity(widths.len()),
            upside_down: 0,
            chord_angle: 0.0,
        };
        let mut end = start;
        for (glyph, &w) in self.layout.glyphs().iter().zip(widths) {
            let p0 = point_at(path, d)?;
            let p1 = point_at(path, d + sign * w)?;
            let (dx, dy) = (p1.x - p0.x, p1.y - p0.y);
            let angle = if dx.hypot(dy) > 1e-9 {
                dy.atan2(dx)
            } else {
                prev_angle.unwrap_or(0.0)
            };
            if let Some(prev) = prev_angle {
                if max_delta > 0.0 && normalize_angle(angle - prev).abs() > max_delta {
                    return None;
                }
            }
            prev_angle = Some(angle);
            if angle.cos() < 0.0 {
                run.upside_down += 1;
            }
            let (sin, cos) = angle.sin_cos();
            let mid = PointD::new((p0.x + p1.x) / 2.0, (p0.y + p1.y) / 2.0);
            run.boxes.push(rotated_box(w, height, mid, angle));
            run.glyphs.push(PositionedGlyph {
                glyph: glyph.clone(),
                pos: PointD::new(p0.x - sin * baseline_shift, p0.y + cos * baseline_shift),
                angle,
            });
            end = p1;
            d += sign * w;
        }
        run.chord_angle = (end.y - start.y).atan2(end.x - start.x);
        Some(run)
    }
}

// ============================================================================
// Tests
// ============================================================================
