//! Text shaping and line layout.
//!
//! Shaping is one glyph per character through
//! [`FontMetrics`](crate::font::FontMetrics); there is no
//! complex-script support. Layout turns the glyph run into lines (explicit
//! newlines and greedy wrapping at `wrap_width`) and answers the sizes and
//! offsets placement needs. Everything here is in device pixels with the
//! layout centered on the anchor point, y pointing down.

use std::ops::Range;
use std::sync::Arc;

use crate::basics::{PointD, RectD};
use crate::font::FontFace;
use crate::text_properties::{
    HorizontalAlignment, JustifyAlignment, TextFormat, TextPlacementProperties, VerticalAlignment,
};

/// One shaped glyph. The face and format are shared with every other glyph
/// of the run.
#[derive(Clone)]
pub struct GlyphInfo {
    pub glyph_index: u32,
    /// Index of the source character in the label text.
    pub char_index: usize,
    pub ch: char,
    pub format: Arc<TextFormat>,
    pub face: FontFace,
    /// Font units.
    pub unscaled_advance: f64,
    pub unscaled_ascent: f64,
    pub unscaled_descent: f64,
    /// Font units to pixels.
    pub scale_multiplier: f64,
    /// Extra advance in pixels (character spacing and kerning).
    pub spacing: f64,
    pub offset: PointD,
}

impl GlyphInfo {
    pub fn advance(&self) -> f64 {
        self.unscaled_advance * self.scale_multiplier + self.spacing
    }

    pub fn ascent(&self) -> f64 {
        self.unscaled_ascent * self.scale_multiplier
    }

    pub fn descent(&self) -> f64 {
        self.unscaled_descent * self.scale_multiplier
    }

    pub fn height(&self) -> f64 {
        self.ascent() - self.descent()
    }
}

impl core::fmt::Debug for GlyphInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GlyphInfo")
            .field("glyph_index", &self.glyph_index)
            .field("char_index", &self.char_index)
            .field("ch", &self.ch)
            .field("face", &self.face.name())
            .field("advance", &self.advance())
            .finish()
    }
}

impl PartialEq for GlyphInfo {
    fn eq(&self, o: &Self) -> bool {
        self.glyph_index == o.glyph_index
            && self.char_index == o.char_index
            && self.face.name() == o.face.name()
            && self.scale_multiplier == o.scale_multiplier
            && self.spacing == o.spacing
            && self.offset == o.offset
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub glyphs: Range<usize>,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone)]
pub struct TextLayout {
    text: String,
    glyphs: Vec<GlyphInfo>,
    lines: Vec<TextLine>,
    width: f64,
    height: f64,
    ascender: f64,
    halign: HorizontalAlignment,
    valign: VerticalAlignment,
    jalign: JustifyAlignment,
    displacement: PointD,
    orientation: f64,
}

impl TextLayout {
    /// Shape and lay out `text`. `scale_factor` multiplies every pixel
    /// quantity (size, spacing, wrap width, displacement).
    pub fn new(
        text: &str,
        format: Arc<TextFormat>,
        face: FontFace,
        props: &TextPlacementProperties,
        scale_factor: f64,
    ) -> Self {
        let upm = face.units_per_em();
        let scale = if upm > 0.0 {
            format.size * scale_factor / upm
        } else {
            0.0
        };
        let char_spacing = format.character_spacing * scale_factor;
        let line_height = (face.ascender() - face.descender() + face.line_gap()) * scale
            + format.line_spacing * scale_factor;
        let wrap = props.wrap_width * scale_factor;

        let mut glyphs = Vec::new();
        let mut lines = Vec::new();
        let mut paragraph = Vec::new();
        for (char_index, ch) in text.chars().enumerate() {
            if ch == '\n' {
                push_paragraph(&mut paragraph, wrap, line_height, &mut glyphs, &mut lines);
                continue;
            }
            let Some(m) = face.glyph(ch) else {
                continue;
            };
            let kern = match paragraph.last() {
                Some(prev) => face.kerning(prev.glyph_index, m.glyph_index) * scale,
                None => 0.0,
            };
            paragraph.push(GlyphInfo {
                glyph_index: m.glyph_index,
                char_index,
                ch,
                format: format.clone(),
                face: face.clone(),
                unscaled_advance: m.advance,
                unscaled_ascent: m.ascent,
                unscaled_descent: m.descent,
                scale_multiplier: scale,
                spacing: char_spacing,
                offset: PointD::new(0.0, 0.0),
            });
            if kern != 0.0 {
                let n = paragraph.len();
                paragraph[n - 2].spacing += kern;
            }
        }
        push_paragraph(&mut paragraph, wrap, line_height, &mut glyphs, &mut lines);

        let width = lines.iter().map(|l: &TextLine| l.width).fold(0.0, f64::max);
        let height: f64 = lines.iter().map(|l| l.height).sum();

        Self {
            text: text.to_string(),
            glyphs,
            lines,
            width,
            height,
            ascender: face.ascender() * scale,
            halign: props.halign,
            valign: props.valign,
            jalign: props.jalign,
            displacement: PointD::new(
                props.displacement.x * scale_factor,
                props.displacement.y * scale_factor,
            ),
            orientation: props.orientation,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn glyphs(&self) -> &[GlyphInfo] {
        &self.glyphs
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    pub fn lines(&self) -> &[TextLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn orientation(&self) -> f64 {
        self.orientation
    }

    pub fn displacement(&self) -> PointD {
        self.displacement
    }

    /// Face ascender in pixels.
    pub fn ascender(&self) -> f64 {
        self.ascender
    }

    /// Height of the first line; the band line labels occupy.
    pub fn line_height(&self) -> f64 {
        self.lines.first().map_or(0.0, |l| l.height)
    }

    /// Advance of every glyph in order; the step sizes for line placement.
    pub fn cluster_widths(&self) -> Vec<f64> {
        self.glyphs.iter().map(GlyphInfo::advance).collect()
    }

    /// Offset of the layout center from the anchor caused by the
    /// horizontal and vertical alignment. Displacement is separate.
    pub fn alignment_offset(&self) -> PointD {
        let x = match self.halign {
            HorizontalAlignment::Left => -self.width / 2.0,
            HorizontalAlignment::Right => self.width / 2.0,
            _ => 0.0,
        };
        let y = match self.valign {
            VerticalAlignment::Top => -self.height / 2.0,
            VerticalAlignment::Bottom => self.height / 2.0,
            _ => 0.0,
        };
        PointD::new(x, y)
    }

    /// Horizontal shift of a line of `line_width` inside the layout box.
    pub fn jalign_offset(&self, line_width: f64) -> f64 {
        let jalign = match self.jalign {
            JustifyAlignment::Auto => match self.halign {
                HorizontalAlignment::Left => JustifyAlignment::Right,
                HorizontalAlignment::Right => JustifyAlignment::Left,
                _ => JustifyAlignment::Middle,
            },
            j => j,
        };
        let slack = (self.width - line_width) / 2.0;
        match jalign {
            JustifyAlignment::Left => -slack,
            JustifyAlignment::Right => slack,
            _ => 0.0,
        }
    }

    /// Unrotated bounds relative to the anchor, displacement included.
    pub fn bounds(&self) -> RectD {
        let c = self.alignment_offset() + self.displacement;
        RectD::from_center(c.x, c.y, self.width, self.height)
    }

    /// Baseline start of every glyph relative to the layout center, before
    /// rotation.
    pub fn glyph_offsets(&self) -> Vec<PointD> {
        let mut out = Vec::with_capacity(self.glyphs.len());
        let mut top = -self.height / 2.0;
        for line in &self.lines {
            let mut x = -line.width / 2.0 + self.jalign_offset(line.width);
            let baseline = top + self.ascender;
            for g in &self.glyphs[line.glyphs.clone()] {
                out.push(PointD::new(x + g.offset.x, baseline + g.offset.y));
                x += g.advance();
            }
            top += line.height;
        }
        out
    }
}

/// Break one paragraph into lines and move its glyphs to the output.
/// Spaces at wrap points are dropped.
fn push_paragraph(
    paragraph: &mut Vec<GlyphInfo>,
    wrap: f64,
    line_height: f64,
    glyphs: &mut Vec<GlyphInfo>,
    lines: &mut Vec<TextLine>,
) {
    let mut start = 0;
    let mut width = 0.0;
    let mut last_space: Option<usize> = None;
    let mut ranges = Vec::new();
    for (i, g) in paragraph.iter().enumerate() {
        let adv = g.advance();
        if wrap > 0.0 && width + adv > wrap && !g.ch.is_whitespace() {
            if let Some(s) = last_space.filter(|&s| s > start) {
                ranges.push(start..s);
                start = s + 1;
                width = paragraph[start..i].iter().map(GlyphInfo::advance).sum();
                last_space = None;
            }
        }
        if g.ch.is_whitespace() {
            last_space = Some(i);
        }
        width += adv;
    }
    ranges.push(start..paragraph.len());

    for r in ranges {
        let first = glyphs.len();
        glyphs.extend(paragraph[r].iter().cloned());
        let width = glyphs[first..].iter().map(GlyphInfo::advance).sum();
        lines.push(TextLine {
            glyphs: first..glyphs.len(),
            width,
            height: line_height,
        });
    }
    paragraph.clear();
}

// ============================================================================
// Tests
// ============================================================================
