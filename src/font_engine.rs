//! TrueType metrics through `ttf-parser`.
//!
//! Only measurement is needed for placement: advances, vertical extents
//! and kerning, all in font units.

use crate::errors::{Error, Result};
use crate::font::{FontMetrics, GlyphMetrics};

/// TrueType/OpenType face loaded from raw bytes.
pub struct TtfFontMetrics {
    name: String,
    face_data: Vec<u8>,
    face_index: u32,
    units_per_em: f64,
    ascender: f64,
    descender: f64,
    line_gap: f64,
}

impl TtfFontMetrics {
    /// Parse `data` once to validate it and read the face-wide metrics.
    /// `face_index` selects the face in a collection (0 for single fonts).
    pub fn from_data(name: &str, data: Vec<u8>, face_index: u32) -> Result<Self> {
        let face = ttf_parser::Face::parse(&data, face_index).map_err(|e| Error::Font {
            message: format!("{name}: {e}"),
        })?;
        let units_per_em = face.units_per_em() as f64;
        let ascender = face.ascender() as f64;
        let descender = face.descender() as f64;
        let line_gap = face.line_gap() as f64;
        Ok(Self {
            name: name.to_string(),
            face_data: data,
            face_index,
            units_per_em,
            ascender,
            descender,
            line_gap,
        })
    }

    pub fn from_file(name: &str, path: &std::path::Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| Error::Font {
            message: format!("{}: {e}", path.display()),
        })?;
        Self::from_data(name, data, 0)
    }

    fn face(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.face_data, self.face_index).ok()
    }
}

impl FontMetrics for TtfFontMetrics {
    fn name(&self) -> &str {
        &self.name
    }

    fn units_per_em(&self) -> f64 {
        self.units_per_em
    }

    fn ascender(&self) -> f64 {
        self.ascender
    }

    fn descender(&self) -> f64 {
        self.descender
    }

    fn line_gap(&self) -> f64 {
        self.line_gap
    }

    fn glyph(&self, ch: char) -> Option<GlyphMetrics> {
        let face = self.face()?;
        let id = face.glyph_index(ch)?;
        let advance = face.glyph_hor_advance(id).map_or(0.0, f64::from);
        // glyphs without an outline (space) have no vertical extent
        let (ascent, descent) = face
            .glyph_bounding_box(id)
            .map_or((0.0, 0.0), |b| (b.y_max as f64, b.y_min as f64));
        Some(GlyphMetrics {
            glyph_index: u32::from(id.0),
            advance,
            ascent,
            descent,
        })
    }

    fn kerning(&self, first: u32, second: u32) -> f64 {
        let (Ok(first), Ok(second)) = (u16::try_from(first), u16::try_from(second)) else {
            return 0.0;
        };
        let Some(face) = self.face() else {
            return 0.0;
        };
        let Some(kern) = face.tables().kern else {
            return 0.0;
        };
        let (first, second) = (ttf_parser::GlyphId(first), ttf_parser::GlyphId(second));
        for subtable in kern.subtables {
            if subtable.horizontal && !subtable.has_cross_stream {
                if let Some(value) = subtable.glyphs_kerning(first, second) {
                    return value as f64;
                }
            }
        }
        0.0
    }
}
