//! Font measurement interface and face cache.
//!
//! Layout only needs unscaled metrics: glyph index, advance, ascent and
//! descent in font units. Scaling to pixels happens in
//! [`text_layout`](crate::text_layout). Faces are shared between glyphs
//! through [`FontFace`] (an `Arc`).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Unscaled metrics of a single glyph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphMetrics {
    pub glyph_index: u32,
    pub advance: f64,
    pub ascent: f64,
    /// Negative below the baseline.
    pub descent: f64,
}

/// A font that can measure characters in font units.
///
/// Implementations must not apply any scaling themselves.
pub trait FontMetrics: Send + Sync {
    fn name(&self) -> &str;

    fn units_per_em(&self) -> f64;

    /// Face-wide ascender, positive above the baseline.
    fn ascender(&self) -> f64;

    /// Face-wide descender, negative below the baseline.
    fn descender(&self) -> f64;

    fn line_gap(&self) -> f64 {
        0.0
    }

    /// Metrics for `ch`, or `None` if the face has no glyph for it.
    fn glyph(&self, ch: char) -> Option<GlyphMetrics>;

    /// Horizontal kerning between two glyph indices.
    fn kerning(&self, _first: u32, _second: u32) -> f64 {
        0.0
    }
}

pub type FontFace = Arc<dyn FontMetrics>;

/// Fixed-pitch metrics needing no font data. Used as the default face and
/// in tests.
#[derive(Debug, Clone)]
pub struct MonospaceMetrics {
    name: String,
    pub units_per_em: f64,
    pub advance: f64,
    pub ascent: f64,
    pub descent: f64,
}

impl MonospaceMetrics {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            units_per_em: 1000.0,
            advance: 600.0,
            ascent: 800.0,
            descent: -200.0,
        }
    }
}

impl Default for MonospaceMetrics {
    fn default() -> Self {
        Self::new("monospace")
    }
}

impl FontMetrics for MonospaceMetrics {
    fn name(&self) -> &str {
        &self.name
    }

    fn units_per_em(&self) -> f64 {
        self.units_per_em
    }

    fn ascender(&self) -> f64 {
        self.ascent
    }

    fn descender(&self) -> f64 {
        self.descent
    }

    fn glyph(&self, ch: char) -> Option<GlyphMetrics> {
        if ch.is_control() {
            return None;
        }
        let (ascent, descent) = if ch.is_whitespace() {
            (0.0, 0.0)
        } else {
            (self.ascent, self.descent)
        };
        Some(GlyphMetrics {
            glyph_index: ch as u32,
            advance: self.advance,
            ascent,
            descent,
        })
    }
}

/// Process-wide registry of faces by name.
///
/// Build one at startup, register faces, then share it by reference with
/// every renderer. Lookups lock briefly and hand out `Arc` clones.
#[derive(Default)]
pub struct FontFaceCache {
    faces: Mutex<HashMap<String, FontFace>>,
}

impl FontFaceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `face` under its own name, replacing any previous face.
    pub fn register(&self, face: FontFace) {
        let name = face.name().to_string();
        self.faces
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name, face);
    }

    pub fn get(&self, name: &str) -> Option<FontFace> {
        self.faces
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    /// Face `name`, falling back to a [`MonospaceMetrics`] of that name
    /// which is registered on first use.
    pub fn get_or_monospace(&self, name: &str) -> FontFace {
        let mut faces = self.faces.lock().unwrap_or_else(|e| e.into_inner());
        faces
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MonospaceMetrics::new(name)))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.faces.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl core::fmt::Debug for FontFaceCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FontFaceCache").field("faces", &self.len()).finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monospace_metrics() {
        let m = MonospaceMetrics::default();
        let g = m.glyph('A').unwrap();
        assert_eq!(g.advance, 600.0);
        assert_eq!(g.glyph_index, 'A' as u32);
        assert_eq!(m.glyph(' ').unwrap().ascent, 0.0);
        assert!(m.glyph('\n').is_none());
    }

    #[test]
    fn test_cache_shares_faces() {
        let cache = FontFaceCache::new();
        assert!(cache.is_empty());
        cache.register(Arc::new(MonospaceMetrics::new("DejaVu Sans")));
        let a = cache.get("DejaVu Sans").unwrap();
        let b = cache.get("DejaVu Sans").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(cache.get("missing").is_none());
    }

    #[test]
    fn test_monospace_fallback_registered_once() {
        let cache = FontFaceCache::new();
        let a = cache.get_or_monospace("x");
        let b = cache.get_or_monospace("x");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }
}
