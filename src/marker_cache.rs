//! Marker shapes and their cache.
//!
//! A marker is a closed outline in device pixels around its anchor at
//! (0, 0). Built-in shapes use `shape://` URIs; anything else is read as a
//! file holding one ring of whitespace separated `x,y` pairs.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::basics::{PointD, RectD};
use crate::ellipse::Ellipse;
use crate::errors::{Error, Result};
use crate::path_storage::PathStorage;
use crate::trans_affine::TransAffine;

/// Size of built-in shapes, pixels.
pub const DEFAULT_MARKER_SIZE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    name: String,
    path: PathStorage,
    bbox: RectD,
}

impl Marker {
    pub fn from_ring(name: &str, ring: &[PointD]) -> Self {
        let mut path = PathStorage::new();
        for (i, p) in ring.iter().enumerate() {
            if i == 0 {
                path.move_to(p.x, p.y);
            } else {
                path.line_to(p.x, p.y);
            }
        }
        path.close_polygon();
        Self::from_path(name, path)
    }

    fn from_path(name: &str, path: PathStorage) -> Self {
        let bbox = path.bounding_rect();
        Self {
            name: name.to_string(),
            path,
            bbox,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Outline relative to the anchor.
    pub fn path(&self) -> &PathStorage {
        &self.path
    }

    /// Bounds relative to the anchor.
    pub fn bbox(&self) -> RectD {
        self.bbox
    }

    /// Outline scaled, rotated by `angle` and moved to `pos`.
    pub fn placed_path(&self, pos: PointD, angle: f64, scale: f64) -> PathStorage {
        let mut m = TransAffine::new_scaling(scale, scale);
        m.rotate(angle);
        m.translate(pos.x, pos.y);
        let mut path = self.path.clone();
        path.transform_all_paths(&m);
        path
    }

    /// Bounds relative to the anchor after scaling.
    pub fn scaled_bbox(&self, scale: f64) -> RectD {
        RectD::new(
            self.bbox.x1 * scale,
            self.bbox.y1 * scale,
            self.bbox.x2 * scale,
            self.bbox.y2 * scale,
        )
    }
}

fn builtin(uri: &str) -> Option<Marker> {
    let h = DEFAULT_MARKER_SIZE / 2.0;
    let ring = |pts: &[(f64, f64)]| -> Vec<PointD> {
        pts.iter().map(|&(x, y)| PointD::new(x, y)).collect()
    };
    let marker = match uri.strip_prefix("shape://")? {
        "ellipse" => {
            let mut path = PathStorage::new();
            path.concat_path(&mut Ellipse::new(0.0, 0.0, h, h, 16));
            Marker::from_path(uri, path)
        }
        "square" => Marker::from_ring(uri, &ring(&[(-h, -h), (h, -h), (h, h), (-h, h)])),
        "triangle" => Marker::from_ring(uri, &ring(&[(-h, h), (0.0, -h), (h, h)])),
        // points along +x, the path direction
        "arrow" => Marker::from_ring(
            uri,
            &ring(&[
                (-h, -h * 0.4),
                (h * 0.2, -h * 0.4),
                (h * 0.2, -h),
                (h, 0.0),
                (h * 0.2, h),
                (h * 0.2, h * 0.4),
                (-h, h * 0.4),
            ]),
        ),
        _ => return None,
    };
    Some(marker)
}

fn parse_ring(text: &str) -> Option<Vec<PointD>> {
    let ring = text
        .split_whitespace()
        .map(|pair| {
            let (x, y) = pair.split_once(',')?;
            let x: f64 = x.parse().ok()?;
            let y: f64 = y.parse().ok()?;
            (x.is_finite() && y.is_finite()).then(|| PointD::new(x, y))
        })
        .collect::<Option<Vec<_>>>()?;
    (ring.len() >= 3).then_some(ring)
}

/// Loads markers once and shares them.
#[derive(Debug, Default)]
pub struct MarkerCache {
    markers: Mutex<HashMap<String, Arc<Marker>>>,
}

impl MarkerCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, uri: &str) -> Result<Arc<Marker>> {
        if let Some(m) = self.markers.lock().unwrap_or_else(|e| e.into_inner()).get(uri) {
            return Ok(Arc::clone(m));
        }
        let marker = match builtin(uri) {
            Some(m) => m,
            None if uri.starts_with("shape://") => {
                return Err(Error::UnsupportedMarker { path: uri.into() });
            }
            None => Self::read_file(uri)?,
        };
        debug!(uri, "marker loaded");
        let mut markers = self.markers.lock().unwrap_or_else(|e| e.into_inner());
        Ok(Arc::clone(markers.entry(uri.to_string()).or_insert_with(|| Arc::new(marker))))
    }

    fn read_file(uri: &str) -> Result<Marker> {
        let path = Path::new(uri);
        let text = std::fs::read_to_string(path).map_err(|source| Error::MarkerFile {
            path: path.to_path_buf(),
            source,
        })?;
        let ring = parse_ring(&text).ok_or_else(|| Error::UnsupportedMarker {
            path: path.to_path_buf(),
        })?;
        Ok(Marker::from_ring(uri, &ring))
    }

    pub fn len(&self) -> usize {
        self.markers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_shapes() {
        let cache = MarkerCache::new();
        for name in ["ellipse", "square", "triangle", "arrow"] {
            let m = cache.load(&format!("shape://{name}")).unwrap();
            let b = m.bbox();
            assert!((b.width() - DEFAULT_MARKER_SIZE).abs() < 1e-9, "{name}");
            assert!((b.height() - DEFAULT_MARKER_SIZE).abs() < 1e-9, "{name}");
        }
        assert_eq!(cache.len(), 4);
        assert!(matches!(cache.load("shape://star"), Err(Error::UnsupportedMarker { .. })));
    }

    #[test]
    fn test_cache_shares() {
        let cache = MarkerCache::new();
        let a = cache.load("shape://square").unwrap();
        let b = cache.load("shape://square").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_missing_file() {
        let cache = MarkerCache::new();
        let err = cache.load("/nonexistent/dir/pin.txt").unwrap_err();
        assert!(matches!(err, Error::MarkerFile { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_file_marker() {
        let dir = std::env::temp_dir();
        let good = dir.join(format!("carto_place_marker_{}.txt", std::process::id()));
        std::fs::write(&good, "0,-6 4,0 0,6 -4,0\n").unwrap();
        let bad = dir.join(format!("carto_place_marker_bad_{}.txt", std::process::id()));
        std::fs::write(&bad, "<svg/>").unwrap();

        let cache = MarkerCache::new();
        let m = cache.load(good.to_str().unwrap()).unwrap();
        assert_eq!(m.bbox(), RectD::new(-4.0, -6.0, 4.0, 6.0));
        let err = cache.load(bad.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedMarker { .. }));

        let _ = std::fs::remove_file(good);
        let _ = std::fs::remove_file(bad);
    }

    #[test]
    fn test_placed_path() {
        let m = Marker::from_ring(
            "r",
            &[PointD::new(0.0, 0.0), PointD::new(2.0, 0.0), PointD::new(2.0, 1.0)],
        );
        let p = m.placed_path(PointD::new(10.0, 10.0), core::f64::consts::FRAC_PI_2, 2.0);
        let b = p.bounding_rect();
        assert!((b.x1 - 8.0).abs() < 1e-9 && (b.x2 - 10.0).abs() < 1e-9);
        assert!((b.y1 - 10.0).abs() < 1e-9 && (b.y2 - 14.0).abs() < 1e-9);
    }
}
