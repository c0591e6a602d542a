//! Coordinate reference systems and transforms between them.
//!
//! Two well-known systems are supported natively: geographic WGS84
//! longitude/latitude and spherical web mercator. A [`ProjTransform`]
//! composes a source and destination system; it is immutable after
//! construction, so one instance can be shared by every render thread
//! through [`ProjTransformCache`].

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::{Arc, Mutex};

use crate::basics::RectD;
use crate::errors::{Error, Result};

pub const EARTH_RADIUS: f64 = 6_378_137.0;
/// Half the circumference of the mercator world square.
pub const MERC_MAX_EXTENT: f64 = 20_037_508.342_789_244;
pub const MERC_MAX_LATITUDE: f64 = 85.051_128_779_8;

/// Number of samples per box edge when transforming envelopes.
const BOX_EDGE_SAMPLES: usize = 20;

// ============================================================================
// Projection
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Projection {
    /// Geographic WGS84, degrees.
    LonLat,
    /// Spherical web mercator, meters.
    WebMercator,
}

impl Projection {
    /// Parse a CRS string (`epsg:4326`, `+init=epsg:3857`,
    /// `+proj=longlat +datum=WGS84`, ...). Matching is case-insensitive.
    pub fn parse(srs: &str) -> Result<Self> {
        let s = srs.trim().to_ascii_lowercase();
        let init = s.strip_prefix("+init=").unwrap_or(&s);
        match init {
            "epsg:4326" => return Ok(Projection::LonLat),
            "epsg:3857" | "epsg:900913" | "epsg:3785" => return Ok(Projection::WebMercator),
            _ => {}
        }
        let proj = s
            .split_whitespace()
            .find_map(|tok| tok.strip_prefix("+proj="));
        match proj {
            Some("longlat") | Some("lonlat") | Some("latlong") => Ok(Projection::LonLat),
            Some("merc") => Ok(Projection::WebMercator),
            _ => Err(Error::InvalidProjection {
                srs: srs.to_string(),
            }),
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Projection::LonLat)
    }

    /// Canonical CRS string.
    pub fn params(&self) -> &'static str {
        match self {
            Projection::LonLat => "epsg:4326",
            Projection::WebMercator => "epsg:3857",
        }
    }

    /// Geographic degrees into this system. Fails outside the valid domain.
    pub fn forward(&self, x: &mut f64, y: &mut f64) -> bool {
        if !x.is_finite() || !y.is_finite() {
            return false;
        }
        match self {
            Projection::LonLat => true,
            Projection::WebMercator => lonlat2merc(x, y),
        }
    }

    /// This system back into geographic degrees.
    pub fn inverse(&self, x: &mut f64, y: &mut f64) -> bool {
        if !x.is_finite() || !y.is_finite() {
            return false;
        }
        match self {
            Projection::LonLat => true,
            Projection::WebMercator => merc2lonlat(x, y),
        }
    }
}

pub fn lonlat2merc(x: &mut f64, y: &mut f64) -> bool {
    if x.abs() > 180.0 || y.abs() > MERC_MAX_LATITUDE {
        return false;
    }
    let lat = *y;
    *x = *x * MERC_MAX_EXTENT / 180.0;
    *y = ((90.0 + lat) * PI / 360.0).tan().ln() * EARTH_RADIUS;
    true
}

pub fn merc2lonlat(x: &mut f64, y: &mut f64) -> bool {
    const SLACK: f64 = 1e-6;
    if x.abs() > MERC_MAX_EXTENT + SLACK || y.abs() > MERC_MAX_EXTENT + SLACK {
        return false;
    }
    *x = *x / MERC_MAX_EXTENT * 180.0;
    *y = (2.0 * (*y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
    true
}

// ============================================================================
// ProjTransform
// ============================================================================

/// Transform between a source and a destination system.
///
/// In rendering the source is the map's CRS and the destination the
/// layer's, so feature coordinates travel through [`backward`](Self::backward).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjTransform {
    source: Projection,
    dest: Projection,
}

impl ProjTransform {
    pub fn new(source: Projection, dest: Projection) -> Self {
        Self { source, dest }
    }

    pub fn from_srs(source: &str, dest: &str) -> Result<Self> {
        Ok(Self::new(Projection::parse(source)?, Projection::parse(dest)?))
    }

    pub fn source(&self) -> Projection {
        self.source
    }

    pub fn dest(&self) -> Projection {
        self.dest
    }

    /// Source and destination are the same system; every call is a no-op.
    pub fn equal(&self) -> bool {
        self.source == self.dest
    }

    pub fn forward(&self, x: &mut f64, y: &mut f64) -> bool {
        if self.equal() {
            return true;
        }
        Self::convert(self.source, self.dest, x, y)
    }

    pub fn backward(&self, x: &mut f64, y: &mut f64) -> bool {
        if self.equal() {
            return true;
        }
        Self::convert(self.dest, self.source, x, y)
    }

    fn convert(from: Projection, to: Projection, x: &mut f64, y: &mut f64) -> bool {
        let (mut tx, mut ty) = (*x, *y);
        if !from.inverse(&mut tx, &mut ty) || !to.forward(&mut tx, &mut ty) {
            return false;
        }
        *x = tx;
        *y = ty;
        true
    }

    /// Envelope of `r` in the destination system, sampled along its edges.
    /// `None` when no sample point could be transformed.
    pub fn forward_box(&self, r: &RectD) -> Option<RectD> {
        if self.equal() {
            return Some(*r);
        }
        self.transform_box(r, |x, y| self.forward(x, y))
    }

    pub fn backward_box(&self, r: &RectD) -> Option<RectD> {
        if self.equal() {
            return Some(*r);
        }
        self.transform_box(r, |x, y| self.backward(x, y))
    }

    fn transform_box<F>(&self, r: &RectD, f: F) -> Option<RectD>
    where
        F: Fn(&mut f64, &mut f64) -> bool,
    {
        let mut out = RectD::invalid();
        let n = BOX_EDGE_SAMPLES;
        for i in 0..=n {
            let t = i as f64 / n as f64;
            let xs = r.x1 + (r.x2 - r.x1) * t;
            let ys = r.y1 + (r.y2 - r.y1) * t;
            for (mut x, mut y) in [(xs, r.y1), (xs, r.y2), (r.x1, ys), (r.x2, ys)] {
                if f(&mut x, &mut y) {
                    out.expand_to_include(x, y);
                }
            }
        }
        if out.is_valid() {
            Some(out)
        } else {
            None
        }
    }
}

// ============================================================================
// ProjTransformCache
// ============================================================================

/// Process-wide transform cache keyed by the (source, dest) CRS strings.
///
/// Construct one at startup and pass it by reference into rendering.
/// Concurrent first requests for the same pair may both build a transform;
/// the first one stored wins and both callers get an equivalent object.
#[derive(Debug, Default)]
pub struct ProjTransformCache {
    transforms: Mutex<HashMap<(String, String), Arc<ProjTransform>>>,
}

impl ProjTransformCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source: &str, dest: &str) -> Result<Arc<ProjTransform>> {
        let key = (source.to_string(), dest.to_string());
        {
            let map = self.transforms.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(t) = map.get(&key) {
                return Ok(Arc::clone(t));
            }
        }
        let created = Arc::new(ProjTransform::from_srs(source, dest)?);
        let mut map = self.transforms.lock().unwrap_or_else(|e| e.into_inner());
        Ok(Arc::clone(map.entry(key).or_insert(created)))
    }

    pub fn len(&self) -> usize {
        self.transforms
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
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
    fn test_parse_variants() {
        assert_eq!(Projection::parse("epsg:4326").unwrap(), Projection::LonLat);
        assert_eq!(Projection::parse("+init=EPSG:4326").unwrap(), Projection::LonLat);
        assert_eq!(
            Projection::parse("+proj=longlat +ellps=WGS84 +datum=WGS84 +no_defs").unwrap(),
            Projection::LonLat
        );
        assert_eq!(Projection::parse("epsg:900913").unwrap(), Projection::WebMercator);
        assert_eq!(
            Projection::parse("+proj=merc +a=6378137 +b=6378137 +lat_ts=0.0 +lon_0=0.0").unwrap(),
            Projection::WebMercator
        );
    }

    #[test]
    fn test_parse_rejects_unknown() {
        match Projection::parse("+proj=lcc +lat_1=33") {
            Err(Error::InvalidProjection { srs }) => assert_eq!(srs, "+proj=lcc +lat_1=33"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(Projection::parse("").is_err());
    }

    #[test]
    fn test_mercator_round_trip() {
        let (mut x, mut y) = (13.4, 52.5);
        assert!(lonlat2merc(&mut x, &mut y));
        assert!((x - 1_491_681.2).abs() < 1.0);
        assert!(merc2lonlat(&mut x, &mut y));
        assert!((x - 13.4).abs() < 1e-9 && (y - 52.5).abs() < 1e-9);
    }

    #[test]
    fn test_mercator_domain() {
        let (mut x, mut y) = (0.0, 89.0);
        assert!(!lonlat2merc(&mut x, &mut y));
        let (mut x, mut y) = (f64::NAN, 0.0);
        assert!(!Projection::WebMercator.forward(&mut x, &mut y));
        let (mut x, mut y) = (MERC_MAX_EXTENT * 2.0, 0.0);
        assert!(!merc2lonlat(&mut x, &mut y));
    }

    #[test]
    fn test_equal_pair_is_exact_noop() {
        let t = ProjTransform::from_srs("epsg:3857", "+init=epsg:900913").unwrap();
        assert!(t.equal());
        let (mut x, mut y) = (0.1 + 0.2, 1e300);
        assert!(t.forward(&mut x, &mut y));
        assert_eq!((x, y), (0.1 + 0.2, 1e300));
        assert!(t.backward(&mut x, &mut y));
        assert_eq!((x, y), (0.1 + 0.2, 1e300));
    }

    #[test]
    fn test_backward_maps_dest_to_source() {
        // map in mercator, layer in lon/lat
        let t = ProjTransform::from_srs("epsg:3857", "epsg:4326").unwrap();
        let (mut x, mut y) = (180.0, 0.0);
        assert!(t.backward(&mut x, &mut y));
        assert!((x - MERC_MAX_EXTENT).abs() < 1e-6 && y.abs() < 1e-6);
        let (mut x, mut y) = (10.0, 88.0);
        assert!(!t.backward(&mut x, &mut y));
        assert_eq!((x, y), (10.0, 88.0));
    }

    #[test]
    fn test_box_transform() {
        let t = ProjTransform::from_srs("epsg:4326", "epsg:3857").unwrap();
        let b = t.forward_box(&RectD::new(-180.0, -85.0, 180.0, 85.0)).unwrap();
        assert!((b.x2 - MERC_MAX_EXTENT).abs() < 1e-6);
        let back = t.backward_box(&b).unwrap();
        assert!((back.y2 - 85.0).abs() < 1e-6);
        assert!(t.forward_box(&RectD::new(0.0, 86.0, 10.0, 89.0)).is_none());
    }

    #[test]
    fn test_cache_reuses_instances() {
        let cache = ProjTransformCache::new();
        let a = cache.get("epsg:4326", "epsg:3857").unwrap();
        let b = cache.get("epsg:4326", "epsg:3857").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("bogus", "epsg:3857").is_err());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_shared_across_threads() {
        let cache = Arc::new(ProjTransformCache::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.get("epsg:3857", "epsg:4326").map(|t| t.equal()))
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap().unwrap(), false);
        }
        assert_eq!(cache.len(), 1);
    }
}
