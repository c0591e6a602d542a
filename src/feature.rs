//! Features and feature sources.
//!
//! A feature is a geometry plus named attributes. Sources hand features
//! out in a stable order; that order decides which of two colliding
//! labels wins, so sources must never reorder between calls.

use std::collections::BTreeMap;
use std::fmt;

use crate::basics::RectD;
use crate::geometry::{Coordinate, Geometry};

/// Attribute value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness used by rule filters: null, `false`, zero and the empty
    /// string are false.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Integer(i) => *i != 0,
            Value::Double(d) => *d != 0.0,
            Value::String(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Double(d) => write!(f, "{d}"),
            Value::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature<T: Coordinate = f64> {
    id: u64,
    geometry: Geometry<T>,
    attributes: BTreeMap<String, Value>,
}

impl<T: Coordinate> Feature<T> {
    pub fn new(id: u64, geometry: Geometry<T>) -> Self {
        Self {
            id,
            geometry,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn geometry(&self) -> &Geometry<T> {
        &self.geometry
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }
}

/// Supplies the features of one layer.
pub trait FeatureSource {
    /// Features whose envelope intersects `bbox` (layer CRS), in source
    /// order. Features with empty geometries are never returned.
    fn features<'a>(&'a self, bbox: &RectD) -> Box<dyn Iterator<Item = &'a Feature> + 'a>;
}

/// Features held in memory, returned in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryFeatureSource {
    features: Vec<Feature>,
}

impl MemoryFeatureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Envelope of every feature.
    pub fn envelope(&self) -> RectD {
        let mut r = RectD::invalid();
        for f in &self.features {
            let e = f.geometry().envelope();
            if e.is_valid() {
                r.expand_to_include_rect(&e);
            }
        }
        r
    }
}

impl FromIterator<Feature> for MemoryFeatureSource {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

impl FeatureSource for MemoryFeatureSource {
    fn features<'a>(&'a self, bbox: &RectD) -> Box<dyn Iterator<Item = &'a Feature> + 'a> {
        let bbox = *bbox;
        Box::new(self.features.iter().filter(move |f| {
            let e = f.geometry().envelope();
            e.is_valid() && e.intersects(&bbox)
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn point(id: u64, x: f64, y: f64) -> Feature {
        Feature::new(id, Geometry::Point(Point::new(x, y)))
    }

    #[test]
    fn test_attributes() {
        let f = point(1, 0.0, 0.0)
            .with_attribute("name", "Main St")
            .with_attribute("lanes", 2i64);
        assert_eq!(f.get("name"), Some(&Value::from("Main St")));
        assert_eq!(f.get("lanes").map(|v| v.to_string()), Some("2".to_string()));
        assert_eq!(f.get("missing"), None);
        assert!(!Value::Null.to_bool());
        assert!(Value::from("x").to_bool());
    }

    #[test]
    fn test_memory_source_order_and_filter() {
        let src: MemoryFeatureSource = vec![
            point(3, 5.0, 5.0),
            point(1, 50.0, 50.0),
            point(2, 6.0, 6.0),
            Feature::new(4, Geometry::Empty),
        ]
        .into_iter()
        .collect();
        let ids: Vec<u64> = src
            .features(&RectD::new(0.0, 0.0, 10.0, 10.0))
            .map(|f| f.id())
            .collect();
        assert_eq!(ids, vec![3, 2]);
        assert_eq!(src.envelope(), RectD::new(5.0, 5.0, 50.0, 50.0));
    }
}
