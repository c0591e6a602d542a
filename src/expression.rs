//! Label expressions.
//!
//! An expression is a template of literal text and `[field]` references,
//! e.g. `"[name] ([ref])"`. Evaluating it against a feature substitutes
//! each reference with the attribute's text, or nothing when the feature
//! lacks it. `[[` and `]]` stand for literal brackets.

use core::fmt;

use crate::errors::{Error, Result};
use crate::feature::Feature;
use crate::geometry::Coordinate;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Field(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    source: String,
    parts: Vec<Part>,
}

impl Expression {
    pub fn parse(expr: &str) -> Result<Self> {
        let err = |message: &str| Error::Expression {
            expr: expr.to_string(),
            message: message.to_string(),
        };
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = expr.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '[' if chars.peek() == Some(&'[') => {
                    chars.next();
                    literal.push('[');
                }
                ']' if chars.peek() == Some(&']') => {
                    chars.next();
                    literal.push(']');
                }
                '[' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some(']') => break,
                            Some('[') => return Err(err("nested '['")),
                            Some(c) => name.push(c),
                            None => return Err(err("unterminated field reference")),
                        }
                    }
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(err("empty field name"));
                    }
                    if !literal.is_empty() {
                        parts.push(Part::Literal(core::mem::take(&mut literal)));
                    }
                    parts.push(Part::Field(name.to_string()));
                }
                ']' => return Err(err("unmatched ']'")),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }
        Ok(Self {
            source: expr.to_string(),
            parts,
        })
    }

    /// An expression that always evaluates to `text`.
    pub fn literal(text: &str) -> Self {
        let parts = if text.is_empty() {
            Vec::new()
        } else {
            vec![Part::Literal(text.to_string())]
        };
        Self {
            source: text.replace('[', "[[").replace(']', "]]"),
            parts,
        }
    }

    pub fn evaluate<T: Coordinate>(&self, feature: &Feature<T>) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(s) => out.push_str(s),
                Part::Field(name) => {
                    if let Some(v) = feature.get(name) {
                        out.push_str(&v.to_string());
                    }
                }
            }
        }
        out
    }

    /// Referenced attribute names, in order of appearance.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|p| match p {
            Part::Field(name) => Some(name.as_str()),
            Part::Literal(_) => None,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl core::str::FromStr for Expression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Geometry, Point};

    fn feature() -> Feature {
        Feature::new(7, Geometry::Point(Point::new(0.0, 0.0)))
            .with_attribute("name", "Main St")
            .with_attribute("ref", 66i64)
    }

    #[test]
    fn test_evaluate() {
        let e = Expression::parse("[name] ([ref])").unwrap();
        assert_eq!(e.evaluate(&feature()), "Main St (66)");
        assert_eq!(e.fields().collect::<Vec<_>>(), vec!["name", "ref"]);
        assert_eq!(e.to_string(), "[name] ([ref])");
    }

    #[test]
    fn test_missing_field_is_empty() {
        let e = Expression::parse("[nothing]").unwrap();
        assert_eq!(e.evaluate(&feature()), "");
    }

    #[test]
    fn test_escaped_brackets() {
        let e = Expression::parse("[[[name]]]").unwrap();
        assert_eq!(e.evaluate(&feature()), "[Main St]");
        assert_eq!(Expression::literal("a[b]").evaluate(&feature()), "a[b]");
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["[name", "[]", "[ ]", "name]", "[a[b]]"] {
            assert!(
                matches!(Expression::parse(bad), Err(Error::Expression { .. })),
                "{bad:?} should not parse"
            );
        }
    }
}
