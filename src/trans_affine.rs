//! Affine transformation matrix.
//!
//! Used for symbolizer-level geometry transforms, marker placement
//! (rotate then translate a marker shape to its anchor), and as the matrix
//! form of the world-to-device view transform.

use crate::errors::{Error, Result};

/// Epsilon for affine matrix comparisons.
pub const AFFINE_EPSILON: f64 = 1e-14;

/// 2D affine transformation matrix.
///
/// Stores six components `[sx, shy, shx, sy, tx, ty]`:
///
/// ```text
///   | sx  shx tx |
///   | shy  sy ty |
///   |  0    0  1 |
/// ```
///
/// Transform: `x' = x*sx + y*shx + tx`, `y' = x*shy + y*sy + ty`.
#[derive(Debug, Clone, Copy)]
pub struct TransAffine {
    pub sx: f64,
    pub shy: f64,
    pub shx: f64,
    pub sy: f64,
    pub tx: f64,
    pub ty: f64,
}

impl TransAffine {
    /// Identity matrix.
    pub fn new() -> Self {
        Self::new_custom(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub fn new_custom(sx: f64, shy: f64, shx: f64, sy: f64, tx: f64, ty: f64) -> Self {
        Self {
            sx,
            shy,
            shx,
            sy,
            tx,
            ty,
        }
    }

    pub fn new_rotation(a: f64) -> Self {
        let (sa, ca) = a.sin_cos();
        Self::new_custom(ca, sa, -sa, ca, 0.0, 0.0)
    }

    pub fn new_scaling(x: f64, y: f64) -> Self {
        Self::new_custom(x, 0.0, 0.0, y, 0.0, 0.0)
    }

    pub fn new_translation(x: f64, y: f64) -> Self {
        Self::new_custom(1.0, 0.0, 0.0, 1.0, x, y)
    }

    pub fn new_skewing(x: f64, y: f64) -> Self {
        Self::new_custom(1.0, y.tan(), x.tan(), 1.0, 0.0, 0.0)
    }

    /// Parse an SVG-style transform list, e.g.
    /// `"translate(10, 5) rotate(45) scale(2)"`.
    ///
    /// Supported: `matrix(a,b,c,d,e,f)`, `translate(tx[,ty])`,
    /// `scale(sx[,sy])`, `rotate(deg[,cx,cy])`, `skewX(deg)`, `skewY(deg)`.
    /// Operations apply right to left as in SVG: the last one listed acts
    /// on the geometry first.
    pub fn parse(expr: &str) -> Result<Self> {
        let err = |message: &str| Error::Expression {
            expr: expr.to_string(),
            message: message.to_string(),
        };
        let mut result = TransAffine::new();
        let mut rest = expr.trim();
        while !rest.is_empty() {
            let open = rest.find('(').ok_or_else(|| err("expected '('"))?;
            let close = rest.find(')').ok_or_else(|| err("expected ')'"))?;
            if close < open {
                return Err(err("unbalanced parentheses"));
            }
            let name = rest[..open].trim();
            let args = rest[open + 1..close]
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<f64>().map_err(|_| err("invalid number")))
                .collect::<Result<Vec<f64>>>()?;
            let m = match (name, args.as_slice()) {
                ("matrix", [a, b, c, d, e, f]) => TransAffine::new_custom(*a, *b, *c, *d, *e, *f),
                ("translate", [tx]) => TransAffine::new_translation(*tx, 0.0),
                ("translate", [tx, ty]) => TransAffine::new_translation(*tx, *ty),
                ("scale", [s]) => TransAffine::new_scaling(*s, *s),
                ("scale", [sx, sy]) => TransAffine::new_scaling(*sx, *sy),
                ("rotate", [a]) => TransAffine::new_rotation(a.to_radians()),
                ("rotate", [a, cx, cy]) => {
                    let mut m = TransAffine::new_translation(-cx, -cy);
                    m.multiply(&TransAffine::new_rotation(a.to_radians()));
                    m.multiply(&TransAffine::new_translation(*cx, *cy));
                    m
                }
                ("skewX", [a]) => TransAffine::new_skewing(a.to_radians(), 0.0),
                ("skewY", [a]) => TransAffine::new_skewing(0.0, a.to_radians()),
                _ => return Err(err("unknown transform or wrong argument count")),
            };
            result.premultiply_rhs(&m);
            rest = rest[close + 1..].trim_start_matches(|c: char| c == ',' || c.is_whitespace());
        }
        Ok(result)
    }

    pub fn reset(&mut self) -> &mut Self {
        *self = Self::new();
        self
    }

    pub fn translate(&mut self, x: f64, y: f64) -> &mut Self {
        self.tx += x;
        self.ty += y;
        self
    }

    pub fn rotate(&mut self, a: f64) -> &mut Self {
        self.multiply(&TransAffine::new_rotation(a))
    }

    pub fn scale(&mut self, x: f64, y: f64) -> &mut Self {
        self.sx *= x;
        self.shx *= x;
        self.tx *= x;
        self.shy *= y;
        self.sy *= y;
        self.ty *= y;
        self
    }

    /// Post-multiply: `self` is applied first, then `m`.
    pub fn multiply(&mut self, m: &TransAffine) -> &mut Self {
        let t0 = self.sx * m.sx + self.shy * m.shx;
        let t2 = self.shx * m.sx + self.sy * m.shx;
        let t4 = self.tx * m.sx + self.ty * m.shx + m.tx;
        self.shy = self.sx * m.shy + self.shy * m.sy;
        self.sy = self.shx * m.shy + self.sy * m.sy;
        self.ty = self.tx * m.shy + self.ty * m.sy + m.ty;
        self.sx = t0;
        self.shx = t2;
        self.tx = t4;
        self
    }

    /// Pre-multiply: `m` is applied first, then `self`.
    fn premultiply_rhs(&mut self, m: &TransAffine) -> &mut Self {
        let mut t = *m;
        t.multiply(self);
        *self = t;
        self
    }

    pub fn invert(&mut self) -> &mut Self {
        let d = self.determinant_reciprocal();
        let t0 = self.sy * d;
        self.sy = self.sx * d;
        self.shy = -self.shy * d;
        self.shx = -self.shx * d;
        let t4 = -self.tx * t0 - self.ty * self.shx;
        self.ty = -self.tx * self.shy - self.ty * self.sy;
        self.sx = t0;
        self.tx = t4;
        self
    }

    #[inline]
    pub fn transform(&self, x: &mut f64, y: &mut f64) {
        let tmp = *x;
        *x = tmp * self.sx + *y * self.shx + self.tx;
        *y = tmp * self.shy + *y * self.sy + self.ty;
    }

    #[inline]
    pub fn inverse_transform(&self, x: &mut f64, y: &mut f64) {
        let d = self.determinant_reciprocal();
        let a = (*x - self.tx) * d;
        let b = (*y - self.ty) * d;
        *x = a * self.sy - b * self.shx;
        *y = b * self.sx - a * self.shy;
    }

    #[inline]
    pub fn determinant_reciprocal(&self) -> f64 {
        1.0 / (self.sx * self.sy - self.shy * self.shx)
    }

    /// Average scale factor.
    pub fn get_scale(&self) -> f64 {
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let x = s * self.sx + s * self.shx;
        let y = s * self.shy + s * self.sy;
        (x * x + y * y).sqrt()
    }

    pub fn is_identity(&self, epsilon: f64) -> bool {
        self.is_equal(&TransAffine::new(), epsilon)
    }

    pub fn is_equal(&self, m: &TransAffine, epsilon: f64) -> bool {
        let eq = |a: f64, b: f64| (a - b).abs() <= epsilon;
        eq(self.sx, m.sx)
            && eq(self.shy, m.shy)
            && eq(self.shx, m.shx)
            && eq(self.sy, m.sy)
            && eq(self.tx, m.tx)
            && eq(self.ty, m.ty)
    }

    /// Rotation angle of the transformed x axis.
    pub fn rotation(&self) -> f64 {
        self.shy.atan2(self.sx)
    }
}

impl Default for TransAffine {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for TransAffine {
    fn eq(&self, other: &Self) -> bool {
        self.is_equal(other, AFFINE_EPSILON)
    }
}

impl std::ops::Mul for TransAffine {
    type Output = TransAffine;
    fn mul(self, rhs: TransAffine) -> TransAffine {
        let mut result = self;
        result.multiply(&rhs);
        result
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn apply(m: &TransAffine, x: f64, y: f64) -> (f64, f64) {
        let (mut x, mut y) = (x, y);
        m.transform(&mut x, &mut y);
        (x, y)
    }

    #[test]
    fn test_identity() {
        let m = TransAffine::new();
        assert_eq!(apply(&m, 3.0, 4.0), (3.0, 4.0));
        assert!(m.is_identity(AFFINE_EPSILON));
    }

    #[test]
    fn test_multiply_order() {
        // Scale first, then translate.
        let m = TransAffine::new_scaling(2.0, 2.0) * TransAffine::new_translation(10.0, 0.0);
        assert_eq!(apply(&m, 1.0, 1.0), (12.0, 2.0));
    }

    #[test]
    fn test_rotation() {
        let m = TransAffine::new_rotation(PI / 2.0);
        let (x, y) = apply(&m, 1.0, 0.0);
        assert!(x.abs() < 1e-12 && (y - 1.0).abs() < 1e-12);
        assert!((m.rotation() - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_invert_round_trip() {
        let m = TransAffine::new_custom(2.0, 0.5, -0.3, 1.5, 7.0, -3.0);
        let (x, y) = apply(&m, 4.0, 5.0);
        let mut inv = m;
        inv.invert();
        let (bx, by) = apply(&inv, x, y);
        assert!((bx - 4.0).abs() < 1e-9 && (by - 5.0).abs() < 1e-9);
        let (mut ix, mut iy) = (x, y);
        m.inverse_transform(&mut ix, &mut iy);
        assert!((ix - 4.0).abs() < 1e-9 && (iy - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_list_applies_right_to_left() {
        // scale first, then translate
        let m = TransAffine::parse("translate(10, 5) scale(2)").unwrap();
        assert_eq!(apply(&m, 1.0, 1.0), (12.0, 7.0));
    }

    #[test]
    fn test_parse_rotate_about_center() {
        let m = TransAffine::parse("rotate(180, 5, 5)").unwrap();
        let (x, y) = apply(&m, 0.0, 0.0);
        assert!((x - 10.0).abs() < 1e-9 && (y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            TransAffine::parse("translate(1,2"),
            Err(Error::Expression { .. })
        ));
        assert!(TransAffine::parse("shear(1)").is_err());
        assert!(TransAffine::parse("scale(a)").is_err());
        assert!(TransAffine::parse("").unwrap().is_identity(AFFINE_EPSILON));
    }
}
