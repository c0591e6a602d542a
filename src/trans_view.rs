//! World-to-device view transform.
//!
//! Maps projected world coordinates inside a map extent onto an image of
//! `width` x `height` pixels. Device y grows downward, so the top edge of
//! the extent (`y2`) lands on pixel row 0. An optional pixel offset shifts
//! the result, which is how buffered meta-tiles are rendered.

use crate::basics::RectD;
use crate::trans_affine::TransAffine;

/// Affine world-to-device mapping. Plain arithmetic, no failure mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    width: f64,
    height: f64,
    extent: RectD,
    sx: f64,
    sy: f64,
    offset_x: f64,
    offset_y: f64,
}

impl ViewTransform {
    /// A degenerate extent (zero width or height) gets unit scale.
    pub fn new(width: u32, height: u32, extent: RectD) -> Self {
        Self::with_offset(width, height, extent, 0.0, 0.0)
    }

    pub fn with_offset(
        width: u32,
        height: u32,
        extent: RectD,
        offset_x: f64,
        offset_y: f64,
    ) -> Self {
        const EPSILON: f64 = 1e-30;
        let (w, h) = (width as f64, height as f64);
        let sx = if extent.width().abs() < EPSILON {
            1.0
        } else {
            w / extent.width()
        };
        let sy = if extent.height().abs() < EPSILON {
            1.0
        } else {
            h / extent.height()
        };
        Self {
            width: w,
            height: h,
            extent,
            sx,
            sy,
            offset_x,
            offset_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn extent(&self) -> &RectD {
        &self.extent
    }

    pub fn scale_x(&self) -> f64 {
        self.sx
    }

    pub fn scale_y(&self) -> f64 {
        self.sy
    }

    /// Pixels per world unit (average of both axes).
    pub fn scale(&self) -> f64 {
        (self.sx + self.sy) * 0.5
    }

    #[inline]
    pub fn forward(&self, x: &mut f64, y: &mut f64) {
        *x = (*x - self.extent.x1) * self.sx - self.offset_x;
        *y = (self.extent.y2 - *y) * self.sy - self.offset_y;
    }

    #[inline]
    pub fn backward(&self, x: &mut f64, y: &mut f64) {
        *x = self.extent.x1 + (*x + self.offset_x) / self.sx;
        *y = self.extent.y2 - (*y + self.offset_y) / self.sy;
    }

    /// Device-space bounds of a world box.
    pub fn forward_box(&self, r: &RectD) -> RectD {
        let (mut x1, mut y1, mut x2, mut y2) = (r.x1, r.y1, r.x2, r.y2);
        self.forward(&mut x1, &mut y1);
        self.forward(&mut x2, &mut y2);
        let mut out = RectD::new(x1, y1, x2, y2);
        out.normalize();
        out
    }

    /// World-space bounds of a device box.
    pub fn backward_box(&self, r: &RectD) -> RectD {
        let (mut x1, mut y1, mut x2, mut y2) = (r.x1, r.y1, r.x2, r.y2);
        self.backward(&mut x1, &mut y1);
        self.backward(&mut x2, &mut y2);
        let mut out = RectD::new(x1, y1, x2, y2);
        out.normalize();
        out
    }

    /// Equivalent affine matrix, for stages that only take a `TransAffine`.
    pub fn to_affine(&self) -> TransAffine {
        let mut mtx = TransAffine::new_translation(-self.extent.x1, -self.extent.y2);
        mtx.multiply(&TransAffine::new_scaling(self.sx, -self.sy));
        mtx.multiply(&TransAffine::new_translation(-self.offset_x, -self.offset_y));
        mtx
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> ViewTransform {
        ViewTransform::new(200, 100, RectD::new(0.0, 0.0, 100.0, 100.0))
    }

    #[test]
    fn test_scale() {
        let v = view();
        assert_eq!(v.scale_x(), 2.0);
        assert_eq!(v.scale_y(), 1.0);
        assert_eq!(v.scale(), 1.5);
    }

    #[test]
    fn test_forward_flips_y() {
        let v = view();
        let (mut x, mut y) = (0.0, 100.0);
        v.forward(&mut x, &mut y);
        assert_eq!((x, y), (0.0, 0.0));
        let (mut x, mut y) = (50.0, 25.0);
        v.forward(&mut x, &mut y);
        assert_eq!((x, y), (100.0, 75.0));
    }

    #[test]
    fn test_backward_inverts_forward() {
        let extent = RectD::new(-10.0, -20.0, 30.0, 40.0);
        let v = ViewTransform::with_offset(256, 256, extent, 8.0, -4.0);
        let (mut x, mut y) = (12.5, -3.0);
        v.forward(&mut x, &mut y);
        v.backward(&mut x, &mut y);
        assert!((x - 12.5).abs() < 1e-12 && (y + 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_boxes() {
        let v = view();
        let b = v.forward_box(&RectD::new(0.0, 0.0, 50.0, 50.0));
        assert_eq!(b, RectD::new(0.0, 50.0, 100.0, 100.0));
        assert_eq!(v.backward_box(&b), RectD::new(0.0, 0.0, 50.0, 50.0));
    }

    #[test]
    fn test_to_affine_matches_forward() {
        let v = ViewTransform::with_offset(300, 200, RectD::new(5.0, 5.0, 65.0, 45.0), 3.0, 7.0);
        let m = v.to_affine();
        let (mut ax, mut ay) = (20.0, 30.0);
        m.transform(&mut ax, &mut ay);
        let (mut fx, mut fy) = (20.0, 30.0);
        v.forward(&mut fx, &mut fy);
        assert!((ax - fx).abs() < 1e-9 && (ay - fy).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_extent_unit_scale() {
        let v = ViewTransform::new(100, 100, RectD::new(5.0, 5.0, 5.0, 5.0));
        assert_eq!(v.scale(), 1.0);
    }
}
