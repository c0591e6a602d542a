//! Liang-Barsky segment clipping.
//!
//! Parametric clipping of one segment against an axis-aligned box, plus the
//! Cohen-Sutherland outcode used for quick inside/outside tests.

use crate::basics::RectD;

pub const CLIPPING_FLAGS_X1_CLIPPED: u32 = 4;
pub const CLIPPING_FLAGS_X2_CLIPPED: u32 = 1;
pub const CLIPPING_FLAGS_Y1_CLIPPED: u32 = 8;
pub const CLIPPING_FLAGS_Y2_CLIPPED: u32 = 2;

/// Cohen-Sutherland outcode for (x, y); zero means inside or on the border.
///
/// ```text
///  0110 | 0010 | 0011
///  -----+------+----- y2
///  0100 | 0000 | 0001
///  -----+------+----- y1
///  1100 | 1000 | 1001
///      x1     x2
/// ```
#[inline]
pub fn clipping_flags(x: f64, y: f64, clip_box: &RectD) -> u32 {
    (x > clip_box.x2) as u32
        | (((y > clip_box.y2) as u32) << 1)
        | (((x < clip_box.x1) as u32) << 2)
        | (((y < clip_box.y1) as u32) << 3)
}

/// Visible part of a clipped segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClippedSegment {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    /// The start point was moved onto the box border.
    pub start_moved: bool,
    /// The end point was moved onto the box border.
    pub end_moved: bool,
}

/// Clip (x1,y1)→(x2,y2) to `clip_box`. `None` when nothing is visible.
/// A degenerate segment is visible iff its point is inside.
pub fn clip_segment(
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    clip_box: &RectD,
) -> Option<ClippedSegment> {
    let dx = x2 - x1;
    let dy = y2 - y1;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;

    let edges = [
        (-dx, x1 - clip_box.x1),
        (dx, clip_box.x2 - x1),
        (-dy, y1 - clip_box.y1),
        (dy, clip_box.y2 - y1),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    let start_moved = t0 > 0.0;
    let end_moved = t1 < 1.0;
    Some(ClippedSegment {
        x1: if start_moved { x1 + t0 * dx } else { x1 },
        y1: if start_moved { y1 + t0 * dy } else { y1 },
        x2: if end_moved { x1 + t1 * dx } else { x2 },
        y2: if end_moved { y1 + t1 * dy } else { y2 },
        start_moved,
        end_moved,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn clip_box() -> RectD {
        RectD::new(10.0, 10.0, 100.0, 100.0)
    }

    #[test]
    fn test_clipping_flags() {
        let cb = clip_box();
        assert_eq!(clipping_flags(50.0, 50.0, &cb), 0);
        assert_eq!(clipping_flags(110.0, 50.0, &cb), CLIPPING_FLAGS_X2_CLIPPED);
        assert_eq!(clipping_flags(5.0, 50.0, &cb), CLIPPING_FLAGS_X1_CLIPPED);
        assert_eq!(clipping_flags(50.0, 110.0, &cb), CLIPPING_FLAGS_Y2_CLIPPED);
        assert_eq!(
            clipping_flags(5.0, 5.0, &cb),
            CLIPPING_FLAGS_X1_CLIPPED | CLIPPING_FLAGS_Y1_CLIPPED
        );
    }

    #[test]
    fn test_fully_inside() {
        let s = clip_segment(20.0, 20.0, 80.0, 80.0, &clip_box()).unwrap();
        assert!(!s.start_moved && !s.end_moved);
        assert_eq!((s.x2, s.y2), (80.0, 80.0));
    }

    #[test]
    fn test_fully_outside() {
        assert!(clip_segment(20.0, 110.0, 80.0, 110.0, &clip_box()).is_none());
        assert!(clip_segment(0.0, 0.0, 5.0, 5.0, &clip_box()).is_none());
    }

    #[test]
    fn test_crossing() {
        let s = clip_segment(0.0, 50.0, 120.0, 50.0, &clip_box()).unwrap();
        assert!(s.start_moved && s.end_moved);
        assert!((s.x1 - 10.0).abs() < 1e-9 && (s.x2 - 100.0).abs() < 1e-9);
        assert!((s.y1 - 50.0).abs() < 1e-9 && (s.y2 - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_corner_miss() {
        // passes outside the top-left corner
        assert!(clip_segment(0.0, 95.0, 15.0, 120.0, &clip_box()).is_none());
    }

    #[test]
    fn test_degenerate_segment() {
        assert!(clip_segment(50.0, 50.0, 50.0, 50.0, &clip_box()).is_some());
        assert!(clip_segment(5.0, 50.0, 5.0, 50.0, &clip_box()).is_none());
    }
}
