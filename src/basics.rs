//! Foundation types, constants, and path command utilities.
//!
//! Everything else in the crate speaks in terms of these: the `u32` path
//! command stream produced by every [`VertexSource`], the [`Rect`] envelope
//! used for clipping and collision tests, and plain [`PointBase`] positions.

// ============================================================================
// Rounding
// ============================================================================

/// Round a double to the nearest unsigned integer (round half up).
#[inline]
pub fn uround(v: f64) -> u32 {
    (v + 0.5) as u32
}

// ============================================================================
// Angles
// ============================================================================

pub const PI: f64 = std::f64::consts::PI;

/// Convert degrees to radians.
#[inline]
pub fn deg2rad(deg: f64) -> f64 {
    deg * PI / 180.0
}

/// Convert radians to degrees.
#[inline]
pub fn rad2deg(rad: f64) -> f64 {
    rad * 180.0 / PI
}

/// Normalize an angle into `(-PI, PI]`.
#[inline]
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a <= -PI {
        a += 2.0 * PI;
    }
    a
}

// ============================================================================
// Rect
// ============================================================================

/// A rectangle defined by two corner points.
///
/// `x1`/`y1` is the minimum corner and `x2`/`y2` the maximum corner once the
/// rectangle is valid. An "invalid" rectangle (`x1 > x2` or `y1 > y2`) is the
/// empty envelope that nothing has been merged into yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect<T: Copy> {
    pub x1: T,
    pub y1: T,
    pub x2: T,
    pub y2: T,
}

impl<T: Copy + PartialOrd> Rect<T> {
    pub fn new(x1: T, y1: T, x2: T, y2: T) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Normalize so that x1 <= x2 and y1 <= y2, swapping if needed.
    pub fn normalize(&mut self) -> &Self {
        if self.x1 > self.x2 {
            core::mem::swap(&mut self.x1, &mut self.x2);
        }
        if self.y1 > self.y2 {
            core::mem::swap(&mut self.y1, &mut self.y2);
        }
        self
    }

    /// Returns `true` if the rectangle is valid (non-empty).
    pub fn is_valid(&self) -> bool {
        self.x1 <= self.x2 && self.y1 <= self.y2
    }

    /// Returns `true` if the point (x, y) is inside the rectangle.
    pub fn hit_test(&self, x: T, y: T) -> bool {
        x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }

    /// Returns `true` if this rectangle overlaps with `r` (touching counts).
    pub fn overlaps(&self, r: &Self) -> bool {
        !(r.x1 > self.x2 || r.x2 < self.x1 || r.y1 > self.y2 || r.y2 < self.y1)
    }

    /// Returns `true` if `r` lies completely inside this rectangle.
    pub fn contains_rect(&self, r: &Self) -> bool {
        r.x1 >= self.x1 && r.x2 <= self.x2 && r.y1 >= self.y1 && r.y2 <= self.y2
    }
}

/// Compute the intersection of two rectangles.
pub fn intersect_rectangles<T: Copy + PartialOrd>(r1: &Rect<T>, r2: &Rect<T>) -> Rect<T> {
    let mut r = *r1;
    if r.x2 > r2.x2 {
        r.x2 = r2.x2;
    }
    if r.y2 > r2.y2 {
        r.y2 = r2.y2;
    }
    if r.x1 < r2.x1 {
        r.x1 = r2.x1;
    }
    if r.y1 < r2.y1 {
        r.y1 = r2.y1;
    }
    r
}

/// Rectangle with `f64` coordinates; the envelope type used throughout.
pub type RectD = Rect<f64>;

impl RectD {
    /// The empty envelope: nothing merged in yet, `is_valid()` is false.
    pub fn invalid() -> Self {
        Self {
            x1: f64::MAX,
            y1: f64::MAX,
            x2: -f64::MAX,
            y2: -f64::MAX,
        }
    }

    /// A rectangle of `width` x `height` centered on `(cx, cy)`.
    pub fn from_center(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        let hw = width * 0.5;
        let hh = height * 0.5;
        Self::new(cx - hw, cy - hh, cx + hw, cy + hh)
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn center(&self) -> PointD {
        PointD::new((self.x1 + self.x2) * 0.5, (self.y1 + self.y2) * 0.5)
    }

    /// Grow the envelope so it includes the point.
    pub fn expand_to_include(&mut self, x: f64, y: f64) {
        if x < self.x1 {
            self.x1 = x;
        }
        if x > self.x2 {
            self.x2 = x;
        }
        if y < self.y1 {
            self.y1 = y;
        }
        if y > self.y2 {
            self.y2 = y;
        }
    }

    /// Grow the envelope so it includes `r`. Invalid rectangles are ignored.
    pub fn expand_to_include_rect(&mut self, r: &RectD) {
        if !r.is_valid() {
            return;
        }
        self.expand_to_include(r.x1, r.y1);
        self.expand_to_include(r.x2, r.y2);
    }

    /// Same as [`Rect::overlaps`], named for envelope semantics.
    pub fn intersects(&self, r: &RectD) -> bool {
        self.is_valid() && r.is_valid() && self.overlaps(r)
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.hit_test(x, y)
    }

    /// The overlapping area of both rectangles, or `None` when disjoint.
    pub fn intersection(&self, r: &RectD) -> Option<RectD> {
        let i = intersect_rectangles(self, r);
        if i.is_valid() {
            Some(i)
        } else {
            None
        }
    }

    /// Move the rectangle so its center lands on `(cx, cy)`.
    pub fn re_center(&mut self, cx: f64, cy: f64) {
        let c = self.center();
        self.x1 += cx - c.x;
        self.x2 += cx - c.x;
        self.y1 += cy - c.y;
        self.y2 += cy - c.y;
    }

    /// A copy grown by `d` on every side (shrunk for negative `d`).
    pub fn padded(&self, d: f64) -> RectD {
        RectD::new(self.x1 - d, self.y1 - d, self.x2 + d, self.y2 + d)
    }

    pub fn translated(&self, dx: f64, dy: f64) -> RectD {
        RectD::new(self.x1 + dx, self.y1 + dy, self.x2 + dx, self.y2 + dy)
    }
}

/// Axis-aligned bounds of a `width` x `height` rectangle centered on
/// `center` and rotated by `angle` radians around it.
pub fn rotated_box(width: f64, height: f64, center: PointD, angle: f64) -> RectD {
    let (sin, cos) = angle.sin_cos();
    let hw = (width * cos).abs() * 0.5 + (height * sin).abs() * 0.5;
    let hh = (width * sin).abs() * 0.5 + (height * cos).abs() * 0.5;
    RectD::new(center.x - hw, center.y - hh, center.x + hw, center.y + hh)
}

// ============================================================================
// Path commands
// ============================================================================

pub const PATH_CMD_STOP: u32 = 0;
pub const PATH_CMD_MOVE_TO: u32 = 1;
pub const PATH_CMD_LINE_TO: u32 = 2;
pub const PATH_CMD_END_POLY: u32 = 0x0F;
pub const PATH_CMD_MASK: u32 = 0x0F;

pub const PATH_FLAGS_NONE: u32 = 0;
pub const PATH_FLAGS_CCW: u32 = 0x10;
pub const PATH_FLAGS_CW: u32 = 0x20;
pub const PATH_FLAGS_CLOSE: u32 = 0x40;

/// The command emitted when a ring is closed.
pub const PATH_CMD_CLOSE: u32 = PATH_CMD_END_POLY | PATH_FLAGS_CLOSE;

/// Returns `true` if `c` is a vertex command (move_to or line_to).
#[inline]
pub fn is_vertex(c: u32) -> bool {
    (PATH_CMD_MOVE_TO..PATH_CMD_END_POLY).contains(&c)
}

/// Returns `true` if `c` is the stop command.
#[inline]
pub fn is_stop(c: u32) -> bool {
    c == PATH_CMD_STOP
}

/// Returns `true` if `c` is a move_to command.
#[inline]
pub fn is_move_to(c: u32) -> bool {
    c == PATH_CMD_MOVE_TO
}

/// Returns `true` if `c` is a line_to command.
#[inline]
pub fn is_line_to(c: u32) -> bool {
    c == PATH_CMD_LINE_TO
}

/// Returns `true` if `c` is an end_poly command (with any flags).
#[inline]
pub fn is_end_poly(c: u32) -> bool {
    (c & PATH_CMD_MASK) == PATH_CMD_END_POLY
}

/// Returns `true` if `c` is a close polygon command.
#[inline]
pub fn is_close(c: u32) -> bool {
    (c & !(PATH_FLAGS_CW | PATH_FLAGS_CCW)) == PATH_CMD_CLOSE
}

// ============================================================================
// Point
// ============================================================================

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointBase<T: Copy> {
    pub x: T,
    pub y: T,
}

impl<T: Copy> PointBase<T> {
    pub fn new(x: T, y: T) -> Self {
        Self { x, y }
    }
}

pub type PointD = PointBase<f64>;

impl PointD {
    /// Rotate around the origin by `angle` radians.
    pub fn rotated(self, angle: f64) -> PointD {
        let (sin, cos) = angle.sin_cos();
        PointD::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }
}

impl core::ops::Add for PointD {
    type Output = PointD;
    fn add(self, o: PointD) -> PointD {
        PointD::new(self.x + o.x, self.y + o.y)
    }
}

impl core::ops::Sub for PointD {
    type Output = PointD;
    fn sub(self, o: PointD) -> PointD {
        PointD::new(self.x - o.x, self.y - o.y)
    }
}

// ============================================================================
// Vertex
// ============================================================================

/// A vertex with coordinates and a path command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexD {
    pub x: f64,
    pub y: f64,
    pub cmd: u32,
}

impl VertexD {
    pub fn new(x: f64, y: f64, cmd: u32) -> Self {
        Self { x, y, cmd }
    }
}

// ============================================================================
// VertexSource trait
// ============================================================================

/// The streaming vertex interface. Geometries, clippers, projections and
/// view transforms all implement it so they can be chained without
/// materializing intermediate vertex lists.
pub trait VertexSource {
    /// Reset the vertex source to the beginning of the given path.
    fn rewind(&mut self, path_id: u32);

    /// Return the next vertex. Writes coordinates to `x` and `y`, returns a
    /// path command. Returns `PATH_CMD_STOP` when iteration is complete.
    fn vertex(&mut self, x: &mut f64, y: &mut f64) -> u32;
}

/// Blanket implementation so `&mut T` can be used as a VertexSource.
impl<T: VertexSource + ?Sized> VertexSource for &mut T {
    fn rewind(&mut self, path_id: u32) {
        (**self).rewind(path_id);
    }

    fn vertex(&mut self, x: &mut f64, y: &mut f64) -> u32 {
        (**self).vertex(x, y)
    }
}

impl<T: VertexSource + ?Sized> VertexSource for Box<T> {
    fn rewind(&mut self, path_id: u32) {
        (**self).rewind(path_id);
    }

    fn vertex(&mut self, x: &mut f64, y: &mut f64) -> u32 {
        (**self).vertex(x, y)
    }
}

/// Drain a vertex source into a list of vertices, stop command excluded.
pub fn collect_vertices(vs: &mut dyn VertexSource) -> Vec<VertexD> {
    let mut out = Vec::new();
    let (mut x, mut y) = (0.0, 0.0);
    vs.rewind(0);
    loop {
        let cmd = vs.vertex(&mut x, &mut y);
        if is_stop(cmd) {
            break;
        }
        out.push(VertexD::new(x, y, cmd));
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
