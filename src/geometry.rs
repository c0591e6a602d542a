//! Feature geometry model.
//!
//! A [`Geometry`] is a closed tagged union over the usual simple-feature
//! variants. Coordinates are generic over [`Coordinate`] so integer domain
//! data (tiles, fixed point sources) and doubles share one model.
//!
//! Traversals (envelope, centroid) use an explicit work-list instead of
//! recursion so deeply nested collections cannot exhaust the stack.

use crate::basics::{PointD, RectD};
use crate::math::{calc_distance, calc_polygon_area, calc_polygon_centroid};

// ============================================================================
// Coordinate
// ============================================================================

/// Numeric type usable as a geometry coordinate.
pub trait Coordinate: Copy + PartialEq + core::fmt::Debug {
    fn to_f64(self) -> f64;
}

impl Coordinate for f64 {
    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
}

impl Coordinate for i64 {
    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
}

// ============================================================================
// Geometry types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point<T: Coordinate = f64> {
    pub x: T,
    pub y: T,
}

impl<T: Coordinate> Point<T> {
    pub fn new(x: T, y: T) -> Self {
        Self { x, y }
    }

    pub fn to_point_d(self) -> PointD {
        PointD::new(self.x.to_f64(), self.y.to_f64())
    }
}

pub type LineString<T = f64> = Vec<Point<T>>;
pub type LinearRing<T = f64> = Vec<Point<T>>;

/// Polygon as a ring list: the first ring is the exterior, the rest are
/// holes. Hole containment is not checked at construction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon<T: Coordinate = f64> {
    pub rings: Vec<LinearRing<T>>,
}

impl<T: Coordinate> Polygon<T> {
    pub fn new(exterior: LinearRing<T>) -> Self {
        Self {
            rings: vec![exterior],
        }
    }

    pub fn with_holes(exterior: LinearRing<T>, holes: Vec<LinearRing<T>>) -> Self {
        let mut rings = Vec::with_capacity(holes.len() + 1);
        rings.push(exterior);
        rings.extend(holes);
        Self { rings }
    }

    pub fn exterior(&self) -> Option<&LinearRing<T>> {
        self.rings.first()
    }

    pub fn holes(&self) -> &[LinearRing<T>] {
        if self.rings.is_empty() {
            &[]
        } else {
            &self.rings[1..]
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryType {
    Empty,
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Geometry<T: Coordinate = f64> {
    #[default]
    Empty,
    Point(Point<T>),
    LineString(LineString<T>),
    Polygon(Polygon<T>),
    MultiPoint(Vec<Point<T>>),
    MultiLineString(Vec<LineString<T>>),
    MultiPolygon(Vec<Polygon<T>>),
    GeometryCollection(Vec<Geometry<T>>),
}

impl<T: Coordinate> Geometry<T> {
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Empty => GeometryType::Empty,
            Geometry::Point(_) => GeometryType::Point,
            Geometry::LineString(_) => GeometryType::LineString,
            Geometry::Polygon(_) => GeometryType::Polygon,
            Geometry::MultiPoint(_) => GeometryType::MultiPoint,
            Geometry::MultiLineString(_) => GeometryType::MultiLineString,
            Geometry::MultiPolygon(_) => GeometryType::MultiPolygon,
            Geometry::GeometryCollection(_) => GeometryType::GeometryCollection,
        }
    }

    /// Calls `f` for every non-collection geometry, in document order.
    pub fn for_each_leaf<'a, F: FnMut(&'a Geometry<T>)>(&'a self, mut f: F) {
        let mut stack = vec![self];
        while let Some(g) = stack.pop() {
            match g {
                Geometry::GeometryCollection(children) => {
                    stack.extend(children.iter().rev());
                }
                leaf => f(leaf),
            }
        }
    }

    /// Bounding box of all coordinates; invalid for empty geometries.
    pub fn envelope(&self) -> RectD {
        let mut env = RectD::invalid();
        let mut add = |pts: &[Point<T>]| {
            for p in pts {
                env.expand_to_include(p.x.to_f64(), p.y.to_f64());
            }
        };
        self.for_each_leaf(|g| match g {
            Geometry::Empty | Geometry::GeometryCollection(_) => {}
            Geometry::Point(p) => add(core::slice::from_ref(p)),
            Geometry::LineString(l) => add(l),
            Geometry::Polygon(poly) => {
                if let Some(ext) = poly.exterior() {
                    add(ext);
                }
            }
            Geometry::MultiPoint(pts) => add(pts),
            Geometry::MultiLineString(lines) => lines.iter().for_each(|l| add(l)),
            Geometry::MultiPolygon(polys) => polys
                .iter()
                .filter_map(|p| p.exterior())
                .for_each(|r| add(r)),
        });
        env
    }

    pub fn is_empty(&self) -> bool {
        !self.envelope().is_valid()
    }

    /// Representative center: the centroid of the dominant part
    /// (largest polygon, longest line, or mean of the points).
    pub fn centroid(&self) -> Option<PointD> {
        let mut result = None;
        self.for_each_leaf(|g| {
            if result.is_none() {
                result = leaf_centroid(g);
            }
        });
        result
    }

    /// A point guaranteed to lie inside polygonal geometries (centroid for
    /// everything else).
    pub fn interior(&self) -> Option<PointD> {
        let mut result = None;
        self.for_each_leaf(|g| {
            if result.is_some() {
                return;
            }
            result = match g {
                Geometry::Polygon(poly) => polygon_interior(poly),
                Geometry::MultiPolygon(polys) => largest_polygon(polys).and_then(polygon_interior),
                other => leaf_centroid(other),
            };
        });
        result
    }

    /// One centroid per part: multi-geometries are split and collections
    /// walked, in part order. Empty parts are skipped.
    pub fn part_centroids(&self) -> Vec<PointD> {
        let mut out = Vec::new();
        self.for_each_leaf(|g| match g {
            Geometry::MultiPoint(pts) => out.extend(pts.iter().map(|p| p.to_point_d())),
            Geometry::MultiLineString(lines) => {
                out.extend(lines.iter().filter_map(|l| line_centroid(l)))
            }
            Geometry::MultiPolygon(polys) => out.extend(
                polys
                    .iter()
                    .filter_map(|p| calc_polygon_centroid(&to_points(p.exterior()?))),
            ),
            leaf => out.extend(leaf_centroid(leaf)),
        });
        out
    }

    /// Like [`part_centroids`](Self::part_centroids), with polygon parts
    /// using their interior point.
    pub fn part_interiors(&self) -> Vec<PointD> {
        let mut out = Vec::new();
        self.for_each_leaf(|g| match g {
            Geometry::Polygon(poly) => out.extend(polygon_interior(poly)),
            Geometry::MultiPolygon(polys) => out.extend(polys.iter().filter_map(polygon_interior)),
            other => out.extend(Geometry::part_centroids(other)),
        });
        out
    }
}

// ============================================================================
// Centroid / interior helpers
// ============================================================================

fn to_points<T: Coordinate>(pts: &[Point<T>]) -> Vec<PointD> {
    pts.iter().map(|p| p.to_point_d()).collect()
}

fn line_length<T: Coordinate>(line: &[Point<T>]) -> f64 {
    line.windows(2)
        .map(|w| {
            calc_distance(
                w[0].x.to_f64(),
                w[0].y.to_f64(),
                w[1].x.to_f64(),
                w[1].y.to_f64(),
            )
        })
        .sum()
}

fn line_centroid<T: Coordinate>(line: &[Point<T>]) -> Option<PointD> {
    let first = line.first()?.to_point_d();
    let mut total = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for w in line.windows(2) {
        let (a, b) = (w[0].to_point_d(), w[1].to_point_d());
        let len = calc_distance(a.x, a.y, b.x, b.y);
        total += len;
        cx += (a.x + b.x) * 0.5 * len;
        cy += (a.y + b.y) * 0.5 * len;
    }
    if total <= 0.0 {
        return Some(first);
    }
    Some(PointD::new(cx / total, cy / total))
}

fn ring_area<T: Coordinate>(ring: &[Point<T>]) -> f64 {
    calc_polygon_area(&to_points(ring)).abs()
}

fn largest_polygon<T: Coordinate>(polys: &[Polygon<T>]) -> Option<&Polygon<T>> {
    polys
        .iter()
        .filter(|p| p.exterior().is_some())
        .fold(None, |best: Option<(&Polygon<T>, f64)>, p| {
            let area = p.exterior().map(|r| ring_area(r)).unwrap_or(0.0);
            match best {
                Some((_, a)) if a >= area => best,
                _ => Some((p, area)),
            }
        })
        .map(|(p, _)| p)
}

fn leaf_centroid<T: Coordinate>(g: &Geometry<T>) -> Option<PointD> {
    match g {
        Geometry::Empty | Geometry::GeometryCollection(_) => None,
        Geometry::Point(p) => Some(p.to_point_d()),
        Geometry::MultiPoint(pts) => {
            if pts.is_empty() {
                return None;
            }
            let n = pts.len() as f64;
            let (sx, sy) = pts
                .iter()
                .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x.to_f64(), sy + p.y.to_f64()));
            Some(PointD::new(sx / n, sy / n))
        }
        Geometry::LineString(l) => line_centroid(l),
        Geometry::MultiLineString(lines) => {
            let longest = lines.iter().fold(None, |best: Option<(&LineString<T>, f64)>, l| {
                let len = line_length(l);
                match best {
                    Some((_, b)) if b >= len => best,
                    _ => Some((l, len)),
                }
            })?;
            line_centroid(longest.0)
        }
        Geometry::Polygon(poly) => calc_polygon_centroid(&to_points(poly.exterior()?)),
        Geometry::MultiPolygon(polys) => {
            calc_polygon_centroid(&to_points(largest_polygon(polys)?.exterior()?))
        }
    }
}

/// Scan a horizontal line through the centroid and return the middle of the
/// widest span that lies inside the polygon (holes respected).
fn polygon_interior<T: Coordinate>(poly: &Polygon<T>) -> Option<PointD> {
    let exterior = to_points(poly.exterior()?);
    let centroid = calc_polygon_centroid(&exterior)?;
    let y = centroid.y;
    let mut xs: Vec<f64> = Vec::new();
    for ring in &poly.rings {
        let pts = to_points(ring);
        let n = pts.len();
        if n < 2 {
            continue;
        }
        for i in 0..n {
            let a = pts[i];
            let b = pts[(i + 1) % n];
            if (a.y > y) != (b.y > y) {
                xs.push(a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y));
            }
        }
    }
    xs.sort_by(|a, b| a.total_cmp(b));
    let mut best: Option<(f64, f64)> = None;
    for pair in xs.chunks_exact(2) {
        let width = pair[1] - pair[0];
        if best.map_or(true, |(w, _)| width > w) {
            best = Some((width, (pair[0] + pair[1]) * 0.5));
        }
    }
    match best {
        Some((_, x)) => Some(PointD::new(x, y)),
        None => Some(centroid),
    }
}

// ============================================================================
// Tests
// ============================================================================
