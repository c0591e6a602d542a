//! Geometry as a vertex source.
//!
//! Emits MOVETO/LINETO/CLOSE commands for a [`Geometry`]: each point is a
//! single MOVETO, each line string a MOVETO followed by LINETOs, each ring a
//! MOVETO, LINETOs and a CLOSE whose coordinates are reset to (0, 0).
//! Collections are walked with a work-list, never recursively.

use crate::basics::{
    VertexSource, PATH_CMD_CLOSE, PATH_CMD_LINE_TO, PATH_CMD_MOVE_TO, PATH_CMD_STOP,
};
use crate::geometry::{Coordinate, Geometry, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PartKind {
    Points,
    Line,
    Ring,
}

#[derive(Debug, Clone, Copy)]
struct Part<'a, T: Coordinate> {
    points: &'a [Point<T>],
    kind: PartKind,
}

/// Streams the vertices of a geometry. `rewind(0)` restarts from the top.
pub struct GeometryVertexAdapter<'a, T: Coordinate = f64> {
    geom: &'a Geometry<T>,
    stack: Vec<&'a Geometry<T>>,
    parts: Vec<Part<'a, T>>,
    part_idx: usize,
    vertex_idx: usize,
    close_pending: bool,
}

impl<'a, T: Coordinate> GeometryVertexAdapter<'a, T> {
    pub fn new(geom: &'a Geometry<T>) -> Self {
        let mut adapter = Self {
            geom,
            stack: Vec::new(),
            parts: Vec::new(),
            part_idx: 0,
            vertex_idx: 0,
            close_pending: false,
        };
        adapter.rewind(0);
        adapter
    }

    /// Replace the parts list with the parts of the next leaf geometry.
    /// Returns false once the work-list is exhausted.
    fn load_next_leaf(&mut self) -> bool {
        self.parts.clear();
        self.part_idx = 0;
        self.vertex_idx = 0;
        while let Some(g) = self.stack.pop() {
            match g {
                Geometry::Empty => {}
                Geometry::Point(p) => self.parts.push(Part {
                    points: core::slice::from_ref(p),
                    kind: PartKind::Points,
                }),
                Geometry::MultiPoint(pts) => self.parts.push(Part {
                    points: pts,
                    kind: PartKind::Points,
                }),
                Geometry::LineString(l) => self.parts.push(Part {
                    points: l,
                    kind: PartKind::Line,
                }),
                Geometry::MultiLineString(lines) => {
                    self.parts.extend(lines.iter().map(|l| Part {
                        points: l,
                        kind: PartKind::Line,
                    }));
                }
                Geometry::Polygon(poly) => {
                    self.parts.extend(poly.rings.iter().map(|r| Part {
                        points: ring_points(r),
                        kind: PartKind::Ring,
                    }));
                }
                Geometry::MultiPolygon(polys) => {
                    for poly in polys {
                        self.parts.extend(poly.rings.iter().map(|r| Part {
                            points: ring_points(r),
                            kind: PartKind::Ring,
                        }));
                    }
                }
                Geometry::GeometryCollection(children) => {
                    self.stack.extend(children.iter().rev());
                }
            }
            if !self.parts.is_empty() {
                return true;
            }
        }
        false
    }
}

/// Ring vertices without the repeated closing point.
fn ring_points<T: Coordinate>(ring: &[Point<T>]) -> &[Point<T>] {
    match (ring.first(), ring.last()) {
        (Some(a), Some(b)) if ring.len() > 1 && a == b => &ring[..ring.len() - 1],
        _ => ring,
    }
}

impl<'a, T: Coordinate> VertexSource for GeometryVertexAdapter<'a, T> {
    fn rewind(&mut self, _path_id: u32) {
        self.stack.clear();
        self.stack.push(self.geom);
        self.parts.clear();
        self.part_idx = 0;
        self.vertex_idx = 0;
        self.close_pending = false;
    }

    fn vertex(&mut self, x: &mut f64, y: &mut f64) -> u32 {
        loop {
            if self.close_pending {
                self.close_pending = false;
                *x = 0.0;
                *y = 0.0;
                return PATH_CMD_CLOSE;
            }
            if let Some(part) = self.parts.get(self.part_idx).copied() {
                if let Some(p) = part.points.get(self.vertex_idx) {
                    let first = self.vertex_idx == 0;
                    self.vertex_idx += 1;
                    *x = p.x.to_f64();
                    *y = p.y.to_f64();
                    if part.kind == PartKind::Ring && self.vertex_idx == part.points.len() {
                        self.close_pending = true;
                    }
                    return if first || part.kind == PartKind::Points {
                        PATH_CMD_MOVE_TO
                    } else {
                        PATH_CMD_LINE_TO
                    };
                }
                self.part_idx += 1;
                self.vertex_idx = 0;
                continue;
            }
            if !self.load_next_leaf() {
                return PATH_CMD_STOP;
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basics::collect_vertices;
    use crate::geometry::Polygon;

    #[test]
    fn test_point_is_single_move_to() {
        let g = Geometry::Point(Point::new(3.0, 4.0));
        let v = collect_vertices(&mut GeometryVertexAdapter::new(&g));
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].cmd, PATH_CMD_MOVE_TO);
        assert_eq!((v[0].x, v[0].y), (3.0, 4.0));
    }

    #[test]
    fn test_multipoint_each_move_to() {
        let g = Geometry::MultiPoint(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]);
        let v = collect_vertices(&mut GeometryVertexAdapter::new(&g));
        assert!(v.iter().all(|v| v.cmd == PATH_CMD_MOVE_TO));
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn test_line_commands() {
        let g = Geometry::LineString(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
        ]);
        let cmds: Vec<u32> = collect_vertices(&mut GeometryVertexAdapter::new(&g))
            .iter()
            .map(|v| v.cmd)
            .collect();
        assert_eq!(cmds, vec![PATH_CMD_MOVE_TO, PATH_CMD_LINE_TO, PATH_CMD_LINE_TO]);
    }

    #[test]
    fn test_polygon_ring_closes_at_origin() {
        let ring = vec![
            Point::new(1.0, 1.0),
            Point::new(5.0, 1.0),
            Point::new(5.0, 5.0),
            Point::new(1.0, 1.0),
        ];
        let g = Geometry::Polygon(Polygon::new(ring));
        let v = collect_vertices(&mut GeometryVertexAdapter::new(&g));
        assert_eq!(v.len(), 4);
        assert_eq!(v[0].cmd, PATH_CMD_MOVE_TO);
        assert_eq!(v[3].cmd, PATH_CMD_CLOSE);
        assert_eq!((v[3].x, v[3].y), (0.0, 0.0));
    }

    #[test]
    fn test_collection_order_and_rewind() {
        let g = Geometry::GeometryCollection(vec![
            Geometry::Point(Point::new(1.0, 0.0)),
            Geometry::Empty,
            Geometry::GeometryCollection(vec![Geometry::Point(Point::new(2.0, 0.0))]),
            Geometry::Point(Point::new(3.0, 0.0)),
        ]);
        let mut adapter = GeometryVertexAdapter::new(&g);
        let xs: Vec<f64> = collect_vertices(&mut adapter).iter().map(|v| v.x).collect();
        assert_eq!(xs, vec![1.0, 2.0, 3.0]);
        // collect_vertices rewinds, so a second pass yields the same stream
        let again: Vec<f64> = collect_vertices(&mut adapter).iter().map(|v| v.x).collect();
        assert_eq!(xs, again);
    }
}
