//! Ellipse outline generator for round marker shapes.

use crate::basics::{
    uround, VertexSource, PATH_CMD_CLOSE, PATH_CMD_LINE_TO, PATH_CMD_MOVE_TO, PATH_CMD_STOP, PI,
};

/// Regular polygon approximating an ellipse, emitted as one closed ring.
///
/// Vertices run counter-clockwise in a y-up frame starting at angle 0,
/// which is clockwise on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
    x: f64,
    y: f64,
    rx: f64,
    ry: f64,
    num: u32,
    step: u32,
}

impl Ellipse {
    /// `num_steps` 0 picks a step count that keeps the chord error below
    /// an eighth of a pixel.
    pub fn new(x: f64, y: f64, rx: f64, ry: f64, num_steps: u32) -> Self {
        let num = if num_steps == 0 {
            Self::auto_steps(rx, ry)
        } else {
            num_steps
        };
        Self {
            x,
            y,
            rx,
            ry,
            num: num.max(3),
            step: 0,
        }
    }

    fn auto_steps(rx: f64, ry: f64) -> u32 {
        let ra = (rx.abs() + ry.abs()) / 2.0;
        if ra <= 0.0 {
            return 3;
        }
        let da = (ra / (ra + 0.125)).acos() * 2.0;
        uround(2.0 * PI / da)
    }

    pub fn num_steps(&self) -> u32 {
        self.num
    }
}

impl VertexSource for Ellipse {
    fn rewind(&mut self, _path_id: u32) {
        self.step = 0;
    }

    fn vertex(&mut self, x: &mut f64, y: &mut f64) -> u32 {
        if self.step == self.num {
            self.step += 1;
            return PATH_CMD_CLOSE;
        }
        if self.step > self.num {
            return PATH_CMD_STOP;
        }
        let angle = self.step as f64 / self.num as f64 * 2.0 * PI;
        *x = self.x + angle.cos() * self.rx;
        *y = self.y + angle.sin() * self.ry;
        self.step += 1;
        if self.step == 1 {
            PATH_CMD_MOVE_TO
        } else {
            PATH_CMD_LINE_TO
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

    #[test]
    fn test_ring_commands() {
        let mut e = Ellipse::new(0.0, 0.0, 10.0, 10.0, 8);
        let v = collect_vertices(&mut e);
        assert_eq!(v.len(), 9);
        assert_eq!(v[0].cmd, PATH_CMD_MOVE_TO);
        assert!(v[1..8].iter().all(|v| v.cmd == PATH_CMD_LINE_TO));
        assert_eq!(v[8].cmd, PATH_CMD_CLOSE);
    }

    #[test]
    fn test_vertices_on_axes() {
        let mut e = Ellipse::new(5.0, 3.0, 20.0, 10.0, 4);
        let v = collect_vertices(&mut e);
        let expected = [(25.0, 3.0), (5.0, 13.0), (-15.0, 3.0), (5.0, -7.0)];
        for (got, (x, y)) in v.iter().zip(expected) {
            assert!((got.x - x).abs() < 1e-9 && (got.y - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_auto_steps_grow_with_radius() {
        let small = Ellipse::new(0.0, 0.0, 2.0, 2.0, 0).num_steps();
        let large = Ellipse::new(0.0, 0.0, 100.0, 100.0, 0).num_steps();
        assert!(small >= 3);
        assert!(large > 20 && large > small);
    }
}
