//! Positional perturbations around an ideal label position.
//!
//! Yields `0`, then `+d1, -d1, +d2, -d2, ...` with
//! `dk = 1.3^k * k / (4 * tolerance) + k`, stopping once `dk` exceeds the
//! tolerance. The growth constants and the attempt cap are empirical.

use tracing::warn;

/// Hard limit on generated offsets.
pub const MAX_TRIES: u32 = 255;

#[derive(Debug, Clone)]
pub struct ToleranceIterator {
    tolerance: f64,
    value: f64,
    tries: u32,
    done: bool,
}

impl ToleranceIterator {
    /// `label_position_tolerance` of 0 falls back to half the spacing.
    pub fn new(label_position_tolerance: f64, spacing: f64) -> Self {
        let tolerance = if label_position_tolerance > 0.0 {
            label_position_tolerance
        } else {
            spacing / 2.0
        };
        Self {
            tolerance,
            value: 0.0,
            tries: 0,
            done: false,
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Number of offsets generated so far.
    pub fn tries(&self) -> u32 {
        self.tries
    }

    fn step(&self, k: f64) -> f64 {
        1.3f64.powf(k) * k / (4.0 * self.tolerance) + k
    }

    fn advance(&mut self) -> Option<f64> {
        if self.done {
            return None;
        }
        self.tries += 1;
        if self.tries > MAX_TRIES {
            warn!(
                tolerance = self.tolerance,
                "too many placement attempts, check label-position-tolerance and spacing"
            );
            self.done = true;
            return None;
        }
        if self.tries == 1 {
            self.value = 0.0;
            return Some(0.0);
        }
        // tries 2,3 -> k=1; 4,5 -> k=2; ...
        let k = (self.tries / 2) as f64;
        let magnitude = self.step(k);
        if magnitude > self.tolerance {
            self.done = true;
            return None;
        }
        self.value = if self.tries % 2 == 0 { magnitude } else { -magnitude };
        Some(self.value)
    }

    /// Offset from the ideal position for the current attempt.
    pub fn current(&self) -> f64 {
        self.value
    }
}

impl Iterator for ToleranceIterator {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        self.advance()
    }
}

// ============================================================================
// Tests
// ============================================================================
