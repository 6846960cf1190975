//! Clamped piecewise-linear curves.
//!
//! Every probability curve in the simulators is built from this type:
//! linear interpolation between anchors and **flat** extrapolation outside
//! them. Flat (not linear) extrapolation is what produces the plateau.

use crate::error::SimError;

/// Width below which a segment is treated as a single point.
const SEGMENT_EPS: f64 = 1e-12;

/// Piecewise-linear curve through `(x, y)` anchors with non-decreasing `x`.
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseLinear {
    knots: Vec<(f64, f64)>,
}

impl PiecewiseLinear {
    /// Build a curve from anchors.
    ///
    /// Fails if the list is empty, contains non-finite values, or the `x`
    /// values decrease anywhere.
    pub fn new(knots: Vec<(f64, f64)>) -> Result<Self, SimError> {
        if knots.is_empty() {
            return Err(SimError::invalid("piecewise-linear curve needs at least one anchor"));
        }
        if knots.iter().any(|(x, y)| !(x.is_finite() && y.is_finite())) {
            return Err(SimError::invalid("curve anchors must be finite"));
        }
        if knots.windows(2).any(|w| w[1].0 < w[0].0) {
            return Err(SimError::invalid(format!(
                "curve anchors must have non-decreasing x values, got {:?}",
                knots.iter().map(|k| k.0).collect::<Vec<_>>()
            )));
        }
        Ok(Self { knots })
    }

    /// Two-anchor curve, the only shape the simulators use.
    pub fn between(a: (f64, f64), b: (f64, f64)) -> Result<Self, SimError> {
        Self::new(vec![a, b])
    }

    /// Evaluate the curve at `x`, clamping outside the anchor range.
    pub fn eval(&self, x: f64) -> f64 {
        let first = self.knots[0];
        let last = self.knots[self.knots.len() - 1];

        if x <= first.0 {
            return first.1;
        }
        if x >= last.0 {
            return last.1;
        }

        for w in self.knots.windows(2) {
            let (x0, x1) = (w[0].0, w[1].0);
            if x >= x0 && x <= x1 {
                return linear_interp(w[0], w[1], x);
            }
        }

        last.1
    }
}

fn linear_interp(a: (f64, f64), b: (f64, f64), x: f64) -> f64 {
    let (x0, y0) = a;
    let (x1, y1) = b;
    if (x1 - x0).abs() < SEGMENT_EPS {
        return y0;
    }
    let u = (x - x0) / (x1 - x0);
    y0 + u * (y1 - y0)
}
