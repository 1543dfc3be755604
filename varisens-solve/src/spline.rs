use crate::SolveError;

/// Natural cubic spline through a strictly increasing set of knots.
///
/// Used to re-grid simulated trajectories onto experimental timestamps.
/// Second derivatives at the end knots are zero; evaluation outside the
/// knot range extrapolates linearly with the boundary slope. With exactly
/// two knots the spline degenerates to the connecting line.
#[derive(Debug, Clone, PartialEq)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivative of the spline at each knot.
    d2: Vec<f64>,
}

impl CubicSpline {
    /// Fits a spline to `(x, y)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::SplineKnots`] if fewer than two knots are
    /// given, the lengths disagree, or `x` is not strictly increasing.
    pub fn fit(x: &[f64], y: &[f64]) -> Result<Self, SolveError> {
        let n = x.len();
        if n < 2 || y.len() != n || x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SolveError::SplineKnots { got: n.min(y.len()) });
        }

        let mut d2 = vec![0.0; n];
        if n > 2 {
            // Thomas algorithm over the n-2 interior second derivatives;
            // natural boundary pins d2[0] and d2[n-1] at zero.
            let m = n - 2;
            let mut diag = vec![0.0; m];
            let mut rhs = vec![0.0; m];
            for i in 0..m {
                let h_lo = x[i + 1] - x[i];
                let h_hi = x[i + 2] - x[i + 1];
                diag[i] = 2.0 * (h_lo + h_hi);
                rhs[i] = 6.0 * ((y[i + 2] - y[i + 1]) / h_hi - (y[i + 1] - y[i]) / h_lo);
            }
            // Forward sweep: eliminate the sub-diagonal h terms.
            for i in 1..m {
                let h = x[i + 1] - x[i];
                let w = h / diag[i - 1];
                diag[i] -= w * h;
                rhs[i] -= w * rhs[i - 1];
            }
            d2[m] = rhs[m - 1] / diag[m - 1];
            for i in (1..m).rev() {
                let h = x[i + 1] - x[i];
                d2[i] = (rhs[i - 1] - h * d2[i + 1]) / diag[i - 1];
            }
        }

        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            d2,
        })
    }

    /// Evaluates the spline at `t`.
    pub fn eval(&self, t: f64) -> f64 {
        let n = self.x.len();
        if t <= self.x[0] {
            return self.y[0] + self.slope_at(0) * (t - self.x[0]);
        }
        if t >= self.x[n - 1] {
            return self.y[n - 1] + self.slope_at(n - 1) * (t - self.x[n - 1]);
        }

        let i = self.x.partition_point(|&knot| knot <= t) - 1;
        let h = self.x[i + 1] - self.x[i];
        let lo = self.x[i + 1] - t;
        let hi = t - self.x[i];

        self.d2[i] * lo * lo * lo / (6.0 * h)
            + self.d2[i + 1] * hi * hi * hi / (6.0 * h)
            + (self.y[i] / h - self.d2[i] * h / 6.0) * lo
            + (self.y[i + 1] / h - self.d2[i + 1] * h / 6.0) * hi
    }

    /// Evaluates the spline at every point of `ts`.
    pub fn eval_many(&self, ts: &[f64]) -> Vec<f64> {
        ts.iter().map(|&t| self.eval(t)).collect()
    }

    /// First derivative at knot `i`, used as the extrapolation slope.
    fn slope_at(&self, i: usize) -> f64 {
        let n = self.x.len();
        if i + 1 < n {
            let h = self.x[i + 1] - self.x[i];
            (self.y[i + 1] - self.y[i]) / h - h * (2.0 * self.d2[i] + self.d2[i + 1]) / 6.0
        } else {
            let h = self.x[i] - self.x[i - 1];
            (self.y[i] - self.y[i - 1]) / h + h * (self.d2[i - 1] + 2.0 * self.d2[i]) / 6.0
        }
    }
}
