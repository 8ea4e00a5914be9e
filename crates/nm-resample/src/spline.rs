use nm_core::Error;

/// Natural cubic spline through `(t[i], y[i])`: second derivative zero at
/// both ends, C2 inside.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    t: Vec<f64>,
    y: Vec<f64>,
    /// Second derivative at each knot.
    y2: Vec<f64>,
}

impl CubicSpline {
    /// Fits the spline. Knots must be strictly increasing and at least two.
    pub fn natural(t: &[f64], y: &[f64]) -> Result<Self, Error> {
        let n = t.len();
        if n != y.len() {
            return Err(Error::InvalidArgument(format!(
                "{n} knots for {} values",
                y.len()
            )));
        }
        if n < 2 {
            return Err(Error::InvalidArgument("spline needs at least two knots".into()));
        }
        if t.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::InvalidArgument(
                "spline knots must be strictly increasing".into(),
            ));
        }

        // Tridiagonal solve, forward sweep then back substitution.
        let mut y2 = vec![0.0; n];
        let mut u = vec![0.0; n];
        for i in 1..n - 1 {
            let sig = (t[i] - t[i - 1]) / (t[i + 1] - t[i - 1]);
            let p = sig * y2[i - 1] + 2.0;
            y2[i] = (sig - 1.0) / p;
            let slope_diff =
                (y[i + 1] - y[i]) / (t[i + 1] - t[i]) - (y[i] - y[i - 1]) / (t[i] - t[i - 1]);
            u[i] = (6.0 * slope_diff / (t[i + 1] - t[i - 1]) - sig * u[i - 1]) / p;
        }
        y2[n - 1] = 0.0;
        for k in (0..n - 1).rev() {
            y2[k] = y2[k] * y2[k + 1] + u[k];
        }

        Ok(Self {
            t: t.to_vec(),
            y: y.to_vec(),
            y2,
        })
    }

    /// Evaluates at `x`. Outside the knot range the end polynomials are
    /// extended.
    pub fn eval(&self, x: f64) -> f64 {
        let n = self.t.len();
        let hi = self.t.partition_point(|&k| k <= x).clamp(1, n - 1);
        let lo = hi - 1;

        let h = self.t[hi] - self.t[lo];
        let a = (self.t[hi] - x) / h;
        let b = (x - self.t[lo]) / h;
        a * self.y[lo]
            + b * self.y[hi]
            + ((a * a * a - a) * self.y2[lo] + (b * b * b - b) * self.y2[hi]) * (h * h) / 6.0
    }
}
