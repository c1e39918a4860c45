//! Weighted polynomial least squares
//!
//! The Vandermonde matrix is built over an abscissa mapped to `[-1, 1]` and
//! each column is normalised before an SVD solve, which keeps degree-10 fits
//! over a few thousand channels well conditioned. Singular values below
//! `rows * EPSILON * max(sigma)` are discarded, so rank-deficient systems
//! (too few weighted points for the degree) return the minimum-norm solution.

use nalgebra::{DMatrix, DVector};

use super::StatsError;

/// A fitted polynomial, stored in the scaled abscissa `t = (x - shift) / scale`.
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialFit {
    /// Coefficients in ascending powers of `t`
    coefficients: Vec<f64>,
    shift: f64,
    scale: f64,
}

impl PolynomialFit {
    /// Fit a polynomial of `degree` to `(x, y)`, optionally weighting each row.
    ///
    /// Weights multiply both the Vandermonde row and the target value, so a
    /// zero weight removes the point from the objective.
    pub fn fit(
        x: &[f64],
        y: &[f64],
        degree: usize,
        weights: Option<&[f64]>,
    ) -> Result<Self, StatsError> {
        if x.len() != y.len() {
            return Err(StatsError::LengthMismatch { x: x.len(), y: y.len() });
        }
        if let Some(w) = weights {
            if w.len() != x.len() {
                return Err(StatsError::WeightLength {
                    weights: w.len(),
                    expected: x.len(),
                });
            }
        }

        let (shift, scale) = Self::domain(x);
        let rows = x.len();
        let cols = degree + 1;
        if rows == 0 {
            return Ok(Self {
                coefficients: vec![0.0; cols],
                shift,
                scale,
            });
        }
        let weight = |i: usize| weights.map_or(1.0, |w| w[i]);

        let mut lhs = DMatrix::<f64>::from_fn(rows, cols, |i, j| {
            let t = (x[i] - shift) / scale;
            t.powi(j as i32) * weight(i)
        });
        let rhs = DVector::<f64>::from_fn(rows, |i, _| y[i] * weight(i));

        // Column normalisation
        let mut col_scale = vec![1.0; cols];
        for (j, s) in col_scale.iter_mut().enumerate() {
            let norm = lhs.column(j).norm();
            if norm > 0.0 {
                *s = norm;
                lhs.column_mut(j).unscale_mut(norm);
            }
        }

        let svd = lhs.svd(true, true);
        let rcond = rows as f64 * f64::EPSILON * svd.singular_values.max();
        let solution = svd
            .solve(&rhs, rcond)
            .map_err(|e| StatsError::LeastSquares(e.to_string()))?;

        let coefficients = solution
            .iter()
            .zip(col_scale.iter())
            .map(|(c, s)| c / s)
            .collect();

        Ok(Self {
            coefficients,
            shift,
            scale,
        })
    }

    /// Evaluate the polynomial at `x`.
    pub fn eval(&self, x: f64) -> f64 {
        let t = (x - self.shift) / self.scale;
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * t + c)
    }

    /// Evaluate the polynomial at every abscissa.
    pub fn eval_all(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|&xi| self.eval(xi)).collect()
    }

    /// Polynomial degree.
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Map `[min(x), max(x)]` onto `[-1, 1]`.
    fn domain(x: &[f64]) -> (f64, f64) {
        let (lo, hi) = x
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if !lo.is_finite() || !hi.is_finite() || hi <= lo {
            let shift = if lo.is_finite() { lo } else { 0.0 };
            return (shift, 1.0);
        }
        ((hi + lo) / 2.0, (hi - lo) / 2.0)
    }
}
