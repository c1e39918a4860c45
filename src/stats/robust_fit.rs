//! Robust polynomial baseline fitting
//!
//! Fits a smooth trend (e.g. the per-channel log-energy profile) while
//! ignoring outliers: after an ordinary least-squares fit, every point whose
//! absolute residual reaches `thresh * MAD` gets weight 0 and the polynomial is
//! refit. Iteration stops once no fitted value moves by more than the
//! convergence tolerance (relative), or at the iteration cap.

use tracing::{debug, warn};

use super::{median, min_positive, PolynomialFit, StatsError};
use crate::config::{self, defaults};

/// Result of a robust fit
#[derive(Debug, Clone)]
pub struct RobustFit {
    /// Fitted curve, one value per input sample
    pub fitted: Vec<f64>,
    /// Final 0/1 weight mask aligned with the input
    pub weights: Vec<f64>,
    /// Reweighting iterations performed
    pub iterations: usize,
    /// False when the iteration cap stopped the loop
    pub converged: bool,
}

/// Iteratively reweighted polynomial regression over `(index, value)` pairs
#[derive(Debug, Clone)]
pub struct RobustPolynomialFitter {
    pub degree: usize,
    /// MAD multiple at which a point is treated as an outlier
    pub thresh: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl RobustPolynomialFitter {
    /// Fitter with iteration control taken from the global config when it is
    /// initialized, else from the built-in defaults.
    pub fn new(degree: usize, thresh: f64) -> Self {
        let (tolerance, max_iterations) = config::try_get().map_or(
            (defaults::FIT_CONVERGENCE_TOLERANCE, defaults::FIT_MAX_ITERATIONS),
            |c| (c.fitting.convergence_tolerance, c.fitting.max_iterations),
        );
        Self {
            degree,
            thresh,
            tolerance,
            max_iterations,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Fit `data` against its sample index.
    pub fn fit(&self, data: &[f64]) -> Result<RobustFit, StatsError> {
        let n = data.len();
        if n == 0 {
            return Ok(RobustFit {
                fitted: Vec::new(),
                weights: Vec::new(),
                iterations: 0,
                converged: true,
            });
        }

        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let mut old = PolynomialFit::fit(&x, data, self.degree, None)?.eval_all(&x);
        let mut weights = vec![1.0; n];

        for iteration in 1..=self.max_iterations {
            let residual: Vec<f64> = data
                .iter()
                .zip(old.iter())
                .map(|(d, f)| (d - f).abs())
                .collect();

            let mut spread = median(&residual);
            if spread == 0.0 {
                match min_positive(residual.iter().copied()) {
                    Some(floor) => {
                        debug!(floor, "Zero MAD in robust fit, using smallest nonzero residual");
                        spread = floor;
                    }
                    None => {
                        // Every point already lies on the curve
                        weights.fill(1.0);
                        return Ok(RobustFit {
                            fitted: old,
                            weights,
                            iterations: iteration - 1,
                            converged: true,
                        });
                    }
                }
            }

            let cutoff = self.thresh * spread;
            for (w, r) in weights.iter_mut().zip(residual.iter()) {
                *w = if *r < cutoff { 1.0 } else { 0.0 };
            }

            let new = PolynomialFit::fit(&x, data, self.degree, Some(&weights))?.eval_all(&x);
            let change = max_relative_change(&new, &old);
            old = new;

            // NaN means every ratio was 0/0; treat as settled
            if change.is_nan() || change < self.tolerance {
                debug!(iteration, change, "Robust fit converged");
                return Ok(RobustFit {
                    fitted: old,
                    weights,
                    iterations: iteration,
                    converged: true,
                });
            }
        }

        warn!(
            max_iterations = self.max_iterations,
            degree = self.degree,
            "Robust fit hit the iteration cap before converging"
        );
        Ok(RobustFit {
            fitted: old,
            weights,
            iterations: self.max_iterations,
            converged: false,
        })
    }
}

/// `max |new - old| / |old|`, skipping NaN ratios. `NaN` when every ratio is NaN.
fn max_relative_change(new: &[f64], old: &[f64]) -> f64 {
    new.iter()
        .zip(old.iter())
        .map(|(n, o)| ((n - o) / o).abs())
        .filter(|r| !r.is_nan())
        .fold(f64::NAN, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trend(i: usize) -> f64 {
        let x = i as f64;
        4.0 + 0.01 * x + 0.01 * (x * 2.3).sin()
    }

    #[test]
    fn test_outliers_get_zero_weight() {
        let mut data: Vec<f64> = (0..60).map(trend).collect();
        data[10] -= 2.0;
        data[40] += 3.0;

        let fit = RobustPolynomialFitter::new(2, 5.0).fit(&data).unwrap();
        assert_eq!(fit.weights.len(), 60);
        assert_eq!(fit.weights[10], 0.0);
        assert_eq!(fit.weights[40], 0.0);
        assert!(fit.converged);
        // Inliers follow the trend closely
        assert!((fit.fitted[20] - trend(20)).abs() < 0.05);
    }

    #[test]
    fn test_weights_are_binary_and_deterministic() {
        let data: Vec<f64> = (0..80).map(|i| trend(i) + if i % 17 == 0 { -1.0 } else { 0.0 }).collect();
        let fitter = RobustPolynomialFitter::new(3, 5.0);
        let a = fitter.fit(&data).unwrap();
        let b = fitter.fit(&data).unwrap();
        assert!(a.weights.iter().all(|w| *w == 0.0 || *w == 1.0));
        assert_eq!(a.weights, b.weights);
        assert_eq!(a.fitted, b.fitted);
    }

    #[test]
    fn test_perfect_polynomial_returns_immediately() {
        let data: Vec<f64> = (0..20).map(|i| 1.0 + 0.5 * i as f64).collect();
        let fit = RobustPolynomialFitter::new(1, 5.0).fit(&data).unwrap();
        assert!(fit.converged);
        for (f, d) in fit.fitted.iter().zip(data.iter()) {
            assert!((f - d).abs() < 1e-9);
        }
    }

    #[test]
    fn test_iteration_cap_is_respected() {
        let data: Vec<f64> = (0..30).map(|i| trend(i) - if i % 3 == 0 { 0.5 } else { 0.0 }).collect();
        let fit = RobustPolynomialFitter::new(4, 1.0)
            .with_max_iterations(1)
            .fit(&data)
            .unwrap();
        assert!(fit.iterations <= 1);
    }

    #[test]
    fn test_empty_input() {
        let fit = RobustPolynomialFitter::new(10, 5.0).fit(&[]).unwrap();
        assert!(fit.fitted.is_empty());
        assert!(fit.weights.is_empty());
    }
}
