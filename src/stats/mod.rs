//! Robust statistics for channel analysis
//!
//! ## Architecture
//! - `polynomial`: weighted polynomial least squares (nalgebra SVD)
//! - `robust_fit`: iteratively reweighted polynomial fit with a MAD cutoff
//!
//! Median and mean come from `statrs`; this module only adds the NaN/empty
//! handling the analysis code relies on.

pub mod polynomial;
pub mod robust_fit;

pub use polynomial::PolynomialFit;
pub use robust_fit::{RobustFit, RobustPolynomialFitter};

use statrs::statistics::{Data, Median, Statistics};
use thiserror::Error;

/// Errors raised by the least-squares machinery
#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Least squares solve failed: {0}")]
    LeastSquares(String),

    #[error("Length mismatch: {x} abscissae, {y} values")]
    LengthMismatch { x: usize, y: usize },

    #[error("Weight vector has {weights} entries, expected {expected}")]
    WeightLength { weights: usize, expected: usize },
}

/// Median of a slice. `NaN` for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    Data::new(values.to_vec()).median()
}

/// Median absolute deviation about the median.
pub fn mad(values: &[f64]) -> f64 {
    let m = median(values);
    let deviations: Vec<f64> = values.iter().map(|v| (v - m).abs()).collect();
    median(&deviations)
}

/// Arithmetic mean. `NaN` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().mean()
}

/// Smallest strictly positive value, if any.
pub fn min_positive(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    values
        .into_iter()
        .filter(|v| *v > 0.0)
        .min_by(f64::total_cmp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert!((median(&[4.0, 1.0, 2.0, 3.0]) - 2.5).abs() < 1e-12);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn test_mad_ignores_single_outlier() {
        let values = [1.0, 1.1, 0.9, 1.0, 100.0];
        let m = mad(&values);
        assert!(m <= 0.1 + 1e-12, "MAD should be robust to the outlier, got {m}");
    }

    #[test]
    fn test_min_positive() {
        assert_eq!(min_positive([0.0, 3.0, 2.0, -1.0]), Some(2.0));
        assert_eq!(min_positive([0.0, 0.0]), None);
    }
}
