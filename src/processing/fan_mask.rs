//! f-k fan masks
//!
//! A mask over the frequency-wavenumber plane that passes a band of
//! frequency, wavenumber and apparent velocity `v = -f/k` with cosine
//! tapered edges. Rows follow the wavenumber axis, columns the frequency
//! axis.

use std::f64::consts::PI;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Apparent velocity assigned to the `k = 0` row
const ZERO_WAVENUMBER_VELOCITY: f64 = -1e10;

/// One edge of the pass band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FanBound {
    /// Taper of relative width `edge` centred on the value
    Value(f64),
    /// Explicit taper between two values (order does not matter)
    Taper(f64, f64),
}

/// Which sign of apparent velocity to suppress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VelocityPolarity {
    #[default]
    Both,
    RejectPositive,
    RejectNegative,
}

/// Fan mask bounds. Unset or zero bounds are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanMaskSpec {
    pub fmin: Option<FanBound>,
    pub fmax: Option<FanBound>,
    pub kmin: Option<FanBound>,
    pub kmax: Option<FanBound>,
    pub vmin: Option<FanBound>,
    pub vmax: Option<FanBound>,
    /// Relative taper width for [`FanBound::Value`] bounds
    pub edge: f64,
    pub polarity: VelocityPolarity,
}

impl Default for FanMaskSpec {
    fn default() -> Self {
        Self {
            fmin: None,
            fmax: None,
            kmin: None,
            kmax: None,
            vmin: None,
            vmax: None,
            edge: 0.1,
            polarity: VelocityPolarity::Both,
        }
    }
}

/// Quantity a bound applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quantity {
    Frequency,
    Wavenumber,
    Velocity,
}

impl FanBound {
    fn is_active(&self) -> bool {
        !matches!(self, Self::Value(v) if *v == 0.0)
    }

    /// (zero point, full pass point) of a lower bound
    fn lower(&self, edge: f64) -> (f64, f64) {
        match *self {
            Self::Value(p) => (p * (1.0 - edge / 2.0).max(0.0), p * (1.0 + edge / 2.0)),
            Self::Taper(a, b) => (a.min(b), a.max(b)),
        }
    }

    /// (zero point, full pass point) of an upper bound
    fn upper(&self, edge: f64) -> (f64, f64) {
        match *self {
            Self::Value(p) => (p * (1.0 + edge / 2.0), p * (1.0 - edge / 2.0)),
            Self::Taper(a, b) => (a.max(b), a.min(b)),
        }
    }
}

fn apply_lower(mask: &mut Array2<f64>, values: &Array2<f64>, (tp_b, tp_e): (f64, f64)) {
    let width = tp_e - tp_b;
    mask.zip_mut_with(values, |m, p| {
        let p = p.abs();
        if p <= tp_b {
            *m = 0.0;
        } else if p < tp_e {
            *m *= 0.5 - 0.5 * ((p - tp_b) / width * PI).cos();
        }
    });
}

fn apply_upper(mask: &mut Array2<f64>, values: &Array2<f64>, (tp_b, tp_e): (f64, f64)) {
    let width = tp_b - tp_e;
    mask.zip_mut_with(values, |m, p| {
        let p = p.abs();
        if p >= tp_b {
            *m = 0.0;
        } else if p > tp_e {
            *m *= 0.5 - 0.5 * ((tp_b - p) / width * PI).cos();
        }
    });
}

/// Build a fan mask for frequencies `f` and wavenumbers `k`.
///
/// The result has shape `(k.len(), f.len())`.
pub fn fk_fan_mask(f: &[f64], k: &[f64], spec: &FanMaskSpec) -> Array2<f64> {
    let shape = (k.len(), f.len());
    let ff = Array2::from_shape_fn(shape, |(_, j)| f[j]);
    let kk = Array2::from_shape_fn(shape, |(i, _)| k[i]);
    let vv = Array2::from_shape_fn(shape, |(i, j)| {
        if k[i] == 0.0 {
            ZERO_WAVENUMBER_VELOCITY
        } else {
            -f[j] / k[i]
        }
    });

    let table = [
        (Quantity::Frequency, &ff, spec.fmin, spec.fmax),
        (Quantity::Wavenumber, &kk, spec.kmin, spec.kmax),
        (Quantity::Velocity, &vv, spec.vmin, spec.vmax),
    ];

    let mut mask = Array2::ones(shape);
    for (quantity, values, min, max) in table {
        if let Some(bound) = min.filter(FanBound::is_active) {
            debug!(?quantity, ?bound, "Applying lower fan bound");
            apply_lower(&mut mask, values, bound.lower(spec.edge));
        }
        if let Some(bound) = max.filter(FanBound::is_active) {
            debug!(?quantity, ?bound, "Applying upper fan bound");
            apply_upper(&mut mask, values, bound.upper(spec.edge));
        }
    }

    match spec.polarity {
        VelocityPolarity::Both => {}
        VelocityPolarity::RejectPositive => mask.zip_mut_with(&vv, |m, v| {
            if *v > 0.0 {
                *m = 0.0;
            }
        }),
        VelocityPolarity::RejectNegative => mask.zip_mut_with(&vv, |m, v| {
            if *v < 0.0 {
                *m = 0.0;
            }
        }),
    }

    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_and_identity() {
        let mask = fk_fan_mask(&[1.0, 2.0, 3.0], &[-0.1, 0.0], &FanMaskSpec::default());
        assert_eq!(mask.dim(), (2, 3));
        assert!(mask.iter().all(|m| *m == 1.0));
    }

    #[test]
    fn test_velocity_lower_bound() {
        // v = -1000, -500, -100 and 300 (taper midpoint)
        let k = [0.01, 0.02, 0.1];
        let spec = FanMaskSpec {
            vmin: Some(FanBound::Value(300.0)),
            ..FanMaskSpec::default()
        };
        let mask = fk_fan_mask(&[10.0], &k, &spec);
        assert_eq!(mask.column(0).to_vec(), vec![1.0, 1.0, 0.0]);

        let mid = fk_fan_mask(&[30.0], &[-0.1], &spec);
        assert!((mid[[0, 0]] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_explicit_upper_taper() {
        let spec = FanMaskSpec {
            fmax: Some(FanBound::Taper(40.0, 20.0)),
            ..FanMaskSpec::default()
        };
        let mask = fk_fan_mask(&[10.0, 30.0, 40.0, 50.0], &[0.1], &spec);
        assert_eq!(mask[[0, 0]], 1.0);
        assert!((mask[[0, 1]] - 0.5).abs() < 1e-12);
        assert_eq!(mask[[0, 2]], 0.0);
        assert_eq!(mask[[0, 3]], 0.0);
    }

    #[test]
    fn test_zero_bound_is_ignored() {
        let spec = FanMaskSpec {
            fmin: Some(FanBound::Value(0.0)),
            kmax: Some(FanBound::Value(0.0)),
            ..FanMaskSpec::default()
        };
        let mask = fk_fan_mask(&[0.0, 5.0], &[0.0, 1.0], &spec);
        assert!(mask.iter().all(|m| *m == 1.0));
    }

    #[test]
    fn test_polarity() {
        // v = -100 for k = 0.1, +100 for k = -0.1
        let k = [0.1, -0.1];
        let reject_pos = FanMaskSpec {
            polarity: VelocityPolarity::RejectPositive,
            ..FanMaskSpec::default()
        };
        assert_eq!(fk_fan_mask(&[10.0], &k, &reject_pos).column(0).to_vec(), vec![1.0, 0.0]);

        let reject_neg = FanMaskSpec {
            polarity: VelocityPolarity::RejectNegative,
            ..FanMaskSpec::default()
        };
        assert_eq!(fk_fan_mask(&[10.0], &k, &reject_neg).column(0).to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_zero_wavenumber_is_very_fast() {
        let spec = FanMaskSpec {
            vmax: Some(FanBound::Value(5000.0)),
            ..FanMaskSpec::default()
        };
        let mask = fk_fan_mask(&[10.0], &[0.0, 0.1], &spec);
        assert_eq!(mask[[0, 0]], 0.0);
        assert_eq!(mask[[1, 0]], 1.0);
    }
}
