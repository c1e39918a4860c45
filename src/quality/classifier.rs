//! Energy-based bad channel classification
//!
//! Bad channels (poor coupling, broken splices, dead digitiser inputs) carry
//! markedly less energy than their neighbours. The classifier compares each
//! channel's log10 energy with a robust polynomial trend along the cable and
//! flags channels more than `thresh` MADs below it, then optionally cleans
//! up the labels with two continuity passes.

use ndarray::ArrayView2;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::ContinuityReconciler;
use crate::config::{self, defaults};
use crate::stats::{median, min_positive, RobustPolynomialFitter, StatsError};
use crate::types::{ChannelLabelSets, ChannelQualityReport, QualityDiagnostics};

/// Parameters of a channel check
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelCheckOptions {
    /// Degree of the energy trend polynomial. Must stay well below the
    /// channel count: with `degree + 1 >= channels` the trend passes through
    /// every channel and nothing is flagged.
    pub degree: usize,
    pub thresh: f64,
    pub continuity: bool,
    pub adjacent: usize,
    pub toleration: usize,
    /// Keep the energy and threshold curves in the report
    pub verbose: bool,
}

impl Default for ChannelCheckOptions {
    fn default() -> Self {
        match config::try_get() {
            Some(c) => Self {
                degree: c.quality.degree,
                thresh: c.quality.thresh,
                continuity: c.quality.continuity,
                adjacent: c.quality.adjacent,
                toleration: c.quality.toleration,
                verbose: false,
            },
            None => Self {
                degree: defaults::QUALITY_DEGREE,
                thresh: defaults::QUALITY_THRESH,
                continuity: defaults::QUALITY_CONTINUITY,
                adjacent: defaults::QUALITY_ADJACENT,
                toleration: defaults::QUALITY_TOLERATION,
                verbose: false,
            },
        }
    }
}

/// Splits channels into good and bad sets
#[derive(Debug, Clone, Default)]
pub struct ChannelQualityClassifier {
    pub options: ChannelCheckOptions,
}

impl ChannelQualityClassifier {
    pub const fn new(options: ChannelCheckOptions) -> Self {
        Self { options }
    }

    /// Classify the channels (rows) of `data`.
    ///
    /// Never fails on degenerate statistics: zero-energy (dead) channels are
    /// clamped to the smallest nonzero energy for the trend fit and always
    /// labelled bad before the continuity passes, and a zero MAD simply flags
    /// every channel strictly below the trend.
    pub fn classify(&self, data: ArrayView2<'_, f64>) -> Result<ChannelQualityReport, StatsError> {
        let opts = &self.options;
        let nch = data.nrows();
        if nch > 0 && opts.degree + 1 >= nch {
            warn!(
                degree = opts.degree,
                channels = nch,
                "Trend degree interpolates every channel; only dead channels can be flagged"
            );
        }

        let power = channel_power(data);
        let energy = log_energy(&power);

        let fit = RobustPolynomialFitter::new(opts.degree, opts.thresh).fit(&energy)?;
        let deviation: Vec<f64> = energy
            .iter()
            .zip(fit.fitted.iter())
            .map(|(e, f)| e - f)
            .collect();

        let inlier_deviation: Vec<f64> = deviation
            .iter()
            .zip(fit.weights.iter())
            .filter(|(_, w)| **w > 0.0)
            .map(|(d, _)| d.abs())
            .collect();
        let mad = median(&inlier_deviation);

        let mut bad: Vec<usize> = deviation
            .iter()
            .enumerate()
            .filter(|(i, d)| power[*i] == 0.0 || **d < -opts.thresh * mad)
            .map(|(i, _)| i)
            .collect();
        let mut good: Vec<usize> = (0..nch).filter(|i| bad.binary_search(i).is_err()).collect();
        debug!(
            bad = bad.len(),
            dead = power.iter().filter(|p| **p == 0.0).count(),
            mad,
            "Energy outliers before continuity check"
        );

        if opts.continuity {
            let reconciler = ContinuityReconciler::new(opts.adjacent, opts.toleration);
            // Good channels inside bad runs are bad too
            (good, bad) = reconciler.reconcile(&good, &bad);
            // Isolated outliers are usually not bad channels
            (bad, good) = reconciler.reconcile(&bad, &good);
        }

        good.sort_unstable();
        bad.sort_unstable();

        info!(
            channels = nch,
            bad = bad.len(),
            fit_iterations = fit.iterations,
            "Channel quality check complete"
        );

        let diagnostics = opts.verbose.then(|| QualityDiagnostics {
            threshold_curve: fit.fitted.iter().map(|f| f - opts.thresh * mad).collect(),
            fitted: fit.fitted,
            energy,
            mad,
        });

        Ok(ChannelQualityReport {
            labels: ChannelLabelSets { good, bad },
            diagnostics,
        })
    }
}

/// Classify with the given options.
pub fn channel_checking(
    data: ArrayView2<'_, f64>,
    options: &ChannelCheckOptions,
) -> Result<ChannelQualityReport, StatsError> {
    ChannelQualityClassifier::new(options.clone()).classify(data)
}

/// log10 of the sum of squares of every channel (row).
///
/// Zero-energy channels take the smallest nonzero channel energy.
pub fn channel_energy(data: ArrayView2<'_, f64>) -> Vec<f64> {
    log_energy(&channel_power(data))
}

/// Sum of squares of every channel (row)
fn channel_power(data: ArrayView2<'_, f64>) -> Vec<f64> {
    let rows: Vec<_> = data.outer_iter().collect();
    rows.par_iter()
        .map(|row| row.iter().map(|v| v * v).sum::<f64>())
        .collect()
}

fn log_energy(power: &[f64]) -> Vec<f64> {
    let floor = if power.iter().any(|s| *s == 0.0) {
        let floor = min_positive(power.iter().copied()).unwrap_or(f64::MIN_POSITIVE);
        debug!(floor, "Clamping zero-energy channels");
        floor
    } else {
        0.0
    };

    power
        .iter()
        .map(|&s| if s == 0.0 { floor.log10() } else { s.log10() })
        .collect()
}
