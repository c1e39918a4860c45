//! Basic DAS record preprocessing
//!
//! All functions take a channel × time view and return a new array; inputs
//! are never modified.
//!
//! # Example
//!
//! ```ignore
//! use daskit::processing::{demean, normalize, phase_to_strain, Normalization};
//!
//! let strain = phase_to_strain(phase.view(), 1550.12, 0.78, 1.46, 10.0);
//! let clean = normalize(demean(strain.view()).into_dyn().view(), Normalization::ZScore)?;
//! ```

use std::f64::consts::PI;
use std::str::FromStr;

use ndarray::{s, Array1, Array2, ArrayView2, ArrayViewD, Axis, Ix2, Zip};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ProcessingError;
use crate::config::SurveyInfo;
use crate::stats::min_positive;

// ============================================================================
// Unit conversion
// ============================================================================

/// Convert optical phase shift (rad) to strain.
///
/// `wavelength_nm` is the vacuum wavelength, `photoelastic` the longitudinal
/// photo-elastic scaling factor, `refractive_index` that of the fiber and
/// `gauge_length` in metres.
pub fn phase_to_strain(
    data: ArrayView2<'_, f64>,
    wavelength_nm: f64,
    photoelastic: f64,
    refractive_index: f64,
    gauge_length: f64,
) -> Array2<f64> {
    let factor = (wavelength_nm * 1e-9) / (photoelastic * 4.0 * PI * refractive_index * gauge_length);
    data.mapv(|v| v * factor)
}

// ============================================================================
// Normalisation and trend removal
// ============================================================================

/// Per-channel normalisation method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Normalization {
    /// Divide by the peak absolute amplitude
    Max,
    /// Subtract the mean, divide by the standard deviation
    #[default]
    ZScore,
}

impl FromStr for Normalization {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max" => Ok(Self::Max),
            "z-score" => Ok(Self::ZScore),
            other => Err(ProcessingError::InvalidArgument(format!(
                "normalization should be 'max' or 'z-score', got '{other}'"
            ))),
        }
    }
}

/// Normalise every channel.
///
/// 1-D input is treated as a single channel. Channels with zero amplitude (or
/// zero standard deviation) are divided by the smallest nonzero value of the
/// other channels.
pub fn normalize(data: ArrayViewD<'_, f64>, method: Normalization) -> Result<Array2<f64>, ProcessingError> {
    let data: Array2<f64> = match data.ndim() {
        1 => Array2::from_shape_vec((1, data.len()), data.iter().copied().collect())
            .map_err(|e| ProcessingError::InvalidArgument(e.to_string()))?,
        2 => data
            .into_dimensionality::<Ix2>()
            .map_err(|e| ProcessingError::InvalidArgument(e.to_string()))?
            .to_owned(),
        n => {
            return Err(ProcessingError::InvalidArgument(format!(
                "data should be a 1-D or 2-D array, got {n}-D"
            )))
        }
    };

    let (centre, mut scale): (Array1<f64>, Array1<f64>) = match method {
        Normalization::Max => (
            Array1::zeros(data.nrows()),
            data.map_axis(Axis(1), |row| row.fold(0.0_f64, |m, v| m.max(v.abs()))),
        ),
        Normalization::ZScore => {
            let mean = data
                .mean_axis(Axis(1))
                .unwrap_or_else(|| Array1::zeros(data.nrows()));
            let std = data.std_axis(Axis(1), 0.0);
            (mean, std)
        }
    };

    if scale.iter().any(|v| *v == 0.0) {
        let floor = min_positive(scale.iter().copied()).unwrap_or(1.0);
        debug!(floor, ?method, "Clamping zero normalisation scale");
        scale.mapv_inplace(|v| if v == 0.0 { floor } else { v });
    }

    let mut out = data;
    Zip::from(out.rows_mut())
        .and(&centre)
        .and(&scale)
        .for_each(|mut row, &c, &s| row.mapv_inplace(|v| (v - c) / s));
    Ok(out)
}

/// Subtract each channel's mean.
pub fn demean(data: ArrayView2<'_, f64>) -> Array2<f64> {
    let mut out = data.to_owned();
    for mut row in out.rows_mut() {
        let n = row.len();
        if n == 0 {
            continue;
        }
        let mean = row.sum() / n as f64;
        row.mapv_inplace(|v| v - mean);
    }
    out
}

/// Subtract each channel's linear least-squares trend.
pub fn detrend(data: ArrayView2<'_, f64>) -> Array2<f64> {
    let mut out = data.to_owned();
    let nt = out.ncols();
    if nt < 2 {
        return demean(data);
    }

    let t_mean = (nt - 1) as f64 / 2.0;
    let stt: f64 = (0..nt).map(|t| (t as f64 - t_mean).powi(2)).sum();
    for mut row in out.rows_mut() {
        let y_mean = row.sum() / nt as f64;
        let sty: f64 = row
            .iter()
            .enumerate()
            .map(|(t, y)| (t as f64 - t_mean) * (y - y_mean))
            .sum();
        let slope = sty / stt;
        for (t, y) in row.iter_mut().enumerate() {
            *y -= y_mean + slope * (t as f64 - t_mean);
        }
    }
    out
}

// ============================================================================
// Stacking and tapering
// ============================================================================

/// Average `n` adjacent channels every `step` channels (`step` defaults to `n`).
pub fn stack(data: ArrayView2<'_, f64>, n: usize, step: Option<usize>) -> Result<Array2<f64>, ProcessingError> {
    let step = step.unwrap_or(n);
    if n == 0 || step == 0 {
        return Err(ProcessingError::InvalidArgument(format!(
            "stack size and step must be positive, got n={n}, step={step}"
        )));
    }

    let (nch, nt) = data.dim();
    let begins: Vec<usize> = if nch >= n {
        (0..=nch - n).step_by(step).collect()
    } else {
        Vec::new()
    };

    let mut out = Array2::zeros((begins.len(), nt));
    for (mut row, &b) in out.rows_mut().into_iter().zip(begins.iter()) {
        let block = data.slice(s![b..b + n, ..]);
        if let Some(mean) = block.mean_axis(Axis(0)) {
            row.assign(&mean);
        }
    }
    Ok(out)
}

/// Symmetric Tukey (tapered cosine) window of `m` points.
///
/// `alpha <= 0` is rectangular, `alpha >= 1` is a Hann window.
pub fn tukey_window(m: usize, alpha: f64) -> Array1<f64> {
    if m <= 1 || alpha <= 0.0 {
        return Array1::ones(m);
    }
    let last = (m - 1) as f64;
    if alpha >= 1.0 {
        return Array1::from_shape_fn(m, |i| 0.5 - 0.5 * (2.0 * PI * i as f64 / last).cos());
    }

    let width = (alpha * last / 2.0).floor() as usize;
    Array1::from_shape_fn(m, |i| {
        let n = i as f64;
        if i <= width {
            0.5 * (1.0 + (PI * (-1.0 + 2.0 * n / alpha / last)).cos())
        } else if i < m - width - 1 {
            1.0
        } else {
            0.5 * (1.0 + (PI * (-2.0 / alpha + 1.0 + 2.0 * n / alpha / last)).cos())
        }
    })
}

/// Taper with Tukey windows along channels (`p_channel`) and time (`p_time`).
pub fn cosine_taper(data: ArrayView2<'_, f64>, p_channel: f64, p_time: f64) -> Array2<f64> {
    let (nch, nt) = data.dim();
    let wx = tukey_window(nch, p_channel);
    let wt = tukey_window(nt, p_time);
    Array2::from_shape_fn((nch, nt), |(i, j)| data[[i, j]] * wx[i] * wt[j])
}

// ============================================================================
// Trimming and padding
// ============================================================================

/// Bounds for [`trim`]. Upper bounds are exclusive; `None` keeps the rest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TrimWindow {
    /// Channel and sample indices
    Samples {
        xmin: usize,
        xmax: Option<usize>,
        tmin: usize,
        tmax: Option<usize>,
    },
    /// Metres and seconds, converted with the channel interval `dx` and the
    /// sampling rate `fs`
    Physical {
        dx: f64,
        fs: f64,
        xmin: f64,
        xmax: Option<f64>,
        tmin: f64,
        tmax: Option<f64>,
    },
}

impl TrimWindow {
    /// Physical window using the survey's channel interval and sampling rate.
    pub fn physical(survey: &SurveyInfo, xmin: f64, xmax: Option<f64>, tmin: f64, tmax: Option<f64>) -> Self {
        Self::Physical {
            dx: survey.channel_interval_m,
            fs: survey.sampling_rate_hz,
            xmin,
            xmax,
            tmin,
            tmax,
        }
    }
}

fn to_index(value: f64) -> usize {
    value.round().max(0.0) as usize
}

/// Cut a record to a channel/time window. Bounds past the record are clamped.
pub fn trim(data: ArrayView2<'_, f64>, window: TrimWindow) -> Result<Array2<f64>, ProcessingError> {
    let (nch, nt) = data.dim();
    let (xmin, xmax, tmin, tmax) = match window {
        TrimWindow::Samples {
            xmin,
            xmax,
            tmin,
            tmax,
        } => (xmin, xmax.unwrap_or(nch), tmin, tmax.unwrap_or(nt)),
        TrimWindow::Physical {
            dx,
            fs,
            xmin,
            xmax,
            tmin,
            tmax,
        } => {
            if dx <= 0.0 || fs <= 0.0 {
                return Err(ProcessingError::InvalidArgument(format!(
                    "channel interval and sampling rate must be positive, got dx={dx}, fs={fs}"
                )));
            }
            (
                to_index(xmin / dx),
                xmax.map_or(nch, |x| to_index(x / dx)),
                to_index(tmin * fs),
                tmax.map_or(nt, |t| to_index(t * fs)),
            )
        }
    };

    let x1 = xmax.min(nch);
    let x0 = xmin.min(x1);
    let t1 = tmax.min(nt);
    let t0 = tmin.min(t1);
    Ok(data.slice(s![x0..x1, t0..t1]).to_owned())
}

/// Split a pad length into (before, after).
fn pad_split(dn: usize) -> (usize, usize) {
    (dn / 2, dn - dn / 2)
}

/// Zero-pad `dn.0` channels and `dn.1` samples, half before and half after.
pub fn pad(data: ArrayView2<'_, f64>, dn: (usize, usize)) -> Array2<f64> {
    let (nch, nt) = data.dim();
    let (x0, _) = pad_split(dn.0);
    let (t0, _) = pad_split(dn.1);
    let mut out = Array2::zeros((nch + dn.0, nt + dn.1));
    out.slice_mut(s![x0..x0 + nch, t0..t0 + nt]).assign(&data);
    out
}

/// Remove padding added by [`pad`] with the same `dn`.
pub fn unpad(data: ArrayView2<'_, f64>, dn: (usize, usize)) -> Result<Array2<f64>, ProcessingError> {
    let (nch, nt) = data.dim();
    if dn.0 > nch || dn.1 > nt {
        return Err(ProcessingError::InvalidArgument(format!(
            "cannot remove padding {dn:?} from a {nch}x{nt} record"
        )));
    }
    let (x0, x1) = pad_split(dn.0);
    let (t0, t1) = pad_split(dn.1);
    Ok(data.slice(s![x0..nch - x1, t0..nt - t1]).to_owned())
}

// ============================================================================
// Time integration and differentiation
// ============================================================================

fn check_rate(fs: f64) -> Result<(), ProcessingError> {
    if fs > 0.0 && fs.is_finite() {
        Ok(())
    } else {
        Err(ProcessingError::InvalidArgument(format!(
            "sampling rate must be positive, got {fs}"
        )))
    }
}

/// Cumulative sum along time divided by the sampling rate.
pub fn time_integration(data: ArrayView2<'_, f64>, fs: f64) -> Result<Array2<f64>, ProcessingError> {
    check_rate(fs)?;
    let mut out = data.to_owned();
    out.accumulate_axis_inplace(Axis(1), |&prev, curr| *curr += prev);
    out.mapv_inplace(|v| v / fs);
    Ok(out)
}

/// First difference along time divided by the sampling rate.
///
/// The result has one sample fewer than the input.
pub fn time_differential(data: ArrayView2<'_, f64>, fs: f64) -> Result<Array2<f64>, ProcessingError> {
    check_rate(fs)?;
    let nt = data.ncols();
    if nt < 2 {
        return Ok(Array2::zeros((data.nrows(), 0)));
    }
    let diff = &data.slice(s![.., 1..]) - &data.slice(s![.., ..nt - 1]);
    Ok(diff.mapv(|v| v / fs))
}

// ============================================================================
// Downsampling
// ============================================================================

/// Downsample by `xint` along channels and `tint` along time.
///
/// Along channels, `stack` averages each group of `xint` channels instead of
/// keeping every `xint`-th one. Time decimation keeps every `tint`-th sample
/// and applies no anti-alias filter; low-pass the record first when needed.
pub fn downsample(
    data: ArrayView2<'_, f64>,
    xint: Option<usize>,
    tint: Option<usize>,
    stack_channels: bool,
) -> Result<Array2<f64>, ProcessingError> {
    if xint == Some(0) || tint == Some(0) {
        return Err(ProcessingError::InvalidArgument(
            "downsampling factors must be positive".to_string(),
        ));
    }

    let spatial = match xint {
        Some(x) if stack_channels => stack(data, x, None)?,
        Some(x) => data.slice(s![..;x, ..]).to_owned(),
        None => data.to_owned(),
    };

    let out = match tint {
        Some(t) => spatial.slice(s![.., ..;t]).to_owned(),
        None => spatial,
    };
    debug!(
        from = ?data.dim(),
        to = ?out.dim(),
        "Downsampled record"
    );
    Ok(out)
}
