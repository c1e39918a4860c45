//! Turning point detection
//!
//! Two independent detectors:
//! - **Coordinate**: heading change (and optionally inclination change) seen
//!   from each channel towards neighbours `channel_gap` channels away, using
//!   WGS84 geodesics. Every contiguous run above `thresh` degrees yields one
//!   turning point at its largest change.
//! - **Waveform**: lag-0 correlation of adjacent channels; the first pair
//!   whose coherence drops more than `thresh` MADs below the median marks a
//!   break between two channels (returned as a half-integer index).

use std::fmt;
use std::str::FromStr;

use geo::{Bearing, Distance, Geodesic, Point};
use ndarray::{ArrayView1, ArrayView2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{self, defaults};
use crate::stats::median;
use crate::types::GeoPosition;

/// Errors raised by turning point detection
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TurningPointError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Input kind for turning point detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
    /// Rows of `(latitude, longitude[, depth])`
    Coordinate,
    /// Rows are channel time series
    Waveform,
}

impl fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coordinate => write!(f, "coordinate"),
            Self::Waveform => write!(f, "waveform"),
        }
    }
}

impl FromStr for DetectionMode {
    type Err = TurningPointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "coordinate" => Ok(Self::Coordinate),
            "waveform" => Ok(Self::Waveform),
            other => Err(TurningPointError::InvalidArgument(format!(
                "detection mode should be 'coordinate' or 'waveform', got '{other}'"
            ))),
        }
    }
}

/// Detected turning points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TurningPoints {
    /// Channel indices of heading changes, and of inclination changes when
    /// depth was supplied
    Coordinate {
        horizontal: Vec<usize>,
        vertical: Option<Vec<usize>>,
    },
    /// Break positions between channels (`i - 0.5`)
    Waveform(Vec<f64>),
}

/// Finds turning points along a fiber
#[derive(Debug, Clone, PartialEq)]
pub struct TurningPointDetector {
    /// Degrees for coordinates, MAD multiples for waveforms
    pub thresh: f64,
    /// Neighbour offset for angle computation
    pub channel_gap: usize,
}

impl Default for TurningPointDetector {
    fn default() -> Self {
        match config::try_get() {
            Some(c) => Self::new(c.turning.thresh, c.turning.channel_gap),
            None => Self::new(defaults::TURNING_THRESH, defaults::TURNING_CHANNEL_GAP),
        }
    }
}

impl TurningPointDetector {
    pub const fn new(thresh: f64, channel_gap: usize) -> Self {
        Self {
            thresh,
            channel_gap,
        }
    }

    /// Dispatch on `mode`.
    ///
    /// Coordinate rows are `(latitude, longitude)`, with depth (m) as the
    /// third column when `depth_info` is set.
    pub fn detect(
        &self,
        mode: DetectionMode,
        data: ArrayView2<'_, f64>,
        depth_info: bool,
    ) -> Result<TurningPoints, TurningPointError> {
        match mode {
            DetectionMode::Waveform => Ok(TurningPoints::Waveform(self.waveform(data))),
            DetectionMode::Coordinate => {
                let needed = if depth_info { 3 } else { 2 };
                if data.ncols() < needed {
                    return Err(TurningPointError::InvalidArgument(format!(
                        "coordinate data needs {needed} columns, got {}",
                        data.ncols()
                    )));
                }
                let positions: Vec<GeoPosition> = data
                    .outer_iter()
                    .map(|row| GeoPosition::new(row[0], row[1]))
                    .collect();
                let depth: Option<Vec<f64>> = depth_info.then(|| data.column(2).to_vec());
                self.coordinate(&positions, depth.as_deref())
            }
        }
    }

    /// Heading (and inclination) turning points of a channel sequence.
    pub fn coordinate(
        &self,
        positions: &[GeoPosition],
        depth: Option<&[f64]>,
    ) -> Result<TurningPoints, TurningPointError> {
        let azimuth = horizontal_angle_change(positions, self.channel_gap);
        let horizontal = local_maximum_indexes(&magnitudes(&azimuth), self.thresh);

        let vertical = match depth {
            None => None,
            Some(d) if d.len() != positions.len() => {
                return Err(TurningPointError::InvalidArgument(format!(
                    "{} depths for {} channels",
                    d.len(),
                    positions.len()
                )));
            }
            Some(d) => {
                let inclination = vertical_angle_change(positions, d, self.channel_gap);
                Some(local_maximum_indexes(&magnitudes(&inclination), self.thresh))
            }
        };

        info!(
            channels = positions.len(),
            horizontal = horizontal.len(),
            vertical = ?vertical.as_ref().map(Vec::len),
            "Coordinate turning points"
        );
        Ok(TurningPoints::Coordinate {
            horizontal,
            vertical,
        })
    }

    /// Coherence breaks between adjacent channels (rows of `data`).
    ///
    /// Returns at most one position, `i - 0.5` for the first pair `(i, i+1)`
    /// whose correlation falls below `median - thresh * MAD`.
    pub fn waveform(&self, data: ArrayView2<'_, f64>) -> Vec<f64> {
        let cc = adjacent_correlation(data);
        if cc.is_empty() {
            return Vec::new();
        }

        let med = median(&cc);
        let deviations: Vec<f64> = cc.iter().map(|c| (c - med).abs()).collect();
        let mad = median(&deviations);
        let cutoff = med - self.thresh * mad;
        debug!(median = med, mad, cutoff, "Adjacent channel coherence");

        cc.iter()
            .position(|c| *c < cutoff)
            .map(|i| vec![i as f64 - 0.5])
            .unwrap_or_default()
    }
}

/// Detect turning points with a mode name, as `"coordinate"` or `"waveform"`.
pub fn turning_points(
    data: ArrayView2<'_, f64>,
    mode: &str,
    thresh: f64,
    depth_info: bool,
    channel_gap: usize,
) -> Result<TurningPoints, TurningPointError> {
    let mode: DetectionMode = mode.parse()?;
    TurningPointDetector::new(thresh, channel_gap).detect(mode, data, depth_info)
}

// ============================================================================
// Angle series
// ============================================================================

fn point(p: &GeoPosition) -> Point<f64> {
    Point::new(p.longitude, p.latitude)
}

/// Neighbour indices `gap` channels away, clamped to the sequence.
fn neighbours(i: usize, gap: usize, n: usize) -> (usize, usize) {
    (i.saturating_sub(gap), (i + gap).min(n - 1))
}

/// Heading change (degrees, in (-180, 180]) at every channel.
///
/// The first and last channels are always 0.
pub fn horizontal_angle_change(positions: &[GeoPosition], gap: usize) -> Vec<f64> {
    let n = positions.len();
    let mut angle = vec![0.0; n];
    for i in 1..n.saturating_sub(1) {
        let (s, e) = neighbours(i, gap, n);
        let mid = point(&positions[i]);
        let azi_s = Geodesic::bearing(point(&positions[s]), mid);
        let azi_e = Geodesic::bearing(mid, point(&positions[e]));
        let mut dazi = azi_e - azi_s;
        if dazi.abs() > 180.0 {
            dazi = -dazi.signum() * (360.0 - dazi.abs());
        }
        angle[i] = dazi;
    }
    angle
}

/// Inclination change (degrees) at every channel, from depths in metres.
///
/// The first and last channels are always 0.
pub fn vertical_angle_change(positions: &[GeoPosition], depth: &[f64], gap: usize) -> Vec<f64> {
    let n = positions.len().min(depth.len());
    let mut angle = vec![0.0; n];
    for i in 1..n.saturating_sub(1) {
        let (s, e) = neighbours(i, gap, n);
        let mid = point(&positions[i]);
        let s12_s = Geodesic::distance(point(&positions[s]), mid);
        let s12_e = Geodesic::distance(mid, point(&positions[e]));
        let theta_s = (depth[i] - depth[s]).atan2(s12_s).to_degrees();
        let theta_e = (depth[e] - depth[i]).atan2(s12_e).to_degrees();
        angle[i] = theta_e - theta_s;
    }
    angle
}

fn magnitudes(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| v.abs()).collect()
}

/// Index of the largest value in every contiguous run of `values > thresh`.
///
/// Ties resolve to the first index of the run.
pub fn local_maximum_indexes(values: &[f64], thresh: f64) -> Vec<usize> {
    let mut peaks = Vec::new();
    let mut run: Option<(usize, f64)> = None;

    for (i, &v) in values.iter().enumerate() {
        if v > thresh {
            run = match run {
                Some((bi, bv)) if bv >= v => Some((bi, bv)),
                _ => Some((i, v)),
            };
        } else if let Some((bi, _)) = run.take() {
            peaks.push(bi);
        }
    }
    if let Some((bi, _)) = run {
        peaks.push(bi);
    }
    peaks
}

// ============================================================================
// Waveform coherence
// ============================================================================

/// Lag-0 Pearson correlation of every adjacent channel pair.
fn adjacent_correlation(data: ArrayView2<'_, f64>) -> Vec<f64> {
    let nch = data.nrows();
    if nch < 2 {
        return Vec::new();
    }
    (0..nch - 1)
        .into_par_iter()
        .map(|i| pearson(data.row(i), data.row(i + 1)))
        .collect()
}

/// Zero when either channel has no variance.
fn pearson(x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
    let n = x.len();
    if n == 0 {
        return 0.0;
    }
    let mx = x.sum() / n as f64;
    let my = y.sum() / n as f64;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y.iter()) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let denom = (sxx * syy).sqrt();
    if denom > 0.0 {
        sxy / denom
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// 20 channels heading east then 20 heading north, ~11 m apart at 30N.
    fn corner_track() -> Vec<GeoPosition> {
        let step = 0.0001;
        let mut track: Vec<GeoPosition> =
            (0..=20).map(|k| GeoPosition::new(30.0, 120.0 + k as f64 * step)).collect();
        track.extend((1..=20).map(|k| GeoPosition::new(30.0 + k as f64 * step, 120.0 + 20.0 * step)));
        track
    }

    #[test]
    fn test_local_maximum_per_run() {
        let values = [0.0, 6.0, 9.0, 7.0, 0.0, 0.0, 8.0, 0.0, 12.0, 12.0];
        assert_eq!(local_maximum_indexes(&values, 5.0), vec![2, 6, 8]);
        assert!(local_maximum_indexes(&values, 20.0).is_empty());
    }

    #[test]
    fn test_heading_wraps_across_north() {
        // heading 350 then 10 degrees: +20, not -340
        let p0 = GeoPosition::new(0.0, 0.0);
        let p1 = GeoPosition::new(0.001, -0.000_176);
        let p2 = GeoPosition::new(0.002, 0.0);
        let angle = horizontal_angle_change(&[p0, p1, p2], 1);
        assert!(angle[1] > 0.0 && angle[1] < 90.0, "got {}", angle[1]);
    }

    #[test]
    fn test_corner_is_single_turning_point() {
        let track = corner_track();
        let angle = horizontal_angle_change(&track, 3);
        assert!((angle[20].abs() - 90.0).abs() < 1.0);
        assert_eq!(angle[0], 0.0);

        let result = TurningPointDetector::new(5.0, 3).coordinate(&track, None).unwrap();
        assert_eq!(
            result,
            TurningPoints::Coordinate {
                horizontal: vec![20],
                vertical: None
            }
        );
    }

    #[test]
    fn test_depth_kink() {
        // Straight line east; flat for 15 channels then descending 1:1
        let track: Vec<GeoPosition> =
            (0..30).map(|k| GeoPosition::new(0.0, k as f64 * 0.0001)).collect();
        let spacing = Geodesic::distance(point(&track[0]), point(&track[1]));
        let depth: Vec<f64> = (0..30)
            .map(|k| if k <= 15 { 0.0 } else { (k - 15) as f64 * spacing })
            .collect();

        let result = TurningPointDetector::new(5.0, 3)
            .coordinate(&track, Some(&depth))
            .unwrap();
        let TurningPoints::Coordinate { horizontal, vertical } = result else {
            panic!("coordinate result expected");
        };
        assert!(horizontal.is_empty());
        assert_eq!(vertical, Some(vec![15]));
    }

    #[test]
    fn test_detect_reads_columns() {
        let track = corner_track();
        let data = Array2::from_shape_fn((track.len(), 2), |(i, j)| {
            if j == 0 { track[i].latitude } else { track[i].longitude }
        });
        let result = turning_points(data.view(), "coordinate", 5.0, false, 3).unwrap();
        assert!(matches!(result, TurningPoints::Coordinate { ref horizontal, .. } if horizontal == &vec![20]));

        let err = turning_points(data.view(), "coordinate", 5.0, true, 3).unwrap_err();
        assert!(matches!(err, TurningPointError::InvalidArgument(_)));
    }

    #[test]
    fn test_waveform_scaled_copies_have_no_break() {
        let data = Array2::from_shape_fn((2, 200), |(i, t)| {
            let amp = if i == 0 { 1.0 } else { 3.5 };
            amp * (t as f64 * 0.21).sin()
        });
        let result = TurningPointDetector::new(5.0, 3).waveform(data.view());
        assert!(result.is_empty());
    }

    #[test]
    fn test_waveform_break_between_groups() {
        let data = Array2::from_shape_fn((20, 256), |(i, t)| {
            let t = t as f64;
            if i < 10 { (t * 0.13).sin() } else { (t * 0.29).cos() + 0.3 * (t * 0.05).sin() }
        });
        let result = TurningPointDetector::new(5.0, 3).waveform(data.view());
        assert_eq!(result, vec![8.5]);
    }

    #[test]
    fn test_dead_channel_correlation_is_zero() {
        let x = ndarray::Array1::from_vec(vec![1.0, 2.0, 3.0]);
        let flat = ndarray::Array1::from_vec(vec![5.0, 5.0, 5.0]);
        assert_eq!(pearson(x.view(), flat.view()), 0.0);
    }

    #[test]
    fn test_unknown_mode_is_invalid_argument() {
        let data = Array2::<f64>::zeros((3, 3));
        let err = turning_points(data.view(), "spectral", 5.0, false, 3).unwrap_err();
        assert!(err.to_string().contains("spectral"));
        assert_eq!("waveform".parse::<DetectionMode>(), Ok(DetectionMode::Waveform));
    }
}
