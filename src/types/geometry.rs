//! Fiber geometry value types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A location whose channel number is known (possibly fractional).
///
/// In [`CoordinateMode::LonLat`] the coordinates are `(longitude, latitude)`,
/// in [`CoordinateMode::Xy`] they are planar `(x, y)` in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KnownPoint {
    pub coord_a: f64,
    pub coord_b: f64,
    pub channel: f64,
}

impl KnownPoint {
    pub const fn new(coord_a: f64, coord_b: f64, channel: f64) -> Self {
        Self {
            coord_a,
            coord_b,
            channel,
        }
    }
}

/// A fiber track vertex with no known channel number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub coord_a: f64,
    pub coord_b: f64,
}

impl TrackPoint {
    pub const fn new(coord_a: f64, coord_b: f64) -> Self {
        Self { coord_a, coord_b }
    }
}

/// Channel spacing between two consecutive anchors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentInterval {
    pub start_channel: f64,
    pub end_channel: f64,
    /// Arc length per channel along this segment (m)
    pub distance_per_channel: f64,
}

/// One channel position produced by interpolation.
///
/// Planar requests return `(x, y)`. Geographic requests return
/// `(latitude, longitude)`, the order consumed by coordinate-mode turning
/// point detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterpolatedChannel {
    pub coord_a: f64,
    pub coord_b: f64,
    pub channel: f64,
}

/// Geographic channel position for turning point detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPosition {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl From<&InterpolatedChannel> for GeoPosition {
    fn from(c: &InterpolatedChannel) -> Self {
        Self::new(c.coord_a, c.coord_b)
    }
}

/// Coordinate system of the points handed to location interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateMode {
    /// Longitude / latitude in degrees, projected to UTM internally
    #[default]
    LonLat,
    /// Planar metres
    Xy,
}

impl fmt::Display for CoordinateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LonLat => write!(f, "lonlat"),
            Self::Xy => write!(f, "xy"),
        }
    }
}

impl FromStr for CoordinateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lonlat" => Ok(Self::LonLat),
            "xy" => Ok(Self::Xy),
            other => Err(format!("coordinate mode should be 'lonlat' or 'xy', got '{other}'")),
        }
    }
}
