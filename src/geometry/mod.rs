//! Fiber geometry
//!
//! ## Architecture
//! - `projection`: UTM forward/inverse transforms scoped to one request
//! - `track`: arc-length channel placement between anchors
//! - `location`: known points + optional dense track -> channel positions
//! - `turning`: heading/inclination changes and waveform coherence breaks

pub mod location;
pub mod projection;
pub mod track;
pub mod turning;

pub use location::{location_interpolation, LocationInterpolator, LocationResult};
pub use projection::{utm_zone, CoordinateProjector, PlanarProjection};
pub use track::{channel_location, TrackGeometryInterpolator, TrackInterpolation};
pub use turning::{
    horizontal_angle_change, local_maximum_indexes, turning_points, vertical_angle_change,
    DetectionMode, TurningPointDetector, TurningPointError, TurningPoints,
};

use thiserror::Error;

/// Errors raised while placing channels along a fiber
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// No known point lies close enough to the track
    #[error("{message}")]
    UnreachableGeometry { message: String },

    #[error("Coordinate arrays differ in length: x={x}, y={y}, channel={channel}")]
    LengthMismatch { x: usize, y: usize, channel: usize },

    #[error("No vertex carries a known channel number")]
    NoAnchors,

    #[error("Anchor channel numbers must increase along the track: {start} -> {end}")]
    NonIncreasingChannels { start: f64, end: f64 },

    #[error("Zero fiber length between channels {start} and {end}")]
    DegenerateSegment { start: f64, end: f64 },
}
