//! das-kit: DAS channel quality and fiber geometry
//!
//! Analysis building blocks for Distributed Acoustic Sensing records, where
//! every channel is one sensing point along an optical fiber.
//!
//! ## Architecture
//!
//! - **Quality**: energy-based bad channel detection with robust trend fitting
//!   and continuity cleanup
//! - **Geometry**: channel positions from sparse known points along a dense
//!   fiber track, UTM projection, turning point detection
//! - **Processing**: record preprocessing and f-k fan masks
//! - **Stats**: robust polynomial fitting shared by the analyses
//! - **Config**: TOML analysis parameters with built-in defaults

pub mod config;
pub mod geometry;
pub mod processing;
pub mod quality;
pub mod stats;
pub mod types;

// Re-export configuration
pub use config::{ConfigError, DasConfig};

// Re-export commonly used types
pub use types::{
    ChannelLabelSets, ChannelQualityReport, CoordinateMode, GeoPosition, InterpolatedChannel,
    KnownPoint, QualityDiagnostics, SegmentInterval, TrackPoint,
};

// Re-export channel quality
pub use quality::{channel_checking, ChannelCheckOptions, ChannelQualityClassifier};

// Re-export geometry
pub use geometry::{
    channel_location, location_interpolation, turning_points, DetectionMode, GeometryError,
    TurningPointDetector, TurningPointError, TurningPoints,
};

// Re-export statistics
pub use stats::{RobustPolynomialFitter, StatsError};

// Re-export processing
pub use processing::ProcessingError;
