//! System-wide default constants.
//!
//! Grouped by subsystem. Every value here is also the serde default of the
//! matching [`DasConfig`](super::DasConfig) field.

// ============================================================================
// Channel Quality
// ============================================================================

/// Degree of the polynomial fitted through the log-energy profile.
pub const QUALITY_DEGREE: usize = 10;

/// MAD multiple below the fitted energy trend that marks a bad channel.
pub const QUALITY_THRESH: f64 = 5.0;

/// Run the two continuity passes after the energy split.
pub const QUALITY_CONTINUITY: bool = true;

/// Half-width of the neighbourhood inspected by a continuity pass.
pub const QUALITY_ADJACENT: usize = 2;

/// Number of neighbourhood members (itself included) allowed to disagree.
pub const QUALITY_TOLERATION: usize = 2;

// ============================================================================
// Robust Fitting
// ============================================================================

/// Maximum relative change of the fitted curve at which iteration stops.
pub const FIT_CONVERGENCE_TOLERANCE: f64 = 0.001;

/// Safety cap on reweighting iterations.
pub const FIT_MAX_ITERATIONS: usize = 100;

// ============================================================================
// Track Geometry
// ============================================================================

/// Relative tolerance used to treat a channel number or remainder as integral.
pub const GEOMETRY_SNAP_TOLERANCE: f64 = 1e-6;

// ============================================================================
// Turning Points
// ============================================================================

/// Angle (degrees) or MAD multiple above which a turning point is reported.
pub const TURNING_THRESH: f64 = 5.0;

/// Neighbour offset (channels) used to measure heading and inclination.
pub const TURNING_CHANNEL_GAP: usize = 3;
