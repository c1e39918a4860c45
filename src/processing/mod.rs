//! Channel × time array preprocessing
//!
//! - `preprocessing`: unit conversion, normalisation, detrending, stacking,
//!   tapering, trimming, padding and resampling of DAS records
//! - `fan_mask`: apparent-velocity fan masks for f-k filtering
//!
//! Records are `ndarray` arrays with one row per channel and one column per
//! time sample.

mod fan_mask;
mod preprocessing;

pub use fan_mask::{fk_fan_mask, FanBound, FanMaskSpec, VelocityPolarity};
pub use preprocessing::*;

use thiserror::Error;

/// Errors in array preprocessing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessingError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
