//! Channel quality analysis
//!
//! - `continuity`: move channels between label sets by neighbourhood density
//! - `classifier`: energy-based good/bad channel split

pub mod classifier;
pub mod continuity;

pub use classifier::{channel_checking, channel_energy, ChannelCheckOptions, ChannelQualityClassifier};
pub use continuity::ContinuityReconciler;
