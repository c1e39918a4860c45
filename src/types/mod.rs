//! Shared data structures for DAS channel analysis
//!
//! - `quality`: channel label sets and the bad-channel report
//! - `geometry`: anchors, track vertices, segment spacing and interpolated
//!   channel positions

mod geometry;
mod quality;

pub use geometry::*;
pub use quality::*;
