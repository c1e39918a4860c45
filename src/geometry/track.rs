//! Arc-length channel interpolation along a fiber track
//!
//! The track is a polyline whose vertices optionally carry a known channel
//! number (anchors). Between two consecutive anchors the fiber length is
//! divided evenly by their channel difference, and channels are placed at
//! that spacing by walking the polyline edge by edge. Only 1-D arc length
//! matters, so tracks that curve back on themselves need no special care.

use tracing::{debug, warn};

use super::GeometryError;
use crate::config::{self, defaults};
use crate::types::{InterpolatedChannel, SegmentInterval};

/// Segment spacing and channel positions produced by one interpolation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackInterpolation {
    pub segments: Vec<SegmentInterval>,
    pub channels: Vec<InterpolatedChannel>,
}

/// Walk state carried from edge to edge within one anchor pair.
///
/// Both fields reset at every anchor: `leftover` to zero, `fraction` to the
/// fractional part of the anchor's channel number.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ArcAccumulator {
    /// Fiber length walked since the last placed channel
    leftover: f64,
    /// Fraction of a channel interval already covered at the anchor
    fraction: f64,
}

/// Channels that land on one edge
#[derive(Debug, Default)]
struct EdgeStep {
    /// Distances from the edge start
    offsets: Vec<f64>,
    /// The remainder completes one more interval at the edge end vertex
    snap_to_end: bool,
}

impl ArcAccumulator {
    fn at_anchor(channel: f64) -> Self {
        Self {
            leftover: 0.0,
            fraction: channel.fract(),
        }
    }

    fn advance(&mut self, edge: f64, spacing: f64, snap_tolerance: f64) -> EdgeStep {
        let available = edge + self.leftover;
        let needed = spacing * (1.0 - self.fraction);
        if available < needed {
            if (needed - available) / spacing < snap_tolerance {
                self.leftover = 0.0;
                self.fraction = 0.0;
                return EdgeStep {
                    offsets: Vec::new(),
                    snap_to_end: true,
                };
            }
            self.leftover = available;
            return EdgeStep::default();
        }

        let count = (available / spacing + self.fraction).floor() as usize;
        let offsets = (0..count)
            .map(|k| (k as f64 + 1.0 - self.fraction) * spacing - self.leftover)
            .collect();
        self.leftover = available - (count as f64 - self.fraction) * spacing;
        self.fraction = 0.0;

        let snap_to_end = (spacing - self.leftover) / spacing < snap_tolerance;
        if snap_to_end {
            self.leftover = 0.0;
        }

        EdgeStep {
            offsets,
            snap_to_end,
        }
    }
}

/// Places channels along a track from its anchors
#[derive(Debug, Clone)]
pub struct TrackGeometryInterpolator {
    /// Relative tolerance for treating values as integral channels
    pub snap_tolerance: f64,
}

impl Default for TrackGeometryInterpolator {
    fn default() -> Self {
        Self {
            snap_tolerance: config::try_get()
                .map_or(defaults::GEOMETRY_SNAP_TOLERANCE, |c| c.geometry.snap_tolerance),
        }
    }
}

impl TrackGeometryInterpolator {
    /// Interpolate channel positions along the vertices `(x, y)`.
    ///
    /// `channel[i] < 0` marks a vertex with unknown channel number. Output
    /// channel numbers are integers and strictly increasing; the first anchor
    /// is emitted as-is when its channel number is integral.
    pub fn interpolate(
        &self,
        x: &[f64],
        y: &[f64],
        channel: &[f64],
    ) -> Result<TrackInterpolation, GeometryError> {
        if x.len() != y.len() || x.len() != channel.len() {
            return Err(GeometryError::LengthMismatch {
                x: x.len(),
                y: y.len(),
                channel: channel.len(),
            });
        }

        let edges: Vec<f64> = x
            .windows(2)
            .zip(y.windows(2))
            .map(|(xs, ys)| (xs[1] - xs[0]).hypot(ys[1] - ys[0]))
            .collect();
        let cumulative: Vec<f64> = std::iter::once(0.0)
            .chain(edges.iter().scan(0.0, |acc, l| {
                *acc += l;
                Some(*acc)
            }))
            .collect();

        let anchors: Vec<usize> = channel
            .iter()
            .enumerate()
            .filter(|(_, c)| **c >= 0.0)
            .map(|(i, _)| i)
            .collect();
        let &first = anchors.first().ok_or(GeometryError::NoAnchors)?;

        let mut result = TrackInterpolation::default();
        let mut chn = channel[first].floor();
        if (chn - channel[first]).abs() < self.snap_tolerance {
            result.channels.push(InterpolatedChannel {
                coord_a: x[first],
                coord_b: y[first],
                channel: chn,
            });
        }

        for pair in anchors.windows(2) {
            let (istart, iend) = (pair[0], pair[1]);
            let span = channel[iend] - channel[istart];
            if span <= 0.0 {
                return Err(GeometryError::NonIncreasingChannels {
                    start: channel[istart],
                    end: channel[iend],
                });
            }

            let spacing = (cumulative[iend] - cumulative[istart]) / span;
            if spacing <= 0.0 || !spacing.is_finite() {
                return Err(GeometryError::DegenerateSegment {
                    start: channel[istart],
                    end: channel[iend],
                });
            }
            result.segments.push(SegmentInterval {
                start_channel: channel[istart],
                end_channel: channel[iend],
                distance_per_channel: spacing,
            });

            let mut acc = ArcAccumulator::at_anchor(channel[istart]);
            for j in istart..iend {
                let step = acc.advance(edges[j], spacing, self.snap_tolerance);
                for offset in step.offsets {
                    let t = if edges[j] > 0.0 {
                        (offset / edges[j]).clamp(0.0, 1.0)
                    } else {
                        1.0
                    };
                    chn += 1.0;
                    result.channels.push(InterpolatedChannel {
                        coord_a: x[j] + t * (x[j + 1] - x[j]),
                        coord_b: y[j] + t * (y[j + 1] - y[j]),
                        channel: chn,
                    });
                }
                if step.snap_to_end {
                    chn += 1.0;
                    result.channels.push(InterpolatedChannel {
                        coord_a: x[j + 1],
                        coord_b: y[j + 1],
                        channel: chn,
                    });
                }
            }

            let drift = chn - channel[iend].floor();
            if drift.abs() > 0.5 {
                warn!(
                    expected = channel[iend].floor(),
                    reached = chn,
                    "Channel count drifted from anchor numbering"
                );
            }
        }

        debug!(
            anchors = anchors.len(),
            channels = result.channels.len(),
            "Track interpolation complete"
        );
        Ok(result)
    }
}

/// Interpolate with the default snap tolerance.
pub fn channel_location(
    x: &[f64],
    y: &[f64],
    channel: &[f64],
) -> Result<TrackInterpolation, GeometryError> {
    TrackGeometryInterpolator::default().interpolate(x, y, channel)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels(result: &TrackInterpolation) -> Vec<f64> {
        result.channels.iter().map(|c| c.channel).collect()
    }

    #[test]
    fn test_straight_line_two_anchors() {
        let result = channel_location(&[0.0, 0.0], &[0.0, 100.0], &[0.0, 10.0]).unwrap();
        assert_eq!(result.channels.len(), 11);
        for (k, c) in result.channels.iter().enumerate() {
            assert_eq!(c.channel, k as f64);
            assert!(c.coord_a.abs() < 1e-12);
            assert!((c.coord_b - 10.0 * k as f64).abs() < 1e-9);
        }
        assert_eq!(result.segments.len(), 1);
        assert!((result.segments[0].distance_per_channel - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_bent_track_carries_leftover_across_vertices() {
        // 95 m north then 105 m east, anchors at both ends, 10 m spacing
        let x = [0.0, 0.0, 105.0];
        let y = [0.0, 95.0, 95.0];
        let n = [0.0, -1.0, 20.0];
        let result = channel_location(&x, &y, &n).unwrap();

        assert_eq!(channels(&result), (0..=20).map(f64::from).collect::<Vec<_>>());
        // channel 10 sits 5 m past the corner
        let c10 = result.channels[10];
        assert!((c10.coord_a - 5.0).abs() < 1e-9);
        assert!((c10.coord_b - 95.0).abs() < 1e-9);
        let last = result.channels[20];
        assert!((last.coord_a - 105.0).abs() < 1e-9);
    }

    #[test]
    fn test_fractional_start_anchor() {
        let result = channel_location(&[0.0, 0.0], &[0.0, 100.0], &[0.5, 10.5]).unwrap();
        // 0.5 is not emitted; channel 1 lies half an interval from the anchor
        assert_eq!(channels(&result), (1..=10).map(f64::from).collect::<Vec<_>>());
        assert!((result.channels[0].coord_b - 5.0).abs() < 1e-9);
        assert!((result.channels[9].coord_b - 95.0).abs() < 1e-9);
    }

    #[test]
    fn test_multiple_segments_with_different_spacing() {
        let x = [0.0, 0.0, 0.0];
        let y = [0.0, 50.0, 150.0];
        let n = [0.0, 5.0, 15.0];
        let result = channel_location(&x, &y, &n).unwrap();
        assert_eq!(result.segments.len(), 2);
        assert!((result.segments[1].distance_per_channel - 10.0).abs() < 1e-12);
        let chans = channels(&result);
        assert_eq!(chans, (0..=15).map(f64::from).collect::<Vec<_>>());
    }

    #[test]
    fn test_unknown_vertices_before_first_anchor_are_ignored() {
        let x = [-30.0, 0.0, 0.0];
        let y = [0.0, 0.0, 40.0];
        let n = [-1.0, 2.0, 6.0];
        let result = channel_location(&x, &y, &n).unwrap();
        assert_eq!(channels(&result), vec![2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!(result.channels[0].coord_a.abs() < 1e-12);
    }

    #[test]
    fn test_channels_strictly_increasing_on_dense_track() {
        // Quarter circle sampled every degree, anchors at both ends
        let r = 500.0;
        let pts: Vec<(f64, f64)> = (0..=90)
            .map(|d| {
                let a = f64::from(d).to_radians();
                (r * a.cos(), r * a.sin())
            })
            .collect();
        let x: Vec<f64> = pts.iter().map(|p| p.0).collect();
        let y: Vec<f64> = pts.iter().map(|p| p.1).collect();
        let mut n = vec![-1.0; 91];
        n[0] = 0.0;
        n[90] = 77.0;
        let result = channel_location(&x, &y, &n).unwrap();
        let chans = channels(&result);
        assert!(chans.windows(2).all(|w| w[1] > w[0]));
        assert_eq!(chans.first(), Some(&0.0));
        assert_eq!(chans.last(), Some(&77.0));
    }

    #[test]
    fn test_accumulator_places_and_carries() {
        let mut acc = ArcAccumulator::at_anchor(0.0);
        let step = acc.advance(2.0, 5.0, 1e-6);
        assert!(step.offsets.is_empty() && !step.snap_to_end);
        assert_eq!(acc.leftover, 2.0);

        let step = acc.advance(4.0, 5.0, 1e-6);
        assert_eq!(step.offsets, vec![3.0]);
        assert!(!step.snap_to_end);
        assert!((acc.leftover - 1.0).abs() < 1e-12);

        let mut acc = ArcAccumulator::at_anchor(0.5);
        let step = acc.advance(10.0, 5.0, 1e-6);
        assert_eq!(step.offsets, vec![2.5, 7.5]);
        assert!((acc.leftover - 2.5).abs() < 1e-12);
        assert_eq!(acc.fraction, 0.0);
    }

    #[test]
    fn test_accumulator_snaps_short_remainder() {
        // Edge ends a hair before the next channel
        let mut acc = ArcAccumulator::at_anchor(0.0);
        let step = acc.advance(5.0 - 1e-12, 5.0, 1e-6);
        assert!(step.offsets.is_empty());
        assert!(step.snap_to_end);
        assert_eq!(acc.leftover, 0.0);
    }

    #[test]
    fn test_accumulator_snaps_after_placing() {
        // One channel mid-edge, the next falls a hair past the edge end
        let mut acc = ArcAccumulator::at_anchor(0.0);
        let step = acc.advance(10.0 - 1e-12, 5.0, 1e-6);
        assert_eq!(step.offsets, vec![5.0]);
        assert!(step.snap_to_end);
        assert_eq!(acc.leftover, 0.0);
    }

    #[test]
    fn test_end_anchor_exact_on_fine_track() {
        // 0.1 m vertices, 5 m channel spacing accumulated in floating point
        let y: Vec<f64> = (0..=100).map(|i| f64::from(i) * 0.1).collect();
        let x = vec![0.0; y.len()];
        let mut n = vec![-1.0; y.len()];
        n[0] = 0.0;
        n[100] = 2.0;

        let result = channel_location(&x, &y, &n).unwrap();
        assert_eq!(channels(&result), vec![0.0, 1.0, 2.0]);
        assert!((result.channels[1].coord_b - 5.0).abs() < 1e-9);
        let end = result.channels[2];
        assert_eq!(end.channel, 2.0);
        assert_eq!(end.coord_a, 0.0);
        assert!((end.coord_b - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_end_anchor_exact_with_unit_vertices() {
        // 1 m vertices, 5 m spacing, three anchors
        let y: Vec<f64> = (0..=30).map(f64::from).collect();
        let x = vec![0.0; y.len()];
        let mut n = vec![-1.0; y.len()];
        n[0] = 0.0;
        n[10] = 2.0;
        n[30] = 6.0;

        let result = channel_location(&x, &y, &n).unwrap();
        assert_eq!(channels(&result), (0..=6).map(f64::from).collect::<Vec<_>>());
        for c in &result.channels {
            assert!((c.coord_b - 5.0 * c.channel).abs() < 1e-9);
        }
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            channel_location(&[0.0], &[0.0, 1.0], &[0.0, 1.0]),
            Err(GeometryError::LengthMismatch { .. })
        ));
        assert!(matches!(
            channel_location(&[0.0, 1.0], &[0.0, 0.0], &[-1.0, -1.0]),
            Err(GeometryError::NoAnchors)
        ));
        assert!(matches!(
            channel_location(&[0.0, 1.0], &[0.0, 0.0], &[5.0, 3.0]),
            Err(GeometryError::NonIncreasingChannels { .. })
        ));
        assert!(matches!(
            channel_location(&[0.0, 0.0], &[0.0, 0.0], &[0.0, 3.0]),
            Err(GeometryError::DegenerateSegment { .. })
        ));
    }
}
