//! Channel positions from sparse known points
//!
//! Known points (coordinates + channel number) are either used directly as
//! the fiber track or stamped onto the nearest vertex of a dense track before
//! arc-length interpolation. Geographic inputs go through one UTM projector
//! per request, for both the forward and the inverse transform.

use tracing::{debug, info, warn};

use super::projection::{CoordinateProjector, PlanarProjection};
use super::track::TrackGeometryInterpolator;
use super::GeometryError;
use crate::config;
use crate::types::{CoordinateMode, InterpolatedChannel, KnownPoint, SegmentInterval, TrackPoint};

/// Interpolated channels, plus segment spacing when requested
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationResult {
    /// Geographic requests hold `(latitude, longitude, channel)`, planar
    /// requests `(x, y, channel)`.
    pub channels: Vec<InterpolatedChannel>,
    pub segments: Option<Vec<SegmentInterval>>,
}

/// Interpolates every channel position along a fiber
#[derive(Debug, Clone)]
pub struct LocationInterpolator {
    /// Known points farther than this from every track vertex are dropped.
    /// `None` accepts any distance.
    pub max_anchor_distance: Option<f64>,
    pub mode: CoordinateMode,
    /// Also return the segment spacing
    pub verbose: bool,
    pub track: TrackGeometryInterpolator,
}

impl Default for LocationInterpolator {
    fn default() -> Self {
        Self {
            max_anchor_distance: config::try_get().and_then(|c| c.geometry.max_anchor_distance_m),
            mode: CoordinateMode::default(),
            verbose: false,
            track: TrackGeometryInterpolator::default(),
        }
    }
}

impl LocationInterpolator {
    pub fn new(mode: CoordinateMode, max_anchor_distance: Option<f64>) -> Self {
        Self {
            mode,
            max_anchor_distance,
            ..Self::default()
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Interpolate channel positions from `known` points, optionally along a
    /// dense `track`.
    pub fn interpolate(
        &self,
        known: &[KnownPoint],
        track: Option<&[TrackPoint]>,
    ) -> Result<LocationResult, GeometryError> {
        match self.mode {
            CoordinateMode::Xy => self.interpolate_planar(known, track),
            CoordinateMode::LonLat => {
                let projector = CoordinateProjector::for_longitudes(known.iter().map(|p| p.coord_a));
                debug!(zone = projector.zone(), "Projecting known points to UTM");
                self.interpolate_projected(known, track, &projector)
            }
        }
    }

    /// Interpolate geographic `(lon, lat)` inputs through `projector`.
    ///
    /// The output rows are `(latitude, longitude, channel)`.
    pub fn interpolate_projected<P: PlanarProjection>(
        &self,
        known: &[KnownPoint],
        track: Option<&[TrackPoint]>,
        projector: &P,
    ) -> Result<LocationResult, GeometryError> {
        let planar_known: Vec<KnownPoint> = known
            .iter()
            .map(|p| {
                let (x, y) = projector.to_planar(p.coord_a, p.coord_b);
                KnownPoint::new(x, y, p.channel)
            })
            .collect();
        let planar_track: Option<Vec<TrackPoint>> = track.map(|t| {
            t.iter()
                .map(|p| {
                    let (x, y) = projector.to_planar(p.coord_a, p.coord_b);
                    TrackPoint::new(x, y)
                })
                .collect()
        });

        let mut result = self.interpolate_planar(&planar_known, planar_track.as_deref())?;
        for c in &mut result.channels {
            let (lon, lat) = projector.to_geographic(c.coord_a, c.coord_b);
            c.coord_a = lat;
            c.coord_b = lon;
        }
        Ok(result)
    }

    fn interpolate_planar(
        &self,
        known: &[KnownPoint],
        track: Option<&[TrackPoint]>,
    ) -> Result<LocationResult, GeometryError> {
        let (x, y, n) = match track {
            None => (
                known.iter().map(|p| p.coord_a).collect(),
                known.iter().map(|p| p.coord_b).collect(),
                known.iter().map(|p| p.channel).collect(),
            ),
            Some(track) => self.stamp_track(known, track)?,
        };

        let interp = self.track.interpolate(&x, &y, &n)?;
        info!(
            channels = interp.channels.len(),
            segments = interp.segments.len(),
            mode = %self.mode,
            "Channel locations interpolated"
        );

        Ok(LocationResult {
            channels: interp.channels,
            segments: self.verbose.then_some(interp.segments),
        })
    }

    /// Stamp each known point's channel on its nearest track vertex and drop
    /// the vertices after the last stamped one.
    fn stamp_track(
        &self,
        known: &[KnownPoint],
        track: &[TrackPoint],
    ) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>), GeometryError> {
        let mut channel = vec![-1.0; track.len()];
        let mut last_matched = None;

        for p in known {
            let nearest = track
                .iter()
                .map(|t| (t.coord_a - p.coord_a).hypot(t.coord_b - p.coord_b))
                .enumerate()
                .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
                    Some((_, bd)) if bd <= d => best,
                    _ => Some((i, d)),
                });
            let Some((idx, dist)) = nearest else { break };

            if self.max_anchor_distance.map_or(true, |dx| dist < dx) {
                channel[idx] = p.channel;
                last_matched = Some(idx);
            } else {
                debug!(channel = p.channel, dist, "Known point too far from track, skipped");
            }
        }

        let Some(last) = last_matched else {
            warn!(known = known.len(), "No known point lies near the fiber track");
            return Err(GeometryError::UnreachableGeometry {
                message: "All known points are too far away from the track points. \
                          If they are reliable, merge them in sequence into the track \
                          points and interpolate again."
                    .to_string(),
            });
        };

        let kept = &track[..=last];
        channel.truncate(last + 1);
        Ok((
            kept.iter().map(|t| t.coord_a).collect(),
            kept.iter().map(|t| t.coord_b).collect(),
            channel,
        ))
    }
}

/// Interpolate the positions of all channels.
///
/// `dx` rejects known points at or beyond that distance (m) from the nearest
/// track vertex; it has no effect without a track.
pub fn location_interpolation(
    known: &[KnownPoint],
    track: Option<&[TrackPoint]>,
    dx: Option<f64>,
    mode: CoordinateMode,
    verbose: bool,
) -> Result<LocationResult, GeometryError> {
    LocationInterpolator::new(mode, dx)
        .verbose(verbose)
        .interpolate(known, track)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense_track(len: usize) -> Vec<TrackPoint> {
        (0..=len).map(|i| TrackPoint::new(0.0, i as f64)).collect()
    }

    #[test]
    fn test_xy_without_track() {
        let known = [KnownPoint::new(0.0, 0.0, 0.0), KnownPoint::new(0.0, 100.0, 10.0)];
        let result = location_interpolation(&known, None, None, CoordinateMode::Xy, false).unwrap();
        assert_eq!(result.channels.len(), 11);
        assert!(result.segments.is_none());
        for (k, c) in result.channels.iter().enumerate() {
            assert!((c.coord_b - 10.0 * k as f64).abs() < 1e-9);
        }
    }

    #[test]
    fn test_track_is_truncated_after_last_known_point() {
        let track = dense_track(120);
        let known = [
            KnownPoint::new(0.2, 0.0, 0.0),
            KnownPoint::new(50.0, 50.0, 5.0), // 50 m off the track
            KnownPoint::new(0.1, 100.0, 10.0),
        ];
        let result =
            location_interpolation(&known, Some(&track), Some(1.0), CoordinateMode::Xy, true).unwrap();

        let chans: Vec<f64> = result.channels.iter().map(|c| c.channel).collect();
        assert_eq!(chans, (0..=10).map(f64::from).collect::<Vec<_>>());
        let last = result.channels[10];
        assert!(last.coord_a.abs() < 1e-12);
        assert!((last.coord_b - 100.0).abs() < 1e-9);
        assert_eq!(result.segments.map(|s| s.len()), Some(1));
    }

    #[test]
    fn test_dx_is_strict() {
        let track = dense_track(10);
        let known = [KnownPoint::new(1.0, 0.0, 0.0), KnownPoint::new(1.0, 10.0, 5.0)];
        let err = location_interpolation(&known, Some(&track), Some(1.0), CoordinateMode::Xy, false)
            .unwrap_err();
        assert!(matches!(err, GeometryError::UnreachableGeometry { .. }));
    }

    #[test]
    fn test_unreachable_geometry_message() {
        let track = dense_track(10);
        let known = [KnownPoint::new(30.0, 0.0, 0.0)];
        let err = location_interpolation(&known, Some(&track), Some(5.0), CoordinateMode::Xy, false)
            .unwrap_err();
        assert!(err.to_string().contains("too far away"));
    }

    #[test]
    fn test_lonlat_along_meridian() {
        // ~1 km due north along 3E; output rows are (lat, lon, channel)
        let known = [KnownPoint::new(3.0, 45.0, 0.0), KnownPoint::new(3.0, 45.009, 10.0)];
        let result =
            location_interpolation(&known, None, None, CoordinateMode::LonLat, false).unwrap();

        assert_eq!(result.channels.len(), 11);
        let first = result.channels[0];
        assert!((first.coord_a - 45.0).abs() < 1e-6);
        assert!((first.coord_b - 3.0).abs() < 1e-6);
        let last = result.channels[10];
        assert!((last.coord_a - 45.009).abs() < 1e-6);
        assert!(result
            .channels
            .windows(2)
            .all(|w| w[1].coord_a > w[0].coord_a && (w[1].coord_b - 3.0).abs() < 1e-6));
    }
}
