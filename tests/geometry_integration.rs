//! Geometry Integration Tests
//!
//! End-to-end scenarios: known points + dense track -> channel positions ->
//! turning points, in both planar and geographic coordinates.

use daskit::geometry::{CoordinateProjector, LocationInterpolator, PlanarProjection};
use daskit::{
    location_interpolation, turning_points, CoordinateMode, GeoPosition, GeometryError,
    KnownPoint, TrackPoint, TurningPointDetector, TurningPoints,
};
use ndarray::Array2;

/// Route library logs through the test writer; `RUST_LOG` picks the level.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_test_writer()
        .try_init();
}

#[test]
fn straight_line_known_points_only() {
    init_tracing();
    let known = [KnownPoint::new(0.0, 0.0, 0.0), KnownPoint::new(0.0, 100.0, 10.0)];
    let result = location_interpolation(&known, None, None, CoordinateMode::Xy, true).unwrap();

    assert_eq!(result.channels.len(), 11);
    for (k, c) in result.channels.iter().enumerate() {
        assert_eq!(c.channel, k as f64);
        assert_eq!(c.coord_a, 0.0);
        assert!((c.coord_b - 10.0 * k as f64).abs() < 1e-9);
    }
    let segments = result.segments.unwrap();
    assert_eq!(segments.len(), 1);
    assert!((segments[0].distance_per_channel - 10.0).abs() < 1e-12);
}

#[test]
fn no_known_point_near_track_is_reported() {
    init_tracing();
    let track: Vec<TrackPoint> = (0..50).map(|i| TrackPoint::new(i as f64, 0.0)).collect();
    let known = [KnownPoint::new(10.0, 40.0, 0.0), KnownPoint::new(30.0, 40.0, 20.0)];

    let err = location_interpolation(&known, Some(&track), Some(2.0), CoordinateMode::Xy, false)
        .unwrap_err();
    assert!(matches!(err, GeometryError::UnreachableGeometry { .. }));
    assert!(err.to_string().contains("merge"));
}

#[test]
fn l_shaped_track_then_turning_point() {
    init_tracing();
    // 100 m east then 100 m north, track vertex every metre, fiber in
    // geographic coordinates near 22.5N 114E
    let proj = CoordinateProjector::new(50);
    let (x0, y0) = proj.to_planar(114.0, 22.5);
    let mut planar: Vec<(f64, f64)> = (0..=100).map(|i| (x0 + i as f64, y0)).collect();
    planar.extend((1..=100).map(|i| (x0 + 100.0, y0 + i as f64)));
    let track: Vec<TrackPoint> = planar
        .iter()
        .map(|&(x, y)| {
            let (lon, lat) = proj.to_geographic(x, y);
            TrackPoint::new(lon, lat)
        })
        .collect();

    let first = track[0];
    let last = track[200];
    let known = [
        KnownPoint::new(first.coord_a, first.coord_b, 0.0),
        KnownPoint::new(last.coord_a, last.coord_b, 40.0),
    ];

    let result = LocationInterpolator::new(CoordinateMode::LonLat, Some(1.0))
        .interpolate(&known, Some(&track))
        .unwrap();
    assert_eq!(result.channels.len(), 41);
    assert!(result.channels.windows(2).all(|w| w[1].channel > w[0].channel));

    // rows are (lat, lon, channel): feed them straight to the detector
    let positions: Vec<GeoPosition> = result.channels.iter().map(GeoPosition::from).collect();
    let detected = TurningPointDetector::new(5.0, 3).coordinate(&positions, None).unwrap();
    assert_eq!(
        detected,
        TurningPoints::Coordinate {
            horizontal: vec![20],
            vertical: None
        }
    );
}

#[test]
fn projection_round_trip_near_zone_centre() {
    init_tracing();
    let lons = [116.2, 116.9, 117.4];
    let proj = CoordinateProjector::for_longitudes(lons);
    assert_eq!(proj.zone(), 50);
    for (lon, lat) in lons.iter().zip([39.5, 40.0, 40.7]) {
        let (x, y) = proj.to_planar(*lon, lat);
        let (lon2, lat2) = proj.to_geographic(x, y);
        assert!((lon - lon2).abs() < 1e-6);
        assert!((lat - lat2).abs() < 1e-6);
    }
}

#[test]
fn waveform_mode_identical_shapes_have_no_break() {
    init_tracing();
    let data = Array2::from_shape_fn((2, 400), |(i, t)| {
        let amp = if i == 0 { 0.2 } else { 7.0 };
        amp * ((t as f64) * 0.05).sin() * ((t as f64) * 0.011).cos()
    });
    match turning_points(data.view(), "waveform", 5.0, false, 3).unwrap() {
        TurningPoints::Waveform(breaks) => assert!(breaks.is_empty()),
        other => panic!("expected waveform result, got {other:?}"),
    }
}

#[test]
fn unknown_detection_mode_is_rejected() {
    init_tracing();
    let data = Array2::<f64>::zeros((4, 2));
    assert!(turning_points(data.view(), "gradient", 5.0, false, 3).is_err());
}
