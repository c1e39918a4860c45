//! UTM projection (WGS84)
//!
//! Transverse Mercator via Krüger's series in the third flattening `n`,
//! truncated at third order (sub-millimetre within a zone). Northing carries
//! no false offset, so points south of the equator get negative northings.

use serde::{Deserialize, Serialize};

/// WGS84 semi-major axis (m)
const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening
const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// UTM central meridian scale factor
const UTM_K0: f64 = 0.9996;
/// UTM false easting (m)
const UTM_FALSE_EASTING: f64 = 500_000.0;

/// Forward/inverse planar projection used by location interpolation.
pub trait PlanarProjection {
    /// `(lon, lat)` in degrees to planar `(x, y)` in metres.
    fn to_planar(&self, lon: f64, lat: f64) -> (f64, f64);
    /// Planar `(x, y)` to `(lon, lat)` in degrees.
    fn to_geographic(&self, x: f64, y: f64) -> (f64, f64);
}

/// UTM projector bound to one zone.
///
/// Built once per interpolation request and passed explicitly, so forward
/// and inverse transforms always share the zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinateProjector {
    zone: i32,
    central_meridian: f64,
    /// k0 * rectifying radius
    scale: f64,
    e: f64,
    alpha: [f64; 3],
    beta: [f64; 3],
    delta: [f64; 3],
}

impl CoordinateProjector {
    /// Projector for UTM `zone`.
    pub fn new(zone: i32) -> Self {
        let n = WGS84_F / (2.0 - WGS84_F);
        let n2 = n * n;
        let n3 = n2 * n;
        let rectifying = WGS84_A / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0);

        Self {
            zone,
            central_meridian: f64::from(zone - 1) * 6.0 - 180.0 + 3.0,
            scale: UTM_K0 * rectifying,
            e: 2.0 * n.sqrt() / (1.0 + n),
            alpha: [
                n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0,
                13.0 * n2 / 48.0 - 3.0 * n3 / 5.0,
                61.0 * n3 / 240.0,
            ],
            beta: [
                n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0,
                n2 / 48.0 + n3 / 15.0,
                17.0 * n3 / 480.0,
            ],
            delta: [
                2.0 * n - 2.0 * n2 / 3.0 - 2.0 * n3,
                7.0 * n2 / 3.0 - 8.0 * n3 / 5.0,
                56.0 * n3 / 15.0,
            ],
        }
    }

    /// Projector whose zone is derived from the longitude span of the points:
    /// `floor((max + min) / 2 / 6) + 31`.
    pub fn for_longitudes(longitudes: impl IntoIterator<Item = f64>) -> Self {
        Self::new(utm_zone(longitudes))
    }

    pub const fn zone(&self) -> i32 {
        self.zone
    }

    pub const fn central_meridian(&self) -> f64 {
        self.central_meridian
    }
}

impl PlanarProjection for CoordinateProjector {
    fn to_planar(&self, lon: f64, lat: f64) -> (f64, f64) {
        let phi = lat.to_radians();
        let dlambda = (lon - self.central_meridian).to_radians();

        let sin_phi = phi.sin();
        let t = (sin_phi.atanh() - self.e * (self.e * sin_phi).atanh()).sinh();
        let xi_p = t.atan2(dlambda.cos());
        let eta_p = (dlambda.sin() / (1.0 + t * t).sqrt()).atanh();

        let mut xi = xi_p;
        let mut eta = eta_p;
        for (j, a) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            xi += a * (k * xi_p).sin() * (k * eta_p).cosh();
            eta += a * (k * xi_p).cos() * (k * eta_p).sinh();
        }

        (UTM_FALSE_EASTING + self.scale * eta, self.scale * xi)
    }

    fn to_geographic(&self, x: f64, y: f64) -> (f64, f64) {
        let xi = y / self.scale;
        let eta = (x - UTM_FALSE_EASTING) / self.scale;

        let mut xi_p = xi;
        let mut eta_p = eta;
        for (j, b) in self.beta.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            xi_p -= b * (k * xi).sin() * (k * eta).cosh();
            eta_p -= b * (k * xi).cos() * (k * eta).sinh();
        }

        let chi = (xi_p.sin() / eta_p.cosh()).asin();
        let mut phi = chi;
        for (j, d) in self.delta.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            phi += d * (k * chi).sin();
        }
        let dlambda = eta_p.sinh().atan2(xi_p.cos());

        (self.central_meridian + dlambda.to_degrees(), phi.to_degrees())
    }
}

/// UTM zone from the midpoint of the longitude span.
pub fn utm_zone(longitudes: impl IntoIterator<Item = f64>) -> i32 {
    let (lo, hi) = longitudes
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() || !hi.is_finite() {
        return 31;
    }
    ((hi + lo) / 2.0 / 6.0).floor() as i32 + 31
}
