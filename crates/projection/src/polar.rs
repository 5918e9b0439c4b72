//! Polar stereographic projection on a sphere (north polar aspect).
//!
//! This is the projection of the RADOLAN/RADVOR radar composites.
//! The plane touches the sphere at the pole and is scaled so that the
//! latitude of true scale (60°N for RADOLAN) is distortion free.
//!
//! Forward formulas:
//! - M = (1 + sin φts) / (1 + sin φ)
//! - x = R · M · cos φ · sin(λ - λ0)
//! - y = -R · M · cos φ · cos(λ - λ0)

use std::f64::consts::PI;

use radar_common::StereographicParams;

use crate::ProjectionError;

/// Polar stereographic projection parameters in radians.
#[derive(Debug, Clone, Copy)]
pub struct PolarStereographic {
    /// Central meridian in radians
    pub lon0: f64,
    /// Latitude of true scale in radians
    pub lat_ts: f64,
    /// Sphere radius (meters)
    pub earth_radius: f64,
    /// 1 + sin(lat_ts)
    k: f64,
}

impl PolarStereographic {
    pub fn new(true_scale_lat_deg: f64, central_meridian_deg: f64, earth_radius: f64) -> Self {
        let to_rad = PI / 180.0;
        let lat_ts = true_scale_lat_deg * to_rad;

        Self {
            lon0: central_meridian_deg * to_rad,
            lat_ts,
            earth_radius,
            k: 1.0 + lat_ts.sin(),
        }
    }

    pub fn from_params(params: &StereographicParams) -> Self {
        Self::new(
            params.true_scale_lat,
            params.central_meridian,
            params.earth_radius,
        )
    }

    /// RADOLAN projection: 60°N, 10°E, R = 6 370 040 m.
    pub fn radolan() -> Self {
        Self::from_params(&StereographicParams::radolan())
    }

    /// Convert geographic coordinates (degrees) to projected meters.
    pub fn forward(&self, lat_deg: f64, lon_deg: f64) -> Result<(f64, f64), ProjectionError> {
        if !lat_deg.is_finite() || !lon_deg.is_finite() {
            return Err(ProjectionError::NonFinite {
                lat: lat_deg,
                lon: lon_deg,
            });
        }

        let to_rad = PI / 180.0;
        let lat = lat_deg * to_rad;
        let dlon = lon_deg * to_rad - self.lon0;

        let denom = 1.0 + lat.sin();
        if denom.abs() < 1e-12 {
            return Err(ProjectionError::SingularPoint(lat_deg));
        }

        let m = self.k / denom;
        let x = self.earth_radius * m * lat.cos() * dlon.sin();
        let y = -self.earth_radius * m * lat.cos() * dlon.cos();

        Ok((x, y))
    }

    /// Convert projected meters back to geographic coordinates (degrees).
    ///
    /// Returns (lat, lon).
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let to_deg = 180.0 / PI;

        let rho = (x * x + y * y).sqrt();
        let lat = PI / 2.0 - 2.0 * (rho / (self.earth_radius * self.k)).atan();
        let mut lon = self.lon0 + x.atan2(-y);

        while lon > PI {
            lon -= 2.0 * PI;
        }
        while lon < -PI {
            lon += 2.0 * PI;
        }

        (lat * to_deg, lon * to_deg)
    }
}
