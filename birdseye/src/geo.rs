//! Geodesy helpers for the sensor platform.
//!
//! # Conventions
//!
//! - Positions are `(latitude, longitude)` in degrees.
//! - [`bearing_between`] returns a compass bearing (0 = north, clockwise).
//! - The tracker works in the sensor azimuth convention (0 = east,
//!   counter-clockwise), which is what [`course_between`] and
//!   [`yaw_to_azimuth`] produce.
//! - Distances are metres on a spherical earth.

use std::f64::consts::PI;

/// A `(latitude, longitude)` pair in degrees.
pub type LatLon = (f64, f64);

/// Mean earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

const DEG_TO_RAD: f64 = PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / PI;

/// Calculate the initial compass bearing from one position to another.
///
/// Returns degrees in `[0, 360)`, 0 = north, 90 = east.
pub fn bearing_between(from: LatLon, to: LatLon) -> f64 {
    let (lat1, lon1) = from;
    let (lat2, lon2) = to;

    let lat1_rad = lat1 * DEG_TO_RAD;
    let lat2_rad = lat2 * DEG_TO_RAD;
    let delta_lon = (lon2 - lon1) * DEG_TO_RAD;

    let y = delta_lon.sin() * lat2_rad.cos();
    let x = lat1_rad.cos() * lat2_rad.sin() - lat1_rad.sin() * lat2_rad.cos() * delta_lon.cos();

    normalize_degrees(y.atan2(x) * RAD_TO_DEG)
}

/// Great-circle distance between two positions in metres (haversine).
pub fn distance_m(from: LatLon, to: LatLon) -> f64 {
    let (lat1, lon1) = from;
    let (lat2, lon2) = to;

    let lat1_rad = lat1 * DEG_TO_RAD;
    let lat2_rad = lat2 * DEG_TO_RAD;
    let delta_lat = (lat2 - lat1) * DEG_TO_RAD;
    let delta_lon = (lon2 - lon1) * DEG_TO_RAD;

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_M * c
}

/// Direction of movement from `from` to `to` in the sensor azimuth convention.
pub fn course_between(from: LatLon, to: LatLon) -> f64 {
    compass_to_azimuth(bearing_between(from, to))
}

/// Convert a compass bearing (north, clockwise) into a sensor azimuth
/// (east, counter-clockwise).
pub fn compass_to_azimuth(compass: f64) -> f64 {
    normalize_degrees(90.0 - compass)
}

/// Convert a north-relative yaw report into the sensor azimuth.
///
/// Autopilot yaw is a compass heading, so this is the same transform as
/// [`compass_to_azimuth`]: `-yaw + 90`.
pub fn yaw_to_azimuth(yaw: f64) -> f64 {
    compass_to_azimuth(yaw)
}

/// Normalize an angle to `[0, 360)` degrees.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let d = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if d >= 360.0 {
        0.0
    } else {
        d
    }
}

/// Wrap an angular difference into `[-180, 180)` degrees.
pub fn wrap_delta(degrees: f64) -> f64 {
    (degrees + 180.0).rem_euclid(360.0) - 180.0
}

/// Local east/north tangent plane anchored at a fixed origin.
///
/// Uses an equirectangular approximation, which is accurate to well under a
/// metre over the few kilometres a ground sensor covers in one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    origin: LatLon,
    cos_lat: f64,
}

impl LocalFrame {
    /// Create a frame anchored at `origin`.
    pub fn new(origin: LatLon) -> Self {
        Self {
            origin,
            cos_lat: (origin.0 * DEG_TO_RAD).cos(),
        }
    }

    /// The anchor position.
    pub fn origin(&self) -> LatLon {
        self.origin
    }

    /// Project a position into `(east, north)` metres from the origin.
    pub fn to_local(&self, position: LatLon) -> (f64, f64) {
        let north = (position.0 - self.origin.0) * DEG_TO_RAD * EARTH_RADIUS_M;
        let east = (position.1 - self.origin.1) * DEG_TO_RAD * EARTH_RADIUS_M * self.cos_lat;
        (east, north)
    }

    /// Inverse of [`LocalFrame::to_local`].
    pub fn to_geodetic(&self, local: (f64, f64)) -> LatLon {
        let (east, north) = local;
        let lat = self.origin.0 + north / EARTH_RADIUS_M * RAD_TO_DEG;
        let lon = if self.cos_lat.abs() < 1e-12 {
            self.origin.1
        } else {
            self.origin.1 + east / (EARTH_RADIUS_M * self.cos_lat) * RAD_TO_DEG
        };
        (lat, lon)
    }
}
