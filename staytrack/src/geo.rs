//! Geographic primitives.
//!
//! Provides the [`Coordinate`] type and great-circle distance used by the
//! acceptance gate, the stay clusterer and the geocode cache. All distances
//! are in meters.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
}

impl Coordinate {
    /// Create a new coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to another coordinate in meters.
    #[inline]
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        haversine_distance(self, other)
    }

    /// Whether `other` lies strictly within `radius_m` of this coordinate.
    #[inline]
    pub fn is_within(&self, other: &Coordinate, radius_m: f64) -> bool {
        self.distance_to(other) < radius_m
    }

    /// Returns a coordinate offset by the given distances in meters.
    ///
    /// Uses an equirectangular approximation, accurate for the short
    /// offsets (tens to hundreds of meters) this crate deals with.
    pub fn offset_meters(&self, north_m: f64, east_m: f64) -> Coordinate {
        let dlat = (north_m / EARTH_RADIUS_M).to_degrees();
        let dlon = (east_m / (EARTH_RADIUS_M * self.latitude.to_radians().cos())).to_degrees();
        Coordinate::new(self.latitude + dlat, self.longitude + dlon)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5}, {:.5}", self.latitude, self.longitude)
    }
}

/// Haversine distance between two coordinates in meters.
pub fn haversine_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}
