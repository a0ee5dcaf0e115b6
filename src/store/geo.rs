//! Geospatial primitives for the geo index

use serde::{Deserialize, Serialize};

/// Earth radius used for great-circle distances, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6372.797_560_856;

/// A (longitude, latitude) pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { longitude, latitude }
    }
}

/// A geo index member found by a radius search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoHit {
    pub member: String,
    pub distance_km: f64,
    pub point: GeoPoint,
}

/// Great-circle distance between two points in kilometers (haversine).
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let half_dlat = (b.latitude - a.latitude).to_radians() / 2.0;
    let half_dlon = (b.longitude - a.longitude).to_radians() / 2.0;

    let h = half_dlat.sin().powi(2) + lat1.cos() * lat2.cos() * half_dlon.sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_is_zero() {
        let p = GeoPoint::new(40.713, -74.006);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn test_one_millidegree_of_latitude() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.001, 0.0);
        let d = haversine_km(a, b);
        assert!((d - 0.1112).abs() < 0.001, "got {}", d);
    }

    #[test]
    fn test_symmetric() {
        let a = GeoPoint::new(51.5, -0.12);
        let b = GeoPoint::new(48.85, 2.35);
        assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-9);
        // London to Paris is roughly 340 km
        assert!((haversine_km(a, b) - 340.0).abs() < 10.0);
    }
}
