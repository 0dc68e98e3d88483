//! Spherical-earth geodesy for course positions.

use serde::{Deserialize, Serialize};

use super::units::normalize_degrees;

/// Mean earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GpsCoordinate {
    /// Latitude, positive north.
    pub latitude: f64,
    /// Longitude, positive east.
    pub longitude: f64,
}

impl GpsCoordinate {
    /// Create a coordinate.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Great-circle distance to `other` in metres (haversine).
    pub fn distance_to(&self, other: &GpsCoordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Initial bearing from `self` towards `other`, degrees in [0, 360).
    pub fn bearing_to(&self, other: &GpsCoordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let y = dlon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
        normalize_degrees(y.atan2(x).to_degrees())
    }

    /// Point reached by travelling `distance_m` metres along `bearing_deg`.
    pub fn destination(&self, distance_m: f64, bearing_deg: f64) -> GpsCoordinate {
        let delta = distance_m / EARTH_RADIUS_M;
        let theta = bearing_deg.to_radians();
        let lat1 = self.latitude.to_radians();
        let lon1 = self.longitude.to_radians();

        let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
        let lon2 = lon1
            + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

        GpsCoordinate {
            latitude: lat2.to_degrees(),
            longitude: (lon2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0,
        }
    }

    /// Midpoint of two coordinates, adequate for the short spans of a course.
    pub fn midpoint(&self, other: &GpsCoordinate) -> GpsCoordinate {
        GpsCoordinate {
            latitude: (self.latitude + other.latitude) / 2.0,
            longitude: (self.longitude + other.longitude) / 2.0,
        }
    }
}

/// Even-odd ray cast test of `point` against a closed polygon.
///
/// Polygons with fewer than three vertices contain nothing.
pub fn is_inside_boundary(point: &GpsCoordinate, boundary: &[GpsCoordinate]) -> bool {
    if boundary.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = boundary.len() - 1;
    for i in 0..boundary.len() {
        let a = &boundary[i];
        let b = &boundary[j];
        let crosses = (a.latitude > point.latitude) != (b.latitude > point.latitude);
        if crosses {
            let lon_at = (b.longitude - a.longitude) * (point.latitude - a.latitude)
                / (b.latitude - a.latitude)
                + a.longitude;
            if point.longitude < lon_at {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::units::angular_distance;

    const AUCKLAND: GpsCoordinate = GpsCoordinate::new(-36.8485, 174.7633);

    #[test]
    fn test_distance_zero() {
        assert_eq!(AUCKLAND.distance_to(&AUCKLAND), 0.0);
    }

    #[test]
    fn test_destination_then_distance() {
        let there = AUCKLAND.destination(1_000.0, 45.0);
        let d = AUCKLAND.distance_to(&there);
        assert!((d - 1_000.0).abs() < 0.01, "distance was {}", d);
    }

    #[test]
    fn test_destination_then_bearing() {
        for bearing in [0.0, 90.0, 180.0, 270.0, 33.0] {
            let there = AUCKLAND.destination(500.0, bearing);
            let back = AUCKLAND.bearing_to(&there);
            assert!(angular_distance(back, bearing) < 0.01, "{} vs {}", back, bearing);
        }
    }

    #[test]
    fn test_bearing_cardinal() {
        let north = GpsCoordinate::new(1.0, 0.0);
        let east = GpsCoordinate::new(0.0, 1.0);
        let origin = GpsCoordinate::default();
        assert!(origin.bearing_to(&north).abs() < 1e-9);
        assert!((origin.bearing_to(&east) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_boundary() {
        let square = [
            GpsCoordinate::new(0.0, 0.0),
            GpsCoordinate::new(0.0, 1.0),
            GpsCoordinate::new(1.0, 1.0),
            GpsCoordinate::new(1.0, 0.0),
        ];
        assert!(is_inside_boundary(&GpsCoordinate::new(0.5, 0.5), &square));
        assert!(!is_inside_boundary(&GpsCoordinate::new(1.5, 0.5), &square));
        assert!(!is_inside_boundary(&GpsCoordinate::new(0.5, 0.5), &square[..2]));
    }
}
