//! Great-circle distance

use crate::{GeoError, Result};
use serde::{Deserialize, Serialize};

/// Mean Earth radius used for all distance calculations
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A point on the Earth's surface, in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    /// Create coordinates without range checks
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Create coordinates, rejecting values outside the valid degree ranges
    pub fn checked(lat: f64, lon: f64) -> Result<Self> {
        let coords = Self::new(lat, lon);
        coords.validate()?;
        Ok(coords)
    }

    /// Check that latitude and longitude are finite and in range
    pub fn validate(&self) -> Result<()> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(GeoError::InvalidLatitude(self.lat));
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(GeoError::InvalidLongitude(self.lon));
        }
        Ok(())
    }

    /// Distance to another point in kilometres
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        haversine_km(*self, *other)
    }
}

/// Haversine distance between two points, in kilometres.
///
/// Uses a spherical Earth of radius [`EARTH_RADIUS_KM`] and the
/// `2·atan2(√a, √(1−a))` form of the central angle.
pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lon = (to.lon - from.lon).to_radians();
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair above 1 for antipodal points.
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zero_distance() {
        let p = Coordinates::new(41.0, 29.0);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn test_known_distance() {
        // Istanbul (Taksim) to Ankara (Kizilay), roughly 350 km apart
        let istanbul = Coordinates::new(41.0370, 28.9850);
        let ankara = Coordinates::new(39.9208, 32.8541);
        let d = haversine_km(istanbul, ankara);
        assert!((345.0..355.0).contains(&d), "got {}", d);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let d = haversine_km(Coordinates::new(0.0, 0.0), Coordinates::new(1.0, 0.0));
        let expected = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;
        assert!((d - expected).abs() < 1e-9);
    }

    #[test]
    fn test_antipodal_points() {
        let d = haversine_km(Coordinates::new(0.0, 0.0), Coordinates::new(0.0, 180.0));
        let half_circumference = EARTH_RADIUS_KM * std::f64::consts::PI;
        assert!((d - half_circumference).abs() < 1e-6);
    }

    #[test]
    fn test_checked_rejects_out_of_range() {
        assert_eq!(
            Coordinates::checked(91.0, 0.0),
            Err(GeoError::InvalidLatitude(91.0))
        );
        assert_eq!(
            Coordinates::checked(0.0, -180.5),
            Err(GeoError::InvalidLongitude(-180.5))
        );
        assert!(Coordinates::checked(f64::NAN, 0.0).is_err());
        assert!(Coordinates::checked(-90.0, 180.0).is_ok());
    }

    proptest! {
        #[test]
        fn prop_zero_distance(lat in -90.0f64..=90.0, lon in -180.0f64..=180.0) {
            let p = Coordinates::new(lat, lon);
            prop_assert_eq!(haversine_km(p, p), 0.0);
        }

        #[test]
        fn prop_symmetric(
            lat1 in -90.0f64..=90.0, lon1 in -180.0f64..=180.0,
            lat2 in -90.0f64..=90.0, lon2 in -180.0f64..=180.0,
        ) {
            let a = Coordinates::new(lat1, lon1);
            let b = Coordinates::new(lat2, lon2);
            prop_assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-6);
        }
    }
}
