//! Great-circle distance

/// WGS-84 mean sphere radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two decimal-degree coordinates, in meters.
pub fn haversine_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}

/// A simple lat/lng bounding box for `find_in_bounds`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lng >= self.min_lng && lng <= self.max_lng
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_points_are_zero() {
        assert_eq!(haversine_m(42.0, -76.0, 42.0, -76.0), 0.0);
    }

    #[test]
    fn antipodes_are_half_circumference() {
        let d = haversine_m(0.0, 0.0, 0.0, 180.0);
        let expected = std::f64::consts::PI * EARTH_RADIUS_M;
        assert!((d - expected).abs() < 1.0, "got {d}, expected {expected}");
    }

    #[test]
    fn known_distance() {
        // ~1.11 km per 0.01 degree of latitude
        let d = haversine_m(42.0, -76.0, 42.010, -76.0);
        assert!((d - 1_112.0).abs() < 5.0, "got {d}");
    }
}
