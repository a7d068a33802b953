use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// WGS84 coordinate pair, serialized the way geo-aware search indexes expect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Result<Self, DomainError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(DomainError::out_of_range("latitude", lat, "[-90, 90]"));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(DomainError::out_of_range("longitude", lng, "[-180, 180]"));
        }
        Ok(Self { lat, lng })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_boundaries() {
        assert!(GeoPoint::new(90.0, -180.0).is_ok());
        assert!(GeoPoint::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn rejects_out_of_range_and_nan() {
        let err = GeoPoint::new(90.5, 0.0).unwrap_err();
        assert_eq!(err.field(), "latitude");

        let err = GeoPoint::new(0.0, f64::NAN).unwrap_err();
        assert_eq!(err.field(), "longitude");
    }
}
