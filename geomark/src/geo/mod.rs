//! Geographic coordinates and great-circle distance.
//!
//! Provides the WGS84 coordinate type used throughout the crate and the
//! haversine distance used for area reconciliation and proximity checks.

use thiserror::Error;

/// Mean Earth radius in kilometers, used by the haversine formula.
pub const MEAN_EARTH_RADIUS_KM: f64 = 6371.008;

/// Errors that can occur when constructing coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeoError {
    /// Latitude outside [-90, 90] degrees.
    #[error("Invalid latitude: {0} (must be within [-90, 90])")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180] degrees.
    #[error("Invalid longitude: {0} (must be within [-180, 180])")]
    InvalidLongitude(f64),
}

/// A geographic coordinate in degrees (WGS84).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Coordinate {
    /// Latitude in degrees, [-90, 90].
    pub latitude: f64,
    /// Longitude in degrees, [-180, 180].
    pub longitude: f64,
}

impl Coordinate {
    /// Create a validated coordinate.
    ///
    /// # Errors
    ///
    /// Returns an error if either component is non-finite or outside the
    /// valid geographic range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::InvalidLatitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::InvalidLongitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Great-circle distance between two coordinates in kilometers.
///
/// Uses the haversine formula with the mean Earth radius. The intermediate
/// term is clamped to [0, 1] so floating-point overshoot near antipodal
/// inputs can never produce a NaN.
#[inline]
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let lat_sin = (dlat / 2.0).sin();
    let lon_sin = (dlon / 2.0).sin();
    let h = (lat_sin * lat_sin + lat1.cos() * lat2.cos() * lon_sin * lon_sin).clamp(0.0, 1.0);

    2.0 * MEAN_EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}
