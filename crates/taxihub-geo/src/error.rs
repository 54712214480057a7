//! Error types for the taxihub-geo crate

use thiserror::Error;

/// Result type alias using `GeoError`
pub type Result<T> = std::result::Result<T, GeoError>;

/// Errors raised while validating geographic input
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    /// Latitude outside [-90, 90] or not finite
    #[error("latitude out of range: {0}")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180] or not finite
    #[error("longitude out of range: {0}")]
    InvalidLongitude(f64),
}
