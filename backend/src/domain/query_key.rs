//! Normalised cache key for a places query.

use std::fmt;

/// `(latitude, longitude, radius)` rounded to a fixed precision.
///
/// Coordinates keep four decimal places (about 11 m), the radius is whole
/// metres, and negative zero is folded into zero so `-0.00001` and `0.0`
/// share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    latitude: String,
    longitude: String,
    radius_meters: u32,
}

impl QueryKey {
    /// Derive the key for a query.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, radius_meters: u32) -> Self {
        Self {
            latitude: format_coordinate(latitude),
            longitude: format_coordinate(longitude),
            radius_meters,
        }
    }

    /// Latitude component.
    #[must_use]
    pub fn latitude(&self) -> &str {
        &self.latitude
    }

    /// Longitude component.
    #[must_use]
    pub fn longitude(&self) -> &str {
        &self.longitude
    }

    /// Radius component.
    #[must_use]
    pub const fn radius_meters(&self) -> u32 {
        self.radius_meters
    }
}

fn format_coordinate(value: f64) -> String {
    let formatted = format!("{value:.4}");
    match formatted.strip_prefix('-') {
        Some(unsigned) if unsigned.chars().all(|c| c == '0' || c == '.') => unsigned.to_owned(),
        _ => formatted,
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.latitude, self.longitude, self.radius_meters
        )
    }
}
