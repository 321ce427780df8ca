//! Location model for geographic coordinates and metadata

use serde::{Deserialize, Serialize};

/// Approximate user position
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Reverse-geocoded city, when geocoding succeeded
    pub city: Option<String>,
}

impl Location {
    /// Create a new location without a city name
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            city: None,
        }
    }

    /// Create location with city
    #[must_use]
    pub fn with_city(latitude: f64, longitude: f64, city: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            city: Some(city.into()),
        }
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }

    /// City if known, coordinates otherwise
    #[must_use]
    pub fn display_name(&self) -> String {
        self.city.clone().unwrap_or_else(|| self.format_coordinates())
    }

    /// Round coordinates for cache key generation
    #[must_use]
    pub fn rounded_coordinates(&self, precision: u32) -> (f64, f64) {
        let multiplier = 10_f64.powi(i32::try_from(precision).unwrap_or(4));
        let lat = (self.latitude * multiplier).round() / multiplier;
        let lon = (self.longitude * multiplier).round() / multiplier;
        (positive_zero(lat), positive_zero(lon))
    }

    /// `<lat>_<lon>` fragment used in cache keys
    ///
    /// With a precision, nearby fixes collapse onto one key so GPS jitter
    /// does not defeat the cache. `None` keeps the raw coordinates.
    #[must_use]
    pub fn key_fragment(&self, precision: Option<u32>) -> String {
        match precision {
            Some(precision) => {
                let (lat, lon) = self.rounded_coordinates(precision);
                let digits = usize::try_from(precision).unwrap_or(2);
                format!("{lat:.digits$}_{lon:.digits$}")
            }
            None => format!(
                "{}_{}",
                positive_zero(self.latitude),
                positive_zero(self.longitude)
            ),
        }
    }
}

/// `-0.0` prints with a sign, which would split one position across two keys
fn positive_zero(value: f64) -> f64 {
    if value == 0.0 { 0.0 } else { value }
}
