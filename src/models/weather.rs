//! Weather snapshot model and condition vocabulary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed condition vocabulary used by scoring and suggestions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCondition {
    Sunny,
    Cloudy,
    Rainy,
    Snowy,
    Stormy,
    Windy,
}

impl WeatherCondition {
    pub const ALL: [WeatherCondition; 6] = [
        WeatherCondition::Sunny,
        WeatherCondition::Cloudy,
        WeatherCondition::Rainy,
        WeatherCondition::Snowy,
        WeatherCondition::Stormy,
        WeatherCondition::Windy,
    ];

    /// Map provider condition text onto the closed vocabulary
    ///
    /// `primary` is the provider's short condition group ("Rain", "Clouds"),
    /// `description` its free-text detail ("light rain", "windy, few clouds").
    /// Rules are case-insensitive substring checks applied in a fixed order;
    /// the first hit wins and unrecognised text maps to [`WeatherCondition::Cloudy`].
    #[must_use]
    pub fn from_provider(primary: &str, description: &str) -> Self {
        let description = description.to_lowercase();
        let text = format!("{} {description}", primary.to_lowercase());

        if text.contains("rain") {
            Self::Rainy
        } else if text.contains("snow") {
            Self::Snowy
        } else if text.contains("storm") || text.contains("thunder") {
            Self::Stormy
        } else if text.contains("cloud") {
            Self::Cloudy
        } else if text.contains("clear") || text.contains("sun") {
            Self::Sunny
        } else if description.contains("wind") {
            Self::Windy
        } else {
            Self::Cloudy
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Sunny => "sunny",
            Self::Cloudy => "cloudy",
            Self::Rainy => "rainy",
            Self::Snowy => "snowy",
            Self::Stormy => "stormy",
            Self::Windy => "windy",
        }
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Observed by the weather provider (possibly served from cache)
    #[default]
    Live,
    /// Synthesised from the calendar season
    Fallback,
}

/// Normalised weather snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherContext {
    /// Temperature in the provider unit (°F)
    pub temperature: i32,
    pub condition: WeatherCondition,
    /// Relative humidity percentage (0-100)
    pub humidity: u8,
    /// Wind speed in mph; `None` scores as calm
    pub wind_speed: Option<f64>,
    /// Display name, `"Unknown"` when nothing better is available
    pub location: String,
    /// When the record was produced or fetched
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub source: Provenance,
}

impl WeatherContext {
    /// Build a live snapshot, normalising out-of-range inputs
    #[must_use]
    pub fn new(
        temperature: i32,
        condition: WeatherCondition,
        humidity: u8,
        wind_speed: Option<f64>,
        location: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let location = location.into();
        Self {
            temperature,
            condition,
            humidity: humidity.min(100),
            wind_speed: wind_speed.filter(|w| w.is_finite()).map(|w| w.max(0.0)),
            location: if location.trim().is_empty() {
                "Unknown".to_string()
            } else {
                location
            },
            timestamp,
            source: Provenance::Live,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: Provenance) -> Self {
        self.source = source;
        self
    }

    /// Wind speed with the absent-means-calm rule applied
    #[must_use]
    pub fn effective_wind_speed(&self) -> f64 {
        self.wind_speed.unwrap_or(0.0)
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.source == Provenance::Fallback
    }

    /// Format temperature with unit
    #[must_use]
    pub fn format_temperature(&self) -> String {
        format!("{}°F", self.temperature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Rain", "light rain", WeatherCondition::Rainy)]
    #[case("Drizzle", "light intensity drizzle rain", WeatherCondition::Rainy)]
    #[case("Snow", "heavy snow", WeatherCondition::Snowy)]
    #[case("Thunderstorm", "thunderstorm", WeatherCondition::Stormy)]
    #[case("Thunderstorm", "thunderstorm with light rain", WeatherCondition::Rainy)]
    #[case("Clouds", "overcast clouds", WeatherCondition::Cloudy)]
    #[case("Clear", "clear sky", WeatherCondition::Sunny)]
    #[case("Squall", "windy squalls", WeatherCondition::Windy)]
    #[case("Mist", "mist", WeatherCondition::Cloudy)]
    #[case("", "", WeatherCondition::Cloudy)]
    #[case("RAIN", "", WeatherCondition::Rainy)]
    fn test_condition_mapping(
        #[case] primary: &str,
        #[case] description: &str,
        #[case] expected: WeatherCondition,
    ) {
        assert_eq!(WeatherCondition::from_provider(primary, description), expected);
    }

    #[test]
    fn test_condition_mapping_is_stable() {
        let first = WeatherCondition::from_provider("Clouds", "broken clouds, windy");
        let second = WeatherCondition::from_provider("Clouds", "broken clouds, windy");
        assert_eq!(first, second);
        assert_eq!(first, WeatherCondition::Cloudy);
    }

    #[test]
    fn test_wind_only_counts_in_description() {
        // "wind" in the primary group alone is not enough
        assert_eq!(
            WeatherCondition::from_provider("Wind", "gusts"),
            WeatherCondition::Cloudy
        );
    }

    #[test]
    fn test_new_normalises_inputs() {
        let ctx = WeatherContext::new(
            70,
            WeatherCondition::Sunny,
            180,
            Some(-3.0),
            "  ",
            Utc::now(),
        );
        assert_eq!(ctx.humidity, 100);
        assert_eq!(ctx.wind_speed, Some(0.0));
        assert_eq!(ctx.location, "Unknown");
        assert!(!ctx.is_fallback());
    }

    #[test]
    fn test_absent_wind_is_calm() {
        let ctx = WeatherContext::new(70, WeatherCondition::Sunny, 50, None, "Oslo", Utc::now());
        assert_eq!(ctx.effective_wind_speed(), 0.0);
        let ctx = WeatherContext::new(70, WeatherCondition::Sunny, 50, Some(f64::NAN), "Oslo", Utc::now());
        assert_eq!(ctx.wind_speed, None);
    }

    #[test]
    fn test_serde_uses_lowercase_condition() {
        let ctx = WeatherContext::new(41, WeatherCondition::Stormy, 80, Some(12.0), "Bergen", Utc::now())
            .with_source(Provenance::Fallback);
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["condition"], "stormy");
        assert_eq!(json["source"], "fallback");
    }

    #[test]
    fn test_missing_source_deserialises_as_live() {
        let json = r#"{"temperature":60,"condition":"cloudy","humidity":40,"wind_speed":null,
            "location":"Paris","timestamp":"2026-01-01T12:00:00Z"}"#;
        let ctx: WeatherContext = serde_json::from_str(json).unwrap();
        assert_eq!(ctx.source, Provenance::Live);
    }
}
