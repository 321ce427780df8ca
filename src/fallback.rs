//! Seasonal stand-in weather for when live data is unavailable
//!
//! Records produced here are tagged [`Provenance::Fallback`]. The forecast
//! variant injects random day-to-day noise on purpose so downstream filtering
//! is exercised without live data; it is not a prediction.

use crate::cache::{Clock, system_clock};
use crate::models::{Provenance, WeatherCondition, WeatherContext};
use chrono::{DateTime, Datelike, Utc};
use rand::RngExt;

pub const FALLBACK_LOCATION: &str = "Unknown";
pub const FALLBACK_HUMIDITY: u8 = 50;
pub const FALLBACK_WIND_SPEED: f64 = 5.0;

const FORECAST_JITTER_DEGREES: i32 = 5;
const FORECAST_CONDITIONS: [WeatherCondition; 3] = [
    WeatherCondition::Sunny,
    WeatherCondition::Cloudy,
    WeatherCondition::Rainy,
];

/// Temperature and condition typical for the month (northern hemisphere)
#[must_use]
pub fn seasonal_baseline(month: u32) -> (i32, WeatherCondition) {
    match month {
        12 | 1 | 2 => (45, WeatherCondition::Cloudy),
        3..=5 => (65, WeatherCondition::Sunny),
        6..=8 => (80, WeatherCondition::Sunny),
        _ => (60, WeatherCondition::Cloudy),
    }
}

/// Fallback record for the season containing `at`
#[must_use]
pub fn seasonal_weather(at: DateTime<Utc>) -> WeatherContext {
    let (temperature, condition) = seasonal_baseline(at.month());
    WeatherContext::new(
        temperature,
        condition,
        FALLBACK_HUMIDITY,
        Some(FALLBACK_WIND_SPEED),
        FALLBACK_LOCATION,
        at,
    )
    .with_source(Provenance::Fallback)
}

#[derive(Clone)]
pub struct FallbackGenerator {
    clock: Clock,
}

impl Default for FallbackGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: system_clock(),
        }
    }

    #[must_use]
    pub fn with_clock(clock: Clock) -> Self {
        Self { clock }
    }

    #[must_use]
    pub fn fallback_current(&self) -> WeatherContext {
        seasonal_weather((self.clock)())
    }

    #[must_use]
    pub fn fallback_forecast(&self, days: usize) -> Vec<WeatherContext> {
        let mut rng = rand::rng();
        self.fallback_forecast_with_rng(days, &mut rng)
    }

    /// One record per day starting today
    ///
    /// Day 0 is exactly [`Self::fallback_current`]; later days get ±5° jitter
    /// and a condition drawn from sunny, cloudy and rainy.
    pub fn fallback_forecast_with_rng<R: RngExt + ?Sized>(
        &self,
        days: usize,
        rng: &mut R,
    ) -> Vec<WeatherContext> {
        let base = self.fallback_current();

        (0..days)
            .map(|day| {
                if day == 0 {
                    return base.clone();
                }
                let offset = chrono::Duration::days(i64::try_from(day).unwrap_or(i64::MAX / 2));
                let jitter = rng.random_range(-FORECAST_JITTER_DEGREES..=FORECAST_JITTER_DEGREES);
                let condition = FORECAST_CONDITIONS[rng.random_range(0..FORECAST_CONDITIONS.len())];

                WeatherContext {
                    temperature: base.temperature + jitter,
                    condition,
                    timestamp: base.timestamp + offset,
                    ..base.clone()
                }
            })
            .collect()
    }
}
