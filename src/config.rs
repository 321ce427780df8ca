//! Configuration management for `WeatherWear`
//!
//! Handles loading configuration from files and environment variables and
//! validates every setting before the engine is built from it. Nothing in the
//! engine reads ambient globals: the API key, TTLs and timeouts all flow from
//! this struct into constructors.

use crate::WeatherError;
use crate::location_resolver::Accuracy;
use ::config::{Config, Environment, File};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Conventional environment variable for the provider key
pub const API_KEY_ENV: &str = "WEATHER_API_KEY";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeatherWearConfig {
    /// Weather API configuration
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Location fallback configuration
    #[serde(default)]
    pub location: LocationConfig,
    /// Recommendation scoring settings
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Weather API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Provider API key; absence switches the engine to seasonal fallback data
    pub api_key: Option<String>,
    /// Base URL for weather API
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    /// Unit system requested from the provider
    #[serde(default = "default_units")]
    pub units: String,
    /// Current-weather request timeout in seconds
    #[serde(default = "default_current_timeout")]
    pub current_timeout_seconds: u32,
    /// Forecast request timeout in seconds
    #[serde(default = "default_forecast_timeout")]
    pub forecast_timeout_seconds: u32,
    /// Retries after the first failed attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First backoff delay in milliseconds, doubled per retry
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,
}

/// Cache configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry TTL in minutes
    #[serde(default = "default_cache_ttl")]
    pub ttl_minutes: u32,
    /// Cache directory location
    #[serde(default = "default_cache_location")]
    pub location: String,
    /// Decimal places kept in coordinate cache keys; `None` keeps raw values
    #[serde(default = "default_coordinate_precision")]
    pub coordinate_precision: Option<u32>,
}

/// Location used when the device cannot provide one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_latitude")]
    pub default_latitude: f64,
    #[serde(default = "default_longitude")]
    pub default_longitude: f64,
    #[serde(default = "default_city")]
    pub default_city: Option<String>,
    /// Upper bound on waiting for a position fix
    #[serde(default = "default_fix_timeout")]
    pub fix_timeout_seconds: u32,
    /// Accuracy requested from the platform; coarser fixes arrive faster
    #[serde(default)]
    pub fix_accuracy: Accuracy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Outfits scoring below this are dropped from recommendations
    #[serde(default = "default_min_outfit_score")]
    pub min_outfit_score: f64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_units() -> String {
    "imperial".to_string()
}

fn default_current_timeout() -> u32 {
    10
}

fn default_forecast_timeout() -> u32 {
    15
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_base_delay() -> u64 {
    500
}

fn default_cache_ttl() -> u32 {
    30
}

fn default_cache_location() -> String {
    dirs::cache_dir()
        .map(|dir| dir.join("weatherwear"))
        .unwrap_or_else(|| PathBuf::from(".weatherwear-cache"))
        .to_string_lossy()
        .into_owned()
}

fn default_coordinate_precision() -> Option<u32> {
    Some(2)
}

fn default_latitude() -> f64 {
    40.7128
}

fn default_longitude() -> f64 {
    -74.0060
}

fn default_city() -> Option<String> {
    Some("New York".to_string())
}

fn default_fix_timeout() -> u32 {
    10
}

fn default_min_outfit_score() -> f64 {
    0.35
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_base_url(),
            units: default_units(),
            current_timeout_seconds: default_current_timeout(),
            forecast_timeout_seconds: default_forecast_timeout(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_cache_ttl(),
            location: default_cache_location(),
            coordinate_precision: default_coordinate_precision(),
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            default_latitude: default_latitude(),
            default_longitude: default_longitude(),
            default_city: default_city(),
            fix_timeout_seconds: default_fix_timeout(),
            fix_accuracy: Accuracy::default(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_outfit_score: default_min_outfit_score(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl WeatherConfig {
    #[must_use]
    pub fn current_timeout(&self) -> Duration {
        Duration::from_secs(self.current_timeout_seconds.into())
    }

    #[must_use]
    pub fn forecast_timeout(&self) -> Duration {
        Duration::from_secs(self.forecast_timeout_seconds.into())
    }

    #[must_use]
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

impl CacheConfig {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.ttl_minutes) * 60)
    }
}

impl LocationConfig {
    #[must_use]
    pub fn fix_timeout(&self) -> Duration {
        Duration::from_secs(self.fix_timeout_seconds.into())
    }
}

impl WeatherWearConfig {
    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(::config::FileFormat::Toml),
            );
        }

        // WEATHERWEAR_WEATHER__API_KEY, WEATHERWEAR_CACHE__TTL_MINUTES, ...
        builder = builder.add_source(
            Environment::with_prefix("WEATHERWEAR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: WeatherWearConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        if config.weather.api_key.is_none() {
            config.weather.api_key = std::env::var(API_KEY_ENV).ok();
        }

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("weatherwear").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.weather.base_url.is_empty() {
            self.weather.base_url = default_weather_base_url();
        }
        if self.weather.units.is_empty() {
            self.weather.units = default_units();
        }
        if self.weather.current_timeout_seconds == 0 {
            self.weather.current_timeout_seconds = default_current_timeout();
        }
        if self.weather.forecast_timeout_seconds == 0 {
            self.weather.forecast_timeout_seconds = default_forecast_timeout();
        }
        if self.cache.ttl_minutes == 0 {
            self.cache.ttl_minutes = default_cache_ttl();
        }
        if self.cache.location.is_empty() {
            self.cache.location = default_cache_location();
        }
        if self.location.fix_timeout_seconds == 0 {
            self.location.fix_timeout_seconds = default_fix_timeout();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        // An empty key from the environment means "not configured"
        if self
            .weather
            .api_key
            .as_deref()
            .is_some_and(|key| key.trim().is_empty())
        {
            self.weather.api_key = None;
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_key()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// A missing key is a valid state; a present one must look plausible
    pub fn validate_api_key(&self) -> Result<()> {
        if let Some(api_key) = &self.weather.api_key {
            if api_key.is_empty() {
                return Err(WeatherError::config(
                    "Weather API key cannot be empty if provided. Either remove it or provide a valid key.",
                )
                .into());
            }

            if api_key.len() > 100 {
                return Err(WeatherError::config(
                    "Weather API key appears to be invalid (too long). Please check your API key.",
                )
                .into());
            }
        }

        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.weather.current_timeout_seconds > 300 || self.weather.forecast_timeout_seconds > 300
        {
            return Err(WeatherError::config("Weather API timeout cannot exceed 300 seconds").into());
        }

        if self.weather.max_retries > 10 {
            return Err(WeatherError::config("Weather API max retries cannot exceed 10").into());
        }

        if self.cache.ttl_minutes > 7 * 24 * 60 {
            return Err(WeatherError::config("Cache TTL cannot exceed one week").into());
        }

        if self.cache.coordinate_precision.is_some_and(|p| p > 6) {
            return Err(
                WeatherError::config("Coordinate precision cannot exceed 6 decimal places").into(),
            );
        }

        if !(-90.0..=90.0).contains(&self.location.default_latitude)
            || !(-180.0..=180.0).contains(&self.location.default_longitude)
        {
            return Err(WeatherError::config("Default location coordinates are out of range").into());
        }

        if !(0.0..=1.0).contains(&self.scoring.min_outfit_score) {
            return Err(
                WeatherError::config("Minimum outfit score must be between 0.0 and 1.0").into(),
            );
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(WeatherError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(WeatherError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if self.weather.units != "imperial" {
            return Err(WeatherError::config(
                "Only the imperial unit system is supported; scoring bands are in °F",
            )
            .into());
        }

        if !self.weather.base_url.starts_with("http://")
            && !self.weather.base_url.starts_with("https://")
        {
            return Err(
                WeatherError::config("Weather API base URL must be a valid HTTP or HTTPS URL")
                    .into(),
            );
        }

        Ok(())
    }
}
