//! Location Resolution Module
//!
//! Obtains the user's approximate position from a platform location provider
//! and degrades through the last stored fix to a configured default, so
//! resolution never fails the caller.

use crate::cache::WeatherCache;
use crate::config::LocationConfig;
use crate::models::Location;
use crate::{Result, WeatherError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a foreground location permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Requested fix accuracy; coarser fixes arrive faster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accuracy {
    Lowest,
    Low,
    #[default]
    Balanced,
    High,
}

/// Platform location services
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn request_permission(&self) -> Result<PermissionStatus>;

    /// `(latitude, longitude)` of the device
    async fn current_position(&self, accuracy: Accuracy) -> Result<(f64, f64)>;

    /// City name for a coordinate, if one is known
    async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Result<Option<String>>;
}

/// Provider backed by a fixed, user-supplied position
///
/// With no position it behaves like a device whose permission was denied.
#[derive(Debug, Clone, Default)]
pub struct StaticLocationProvider {
    position: Option<(f64, f64)>,
    city: Option<String>,
}

impl StaticLocationProvider {
    #[must_use]
    pub fn new(position: Option<(f64, f64)>, city: Option<String>) -> Self {
        Self { position, city }
    }

    #[must_use]
    pub fn unavailable() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocationProvider for StaticLocationProvider {
    async fn request_permission(&self) -> Result<PermissionStatus> {
        Ok(if self.position.is_some() {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        })
    }

    async fn current_position(&self, _accuracy: Accuracy) -> Result<(f64, f64)> {
        self.position
            .ok_or_else(|| WeatherError::location("no position configured"))
    }

    async fn reverse_geocode(&self, _latitude: f64, _longitude: f64) -> Result<Option<String>> {
        Ok(self.city.clone())
    }
}

/// Service for resolving the user's location
pub struct LocationResolver {
    provider: Arc<dyn LocationProvider>,
    cache: WeatherCache,
    config: LocationConfig,
}

impl LocationResolver {
    #[must_use]
    pub fn new(provider: Arc<dyn LocationProvider>, cache: WeatherCache, config: LocationConfig) -> Self {
        Self {
            provider,
            cache,
            config,
        }
    }

    /// Resolve the current location; never fails
    ///
    /// Tries a fresh fix, then the last stored fix, then the configured
    /// default. Fresh and promoted fixes are persisted for future fallback.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_location(&self) -> Location {
        match self.fresh_fix().await {
            Ok(location) => {
                debug!(
                    "Resolved location: {} at ({}, {})",
                    location.display_name(),
                    location.latitude,
                    location.longitude
                );
                self.cache.remember_location(&location).await;
                location
            }
            Err(e) => {
                warn!("Location fix unavailable: {}", e);
                if let Some(location) = self.cache.last_known_location().await {
                    info!("Using last known location {}", location.display_name());
                    self.cache.remember_location(&location).await;
                    location
                } else {
                    info!("No stored location, using configured default");
                    self.default_location()
                }
            }
        }
    }

    /// Reuse a fix younger than the cache TTL, otherwise resolve anew
    ///
    /// Skips the permission API entirely when a recent fix exists.
    pub async fn recent_or_resolve(&self) -> Location {
        if let Some(location) = self.cache.recent_location().await {
            debug!("Reusing recent location fix {}", location.display_name());
            return location;
        }
        self.resolve_location().await
    }

    #[must_use]
    pub fn default_location(&self) -> Location {
        Location {
            latitude: self.config.default_latitude,
            longitude: self.config.default_longitude,
            city: self.config.default_city.clone(),
        }
    }

    async fn fresh_fix(&self) -> Result<Location> {
        match self.provider.request_permission().await? {
            PermissionStatus::Granted => {}
            PermissionStatus::Denied => {
                return Err(WeatherError::location("foreground location permission denied"));
            }
        }

        let timeout = self.config.fix_timeout();
        let (latitude, longitude) = tokio::time::timeout(
            timeout,
            self.provider.current_position(self.config.fix_accuracy),
        )
        .await
        .map_err(|_| WeatherError::timeout("location fix", timeout))??;

        // Geocoding only decorates the fix
        let city = match self.provider.reverse_geocode(latitude, longitude).await {
            Ok(city) => city,
            Err(e) => {
                debug!("Reverse geocoding failed: {}, leaving city empty", e);
                None
            }
        };

        Ok(Location {
            latitude,
            longitude,
            city,
        })
    }
}
