//! Weather acquisition service
//!
//! Chains location resolution, the TTL cache and the provider client, and
//! recovers every failure into seasonal fallback data. Both entry points are
//! total: they always hand back usable weather.

use crate::cache::WeatherCache;
use crate::config::WeatherWearConfig;
use crate::fallback::FallbackGenerator;
use crate::location_resolver::{LocationProvider, LocationResolver};
use crate::models::{Location, Outfit, WeatherContext};
use crate::recommendation::{RankedOutfit, rank_recommendations};
use crate::retry::{BackoffRetry, RetryContext, RetryExecutor, RetryPolicy};
use crate::weather::{WeatherApiClient, WeatherProvider};
use crate::{Result, WeatherError};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

const CURRENT_CONTEXT: RetryContext = RetryContext::new("weather_service", "current weather");

/// Turn a failed fetch into fallback weather
pub fn recover(result: Result<WeatherContext>, fallback: &FallbackGenerator) -> WeatherContext {
    match result {
        Ok(weather) => weather,
        Err(e) => {
            warn!("Weather unavailable ({}), using seasonal fallback", e);
            fallback.fallback_current()
        }
    }
}

pub struct WeatherService<R = BackoffRetry> {
    resolver: LocationResolver,
    cache: WeatherCache,
    provider: Arc<dyn WeatherProvider>,
    retry: R,
    policy: RetryPolicy,
    fallback: FallbackGenerator,
    min_outfit_score: f64,
}

impl WeatherService<BackoffRetry> {
    #[must_use]
    pub fn new(
        resolver: LocationResolver,
        cache: WeatherCache,
        provider: Arc<dyn WeatherProvider>,
    ) -> Self {
        Self {
            resolver,
            cache,
            provider,
            retry: BackoffRetry,
            policy: RetryPolicy::default(),
            fallback: FallbackGenerator::new(),
            min_outfit_score: crate::recommendation::DEFAULT_MIN_SCORE,
        }
    }

    /// Wire the stock components from configuration
    ///
    /// Opens the persistent cache and builds the HTTP client; the location
    /// provider is supplied by the platform layer.
    pub fn from_config(
        config: &WeatherWearConfig,
        location_provider: Arc<dyn LocationProvider>,
        offline: bool,
    ) -> Result<Self> {
        let cache = WeatherCache::open(&config.cache);
        let fallback = FallbackGenerator::new();
        let client = WeatherApiClient::new(config.weather.clone(), fallback.clone())?;
        let resolver = LocationResolver::new(location_provider, cache.clone(), config.location.clone());

        Ok(Self::new(resolver, cache, Arc::new(client))
            .with_policy(RetryPolicy::from_config(&config.weather).offline(offline))
            .with_fallback(fallback)
            .with_min_outfit_score(config.scoring.min_outfit_score))
    }
}

impl<R: RetryExecutor> WeatherService<R> {
    /// Swap the retry capability
    pub fn with_retry<E: RetryExecutor>(self, retry: E) -> WeatherService<E> {
        WeatherService {
            resolver: self.resolver,
            cache: self.cache,
            provider: self.provider,
            retry,
            policy: self.policy,
            fallback: self.fallback,
            min_outfit_score: self.min_outfit_score,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: FallbackGenerator) -> Self {
        self.fallback = fallback;
        self
    }

    #[must_use]
    pub fn with_min_outfit_score(mut self, min_outfit_score: f64) -> Self {
        self.min_outfit_score = min_outfit_score;
        self
    }

    #[must_use]
    pub fn cache(&self) -> &WeatherCache {
        &self.cache
    }

    #[must_use]
    pub fn resolver(&self) -> &LocationResolver {
        &self.resolver
    }

    /// Current weather for the user's location, never fails
    #[instrument(skip(self))]
    pub async fn current_weather(&self) -> WeatherContext {
        let location = self.resolver.recent_or_resolve().await;
        self.current_weather_at(&location).await
    }

    /// Current weather for an explicit location, never fails
    #[instrument(skip(self, location), fields(location = %location.display_name()))]
    pub async fn current_weather_at(&self, location: &Location) -> WeatherContext {
        if let Some(weather) = self.cache.cached_weather(location).await {
            debug!("Using cached weather for {}", location.display_name());
            return weather;
        }

        let start_time = Instant::now();
        let provider: &dyn WeatherProvider = self.provider.as_ref();
        let result = self
            .retry
            .execute_with_retry(
                move || provider.fetch_current(location),
                &CURRENT_CONTEXT,
                &self.policy,
            )
            .await;

        if let Ok(weather) = &result {
            self.store_if_live(location, weather).await;
            debug!(
                "Current weather acquired in {:.3}s",
                start_time.elapsed().as_secs_f64()
            );
        }
        recover(result, &self.fallback)
    }

    /// Per-day forecast for the user's location, never fails
    ///
    /// Returns at most `days` records; a live forecast may cover fewer days
    /// than asked for when the provider's horizon is shorter.
    #[instrument(skip(self))]
    pub async fn forecast(&self, days: usize) -> Vec<WeatherContext> {
        let location = self.resolver.recent_or_resolve().await;
        self.forecast_at(&location, days).await
    }

    #[instrument(skip(self, location), fields(location = %location.display_name()))]
    pub async fn forecast_at(&self, location: &Location, days: usize) -> Vec<WeatherContext> {
        if days == 0 {
            return Vec::new();
        }
        if let Some(forecast) = self.cache.cached_forecast(location, days).await {
            debug!("Using cached {}-day forecast", forecast.len());
            return forecast;
        }

        match self.fetch_forecast_with_retry(location, days).await {
            Ok(forecast) if !forecast.is_empty() => {
                if forecast.iter().all(|day| !day.is_fallback()) {
                    self.cache.store_forecast(location, days, &forecast).await;
                }
                forecast
            }
            Ok(_) => {
                warn!("Provider returned an empty forecast, using seasonal fallback");
                self.fallback.fallback_forecast(days)
            }
            Err(e) => {
                warn!("Forecast unavailable ({}), using seasonal fallback", e);
                self.fallback.fallback_forecast(days)
            }
        }
    }

    /// Score `outfits` against current weather, best first
    pub async fn recommend<O: Outfit>(&self, outfits: Vec<O>) -> (WeatherContext, Vec<RankedOutfit<O>>) {
        let weather = self.current_weather().await;
        let ranked = rank_recommendations(outfits, &weather, self.min_outfit_score);
        info!(
            "{} outfits recommended for {} {}",
            ranked.len(),
            weather.format_temperature(),
            weather.condition
        );
        (weather, ranked)
    }

    async fn fetch_forecast_with_retry(
        &self,
        location: &Location,
        days: usize,
    ) -> Result<Vec<WeatherContext>> {
        if self.policy.offline_mode {
            return Err(WeatherError::offline("forecast"));
        }

        let mut attempt = 0;
        loop {
            match self.provider.fetch_forecast(location, days).await {
                Ok(forecast) => return Ok(forecast),
                Err(e) if e.is_retryable() && attempt < self.policy.max_retries => {
                    let delay = self.policy.backoff_for_attempt(attempt);
                    attempt += 1;
                    warn!(
                        "Forecast fetch failed ({}), retry {}/{} in {}ms",
                        e,
                        attempt,
                        self.policy.max_retries,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Seasonal guesses are never cached so live data is retried next time
    async fn store_if_live(&self, location: &Location, weather: &WeatherContext) {
        if weather.is_fallback() {
            debug!("Not caching fallback weather");
        } else {
            self.cache.store_weather(location, weather).await;
        }
    }
}
