//! Best-effort key/value cache with time-to-live reads
//!
//! Entries are JSON envelopes `{data, timestamp}` with an epoch-millis write
//! time. Reads past the TTL behave like misses; stale entries are never
//! deleted, the next successful fetch simply overwrites them. Every failure
//! in here is logged and swallowed so the weather path is never blocked by
//! storage.

use crate::config::CacheConfig;
use crate::models::{Location, WeatherContext};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fjall::Keyspace;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task;

/// Injectable source of "now"
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[must_use]
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

pub const LAST_KNOWN_LOCATION_KEY: &str = "last_known_location";
const CURRENT_PREFIX: &str = "weather_cache_";
const FORECAST_PREFIX: &str = "weather_cache_forecast_";

/// Raw string storage underneath the cache
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String) -> Result<()>;
}

/// Persistent store on disk
pub struct FjallStore {
    store: Keyspace,
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

impl FjallStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = fjall::Database::builder(&path).open()?;
        let items = db.keyspace("cache", fjall::KeyspaceCreateOptions::default)?;
        Ok(FjallStore { store: items })
    }
}

#[async_trait]
impl KeyValueStore for FjallStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();

        let maybe_bytes = task::spawn_blocking(move || get_from_store(store, key)).await??;
        Ok(maybe_bytes.map(String::from_utf8).transpose()?)
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        task::spawn_blocking(move || store.insert(key, value.into_bytes())).await??;
        Ok(())
    }
}

/// Process-local store, used in tests and when no cache directory is usable
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// Stored envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    /// Write time, Unix epoch milliseconds
    pub timestamp: i64,
}

/// Forecast payload inside a [`CacheEntry`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredForecast {
    requested_days: usize,
    days: Vec<WeatherContext>,
}

/// TTL cache shared by location, current-weather and forecast lookups
///
/// Cloning is cheap and clones share the same store. Concurrent writers to one
/// key race without coordination; the last write wins.
#[derive(Clone)]
pub struct WeatherCache {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
    coordinate_precision: Option<u32>,
    clock: Clock,
}

impl WeatherCache {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            ttl: config.ttl(),
            coordinate_precision: config.coordinate_precision,
            clock: system_clock(),
        }
    }

    /// Open the on-disk store, degrading to memory if it cannot be opened
    #[must_use]
    pub fn open(config: &CacheConfig) -> Self {
        let store: Arc<dyn KeyValueStore> = match FjallStore::open(&config.location) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::warn!(
                    "Failed to open cache at {}: {}; using in-memory cache",
                    config.location,
                    e
                );
                Arc::new(MemoryStore::new())
            }
        };
        Self::new(store, config)
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Value under `key` if present, decodable and younger than the TTL
    #[tracing::instrument(name = "query_cache", level = "debug", skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.get_entry::<T>(key).await?;
        if self.is_fresh(entry.timestamp) {
            tracing::debug!("Key found and still fresh");
            Some(entry.data)
        } else {
            tracing::debug!("Key found but expired");
            None
        }
    }

    /// Overwrite `key` with `value` stamped at the current time
    #[tracing::instrument(name = "put_cache", level = "debug", skip(self, value))]
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) {
        let entry = CacheEntry {
            data: value,
            timestamp: self.now().timestamp_millis(),
        };
        let payload = match serde_json::to_string(&entry) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Failed to serialize cache entry {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.store.set(key, payload).await {
            tracing::warn!("Failed to write cache entry {}: {}", key, e);
        }
    }

    /// Envelope under `key` regardless of age
    async fn get_entry<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!("Key not found");
                return None;
            }
            Err(e) => {
                tracing::warn!("Failed to read cache entry {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Discarding unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }

    fn is_fresh(&self, timestamp_millis: i64) -> bool {
        let age_millis = self.now().timestamp_millis().saturating_sub(timestamp_millis);
        let ttl_millis = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        age_millis < ttl_millis
    }

    #[must_use]
    pub fn current_key(&self, location: &Location) -> String {
        format!(
            "{CURRENT_PREFIX}{}",
            location.key_fragment(self.coordinate_precision)
        )
    }

    #[must_use]
    pub fn forecast_key(&self, location: &Location) -> String {
        format!(
            "{FORECAST_PREFIX}{}",
            location.key_fragment(self.coordinate_precision)
        )
    }

    /// Fresh current weather for `location`, readable by any subsystem
    pub async fn cached_weather(&self, location: &Location) -> Option<WeatherContext> {
        self.get(&self.current_key(location)).await
    }

    pub async fn store_weather(&self, location: &Location, weather: &WeatherContext) {
        self.set(&self.current_key(location), weather).await;
    }

    /// Fresh forecast fetched for at least `days` days, trimmed to `days`
    ///
    /// A provider may answer with a shorter horizon than requested. The entry
    /// records the request it answered, so asking again for the same or fewer
    /// days is a hit even when fewer records were stored.
    pub async fn cached_forecast(
        &self,
        location: &Location,
        days: usize,
    ) -> Option<Vec<WeatherContext>> {
        let mut stored: StoredForecast = self.get(&self.forecast_key(location)).await?;
        if stored.requested_days < days {
            tracing::debug!(
                "Cached forecast was fetched for {} days, {} requested",
                stored.requested_days,
                days
            );
            return None;
        }
        stored.days.truncate(days);
        Some(stored.days)
    }

    pub async fn store_forecast(
        &self,
        location: &Location,
        requested_days: usize,
        forecast: &[WeatherContext],
    ) {
        let stored = StoredForecast {
            requested_days,
            days: forecast.to_vec(),
        };
        self.set(&self.forecast_key(location), &stored).await;
    }

    /// Most recent stored fix, however old
    pub async fn last_known_location(&self) -> Option<Location> {
        self.get_entry(LAST_KNOWN_LOCATION_KEY)
            .await
            .map(|entry| entry.data)
    }

    /// Stored fix if it is younger than the TTL
    pub async fn recent_location(&self) -> Option<Location> {
        self.get(LAST_KNOWN_LOCATION_KEY).await
    }

    pub async fn remember_location(&self, location: &Location) {
        self.set(LAST_KNOWN_LOCATION_KEY, location).await;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::WeatherCondition;
    use std::sync::Mutex;

    /// Clock that tests can move forward by hand
    pub(crate) struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        pub(crate) fn starting_at(now: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self(Mutex::new(now)))
        }

        pub(crate) fn advance(&self, by: chrono::Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }

        pub(crate) fn clock(self: &Arc<Self>) -> Clock {
            let this = Arc::clone(self);
            Arc::new(move || *this.0.lock().unwrap())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl KeyValueStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(anyhow::anyhow!("disk on fire"))
        }

        async fn set(&self, _key: &str, _value: String) -> Result<()> {
            Err(anyhow::anyhow!("disk full"))
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-14T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn sample_weather() -> WeatherContext {
        WeatherContext::new(58, WeatherCondition::Cloudy, 62, Some(7.0), "Boston", t0())
    }

    fn memory_cache(clock: Clock) -> WeatherCache {
        WeatherCache::new(Arc::new(MemoryStore::new()), &CacheConfig::default()).with_clock(clock)
    }

    #[tokio::test]
    async fn test_entry_served_until_ttl_then_bypassed() {
        let manual = ManualClock::starting_at(t0());
        let cache = memory_cache(manual.clock());
        let location = Location::new(42.3601, -71.0589);

        cache.store_weather(&location, &sample_weather()).await;

        manual.advance(chrono::Duration::minutes(29));
        assert_eq!(cache.cached_weather(&location).await, Some(sample_weather()));

        manual.advance(chrono::Duration::minutes(2));
        assert_eq!(cache.cached_weather(&location).await, None);
    }

    #[tokio::test]
    async fn test_stale_entry_is_overwritten_not_evicted() {
        let manual = ManualClock::starting_at(t0());
        let cache = memory_cache(manual.clock());

        cache.set("k", &1_u32).await;
        manual.advance(chrono::Duration::hours(2));
        assert_eq!(cache.get::<u32>("k").await, None);
        // still physically present for untimed readers
        assert!(cache.get_entry::<u32>("k").await.is_some());

        cache.set("k", &2_u32).await;
        assert_eq!(cache.get::<u32>("k").await, Some(2));
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_a_miss() {
        let store = Arc::new(MemoryStore::new());
        store.set("weather_cache_1.00_2.00", "{not-json".to_string()).await.unwrap();
        let cache = WeatherCache::new(store, &CacheConfig::default());

        assert_eq!(cache.cached_weather(&Location::new(1.0, 2.0)).await, None);
    }

    #[tokio::test]
    async fn test_store_failures_are_swallowed() {
        let cache = WeatherCache::new(Arc::new(FailingStore), &CacheConfig::default());
        let location = Location::new(1.0, 2.0);

        cache.store_weather(&location, &sample_weather()).await;
        assert_eq!(cache.cached_weather(&location).await, None);
        assert_eq!(cache.last_known_location().await, None);
    }

    #[tokio::test]
    async fn test_keys_follow_coordinate_precision() {
        let location = Location::new(40.712_776, -74.005_974);
        let rounded = memory_cache(system_clock());
        assert_eq!(rounded.current_key(&location), "weather_cache_40.71_-74.01");
        assert_eq!(
            rounded.forecast_key(&location),
            "weather_cache_forecast_40.71_-74.01"
        );

        let config = CacheConfig {
            coordinate_precision: None,
            ..CacheConfig::default()
        };
        let raw = WeatherCache::new(Arc::new(MemoryStore::new()), &config);
        assert_eq!(
            raw.current_key(&location),
            "weather_cache_40.712776_-74.005974"
        );
    }

    #[tokio::test]
    async fn test_forecast_hit_depends_on_requested_days() {
        let cache = memory_cache(system_clock());
        let location = Location::new(1.0, 2.0);
        let days = vec![sample_weather(), sample_weather(), sample_weather()];

        cache.store_forecast(&location, 3, &days).await;

        assert_eq!(cache.cached_forecast(&location, 2).await.map(|f| f.len()), Some(2));
        assert_eq!(cache.cached_forecast(&location, 5).await, None);
    }

    #[tokio::test]
    async fn test_short_forecast_is_a_hit_for_its_request() {
        let cache = memory_cache(system_clock());
        let location = Location::new(1.0, 2.0);
        let days = vec![sample_weather(), sample_weather()];

        // provider only knew two days of a seven-day request
        cache.store_forecast(&location, 7, &days).await;

        assert_eq!(cache.cached_forecast(&location, 7).await, Some(days.clone()));
        assert_eq!(cache.cached_forecast(&location, 1).await.map(|f| f.len()), Some(1));
        assert_eq!(cache.cached_forecast(&location, 8).await, None);
    }

    #[tokio::test]
    async fn test_bare_forecast_list_is_a_miss() {
        let cache = memory_cache(system_clock());
        let location = Location::new(1.0, 2.0);

        let key = cache.forecast_key(&location);
        cache.set(&key, &vec![sample_weather()]).await;

        assert_eq!(cache.cached_forecast(&location, 1).await, None);
    }

    #[tokio::test]
    async fn test_last_known_location_ignores_ttl() {
        let manual = ManualClock::starting_at(t0());
        let cache = memory_cache(manual.clock());
        let home = Location::with_city(51.5072, -0.1276, "London");

        cache.remember_location(&home).await;
        manual.advance(chrono::Duration::days(3));

        assert_eq!(cache.recent_location().await, None);
        assert_eq!(cache.last_known_location().await, Some(home));
    }

    #[tokio::test]
    async fn test_fjall_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FjallStore::open(dir.path()).unwrap();

        assert_eq!(store.get("missing").await.unwrap(), None);
        store.set("key", "value".to_string()).await.unwrap();
        assert_eq!(store.get("key").await.unwrap().as_deref(), Some("value"));
    }
}
