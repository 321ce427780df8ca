//! `WeatherWear` - weather-aware outfit appropriateness engine
//!
//! This library resolves the user's location, obtains current and forecast
//! weather through a TTL cache with seasonal fallback, and scores clothing
//! items and outfits against that weather.

pub mod cache;
pub mod config;
pub mod error;
pub mod fallback;
pub mod location_resolver;
pub mod models;
pub mod recommendation;
pub mod retry;
pub mod scoring;
pub mod service;
pub mod suggestions;
pub mod telemetry;
pub mod weather;

// Re-export core types for public API
pub use cache::{FjallStore, KeyValueStore, MemoryStore, WeatherCache};
pub use config::WeatherWearConfig;
pub use error::WeatherError;
pub use fallback::FallbackGenerator;
pub use location_resolver::{LocationProvider, LocationResolver, StaticLocationProvider};
pub use models::{
    ClothingItem, Location, Outfit, OutfitCandidate, Provenance, WeatherCondition, WeatherContext,
};
pub use recommendation::{RankedOutfit, filter_recommendations, outfit_score, rank_recommendations};
pub use retry::{BackoffRetry, RetryContext, RetryExecutor, RetryPolicy};
pub use scoring::score_item;
pub use service::WeatherService;
pub use suggestions::weather_suggestions;
pub use weather::{WeatherApiClient, WeatherProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, WeatherError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
