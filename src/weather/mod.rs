//! Weather provider seam and the HTTP client behind it

use async_trait::async_trait;

use crate::Result;
use crate::models::{Location, WeatherContext};

pub mod openweather;

pub use openweather::WeatherApiClient;

/// Source of normalised weather records
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Current conditions at `location`
    async fn fetch_current(&self, location: &Location) -> Result<WeatherContext>;

    /// One representative record per day, today first, at most `days` long
    async fn fetch_forecast(&self, location: &Location, days: usize)
    -> Result<Vec<WeatherContext>>;
}
