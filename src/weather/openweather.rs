//! HTTP client for the OpenWeather-style current/forecast API
//!
//! Requests always ask for imperial units. Each call runs under its own
//! deadline (10s current, 15s forecast by default); expiry drops the in-flight
//! request and surfaces as [`WeatherError::Timeout`]. Without an API key the
//! client does not touch the network at all and answers with seasonal
//! fallback data.

use super::WeatherProvider;
use crate::config::WeatherConfig;
use crate::fallback::{FALLBACK_HUMIDITY, FallbackGenerator};
use crate::models::{Location, Provenance, WeatherCondition, WeatherContext};
use crate::{Result, WeatherError};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Timelike, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Three-hour slots per forecast day
pub const SLOTS_PER_DAY: usize = 8;

/// Local hours that count as "midday" when picking a day's representative slot
const MIDDAY_HOURS: std::ops::RangeInclusive<u32> = 10..=14;
const NOON: u32 = 12;

/// Current weather payload
#[derive(Debug, Deserialize)]
pub struct CurrentResponse {
    pub main: MainBlock,
    #[serde(default)]
    pub weather: Vec<ConditionBlock>,
    #[serde(default)]
    pub wind: Option<WindBlock>,
    /// Provider's own name for the station area
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MainBlock {
    pub temp: f64,
    #[serde(default)]
    pub humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ConditionBlock {
    #[serde(default)]
    pub main: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct WindBlock {
    #[serde(default)]
    pub speed: Option<f64>,
}

/// Forecast payload: a flat list of 3-hour slots
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub list: Vec<ForecastSlot>,
    #[serde(default)]
    pub city: Option<CityBlock>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastSlot {
    /// Slot start, Unix seconds UTC
    pub dt: i64,
    pub main: MainBlock,
    #[serde(default)]
    pub weather: Vec<ConditionBlock>,
    #[serde(default)]
    pub wind: Option<WindBlock>,
}

#[derive(Debug, Deserialize)]
pub struct CityBlock {
    #[serde(default)]
    pub name: Option<String>,
    /// Offset from UTC in seconds
    #[serde(default)]
    pub timezone: Option<i32>,
}

/// Weather API client
pub struct WeatherApiClient {
    client: Client,
    config: WeatherConfig,
    fallback: FallbackGenerator,
}

impl WeatherApiClient {
    /// Create a new weather API client
    pub fn new(config: WeatherConfig, fallback: FallbackGenerator) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("WeatherWear/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WeatherError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            fallback,
        })
    }

    fn endpoint(&self, path: &str, api_key: &str, location: &Location, extra: &[(&str, String)]) -> Result<Url> {
        let mut params = vec![
            ("latitude", location.latitude.to_string()),
            ("longitude", location.longitude.to_string()),
            ("apiKey", api_key.to_string()),
            ("units", self.config.units.clone()),
        ];
        params.extend(extra.iter().map(|(k, v)| (*k, v.clone())));

        let base = self.config.base_url.trim_end_matches('/');
        Url::parse_with_params(&format!("{base}/{path}"), &params)
            .map_err(|e| WeatherError::config(format!("Invalid weather API URL: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| WeatherError::network(format!("API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WeatherError::status(
                status.as_u16(),
                format!(
                    "{} {}",
                    status.canonical_reason().unwrap_or("Unknown error"),
                    body.chars().take(200).collect::<String>()
                )
                .trim()
                .to_string(),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| WeatherError::parse(format!("Failed to parse weather response: {e}")))
    }
}

/// Run `fut` under a deadline, mapping expiry to a timeout error
async fn with_deadline<T>(
    operation: &'static str,
    deadline: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| WeatherError::timeout(operation, deadline))?
}

#[async_trait]
impl WeatherProvider for WeatherApiClient {
    #[instrument(skip(self, location), fields(lat = location.latitude, lon = location.longitude))]
    async fn fetch_current(&self, location: &Location) -> Result<WeatherContext> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            debug!("No API key configured, using seasonal fallback");
            return Ok(self.fallback.fallback_current());
        };

        let start_time = Instant::now();
        let url = self.endpoint("weather", api_key, location, &[])?;
        let response: CurrentResponse =
            with_deadline("current weather", self.config.current_timeout(), self.get_json(url))
                .await?;

        let weather = parse_current(response, location, Utc::now())?;
        let total_duration = start_time.elapsed();
        info!(
            "Retrieved current weather for {} in {:.3}s",
            weather.location,
            total_duration.as_secs_f64()
        );
        if total_duration.as_secs() > 5 {
            warn!("Slow API response detected: {:.3}s", total_duration.as_secs_f64());
        }
        Ok(weather)
    }

    #[instrument(skip(self, location), fields(lat = location.latitude, lon = location.longitude))]
    async fn fetch_forecast(&self, location: &Location, days: usize) -> Result<Vec<WeatherContext>> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            debug!("No API key configured, using seasonal fallback forecast");
            return Ok(self.fallback.fallback_forecast(days));
        };
        if days == 0 {
            return Ok(Vec::new());
        }

        let start_time = Instant::now();
        let count = days.saturating_mul(SLOTS_PER_DAY);
        let url = self.endpoint("forecast", api_key, location, &[("cnt", count.to_string())])?;
        let response: ForecastResponse =
            with_deadline("forecast", self.config.forecast_timeout(), self.get_json(url)).await?;

        let forecast = parse_forecast(response, location, days)?;
        info!(
            "Retrieved {}-day forecast in {:.3}s",
            forecast.len(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(forecast)
    }
}

fn normalise(
    main: &MainBlock,
    conditions: &[ConditionBlock],
    wind: Option<&WindBlock>,
    location_name: String,
    timestamp: DateTime<Utc>,
) -> Result<WeatherContext> {
    if !main.temp.is_finite() {
        return Err(WeatherError::parse(format!("non-finite temperature {}", main.temp)));
    }
    let temperature = main.temp.round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32;
    let humidity = match main.humidity.filter(|h| h.is_finite()) {
        Some(h) => h.round().clamp(0.0, 100.0) as u8,
        None => {
            debug!("Payload has no usable humidity, assuming {}%", FALLBACK_HUMIDITY);
            FALLBACK_HUMIDITY
        }
    };
    let wind_speed = wind.and_then(|w| w.speed).unwrap_or(0.0);
    let condition = conditions
        .first()
        .map_or(WeatherCondition::Cloudy, |c| {
            WeatherCondition::from_provider(&c.main, &c.description)
        });

    Ok(WeatherContext::new(
        temperature,
        condition,
        humidity,
        Some(wind_speed),
        location_name,
        timestamp,
    )
    .with_source(Provenance::Live))
}

/// Reverse-geocoded city wins over the provider's name
fn location_name(location: &Location, provider_name: Option<&str>) -> String {
    location
        .city
        .clone()
        .or_else(|| provider_name.filter(|n| !n.trim().is_empty()).map(str::to_string))
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Normalise a current-weather payload
pub fn parse_current(
    response: CurrentResponse,
    location: &Location,
    fetched_at: DateTime<Utc>,
) -> Result<WeatherContext> {
    normalise(
        &response.main,
        &response.weather,
        response.wind.as_ref(),
        location_name(location, response.name.as_deref()),
        fetched_at,
    )
}

/// Normalise a forecast payload to one record per local calendar day
pub fn parse_forecast(
    response: ForecastResponse,
    location: &Location,
    days: usize,
) -> Result<Vec<WeatherContext>> {
    if response.list.is_empty() {
        return Err(WeatherError::parse("forecast contained no slots"));
    }

    let offset = response
        .city
        .as_ref()
        .and_then(|c| c.timezone)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix());
    let name = location_name(
        location,
        response.city.as_ref().and_then(|c| c.name.as_deref()),
    );

    select_daily_slots(&response.list, offset)
        .into_iter()
        .take(days)
        .map(|slot| {
            let timestamp = DateTime::from_timestamp(slot.dt, 0)
                .ok_or_else(|| WeatherError::parse(format!("invalid slot time {}", slot.dt)))?;
            normalise(&slot.main, &slot.weather, slot.wind.as_ref(), name.clone(), timestamp)
        })
        .collect()
}

/// Pick one slot per local day, in first-seen day order
///
/// A slot between 10:00 and 14:00 local beats any other slot of its day, and
/// among those the one nearest noon wins; days without a midday slot keep the
/// first slot seen.
pub fn select_daily_slots(slots: &[ForecastSlot], offset: FixedOffset) -> Vec<&ForecastSlot> {
    let mut days: Vec<(NaiveDate, u32, &ForecastSlot)> = Vec::new();

    for slot in slots {
        let Some(utc) = DateTime::from_timestamp(slot.dt, 0) else {
            warn!("Skipping forecast slot with invalid time {}", slot.dt);
            continue;
        };
        let local = utc.with_timezone(&offset);
        let (date, hour) = (local.date_naive(), local.hour());

        match days.iter().position(|(d, _, _)| *d == date) {
            Some(index) => {
                if is_better_midday(hour, days[index].1) {
                    days[index] = (date, hour, slot);
                }
            }
            None => days.push((date, hour, slot)),
        }
    }

    days.into_iter().map(|(_, _, slot)| slot).collect()
}

fn is_better_midday(candidate: u32, current: u32) -> bool {
    if !MIDDAY_HOURS.contains(&candidate) {
        return false;
    }
    !MIDDAY_HOURS.contains(&current) || candidate.abs_diff(NOON) < current.abs_diff(NOON)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeatherConfig;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CURRENT_JSON: &str = r#"{
        "name": "Brooklyn",
        "main": {"temp": 71.6, "humidity": 64},
        "weather": [{"main": "Clouds", "description": "scattered clouds"}],
        "wind": {"speed": 9.2}
    }"#;

    fn slot(dt: i64, temp: f64, main: &str) -> serde_json::Value {
        serde_json::json!({
            "dt": dt,
            "main": {"temp": temp, "humidity": 55},
            "weather": [{"main": main, "description": main.to_lowercase()}],
            "wind": {"speed": 4.0}
        })
    }

    // 2026-04-01T00:00:00Z
    const DAY0: i64 = 1_775_001_600;
    const HOUR: i64 = 3_600;

    fn config(server: &MockServer, api_key: Option<&str>) -> WeatherConfig {
        WeatherConfig {
            api_key: api_key.map(str::to_string),
            base_url: server.uri(),
            current_timeout_seconds: 1,
            forecast_timeout_seconds: 1,
            ..WeatherConfig::default()
        }
    }

    fn client(config: WeatherConfig) -> WeatherApiClient {
        WeatherApiClient::new(config, FallbackGenerator::new()).unwrap()
    }

    #[test]
    fn test_parse_current_rounds_and_maps() {
        let response: CurrentResponse = serde_json::from_str(CURRENT_JSON).unwrap();
        let weather = parse_current(response, &Location::new(40.68, -73.94), Utc::now()).unwrap();

        assert_eq!(weather.temperature, 72);
        assert_eq!(weather.humidity, 64);
        assert_eq!(weather.wind_speed, Some(9.2));
        assert_eq!(weather.condition, WeatherCondition::Cloudy);
        assert_eq!(weather.location, "Brooklyn");
        assert!(!weather.is_fallback());
    }

    #[test]
    fn test_parse_current_defaults() {
        let json = r#"{"main": {"temp": 30.4}}"#;
        let response: CurrentResponse = serde_json::from_str(json).unwrap();
        let weather =
            parse_current(response, &Location::with_city(1.0, 2.0, "Reykjavik"), Utc::now()).unwrap();

        assert_eq!(weather.temperature, 30);
        assert_eq!(weather.humidity, FALLBACK_HUMIDITY);
        assert_eq!(weather.wind_speed, Some(0.0));
        assert_eq!(weather.condition, WeatherCondition::Cloudy);
        // geocoded city wins, even over a missing provider name
        assert_eq!(weather.location, "Reykjavik");
    }

    #[test]
    fn test_midday_slot_selection() {
        let list = vec![
            slot(DAY0 + 6 * HOUR, 50.0, "Clear"),
            slot(DAY0 + 9 * HOUR, 55.0, "Clear"),
            slot(DAY0 + 12 * HOUR, 60.0, "Rain"),
            slot(DAY0 + 15 * HOUR, 58.0, "Clear"),
            // next day has no midday slot
            slot(DAY0 + 24 * HOUR + 18 * HOUR, 40.0, "Snow"),
            slot(DAY0 + 24 * HOUR + 21 * HOUR, 38.0, "Clear"),
        ];
        let response: ForecastResponse =
            serde_json::from_value(serde_json::json!({"list": list, "city": {"name": "Austin"}}))
                .unwrap();

        let forecast = parse_forecast(response, &Location::new(30.27, -97.74), 5).unwrap();

        assert_eq!(forecast.len(), 2);
        assert_eq!(forecast[0].temperature, 60);
        assert_eq!(forecast[0].condition, WeatherCondition::Rainy);
        assert_eq!(forecast[1].temperature, 40);
        assert_eq!(forecast[1].condition, WeatherCondition::Snowy);
        assert_eq!(forecast[0].location, "Austin");
    }

    #[test]
    fn test_slot_selection_uses_local_time() {
        // 17:00Z is 12:00 at UTC-5, 15:00Z is 10:00
        let list = vec![
            slot(DAY0 + 15 * HOUR, 61.0, "Clear"),
            slot(DAY0 + 17 * HOUR, 64.0, "Clear"),
        ];
        let response: ForecastResponse = serde_json::from_value(
            serde_json::json!({"list": list, "city": {"name": "Chicago", "timezone": -18000}}),
        )
        .unwrap();

        let forecast = parse_forecast(response, &Location::new(41.88, -87.63), 1).unwrap();
        assert_eq!(forecast[0].temperature, 64);
    }

    #[test]
    fn test_empty_forecast_is_parse_error() {
        let response: ForecastResponse =
            serde_json::from_value(serde_json::json!({"list": []})).unwrap();
        let err = parse_forecast(response, &Location::new(0.0, 0.0), 3).unwrap_err();
        assert!(matches!(err, WeatherError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_fetch_current_sends_expected_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("latitude", "40.68"))
            .and(query_param("longitude", "-73.94"))
            .and(query_param("apiKey", "secret-key"))
            .and(query_param("units", "imperial"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CURRENT_JSON))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(config(&server, Some("secret-key")));
        let weather = client
            .fetch_current(&Location::new(40.68, -73.94))
            .await
            .unwrap();
        assert_eq!(weather.temperature, 72);
    }

    #[tokio::test]
    async fn test_fetch_forecast_requests_eight_slots_per_day() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "list": [slot(DAY0 + 12 * HOUR, 70.0, "Clear"), slot(DAY0 + 36 * HOUR, 72.0, "Clouds")],
            "city": {"name": "Denver"}
        });
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(query_param("cnt", "24"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let forecast = client(config(&server, Some("k")))
            .fetch_forecast(&Location::new(39.74, -104.99), 3)
            .await
            .unwrap();
        assert_eq!(forecast.len(), 2);
        assert_eq!(forecast[1].condition, WeatherCondition::Cloudy);
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(config(&server, Some("k")))
            .fetch_current(&Location::new(0.0, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::Status { status: 503, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(CURRENT_JSON)
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let err = client(config(&server, Some("k")))
            .fetch_current(&Location::new(0.0, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::Timeout { operation: "current weather", .. }));
    }

    #[tokio::test]
    async fn test_missing_api_key_never_calls_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CURRENT_JSON))
            .expect(0)
            .mount(&server)
            .await;

        let client = client(config(&server, None));
        let weather = client.fetch_current(&Location::new(0.0, 0.0)).await.unwrap();
        assert!(weather.is_fallback());
        assert_eq!(client.fetch_forecast(&Location::new(0.0, 0.0), 4).await.unwrap().len(), 4);
    }
}
