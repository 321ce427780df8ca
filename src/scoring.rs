//! Weather appropriateness scoring for single clothing items
//!
//! A score starts at a neutral 0.5 and receives three independent deltas
//! (temperature band, condition, humidity/wind) before being clamped into
//! `[0, 1]`. Scoring is pure and total: unknown tags and empty tag sets simply
//! contribute nothing.

use crate::models::{ClothingItem, WeatherCondition, WeatherContext};
use serde::Serialize;

pub const NEUTRAL_SCORE: f64 = 0.5;
const HUMID_ABOVE: u8 = 70;
const WINDY_FROM_MPH: f64 = 15.0;

/// Per-factor deltas behind an item score
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub temperature: f64,
    pub condition: f64,
    pub environment: f64,
    /// Clamped final score
    pub total: f64,
}

/// Suitability of `item` for `weather`, in `[0, 1]`
#[must_use]
pub fn score_item(item: &ClothingItem, weather: &WeatherContext) -> f64 {
    score_breakdown(item, weather).total
}

#[must_use]
pub fn score_breakdown(item: &ClothingItem, weather: &WeatherContext) -> ScoreBreakdown {
    let temperature = temperature_delta(item, weather.temperature);
    let condition = condition_delta(item, weather.condition);
    let environment = environment_delta(item, weather.humidity, weather.effective_wind_speed());
    let total = (NEUTRAL_SCORE + temperature + condition + environment).clamp(0.0, 1.0);

    ScoreBreakdown {
        temperature,
        condition,
        environment,
        total,
    }
}

fn is_outerwear(item: &ClothingItem) -> bool {
    item.is_category("outerwear")
}

fn is_shoes(item: &ClothingItem) -> bool {
    item.is_category("shoes")
}

fn is_hat(item: &ClothingItem) -> bool {
    item.is_category("hats")
        || item.is_category("hat")
        || (item.is_category("accessories") && item.has_any_tag(&["hat", "hats"]))
}

fn is_waterproof(item: &ClothingItem) -> bool {
    item.has_any_tag(&["waterproof", "water-resistant"])
}

/// Delta for the temperature band (°F)
#[must_use]
pub fn temperature_delta(item: &ClothingItem, temperature: i32) -> f64 {
    let mut delta = 0.0;

    match temperature {
        t if t < 32 => {
            if is_outerwear(item) || item.has_any_tag(&["winter", "warm"]) {
                delta += 0.3;
            }
            if item.has_any_tag(&["light", "summer"]) {
                delta -= 0.3;
            }
            if item.has_any_tag(&["shorts", "sleeveless"]) {
                delta -= 0.3;
            }
        }
        t if t < 50 => {
            if is_outerwear(item) || item.has_any_tag(&["warm", "long-sleeve"]) {
                delta += 0.2;
            }
            if item.has_any_tag(&["light", "sleeveless"]) {
                delta -= 0.2;
            }
            if item.has_tag("shorts") {
                delta -= 0.2;
            }
            if item.has_tag("summer") {
                delta -= 0.1;
            }
        }
        t if t < 65 => {
            if item.is_category("cardigan") || item.has_any_tag(&["light-layer", "cardigan"]) {
                delta += 0.1;
            }
            if item.has_any_tag(&["heavy", "winter"]) {
                delta -= 0.1;
            }
        }
        t if t < 75 => {
            delta += 0.1;
        }
        t if t < 85 => {
            if item.has_any_tag(&["light", "breathable", "summer"]) {
                delta += 0.25;
            }
            if is_outerwear(item) || item.has_any_tag(&["heavy", "long-sleeve"]) {
                delta -= 0.25;
            }
        }
        _ => {
            if item.has_any_tag(&["light", "breathable", "sleeveless"]) {
                delta += 0.3;
            }
            if is_outerwear(item) || item.has_any_tag(&["heavy", "long-sleeve"]) {
                delta -= 0.35;
            }
        }
    }

    delta
}

/// Delta for the sky condition
///
/// Shoes are judged more strictly in snow than in rain: a `water-resistant`
/// tag spares them the rain penalty, but only `waterproof` spares them the
/// snow penalty.
#[must_use]
pub fn condition_delta(item: &ClothingItem, condition: WeatherCondition) -> f64 {
    let mut delta = 0.0;

    match condition {
        WeatherCondition::Rainy => {
            if is_waterproof(item) {
                delta += 0.2;
            }
            if item.has_any_tag(&["suede", "delicate"]) {
                delta -= 0.2;
            }
            if is_shoes(item) && !is_waterproof(item) {
                delta -= 0.1;
            }
        }
        WeatherCondition::Snowy => {
            if item.has_any_tag(&["waterproof", "winter", "warm"]) {
                delta += 0.2;
            }
            if item.has_any_tag(&["light", "delicate"]) {
                delta -= 0.2;
            }
            if is_shoes(item) && !item.has_tag("waterproof") {
                delta -= 0.3;
            }
        }
        WeatherCondition::Windy => {
            if item.has_any_tag(&["fitted", "structured"]) {
                delta += 0.1;
            }
            if item.has_any_tag(&["flowy", "loose"]) {
                delta -= 0.1;
            }
            if is_hat(item) {
                delta -= 0.1;
            }
        }
        WeatherCondition::Sunny => {
            if item.has_any_tag(&["sun-protection", "light-color", "breathable", "light"]) {
                delta += 0.1;
            }
            if item.is_category("tops") && item.has_tag("dark") {
                delta -= 0.05;
            }
        }
        WeatherCondition::Stormy => {
            if item.has_tag("waterproof") || is_outerwear(item) {
                delta += 0.2;
            }
            if item.has_any_tag(&["delicate", "formal"]) {
                delta -= 0.2;
            }
        }
        WeatherCondition::Cloudy => {}
    }

    delta
}

/// Delta for humidity (%) and wind speed (mph)
#[must_use]
pub fn environment_delta(item: &ClothingItem, humidity: u8, wind_speed: f64) -> f64 {
    let mut delta = 0.0;

    if humidity > HUMID_ABOVE {
        if item.has_any_tag(&["breathable", "moisture-wicking"]) {
            delta += 0.1;
        }
        if item.has_any_tag(&["heavy", "non-breathable"]) {
            delta -= 0.1;
        }
    }

    if wind_speed >= WINDY_FROM_MPH {
        if item.has_any_tag(&["wind-resistant", "fitted"]) {
            delta += 0.1;
        }
        if item.has_any_tag(&["flowy", "loose"]) {
            delta -= 0.1;
        }
    }

    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rand::{RngExt, SeedableRng, rngs::StdRng};
    use rstest::rstest;

    const EPS: f64 = 1e-9;

    fn weather(temperature: i32, condition: WeatherCondition) -> WeatherContext {
        WeatherContext::new(temperature, condition, 50, Some(0.0), "Test", Utc::now())
    }

    fn item(category: &str, tags: &[&str]) -> ClothingItem {
        ClothingItem::new(category, tags.iter().copied())
    }

    #[test]
    fn test_cold_snow_prefers_insulated_outerwear() {
        let w = weather(20, WeatherCondition::Snowy);
        let parka = item("outerwear", &["waterproof", "warm"]);
        let tank = item("tops", &["light", "summer", "sleeveless"]);

        assert!(score_item(&parka, &w) > score_item(&tank, &w));
        assert_eq!(score_item(&parka, &w), 1.0);
        assert_eq!(score_item(&tank, &w), 0.0);
    }

    #[test]
    fn test_heat_prefers_breathable_layers() {
        let w = weather(90, WeatherCondition::Sunny);
        let tee = item("tops", &["light", "breathable", "sleeveless"]);
        let coat = item("outerwear", &["heavy", "long-sleeve"]);

        assert!(score_item(&tee, &w) > score_item(&coat, &w));
        assert!((score_item(&tee, &w) - 0.9).abs() < EPS);
        assert!((score_item(&coat, &w) - 0.15).abs() < EPS);
    }

    #[rstest]
    #[case(31, 0.3)]
    #[case(32, 0.2)]
    #[case(49, 0.2)]
    #[case(50, 0.0)]
    #[case(65, 0.1)]
    #[case(74, 0.1)]
    #[case(75, -0.25)]
    #[case(84, -0.25)]
    #[case(85, -0.35)]
    fn test_outerwear_across_band_edges(#[case] temperature: i32, #[case] expected: f64) {
        let coat = item("outerwear", &[]);
        assert!((temperature_delta(&coat, temperature) - expected).abs() < EPS);
    }

    #[rstest]
    #[case(WeatherCondition::Rainy, "shoes", &["suede"], -0.3)]
    #[case(WeatherCondition::Rainy, "shoes", &["water-resistant"], 0.2)]
    #[case(WeatherCondition::Snowy, "shoes", &[], -0.3)]
    #[case(WeatherCondition::Snowy, "shoes", &["waterproof", "warm"], 0.2)]
    #[case(WeatherCondition::Snowy, "shoes", &["water-resistant"], -0.3)]
    #[case(WeatherCondition::Windy, "accessories", &["hat", "loose"], -0.2)]
    #[case(WeatherCondition::Windy, "tops", &["fitted"], 0.1)]
    #[case(WeatherCondition::Sunny, "tops", &["dark"], -0.05)]
    #[case(WeatherCondition::Stormy, "outerwear", &["formal"], 0.0)]
    #[case(WeatherCondition::Cloudy, "tops", &["delicate"], 0.0)]
    fn test_condition_deltas(
        #[case] condition: WeatherCondition,
        #[case] category: &str,
        #[case] tags: &[&str],
        #[case] expected: f64,
    ) {
        let it = item(category, tags);
        assert!((condition_delta(&it, condition) - expected).abs() < EPS);
    }

    #[test]
    fn test_environment_thresholds() {
        let shirt = item("tops", &["moisture-wicking", "fitted"]);
        assert_eq!(environment_delta(&shirt, 70, 14.9), 0.0);
        assert!((environment_delta(&shirt, 71, 0.0) - 0.1).abs() < EPS);
        assert!((environment_delta(&shirt, 71, 15.0) - 0.2).abs() < EPS);

        let dress = item("dresses", &["flowy", "heavy"]);
        assert!((environment_delta(&dress, 90, 20.0) + 0.2).abs() < EPS);
    }

    #[test]
    fn test_absent_wind_scores_as_calm() {
        let scarf = item("accessories", &["loose"]);
        let mut w = weather(70, WeatherCondition::Cloudy);
        w.wind_speed = None;
        assert!((score_item(&scarf, &w) - 0.6).abs() < EPS);
    }

    #[test]
    fn test_untagged_item_stays_near_neutral() {
        let blank = item("misc", &[]);
        assert_eq!(score_item(&blank, &weather(55, WeatherCondition::Cloudy)), NEUTRAL_SCORE);
    }

    #[test]
    fn test_tags_are_case_sensitive() {
        let shouty = item("tops", &["LIGHT", "Breathable"]);
        assert_eq!(score_item(&shouty, &weather(90, WeatherCondition::Cloudy)), NEUTRAL_SCORE);
    }

    #[test]
    fn test_breakdown_sums_to_total() {
        let it = item("outerwear", &["waterproof", "fitted"]);
        let mut w = weather(40, WeatherCondition::Rainy);
        w.wind_speed = Some(20.0);
        let b = score_breakdown(&it, &w);
        assert!((b.total - (NEUTRAL_SCORE + b.temperature + b.condition + b.environment)).abs() < EPS);
    }

    #[test]
    fn test_score_always_clamped() {
        const VOCAB: [&str; 24] = [
            "winter", "warm", "light", "summer", "shorts", "sleeveless", "long-sleeve",
            "light-layer", "cardigan", "heavy", "breathable", "waterproof", "water-resistant",
            "suede", "delicate", "fitted", "structured", "flowy", "loose", "hat",
            "sun-protection", "light-color", "dark", "formal",
        ];
        const CATEGORIES: [&str; 6] = ["outerwear", "shoes", "tops", "accessories", "hats", "bottoms"];

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..5_000 {
            let tag_count = rng.random_range(0..8);
            let tags: Vec<&str> = (0..tag_count)
                .map(|_| VOCAB[rng.random_range(0..VOCAB.len())])
                .collect();
            let it = item(CATEGORIES[rng.random_range(0..CATEGORIES.len())], &tags);
            let w = WeatherContext::new(
                rng.random_range(-60..140),
                WeatherCondition::ALL[rng.random_range(0..WeatherCondition::ALL.len())],
                rng.random_range(0..=100),
                Some(rng.random_range(0.0..60.0)),
                "Anywhere",
                Utc::now(),
            );

            let score = score_item(&it, &w);
            assert!((0.0..=1.0).contains(&score), "score {score} out of range for {it:?}");
        }
    }
}
