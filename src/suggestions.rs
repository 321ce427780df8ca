//! Styling tips derived from a weather record
//!
//! Independent of scoring: the same record always yields the same tips, in
//! the order temperature band, condition, humidity, wind.

use crate::models::{WeatherCondition, WeatherContext};

pub const GENERIC_TIP: &str = "Check the weather before heading out and dress in layers you can adjust.";

const HUMID_THRESHOLD: u8 = 70;
const WINDY_THRESHOLD: f64 = 15.0;

/// Temperature band tip; every temperature falls in exactly one band
fn temperature_tip(temperature: i32) -> &'static str {
    match temperature {
        t if t < 32 => "Freezing out: wear a heavy coat, gloves and a warm hat.",
        t if t < 50 => "Cold: a warm jacket or wool coat over a sweater works well.",
        t if t < 65 => "Cool: bring a light jacket or cardigan you can layer.",
        t if t < 75 => "Mild: comfortable for most outfits, a light layer is optional.",
        t if t < 85 => "Warm: choose breathable fabrics and short sleeves.",
        _ => "Hot: go for light, loose, moisture-wicking clothing.",
    }
}

fn condition_tip(condition: WeatherCondition) -> Option<&'static str> {
    match condition {
        WeatherCondition::Rainy => {
            Some("Rain expected: wear waterproof shoes and take a rain jacket or umbrella.")
        }
        WeatherCondition::Snowy => Some("Snow expected: insulated, water-resistant boots are a must."),
        WeatherCondition::Windy => Some("Windy: a windbreaker helps, skip loose scarves and skirts."),
        WeatherCondition::Sunny => Some("Sunny: sunglasses and a hat will keep you comfortable."),
        WeatherCondition::Cloudy | WeatherCondition::Stormy => None,
    }
}

/// Ordered tips for `weather`, never empty
#[must_use]
pub fn weather_suggestions(weather: &WeatherContext) -> Vec<String> {
    let mut tips = vec![temperature_tip(weather.temperature).to_string()];

    if let Some(tip) = condition_tip(weather.condition) {
        tips.push(tip.to_string());
    }
    if weather.humidity > HUMID_THRESHOLD {
        tips.push("Humid: breathable natural fabrics like cotton and linen feel best.".to_string());
    }
    if weather.effective_wind_speed() > WINDY_THRESHOLD {
        tips.push("Strong wind: secure accessories and add a wind-resistant layer.".to_string());
    }

    tips
}

/// Tips for an optional record; missing weather yields the generic tip
#[must_use]
pub fn suggestions_for(weather: Option<&WeatherContext>) -> Vec<String> {
    weather.map_or_else(|| vec![GENERIC_TIP.to_string()], weather_suggestions)
}
