use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::debug;

use weatherwear::location_resolver::{LocationProvider, StaticLocationProvider};
use weatherwear::scoring::score_breakdown;
use weatherwear::{
    ClothingItem, Location, OutfitCandidate, WeatherContext, WeatherError, WeatherService,
    WeatherWearConfig, rank_recommendations, telemetry, weather_suggestions,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Weather-aware outfit scoring")]
struct Cli {
    /// Configuration file (defaults to <config dir>/weatherwear/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Never call the weather provider; use cached or seasonal data
    #[arg(long, global = true)]
    offline: bool,
    #[arg(long, global = true, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,
    #[arg(long, global = true, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,
    /// City label for --lat/--lon
    #[arg(long, global = true)]
    city: Option<String>,
    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Current weather and styling tips
    Weather,
    /// One record per day, today first
    Forecast {
        #[arg(long, default_value_t = 5)]
        days: usize,
    },
    /// Score a single item against current weather
    Score {
        #[arg(long)]
        category: String,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Rank outfits from a JSON file against current weather
    Recommend {
        #[arg(long)]
        file: PathBuf,
        /// Overrides scoring.min_outfit_score
        #[arg(long)]
        min_score: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = WeatherWearConfig::load_from_path(cli.config.clone()).inspect_err(report)?;
    telemetry::init_logging(&config.logging, cli.verbose)?;

    let explicit = match (cli.lat, cli.lon) {
        (Some(lat), Some(lon)) => Some(Location {
            latitude: lat,
            longitude: lon,
            city: cli.city.clone(),
        }),
        _ => None,
    };
    let provider: Arc<dyn LocationProvider> = match &explicit {
        Some(location) => Arc::new(StaticLocationProvider::new(
            Some((location.latitude, location.longitude)),
            location.city.clone(),
        )),
        None => Arc::new(StaticLocationProvider::unavailable()),
    };

    let service = WeatherService::from_config(&config, provider, cli.offline)
        .map_err(anyhow::Error::from)
        .inspect_err(report)?;
    debug!("Service ready (offline: {})", cli.offline);

    match cli.command {
        Commands::Weather => {
            let weather = current(&service, explicit.as_ref()).await;
            let tips = weather_suggestions(&weather);
            if cli.json {
                print_json(&serde_json::json!({ "weather": weather, "suggestions": tips }))?;
            } else {
                println!("{}", describe(&weather));
                for tip in tips {
                    println!("  - {tip}");
                }
            }
        }
        Commands::Forecast { days } => {
            let forecast = match &explicit {
                Some(location) => service.forecast_at(location, days).await,
                None => service.forecast(days).await,
            };
            if cli.json {
                print_json(&forecast)?;
            } else {
                for day in &forecast {
                    println!("{}  {}", day.timestamp.format("%a %Y-%m-%d"), describe(day));
                }
            }
        }
        Commands::Score { category, tags } => {
            let item = ClothingItem::new(category, tags.iter().map(|t| t.trim().to_lowercase()));
            let weather = current(&service, explicit.as_ref()).await;
            let breakdown = score_breakdown(&item, &weather);
            if cli.json {
                print_json(&serde_json::json!({ "weather": weather, "score": breakdown }))?;
            } else {
                println!("{}", describe(&weather));
                println!(
                    "{}: {:.2} (temperature {:+.2}, condition {:+.2}, environment {:+.2})",
                    item.category,
                    breakdown.total,
                    breakdown.temperature,
                    breakdown.condition,
                    breakdown.environment
                );
            }
        }
        Commands::Recommend { file, min_score } => {
            let min_score = min_score.unwrap_or(config.scoring.min_outfit_score);
            if !(0.0..=1.0).contains(&min_score) {
                bail!("--min-score must be between 0.0 and 1.0");
            }
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let outfits: Vec<OutfitCandidate> = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse outfits in {}", file.display()))?;

            let weather = current(&service, explicit.as_ref()).await;
            let ranked = rank_recommendations(outfits, &weather, min_score);
            if cli.json {
                print_json(&serde_json::json!({ "weather": weather, "recommendations": ranked }))?;
            } else {
                println!("{}", describe(&weather));
                if ranked.is_empty() {
                    println!("No outfits score at least {min_score:.2}");
                }
                for (rank, entry) in ranked.iter().enumerate() {
                    let name = entry.outfit.name.as_deref().unwrap_or("(unnamed)");
                    println!("{:>2}. {:<24} {:.2}", rank + 1, name, entry.score);
                }
            }
        }
    }

    Ok(())
}

async fn current(service: &WeatherService, explicit: Option<&Location>) -> WeatherContext {
    match explicit {
        Some(location) => service.current_weather_at(location).await,
        None => service.current_weather().await,
    }
}

/// Friendly hint ahead of the full error chain
fn report(error: &anyhow::Error) {
    if let Some(error) = error.downcast_ref::<WeatherError>() {
        eprintln!("{}", error.user_message());
    }
}

fn describe(weather: &WeatherContext) -> String {
    let mut line = format!(
        "{}: {}, {}, humidity {}%, wind {:.0} mph",
        weather.location,
        weather.format_temperature(),
        weather.condition.label(),
        weather.humidity,
        weather.effective_wind_speed()
    );
    if weather.is_fallback() {
        line.push_str(" (estimated)");
    }
    line
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
