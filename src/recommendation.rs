//! Outfit-level scoring, threshold filtering and ranking
//!
//! Contract: if any outfit score comes out non-finite the whole call is
//! abandoned and the input is returned unfiltered, in its original order. A
//! partially filtered list is never returned.

use crate::models::{Outfit, WeatherContext};
use crate::scoring::score_item;
use serde::Serialize;
use tracing::{debug, warn};

pub const DEFAULT_MIN_SCORE: f64 = 0.35;

/// Outfit paired with its weather score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedOutfit<O> {
    pub outfit: O,
    pub score: f64,
}

/// Mean item score; an outfit with no items scores 0
#[must_use]
pub fn outfit_score<O: Outfit + ?Sized>(outfit: &O, weather: &WeatherContext) -> f64 {
    let items = outfit.items();
    if items.is_empty() {
        return 0.0;
    }
    let sum: f64 = items.iter().map(|item| score_item(item, weather)).sum();
    sum / items.len() as f64
}

/// Keep outfits scoring at least `min_score`, best first
///
/// Equal scores keep their input order.
#[must_use]
pub fn filter_recommendations<O: Outfit>(
    recommendations: Vec<O>,
    weather: &WeatherContext,
    min_score: f64,
) -> Vec<O> {
    match rank(&recommendations, weather, min_score) {
        Some(order) => {
            let mut slots: Vec<Option<O>> = recommendations.into_iter().map(Some).collect();
            order
                .into_iter()
                .filter_map(|(index, _)| slots[index].take())
                .collect()
        }
        None => recommendations,
    }
}

/// Like [`filter_recommendations`] but keeps the scores
///
/// On the unfiltered-fallback path every outfit is reported with its raw score.
#[must_use]
pub fn rank_recommendations<O: Outfit>(
    recommendations: Vec<O>,
    weather: &WeatherContext,
    min_score: f64,
) -> Vec<RankedOutfit<O>> {
    match rank(&recommendations, weather, min_score) {
        Some(order) => {
            let mut slots: Vec<Option<O>> = recommendations.into_iter().map(Some).collect();
            order
                .into_iter()
                .filter_map(|(index, score)| {
                    slots[index].take().map(|outfit| RankedOutfit { outfit, score })
                })
                .collect()
        }
        None => recommendations
            .into_iter()
            .map(|outfit| {
                let score = outfit_score(&outfit, weather);
                RankedOutfit { outfit, score }
            })
            .collect(),
    }
}

/// Indices and scores of surviving outfits in output order, or `None` to
/// signal the unfiltered fallback
fn rank<O: Outfit>(
    recommendations: &[O],
    weather: &WeatherContext,
    min_score: f64,
) -> Option<Vec<(usize, f64)>> {
    if !min_score.is_finite() {
        warn!("Ignoring non-finite minimum score {}", min_score);
        return None;
    }

    let mut scored = Vec::with_capacity(recommendations.len());
    for (index, outfit) in recommendations.iter().enumerate() {
        let score = outfit_score(outfit, weather);
        if !score.is_finite() {
            warn!("Outfit {} produced score {}, returning recommendations unfiltered", index, score);
            return None;
        }
        scored.push((index, score));
    }

    scored.retain(|(_, score)| *score >= min_score);
    // stable: ties keep input order
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    debug!(
        "{} of {} outfits pass minimum score {:.2}",
        scored.len(),
        recommendations.len(),
        min_score
    );
    Some(scored)
}
