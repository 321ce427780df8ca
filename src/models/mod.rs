//! Data models for the WeatherWear engine
//!
//! This module contains the core domain models organized by concern:
//! - Location: Geographic coordinates and the optional city name
//! - Weather: Normalised weather snapshots and the condition vocabulary
//! - Wardrobe: Caller-owned item and outfit descriptors

pub mod location;
pub mod wardrobe;
pub mod weather;

// Re-export all public types for convenient access
pub use location::Location;
pub use wardrobe::{ClothingItem, Outfit, OutfitCandidate};
pub use weather::{Provenance, WeatherCondition, WeatherContext};
