//! Caller-owned wardrobe descriptors consumed by scoring

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The slice of a wardrobe item that scoring looks at
///
/// Tags are matched exactly; callers are expected to supply them lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClothingItem {
    pub category: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl ClothingItem {
    #[must_use]
    pub fn new<I, S>(category: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            category: category.into(),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    #[must_use]
    pub fn has_any_tag(&self, tags: &[&str]) -> bool {
        tags.iter().any(|tag| self.tags.contains(*tag))
    }

    #[must_use]
    pub fn is_category(&self, category: &str) -> bool {
        self.category == category
    }
}

/// Anything that carries a list of items can be ranked as an outfit
pub trait Outfit {
    fn items(&self) -> &[ClothingItem];
}

/// Plain outfit record, as read from recommendation files
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutfitCandidate {
    #[serde(default)]
    pub name: Option<String>,
    pub items: Vec<ClothingItem>,
}

impl Outfit for OutfitCandidate {
    fn items(&self) -> &[ClothingItem] {
        &self.items
    }
}

impl Outfit for Vec<ClothingItem> {
    fn items(&self) -> &[ClothingItem] {
        self
    }
}
