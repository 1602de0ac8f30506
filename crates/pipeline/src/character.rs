use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Structured tag buckets on a character.
///
/// Variant order is the flattening order used by prompt composition, so it
/// is part of the observable output and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagCategory {
    Type,
    Appearance,
    Ethnicity,
    Fantasy,
    Origin,
    Personality,
    ContentRating,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonalityTraits {
    pub main: String,
    pub sub_traits: Vec<String>,
}

/// Whether the character lives under a user's folder or the shared
/// premade catalog. Decides the second path segment in asset storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    User,
    Premade,
}

impl OwnerKind {
    pub fn folder(&self) -> &'static str {
        match self {
            OwnerKind::User => "characters",
            OwnerKind::Premade => "premade_characters",
        }
    }
}

/// Character description handed in by the application layer.
///
/// The pipeline never owns or persists this; name + description jointly
/// determine the identity seed, and the content-rating tags gate the
/// explicit-content negative terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterSpec {
    pub name: String,
    pub description: String,

    pub style: String,
    pub secondary_style: Option<String>,

    pub traits: PersonalityTraits,
    pub tags: BTreeMap<TagCategory, Vec<String>>,

    pub owner_id: String,
    pub owner_kind: OwnerKind,
}

impl CharacterSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        style: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            style: style.into(),
            secondary_style: None,
            traits: PersonalityTraits::default(),
            tags: BTreeMap::new(),
            owner_id: owner_id.into(),
            owner_kind: OwnerKind::User,
        }
    }

    /// Case-insensitive membership check against the content-rating tags.
    pub fn content_rating_has(&self, marker: &str) -> bool {
        self.tags
            .get(&TagCategory::ContentRating)
            .map(|tags| tags.iter().any(|t| t.eq_ignore_ascii_case(marker)))
            .unwrap_or(false)
    }
}
