use serde::{Deserialize, Serialize};

use persona_common::blake3_hex;

/// Highest seed value the synthesis backend accepts.
pub const MAX_SEED: u32 = u32::MAX;

const VARIATION_OFFSET_SCALE: u64 = 1_000;

/// Named secondary-image kinds, each mapping to a fixed seed offset so a
/// character keeps its identity while pose/framing changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariationKind {
    Face,
    Body,
    Outfit,
    Default,
}

impl VariationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariationKind::Face => "face",
            VariationKind::Body => "body",
            VariationKind::Outfit => "outfit",
            VariationKind::Default => "default",
        }
    }

    fn offset(&self) -> u64 {
        match self {
            VariationKind::Default => 0,
            VariationKind::Face => 1,
            VariationKind::Body => 2,
            VariationKind::Outfit => 3,
        }
    }

    /// Extra positive-prompt phrase appended for this kind.
    pub fn prompt_suffix(&self) -> Option<&'static str> {
        match self {
            VariationKind::Face => Some("close-up portrait, same face, detailed facial features"),
            VariationKind::Body => Some("full body shot, same character"),
            VariationKind::Outfit => Some("alternative outfit, same character design"),
            VariationKind::Default => None,
        }
    }
}

/// Stable per-character randomization key.
///
/// Not security-sensitive: the 8-hex-digit truncation of the content hash
/// is purely a determinism trick, but it must stay bit-for-bit stable so
/// regenerated images match the existing catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterSeed {
    base: u32,
}

impl CharacterSeed {
    /// Derive the identity seed from the normalized name + description.
    pub fn derive(name: &str, description: &str) -> Self {
        let normalized = format!(
            "{}_{}",
            name.trim().to_lowercase(),
            description.trim().to_lowercase()
        );
        let digest = blake3_hex(normalized.as_bytes());
        let base = u32::from_str_radix(&digest[..8], 16)
            .expect("8 hex digits always parse as u32");
        Self { base }
    }

    pub fn from_base(base: u32) -> Self {
        Self { base }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    /// Kind-specific derived seed: fixed scaled offset, reduced modulo the
    /// backend's maximum accepted seed.
    pub fn variation(&self, kind: VariationKind) -> u32 {
        ((self.base as u64 + kind.offset() * VARIATION_OFFSET_SCALE) % MAX_SEED as u64) as u32
    }
}

/// Fresh random seed for diversity-oriented generations (embedding sets).
pub fn fresh_seed() -> u32 {
    rand::random_range(0..MAX_SEED)
}
