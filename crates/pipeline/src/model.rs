use serde::{Deserialize, Serialize};

/// Supported art styles. Unknown style strings fall back to the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtStyle {
    #[default]
    Realistic,
    Anime,
    Fantasy,
    Cyberpunk,
}

impl ArtStyle {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "realistic" | "photorealistic" => ArtStyle::Realistic,
            "anime" => ArtStyle::Anime,
            "fantasy" => ArtStyle::Fantasy,
            "cyberpunk" => ArtStyle::Cyberpunk,
            _ => ArtStyle::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtStyle::Realistic => "realistic",
            ArtStyle::Anime => "anime",
            ArtStyle::Fantasy => "fantasy",
            ArtStyle::Cyberpunk => "cyberpunk",
        }
    }
}

/// A style adapter applied on top of the base checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoraAdapter {
    pub name: String,
    pub strength: f32,
}

impl LoraAdapter {
    /// Strength is clamped into [0, 1].
    pub fn new(name: impl Into<String>, strength: f32) -> Self {
        Self {
            name: name.into(),
            strength: strength.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSelection {
    pub checkpoint: String,
    pub adapters: Vec<LoraAdapter>,
}

/// Checkpoint + adapter stack for each style.
const STYLE_MODELS: &[(ArtStyle, &str, &[(&str, f32)])] = &[
    (ArtStyle::Realistic, "realvisxl_v50.safetensors", &[("detail_tweaker_xl", 0.6)]),
    (ArtStyle::Anime, "animagine_xl_40.safetensors", &[("anime_detail_eyes", 0.7)]),
    (ArtStyle::Fantasy, "dreamshaper_xl_v21.safetensors", &[("fantasy_art_xl", 0.8)]),
    (ArtStyle::Cyberpunk, "juggernaut_xl_v9.safetensors", &[("neon_cyberpunk_xl", 0.75)]),
];

/// Map a requested style to a backend checkpoint and adapter list.
/// Pure lookup; unknown styles land on the default style's entry.
pub fn select_model(style: &str) -> ModelSelection {
    let parsed = ArtStyle::parse(style);
    let (_, checkpoint, adapters) = STYLE_MODELS
        .iter()
        .find(|(s, _, _)| *s == parsed)
        .expect("every ArtStyle has a model table entry");

    ModelSelection {
        checkpoint: checkpoint.to_string(),
        adapters: adapters
            .iter()
            .map(|(name, strength)| LoraAdapter::new(*name, *strength))
            .collect(),
    }
}
