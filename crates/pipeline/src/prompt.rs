use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::character::{CharacterSpec, TagCategory};
use crate::model::{select_model, ArtStyle, LoraAdapter};

/// Content-rating tag that lifts the explicit-content exclusions.
pub const EXPLICIT_MARKER: &str = "nsfw";

/// Fixed prefix of every positive prompt.
const QUALITY_KEYWORDS: &[&str] = &["masterpiece", "best quality", "highly detailed", "8k uhd"];

/// Fixed suffix of every positive prompt.
const CLOSING_KEYWORDS: &[&str] = &["sharp focus", "detailed face", "professional lighting"];

/// Baseline anatomy/quality/artifact exclusions, always present.
const BASELINE_NEGATIVE: &[&str] = &[
    "lowres",
    "bad anatomy",
    "bad hands",
    "missing fingers",
    "extra digits",
    "extra limbs",
    "deformed",
    "mutated",
    "blurry",
    "jpeg artifacts",
    "signature",
    "watermark",
    "username",
];

/// Appended iff the content rating lacks the explicit marker.
const EXPLICIT_NEGATIVE: &[&str] = &["nsfw", "nude", "explicit", "suggestive"];

/// Mapping from personality traits to visual descriptors. Traits missing
/// from the table pass through as-is.
const TRAIT_DESCRIPTORS: &[(&str, &str)] = &[
    ("confident", "confident pose, direct gaze"),
    ("shy", "shy expression, averted eyes"),
    ("playful", "playful smile, light-hearted expression"),
    ("mysterious", "enigmatic expression, dramatic shadows"),
    ("gentle", "soft gentle expression, warm eyes"),
    ("fierce", "intense stare, determined expression"),
    ("elegant", "elegant posture, graceful bearing"),
    ("energetic", "dynamic pose, lively expression"),
    ("brooding", "moody atmosphere, distant gaze"),
    ("cheerful", "bright smile, cheerful expression"),
];

/// Character-type tags that map to a composition marker.
const TYPE_MARKERS: &[(&str, &str)] = &[
    ("female", "1girl, solo"),
    ("male", "1boy, solo"),
    ("non-binary", "androgynous, solo"),
];

fn style_keywords(style: ArtStyle) -> &'static [&'static str] {
    match style {
        ArtStyle::Realistic => &["photorealistic", "realistic photography", "natural skin texture"],
        ArtStyle::Anime => &["anime style", "anime art", "cel shading"],
        ArtStyle::Fantasy => &["fantasy art", "epic fantasy", "intricate details"],
        ArtStyle::Cyberpunk => &["cyberpunk style", "neon lighting", "futuristic cityscape"],
    }
}

/// Competing-style vocabulary excluded per requested style.
fn style_negatives(style: ArtStyle) -> &'static [&'static str] {
    match style {
        ArtStyle::Realistic => &["anime", "cartoon", "illustration", "3d render", "painting"],
        ArtStyle::Anime => &["photorealistic", "photograph", "3d render", "hyperrealistic"],
        ArtStyle::Fantasy => &["photograph", "modern clothing", "mundane setting"],
        ArtStyle::Cyberpunk => &["medieval", "pastoral", "watercolor"],
    }
}

/// Strip characters that collide with the backend's prompt syntax
/// (emphasis brackets and adapter tags). Everything else passes through
/// unmodified.
fn sanitize_description(description: &str) -> String {
    description
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | '<' | '>'))
        .collect()
}

fn push_unique(parts: &mut Vec<String>, seen: &mut HashSet<String>, phrase: &str) {
    let phrase = phrase.trim();
    if phrase.is_empty() {
        return;
    }
    if seen.insert(phrase.to_lowercase()) {
        parts.push(phrase.to_string());
    }
}

/// Build the positive/negative prompt pair for a character.
///
/// Pure and total: unknown tags, traits, and styles degrade to passthrough
/// or defaults, never to an error.
pub fn compose(spec: &CharacterSpec) -> (String, String) {
    let primary = ArtStyle::parse(&spec.style);
    let secondary = spec.secondary_style.as_deref().map(ArtStyle::parse);

    let mut parts: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for kw in QUALITY_KEYWORDS {
        push_unique(&mut parts, &mut seen, kw);
    }
    for kw in style_keywords(primary) {
        push_unique(&mut parts, &mut seen, kw);
    }
    if let Some(secondary) = secondary.filter(|s| *s != primary) {
        for kw in style_keywords(secondary) {
            push_unique(&mut parts, &mut seen, kw);
        }
    }

    if let Some(type_tag) = spec
        .tags
        .get(&TagCategory::Type)
        .and_then(|tags| tags.first())
    {
        let marker = TYPE_MARKERS
            .iter()
            .find(|(tag, _)| tag.eq_ignore_ascii_case(type_tag))
            .map(|(_, marker)| *marker)
            .unwrap_or(type_tag);
        push_unique(&mut parts, &mut seen, marker);
    }

    for segment in sanitize_description(&spec.description).split(',') {
        push_unique(&mut parts, &mut seen, segment);
    }

    for trait_name in std::iter::once(&spec.traits.main).chain(spec.traits.sub_traits.iter()) {
        if trait_name.trim().is_empty() {
            continue;
        }
        let descriptor = TRAIT_DESCRIPTORS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(trait_name))
            .map(|(_, descriptor)| *descriptor);
        match descriptor {
            Some(descriptor) => {
                for segment in descriptor.split(',') {
                    push_unique(&mut parts, &mut seen, segment);
                }
            }
            None => push_unique(&mut parts, &mut seen, &trait_name.to_lowercase()),
        }
    }

    // Type already became the marker; content-rating only gates negatives.
    for (category, tags) in &spec.tags {
        if matches!(category, TagCategory::Type | TagCategory::ContentRating) {
            continue;
        }
        for tag in tags {
            push_unique(&mut parts, &mut seen, tag);
        }
    }

    for kw in CLOSING_KEYWORDS {
        push_unique(&mut parts, &mut seen, kw);
    }

    let positive = parts.join(", ");

    let mut negative_parts: Vec<String> = Vec::new();
    let mut negative_seen: HashSet<String> = HashSet::new();

    for term in BASELINE_NEGATIVE {
        push_unique(&mut negative_parts, &mut negative_seen, term);
    }
    for term in style_negatives(primary) {
        push_unique(&mut negative_parts, &mut negative_seen, term);
    }
    if let Some(secondary) = secondary.filter(|s| *s != primary) {
        for term in style_negatives(secondary) {
            push_unique(&mut negative_parts, &mut negative_seen, term);
        }
    }
    if !spec.content_rating_has(EXPLICIT_MARKER) {
        for term in EXPLICIT_NEGATIVE {
            push_unique(&mut negative_parts, &mut negative_seen, term);
        }
    }

    (positive, negative_parts.join(", "))
}

/// Fully resolved prompt: text pair plus the model the graph should load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSpec {
    pub positive: String,
    pub negative: String,
    pub checkpoint: String,
    pub adapters: Vec<LoraAdapter>,
}

impl PromptSpec {
    pub fn from_character(spec: &CharacterSpec) -> Self {
        let (positive, negative) = compose(spec);
        let selection = select_model(&spec.style);
        Self {
            positive,
            negative,
            checkpoint: selection.checkpoint,
            adapters: selection.adapters,
        }
    }

    /// Append an extra phrase (variation suffix) to the positive prompt.
    pub fn with_positive_suffix(mut self, suffix: &str) -> Self {
        if !suffix.trim().is_empty() {
            self.positive = format!("{}, {}", self.positive, suffix.trim());
        }
        self
    }
}
