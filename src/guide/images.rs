//! Deterministic choice of one representative image per aspect ratio.

use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Categories in descending priority; the first category present in an aspect group wins.
const CATEGORY_PRIORITY: [&str; 8] = [
    "banner",    // cast ensemble with source-provided text
    "banner-l1", // same as banner
    "banner-l2", // plain text
    "banner-lo", // logo only
    "logo",
    "banner-l3", // stock photo with plain text
    "iconic",    // no text
    "staple",    // fallback for programs without a unique banner
];

/// Only medium-size images are used for guide art.
const ACCEPTED_SIZE: &str = "md";

const ACCEPTED_TIERS: [&str; 3] = ["series", "sport", "sport event"];

/// An image offered by a provider. Serialized verbatim into the cache.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageCandidate {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub aspect: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(default, deserialize_with = "text_or_number", skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(default, deserialize_with = "text_or_number", skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
}

/// Pixel dimensions arrive as strings or as bare numbers.
fn text_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(text)) => Ok(Some(text)),
        Some(serde_json::Value::Number(number)) => Ok(Some(number.to_string())),
        Some(other) => Err(D::Error::custom(format!("expected a dimension, found {other}"))),
    }
}

impl ImageCandidate {
    fn field(value: &Option<String>) -> Option<&str> {
        value.as_deref().filter(|v| !v.is_empty())
    }

    /// Required fields present, medium size, and (when present) an accepted tier.
    fn is_eligible(&self) -> bool {
        let required = Self::field(&self.category).is_some()
            && Self::field(&self.aspect).is_some()
            && Self::field(&self.uri).is_some();
        let sized = Self::field(&self.size).is_some_and(|s| s.eq_ignore_ascii_case(ACCEPTED_SIZE));
        let tiered = Self::field(&self.tier)
            .is_none_or(|t| ACCEPTED_TIERS.iter().any(|a| t.eq_ignore_ascii_case(a)));
        required && sized && tiered
    }

    /// Lowercased aspect ratio class (e.g. `4x3`).
    pub fn aspect_class(&self) -> Option<String> {
        Self::field(&self.aspect).map(str::to_lowercase)
    }

    fn priority(&self) -> Option<usize> {
        let category = Self::field(&self.category)?.to_lowercase();
        CATEGORY_PRIORITY.iter().position(|c| *c == category)
    }
}

/// Picks representative images and rewrites relative URIs against the provider image endpoint.
#[derive(Debug, Clone)]
pub struct ImageSelector {
    image_base: String,
}

impl ImageSelector {
    /// `image_base` is the absolute prefix for relative URIs, e.g.
    /// `https://json.schedulesdirect.org/20141201/image/`.
    pub fn new(image_base: impl Into<String>) -> Self {
        Self {
            image_base: image_base.into(),
        }
    }

    fn absolutize(&self, uri: &str) -> String {
        if uri.to_lowercase().starts_with("http") {
            uri.to_string()
        } else {
            format!("{}{}", self.image_base, uri.to_lowercase())
        }
    }

    /// Returns one chosen image per aspect ratio, in first-seen aspect order.
    pub fn select_representative(
        &self,
        candidates: &[ImageCandidate],
    ) -> IndexMap<String, ImageCandidate> {
        // aspect -> (priority, candidate); lower priority index wins, first seen keeps ties
        let mut best: IndexMap<String, Option<(usize, ImageCandidate)>> = IndexMap::new();

        for candidate in candidates.iter().filter(|c| c.is_eligible()) {
            let Some(aspect) = candidate.aspect_class() else {
                continue;
            };
            let slot = best.entry(aspect).or_default();
            let Some(priority) = candidate.priority() else {
                continue;
            };
            if slot.as_ref().is_none_or(|(current, _)| priority < *current) {
                let mut chosen = candidate.clone();
                chosen.uri = chosen.uri.as_deref().map(|u| self.absolutize(u));
                *slot = Some((priority, chosen));
            }
        }

        best.into_iter()
            .filter_map(|(aspect, slot)| slot.map(|(_, image)| (aspect, image)))
            .collect()
    }

    /// Flattened form of [`Self::select_representative`], as stored in the cache.
    pub fn select_list(&self, candidates: &[ImageCandidate]) -> Vec<ImageCandidate> {
        self.select_representative(candidates)
            .into_values()
            .collect()
    }
}

/// Finds the image of the requested aspect in an already-selected list.
pub fn image_for_aspect<'a>(images: &'a [ImageCandidate], aspect: &str) -> Option<&'a ImageCandidate> {
    images
        .iter()
        .find(|image| image.aspect_class().as_deref() == Some(aspect))
}
