//! Match results and their explanations
//!
//! Output structures returned to the gateway, plus the text that explains
//! which soil conditions a match was found under.

use serde::{Deserialize, Serialize};
use soilmatch_core::{FeatureCatalog, SoilPolygon};

/// Name of the placeholder result emitted when no polygon contributed
pub const NO_MATCH_NAME: &str = "No specific microbe found";

/// Message attached to an empty result list
pub const EMPTY_RESULT_MESSAGE: &str =
    "No microbes found for the given soil characteristics. Try adjusting the values.";

/// A taxon matched to the query profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchResult {
    /// Taxon name
    pub name: String,
    /// `1 / (1 + d)` for feature-space distance `d`; 0 for the placeholder
    #[serde(rename = "probability")]
    pub similarity: f64,
    pub explanation: String,
}

impl MatchResult {
    pub fn new(name: impl Into<String>, similarity: f64, explanation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            similarity,
            explanation: explanation.into(),
        }
    }

    /// Placeholder explained by the reference means of every feature
    pub fn no_match(catalog: &FeatureCatalog, region: &str) -> Self {
        let conditions = describe(catalog.iter().map(|f| (f.name.as_str(), f.mean)));
        Self::new(
            NO_MATCH_NAME,
            0.0,
            format!(
                "No matching soil polygon had all features present. Using mean values for {}: {}",
                region, conditions
            ),
        )
    }

    pub fn is_placeholder(&self) -> bool {
        self.name == NO_MATCH_NAME
    }
}

/// Response of one match request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchResponse {
    pub microbes: Vec<MatchResult>,
    /// Set when `microbes` is empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl MatchResponse {
    pub fn new(microbes: Vec<MatchResult>) -> Self {
        let message = microbes.is_empty().then(|| EMPTY_RESULT_MESSAGE.to_string());
        Self { microbes, message }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.microbes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.microbes.len()
    }
}

/// `Name=value` pairs with one decimal, comma separated
pub fn describe<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> String {
    pairs
        .into_iter()
        .map(|(name, value)| format!("{}={:.1}", name, value))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Explanation for a taxon found through `polygon`. Only called for
/// complete polygons; a missing value would be skipped.
pub fn polygon_explanation(catalog: &FeatureCatalog, polygon: &SoilPolygon, region: &str) -> String {
    let conditions = describe(
        catalog
            .iter()
            .filter_map(|f| polygon.value(&f.key).map(|v| (f.name.as_str(), v))),
    );
    format!("Found in similar soil conditions in {} with: {}", region, conditions)
}
