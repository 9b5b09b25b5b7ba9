//! Feature catalog
//!
//! Static description of the soil features tracked by the matcher: key,
//! display name, description, valid range and reference mean. The catalog
//! is ordered; that order defines the layout of every feature vector.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Description of one tracked soil feature
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureSpec {
    /// Column key in the reference data (e.g. `OC_TOP_P`)
    pub key: String,
    /// Human-readable name used in explanations
    pub name: String,
    pub description: String,
    /// Inclusive lower bound for query values
    pub min: f64,
    /// Inclusive upper bound for query values
    pub max: f64,
    /// Value substituted when a query omits this feature
    pub mean: f64,
}

impl FeatureSpec {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        range: (f64, f64),
        mean: f64,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: description.into(),
            min: range.0,
            max: range.1,
            mean,
        }
    }

    /// Inclusive range check
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Ordered, immutable set of tracked features
///
/// Deserialization goes through [`FeatureCatalog::new`], so a serialized
/// catalog is validated the same way as one built in code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "Vec<FeatureSpec>", into = "Vec<FeatureSpec>")]
pub struct FeatureCatalog {
    features: Vec<FeatureSpec>,
}

impl FeatureCatalog {
    /// Create a catalog, rejecting empty sets, duplicate keys and inverted ranges
    pub fn new(features: Vec<FeatureSpec>) -> Result<Self> {
        if features.is_empty() {
            return Err(Error::InvalidConfig("feature catalog cannot be empty".to_string()));
        }
        for (i, spec) in features.iter().enumerate() {
            if !(spec.min <= spec.max) {
                return Err(Error::InvalidConfig(format!(
                    "feature {} has an empty range [{}, {}]",
                    spec.key, spec.min, spec.max
                )));
            }
            if features[..i].iter().any(|other| other.key == spec.key) {
                return Err(Error::InvalidConfig(format!("duplicate feature key {}", spec.key)));
            }
        }
        Ok(Self { features })
    }

    /// The five features of the European soil database subset used for Poland
    pub fn soil_defaults() -> Self {
        Self {
            features: vec![
                FeatureSpec::new(
                    "TEXT",
                    "Soil Texture",
                    "Relative proportion of sand, silt, and clay (0: Coarse/Sandy to 8: Fine/Clayey)",
                    (0.0, 8.0),
                    2.06,
                ),
                FeatureSpec::new(
                    "OC_TOP_P",
                    "Organic Carbon Content",
                    "Percentage of organic carbon in topsoil (higher values indicate more organic matter)",
                    (30.0, 100.0),
                    88.47,
                ),
                FeatureSpec::new(
                    "AWC_TOP_P",
                    "Available Water Capacity",
                    "Percentage of water that soil can hold for plant and microbial use",
                    (34.0, 100.0),
                    92.47,
                ),
                FeatureSpec::new(
                    "CEC_TOP_P",
                    "Cation Exchange Capacity",
                    "Soil's ability to hold and supply nutrients (higher values indicate better nutrient retention)",
                    (40.0, 100.0),
                    91.82,
                ),
                FeatureSpec::new(
                    "PHYSCHIM",
                    "Soil pH",
                    "Soil acidity/alkalinity (1: Very acidic to 5: Very alkaline)",
                    (1.0, 5.0),
                    3.11,
                ),
            ],
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FeatureSpec> {
        self.features.iter()
    }

    pub fn get(&self, key: &str) -> Option<&FeatureSpec> {
        self.features.iter().find(|f| f.key == key)
    }

    /// Position of a key in the vector layout
    pub fn position(&self, key: &str) -> Option<usize> {
        self.features.iter().position(|f| f.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|f| f.key.as_str())
    }

    /// Reference means in catalog order
    pub fn means(&self) -> Vec<f64> {
        self.features.iter().map(|f| f.mean).collect()
    }
}

impl Default for FeatureCatalog {
    fn default() -> Self {
        Self::soil_defaults()
    }
}

impl TryFrom<Vec<FeatureSpec>> for FeatureCatalog {
    type Error = Error;

    fn try_from(features: Vec<FeatureSpec>) -> Result<Self> {
        Self::new(features)
    }
}

impl From<FeatureCatalog> for Vec<FeatureSpec> {
    fn from(catalog: FeatureCatalog) -> Self {
        catalog.features
    }
}

impl<'a> IntoIterator for &'a FeatureCatalog {
    type Item = &'a FeatureSpec;
    type IntoIter = std::slice::Iter<'a, FeatureSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}
