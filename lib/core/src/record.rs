use crate::geometry::Geometry;
use crate::FeatureCatalog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value of one feature cell: `None` is the explicit "missing" sentinel
pub type FeatureValue = Option<f64>;

/// A reference soil-survey polygon
#[derive(Debug, Clone, PartialEq)]
pub struct SoilPolygon {
    /// Source identifier (e.g. the soil mapping unit), informational only
    pub id: Option<String>,
    /// Feature columns present for this row. A key that maps to `None`
    /// is a known column with a missing cell.
    pub values: BTreeMap<String, FeatureValue>,
    pub geometry: Option<Geometry>,
}

impl SoilPolygon {
    pub fn new(values: BTreeMap<String, FeatureValue>, geometry: Option<Geometry>) -> Self {
        Self { id: None, values, geometry }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Build from `(key, value)` pairs
    pub fn from_pairs<K, I>(pairs: I, geometry: Option<Geometry>) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, FeatureValue)>,
    {
        let values = pairs.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self::new(values, geometry)
    }

    /// Whether the row carries this column at all (even if the cell is missing)
    #[inline]
    pub fn has_column(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Present, finite value of a feature
    #[inline]
    pub fn value(&self, key: &str) -> Option<f64> {
        self.values
            .get(key)
            .copied()
            .flatten()
            .filter(|v| v.is_finite())
    }

    /// True when every tracked feature has a present value
    pub fn is_complete(&self, catalog: &FeatureCatalog) -> bool {
        catalog.keys().all(|k| self.value(k).is_some())
    }

    /// Feature cells in catalog order
    pub fn feature_row(&self, catalog: &FeatureCatalog) -> Vec<FeatureValue> {
        catalog.keys().map(|k| self.value(k)).collect()
    }
}

/// A georeferenced observation of a microbial taxon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OccurrenceRecord {
    pub taxon: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl OccurrenceRecord {
    pub fn new(taxon: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            taxon: taxon.into(),
            latitude,
            longitude,
        }
    }

    #[inline]
    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}
