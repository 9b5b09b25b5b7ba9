//! Reference store
//!
//! The soil-polygon table and the occurrence table, loaded once at startup
//! and read-only afterwards. Construction validates that every tracked
//! feature column exists in the soil table; it never looks at file formats.

use crate::record::{FeatureValue, OccurrenceRecord, SoilPolygon};
use crate::{Error, FeatureCatalog, Result};
use serde::Serialize;
use tracing::{info, warn};

/// Observed statistics of one feature column over present values
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeatureSummary {
    pub key: String,
    pub name: String,
    pub description: String,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Number of rows with a present value
    pub present: usize,
}

/// Immutable in-memory reference tables
#[derive(Debug, Clone)]
pub struct ReferenceStore {
    catalog: FeatureCatalog,
    polygons: Vec<SoilPolygon>,
    occurrences: Vec<OccurrenceRecord>,
}

impl ReferenceStore {
    /// Validate and freeze the reference tables.
    ///
    /// Fails with [`Error::DataIntegrity`] when the soil table is empty or a
    /// tracked feature column is absent from every row. Occurrence records
    /// without usable coordinates are dropped.
    pub fn new(
        catalog: FeatureCatalog,
        polygons: Vec<SoilPolygon>,
        occurrences: Vec<OccurrenceRecord>,
    ) -> Result<Self> {
        if polygons.is_empty() {
            return Err(Error::DataIntegrity("reference soil table is empty".to_string()));
        }

        for key in catalog.keys() {
            if !polygons.iter().any(|p| p.has_column(key)) {
                return Err(Error::DataIntegrity(format!(
                    "feature {} not found in soil data",
                    key
                )));
            }
        }

        let total = occurrences.len();
        let occurrences: Vec<OccurrenceRecord> = occurrences
            .into_iter()
            .filter(OccurrenceRecord::has_coordinates)
            .collect();
        if occurrences.len() < total {
            warn!(
                dropped = total - occurrences.len(),
                "Dropped occurrence records without coordinates"
            );
        }

        let store = Self { catalog, polygons, occurrences };
        info!(
            polygons = store.polygons.len(),
            complete = store.complete_polygon_count(),
            occurrences = store.occurrences.len(),
            "Reference store ready"
        );
        Ok(store)
    }

    pub fn catalog(&self) -> &FeatureCatalog {
        &self.catalog
    }

    pub fn polygons(&self) -> &[SoilPolygon] {
        &self.polygons
    }

    pub fn polygon(&self, row: usize) -> Option<&SoilPolygon> {
        self.polygons.get(row)
    }

    pub fn occurrences(&self) -> &[OccurrenceRecord] {
        &self.occurrences
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Soil feature matrix in catalog order, one row per polygon
    pub fn feature_rows(&self) -> Vec<Vec<FeatureValue>> {
        self.polygons
            .iter()
            .map(|p| p.feature_row(&self.catalog))
            .collect()
    }

    pub fn complete_polygon_count(&self) -> usize {
        self.polygons
            .iter()
            .filter(|p| p.is_complete(&self.catalog))
            .count()
    }

    /// Observed min/max/mean per feature. Features with no present value
    /// at all are omitted.
    pub fn feature_summary(&self) -> Vec<FeatureSummary> {
        self.catalog
            .iter()
            .filter_map(|spec| {
                let mut present = 0usize;
                let mut sum = 0.0;
                let mut min = f64::INFINITY;
                let mut max = f64::NEG_INFINITY;
                for v in self.polygons.iter().filter_map(|p| p.value(&spec.key)) {
                    present += 1;
                    sum += v;
                    min = min.min(v);
                    max = max.max(v);
                }
                (present > 0).then(|| FeatureSummary {
                    key: spec.key.clone(),
                    name: spec.name.clone(),
                    description: spec.description.clone(),
                    min,
                    max,
                    mean: sum / present as f64,
                    present,
                })
            })
            .collect()
    }
}
