use crate::gbif::load_occurrences;
use crate::geojson::load_soil_polygons;
use anyhow::{Context, Result};
use soilmatch_core::{FeatureCatalog, ReferenceStore};
use std::path::PathBuf;

/// Locations and filters for the two reference datasets
#[derive(Debug, Clone)]
pub struct ReferenceLoader {
    pub soil_path: PathBuf,
    pub occurrence_path: PathBuf,
    /// Keep only occurrences from this country (`countryCode` column)
    pub country_code: Option<String>,
}

impl ReferenceLoader {
    pub fn new(soil_path: impl Into<PathBuf>, occurrence_path: impl Into<PathBuf>) -> Self {
        Self {
            soil_path: soil_path.into(),
            occurrence_path: occurrence_path.into(),
            country_code: None,
        }
    }

    pub fn with_country(mut self, code: impl Into<String>) -> Self {
        let code = code.into();
        self.country_code = (!code.is_empty()).then_some(code);
        self
    }

    /// Read both datasets and build the reference store
    pub fn load(&self, catalog: FeatureCatalog) -> Result<ReferenceStore> {
        let polygons = load_soil_polygons(&self.soil_path, &catalog)?;
        let occurrences = load_occurrences(&self.occurrence_path, self.country_code.as_deref())?;
        ReferenceStore::new(catalog, polygons, occurrences.records)
            .context("Failed to build reference store")
    }
}
