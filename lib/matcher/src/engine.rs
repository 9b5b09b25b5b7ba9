//! Match engine
//!
//! Owns the reference store together with the normalizer and neighbor index
//! fitted on it. Built once at startup; every method takes `&self`, so one
//! engine can be shared across request handlers behind an `Arc`.

use crate::association::{associate, AssociationSource};
use crate::config::MatchConfig;
use crate::explain::{polygon_explanation, MatchResponse, MatchResult};
use crate::query::QueryVector;
use crate::rank::deduplicate;
use serde_json::{Map, Value};
use soilmatch_core::{
    Error, FeatureCatalog, FeatureSummary, NeighborIndex, Normalizer, ReferenceStore, Result,
};
use std::collections::HashMap;
use tracing::{debug, info};

/// Immutable matching state fitted on a [`ReferenceStore`]
pub struct MatchEngine {
    store: ReferenceStore,
    normalizer: Normalizer,
    index: NeighborIndex,
    config: MatchConfig,
}

impl MatchEngine {
    /// Fit the normalizer and build the neighbor index.
    ///
    /// Any failure here means the service must not serve requests.
    pub fn build(store: ReferenceStore, config: MatchConfig) -> Result<Self> {
        config.validate()?;

        let summary = store.feature_summary();
        for key in store.catalog().keys() {
            if !summary.iter().any(|s| s.key == key) {
                return Err(Error::DataIntegrity(format!(
                    "feature {} has no values in soil data",
                    key
                )));
            }
        }

        let rows = store.feature_rows();
        let normalizer = Normalizer::fitted(&rows)?;
        let vectors = normalizer.transform_rows(&rows)?;
        let index = NeighborIndex::build(&vectors, config.neighbors)?;

        info!(
            rows = index.len(),
            dim = index.dim(),
            neighbors = index.default_k(),
            "Neighbor index built"
        );

        Ok(Self {
            store,
            normalizer,
            index,
            config,
        })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn catalog(&self) -> &FeatureCatalog {
        self.store.catalog()
    }

    pub fn store(&self) -> &ReferenceStore {
        &self.store
    }

    pub fn feature_summary(&self) -> Vec<FeatureSummary> {
        self.store.feature_summary()
    }

    /// Match a JSON feature mapping with explicit `k` and result cap
    pub fn match_json(
        &self,
        query: &Map<String, Value>,
        k: usize,
        max_results: usize,
    ) -> Result<MatchResponse> {
        let query = QueryVector::from_json(self.catalog(), query)?;
        self.match_query(&query, k, max_results)
    }

    /// Match numeric feature values with explicit `k` and result cap
    pub fn match_features(
        &self,
        query: &HashMap<String, f64>,
        k: usize,
        max_results: usize,
    ) -> Result<MatchResponse> {
        let query = QueryVector::from_values(self.catalog(), query)?;
        self.match_query(&query, k, max_results)
    }

    /// Match with the configured neighbor count and result cap
    pub fn match_default(&self, query: &Map<String, Value>) -> Result<MatchResponse> {
        self.match_json(query, self.config.neighbors, self.config.max_results)
    }

    /// Run the pipeline for a validated query
    pub fn match_query(
        &self,
        query: &QueryVector,
        k: usize,
        max_results: usize,
    ) -> Result<MatchResponse> {
        let catalog = self.store.catalog();
        let normalized = self.normalizer.transform(query.values())?;
        let neighbors = self.index.search(&normalized, k)?;

        let mut emitted = Vec::new();
        let mut contributed = false;

        for neighbor in neighbors {
            let Some(polygon) = self.store.polygon(neighbor.row) else {
                continue;
            };
            if !polygon.is_complete(catalog) {
                debug!(row = neighbor.row, "Skipping polygon with missing features");
                continue;
            }
            let Some(geometry) = polygon.geometry.as_ref() else {
                debug!(row = neighbor.row, "Skipping polygon without geometry");
                continue;
            };
            let Some(association) =
                associate(self.store.occurrences(), geometry, self.config.fallback_nearest)
            else {
                debug!(row = neighbor.row, "No occurrences associated with polygon");
                continue;
            };

            debug!(
                row = neighbor.row,
                distance = neighbor.distance,
                records = association.records.len(),
                fallback = association.source == AssociationSource::NearestFallback,
                "Associated occurrences"
            );

            contributed = true;
            let similarity = 1.0 / (1.0 + neighbor.distance);
            let explanation = polygon_explanation(catalog, polygon, &self.config.region_name);
            for taxon in association.distinct_taxa(self.config.max_taxa_per_polygon) {
                emitted.push(MatchResult::new(taxon, similarity, explanation.clone()));
            }
        }

        if !contributed {
            emitted.push(MatchResult::no_match(catalog, &self.config.region_name));
        }

        Ok(MatchResponse::new(deduplicate(emitted, max_results)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use soilmatch_core::{Geometry, OccurrenceRecord, Polygon, SoilPolygon};

    fn soil(values: [Option<f64>; 5], bbox: (f64, f64, f64, f64)) -> SoilPolygon {
        let keys = ["TEXT", "OC_TOP_P", "AWC_TOP_P", "CEC_TOP_P", "PHYSCHIM"];
        SoilPolygon::from_pairs(
            keys.into_iter().zip(values),
            Some(Geometry::Polygon(Polygon::rectangle(bbox.0, bbox.1, bbox.2, bbox.3))),
        )
    }

    fn engine(polygons: Vec<SoilPolygon>, occurrences: Vec<OccurrenceRecord>) -> MatchEngine {
        let store = ReferenceStore::new(FeatureCatalog::soil_defaults(), polygons, occurrences).unwrap();
        MatchEngine::build(store, MatchConfig::default()).unwrap()
    }

    fn query(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_closer_polygon_ranks_first() {
        let engine = engine(
            vec![
                soil([Some(1.0), Some(90.0), Some(90.0), Some(90.0), Some(2.0)], (0.0, 0.0, 1.0, 1.0)),
                soil([Some(7.0), Some(40.0), Some(50.0), Some(50.0), Some(5.0)], (10.0, 10.0, 11.0, 11.0)),
            ],
            vec![
                OccurrenceRecord::new("Near", 0.5, 0.5),
                OccurrenceRecord::new("Far", 10.5, 10.5),
            ],
        );
        let response = engine
            .match_default(&query(json!({"TEXT": 1, "OC_TOP_P": 90, "AWC_TOP_P": 90, "CEC_TOP_P": 90, "PHYSCHIM": 2})))
            .unwrap();
        assert_eq!(response.len(), 2);
        assert_eq!(response.microbes[0].name, "Near");
        assert_eq!(response.microbes[0].similarity, 1.0);
        assert!(response.microbes[1].similarity < 1.0);
    }

    #[test]
    fn test_placeholder_when_no_polygon_complete() {
        let engine = engine(
            vec![
                soil([Some(1.0), Some(90.0), Some(90.0), None, Some(2.0)], (0.0, 0.0, 1.0, 1.0)),
                soil([None, Some(80.0), Some(70.0), Some(60.0), Some(4.0)], (0.0, 0.0, 1.0, 1.0)),
            ],
            vec![OccurrenceRecord::new("A", 0.5, 0.5)],
        );
        let response = engine.match_default(&Map::new()).unwrap();
        assert_eq!(response.len(), 1);
        assert!(response.microbes[0].is_placeholder());
        assert!(response.microbes[0].explanation.contains("Soil Texture=2.1"));
        assert!(response.message.is_none());
    }

    #[test]
    fn test_placeholder_when_no_occurrences() {
        let engine = engine(
            vec![soil([Some(1.0), Some(90.0), Some(90.0), Some(90.0), Some(2.0)], (0.0, 0.0, 1.0, 1.0))],
            Vec::new(),
        );
        let response = engine.match_default(&Map::new()).unwrap();
        assert!(response.microbes[0].is_placeholder());
    }

    #[test]
    fn test_max_results_zero_is_empty_outcome() {
        let engine = engine(
            vec![soil([Some(1.0), Some(90.0), Some(90.0), Some(90.0), Some(2.0)], (0.0, 0.0, 1.0, 1.0))],
            vec![OccurrenceRecord::new("A", 0.5, 0.5)],
        );
        let response = engine.match_json(&Map::new(), 5, 0).unwrap();
        assert!(response.is_empty());
        assert!(response.message.is_some());
    }

    #[test]
    fn test_validation_error_propagates() {
        let engine = engine(
            vec![soil([Some(1.0), Some(90.0), Some(90.0), Some(90.0), Some(2.0)], (0.0, 0.0, 1.0, 1.0))],
            Vec::new(),
        );
        let err = engine.match_default(&query(json!({"PHYSCHIM": 6}))).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_per_polygon_taxa_cap() {
        let engine = engine(
            vec![soil([Some(1.0), Some(90.0), Some(90.0), Some(90.0), Some(2.0)], (0.0, 0.0, 10.0, 10.0))],
            (0..6)
                .map(|i| OccurrenceRecord::new(format!("T{}", i), i as f64, i as f64))
                .collect(),
        );
        let response = engine.match_default(&Map::new()).unwrap();
        let names: Vec<&str> = response.microbes.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["T0", "T1", "T2"]);
    }

    #[test]
    fn test_build_rejects_valueless_feature() {
        let store = ReferenceStore::new(
            FeatureCatalog::soil_defaults(),
            vec![soil([Some(1.0), Some(90.0), Some(90.0), None, Some(2.0)], (0.0, 0.0, 1.0, 1.0))],
            Vec::new(),
        )
        .unwrap();
        let err = MatchEngine::build(store, MatchConfig::default()).err().unwrap();
        assert!(matches!(err, Error::DataIntegrity(ref m) if m.contains("CEC_TOP_P")));
    }
}
