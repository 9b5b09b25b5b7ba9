//! # SoilMatch
//!
//! Matches a soil-characteristic profile against a reference table of soil
//! polygons and reports the microbial taxa observed in the most similar soils.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! soilmatch --soil-path data/poland_soil.geojson \
//!     --occurrence-path data/occurrence.txt --http-port 5000
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use soilmatch::prelude::*;
//!
//! let store = ReferenceLoader::new("soil.geojson", "occurrence.txt")
//!     .with_country("PL")
//!     .load(FeatureCatalog::soil_defaults())
//!     .unwrap();
//! let engine = MatchEngine::build(store, MatchConfig::default()).unwrap();
//!
//! let query = serde_json::json!({"TEXT": 2.0, "PHYSCHIM": 3.0});
//! let response = engine.match_default(query.as_object().unwrap()).unwrap();
//! for microbe in &response.microbes {
//!     println!("{} ({:.3}): {}", microbe.name, microbe.similarity, microbe.explanation);
//! }
//! ```
//!
//! ## Crate Structure
//!
//! - `soilmatch-core` - feature catalog, records, geometry, normalizer, k-d tree
//! - `soilmatch-matcher` - query validation, occurrence association, ranking
//! - `soilmatch-storage` - GeoJSON and GBIF ingestion
//! - `soilmatch-api` - REST gateway and explanation client

// Re-export core types
pub use soilmatch_core::{
    BoundingBox, Coord, Error, FeatureCatalog, FeatureSpec, FeatureSummary, FeatureValue, Geometry,
    Neighbor, NeighborIndex, Normalizer, OccurrenceRecord, Polygon, ReferenceStore, Result,
    SoilPolygon, Vector,
};

// Re-export matching
pub use soilmatch_matcher::{
    AssociationSource, MatchConfig, MatchEngine, MatchResponse, MatchResult, QueryVector,
    NO_MATCH_NAME,
};

// Re-export storage
pub use soilmatch_storage::ReferenceLoader;

// Re-export API
pub use soilmatch_api::{ExplainerConfig, GeminiExplainer, RestApi};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Error, FeatureCatalog, FeatureSpec, Geometry, MatchConfig, MatchEngine, MatchResponse,
        MatchResult, OccurrenceRecord, Polygon, ReferenceLoader, ReferenceStore, Result,
        SoilPolygon,
    };
}
