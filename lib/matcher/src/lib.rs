//! # SoilMatch Matcher
//!
//! Matches a soil-characteristic profile to microbial taxa observed in
//! similar soils.
//!
//! ## How it works
//!
//! 1. The query is validated against the feature catalog; absent features
//!    take their reference mean
//! 2. The normalized query is looked up in the k-d tree over reference polygons
//! 3. Each complete neighbor polygon is associated with occurrence records
//!    (bounding box first, nearest-to-centroid fallback otherwise)
//! 4. Up to three distinct taxa per polygon are scored with `1 / (1 + d)`
//! 5. Results are deduplicated by taxon, ranked and truncated
//!
//! ```text
//! ┌─────────┐   ┌────────────┐   ┌──────────┐   ┌─────────────┐   ┌────────┐
//! │  Query  │──>│ Normalizer │──>│ k-d tree │──>│ Association │──>│  Rank  │
//! └─────────┘   └────────────┘   └──────────┘   └─────────────┘   └────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use soilmatch_core::{FeatureCatalog, Geometry, OccurrenceRecord, Polygon, ReferenceStore, SoilPolygon};
//! use soilmatch_matcher::{MatchConfig, MatchEngine};
//!
//! let polygon = SoilPolygon::from_pairs(
//!     [
//!         ("TEXT", Some(2.0)),
//!         ("OC_TOP_P", Some(88.0)),
//!         ("AWC_TOP_P", Some(90.0)),
//!         ("CEC_TOP_P", Some(90.0)),
//!         ("PHYSCHIM", Some(3.0)),
//!     ],
//!     Some(Geometry::Polygon(Polygon::rectangle(0.0, 0.0, 10.0, 10.0))),
//! );
//! let store = ReferenceStore::new(
//!     FeatureCatalog::soil_defaults(),
//!     vec![polygon],
//!     vec![OccurrenceRecord::new("Bacillus X", 5.0, 5.0)],
//! )
//! .unwrap();
//! let engine = MatchEngine::build(store, MatchConfig::default()).unwrap();
//!
//! let response = engine.match_default(&serde_json::Map::new()).unwrap();
//! assert_eq!(response.microbes[0].name, "Bacillus X");
//! ```

pub mod association;
pub mod config;
pub mod engine;
pub mod explain;
pub mod query;
pub mod rank;

pub use association::{associate, nearest_occurrences, Association, AssociationSource};
pub use config::MatchConfig;
pub use engine::MatchEngine;
pub use explain::{MatchResponse, MatchResult, EMPTY_RESULT_MESSAGE, NO_MATCH_NAME};
pub use query::QueryVector;
