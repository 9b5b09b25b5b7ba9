//! # SoilMatch Core
//!
//! Core library for the SoilMatch soil-to-microbe matcher.
//!
//! This crate provides the data model and the numeric building blocks:
//!
//! - [`FeatureCatalog`] - The tracked soil features with ranges and reference means
//! - [`SoilPolygon`] / [`OccurrenceRecord`] - Reference rows
//! - [`ReferenceStore`] - Validated, immutable reference tables
//! - [`Normalizer`] - Per-feature standardization fitted on the soil table
//! - [`NeighborIndex`] - Exact k-d tree nearest-neighbor search
//!
//! ## Example
//!
//! ```rust
//! use soilmatch_core::{FeatureCatalog, Normalizer, NeighborIndex, Vector};
//!
//! let rows = vec![
//!     vec![Some(1.0), Some(90.0)],
//!     vec![Some(3.0), None],
//!     vec![Some(5.0), Some(70.0)],
//! ];
//! let normalizer = Normalizer::fitted(&rows).unwrap();
//! let vectors = normalizer.transform_rows(&rows).unwrap();
//! let index = NeighborIndex::build(&vectors, 2).unwrap();
//!
//! let query = normalizer.transform(&Vector::new(vec![1.0, 90.0])).unwrap();
//! let hits = index.nearest(&query).unwrap();
//! assert_eq!(hits[0].row, 0);
//! ```

pub mod error;
pub mod feature;
pub mod geometry;
pub mod kdtree;
pub mod normalizer;
pub mod record;
pub mod store;
pub mod vector;

pub use error::{Error, Result};
pub use feature::{FeatureCatalog, FeatureSpec};
pub use geometry::{BoundingBox, Coord, Geometry, Polygon};
pub use kdtree::{Neighbor, NeighborIndex, DEFAULT_NEIGHBORS};
pub use normalizer::Normalizer;
pub use record::{FeatureValue, OccurrenceRecord, SoilPolygon};
pub use store::{FeatureSummary, ReferenceStore};
pub use vector::Vector;
