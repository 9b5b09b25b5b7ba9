//! Matching configuration
//!
//! Tunables of the match pipeline. All of them have defaults matching the
//! reference deployment and can be overridden from the command line or a
//! serialized config.

use serde::{Deserialize, Serialize};
use soilmatch_core::{Error, Result, DEFAULT_NEIGHBORS};

/// Configuration for a [`MatchEngine`](crate::MatchEngine)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchConfig {
    /// Neighbor count fixed when the index is built; default `k` for requests
    #[serde(default = "default_neighbors")]
    pub neighbors: usize,

    /// Default cap on returned matches
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Occurrences taken by the nearest-to-centroid fallback
    #[serde(default = "default_fallback_nearest")]
    pub fallback_nearest: usize,

    /// Distinct taxa emitted per matched polygon
    #[serde(default = "default_max_taxa")]
    pub max_taxa_per_polygon: usize,

    /// Region named in explanations
    #[serde(default = "default_region_name")]
    pub region_name: String,
}

fn default_neighbors() -> usize {
    DEFAULT_NEIGHBORS
}

fn default_max_results() -> usize {
    5
}

fn default_fallback_nearest() -> usize {
    3
}

fn default_max_taxa() -> usize {
    3
}

fn default_region_name() -> String {
    "Poland".to_string()
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            neighbors: default_neighbors(),
            max_results: default_max_results(),
            fallback_nearest: default_fallback_nearest(),
            max_taxa_per_polygon: default_max_taxa(),
            region_name: default_region_name(),
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.neighbors == 0 {
            return Err(Error::InvalidConfig("neighbors must be >= 1".to_string()));
        }
        if self.max_taxa_per_polygon == 0 {
            return Err(Error::InvalidConfig("max_taxa_per_polygon must be >= 1".to_string()));
        }
        Ok(())
    }
}
