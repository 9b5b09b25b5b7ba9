//! HTTP surface for SoilMatch: the matching endpoint, the catalog listing
//! and the taxon explanation proxy.

pub mod explainer;
pub mod rest;

pub use explainer::{ExplainerConfig, GeminiExplainer, MISSING_KEY_MESSAGE, UNAVAILABLE_MESSAGE};
pub use rest::{ApiError, RestApi};
