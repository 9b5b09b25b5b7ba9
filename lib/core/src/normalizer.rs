//! Per-feature standardization
//!
//! Fits a zero-mean, unit-variance affine transform on the reference soil
//! table. Missing cells are imputed with their column mean once, before the
//! fit; the same fill values are reused when the reference table itself is
//! transformed for indexing.

use crate::record::FeatureValue;
use crate::{Error, Result, Vector};
use rayon::prelude::*;

/// Relative tolerance under which a column counts as constant
const CONSTANT_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
struct FittedState {
    /// Mean of present values, used to impute missing cells
    fill: Vec<f64>,
    mean: Vec<f64>,
    /// Population standard deviation; `0.0` marks a constant column
    std: Vec<f64>,
}

/// Standard scaler over a fixed-width feature vector
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalizer {
    state: Option<FittedState>,
}

impl Normalizer {
    /// An unfitted normalizer; every transform fails until [`fit`](Self::fit) succeeds
    pub fn new() -> Self {
        Self { state: None }
    }

    /// Fit on `rows`, returning the fitted normalizer
    pub fn fitted(rows: &[Vec<FeatureValue>]) -> Result<Self> {
        let mut normalizer = Self::new();
        normalizer.fit(rows)?;
        Ok(normalizer)
    }

    #[inline]
    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    /// Width of the fitted vectors
    pub fn dim(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.mean.len())
    }

    pub fn means(&self) -> Option<&[f64]> {
        self.state.as_ref().map(|s| s.mean.as_slice())
    }

    pub fn std_devs(&self) -> Option<&[f64]> {
        self.state.as_ref().map(|s| s.std.as_slice())
    }

    /// Compute per-feature fill values, means and standard deviations.
    ///
    /// A column with no present value cannot be fitted and is reported as
    /// [`Error::DataIntegrity`].
    pub fn fit(&mut self, rows: &[Vec<FeatureValue>]) -> Result<()> {
        let dim = match rows.first() {
            Some(row) => row.len(),
            None => return Err(Error::DataIntegrity("cannot fit on an empty table".to_string())),
        };
        if let Some(bad) = rows.iter().find(|r| r.len() != dim) {
            return Err(Error::InvalidDimension {
                expected: dim,
                actual: bad.len(),
            });
        }

        let mut fill = Vec::with_capacity(dim);
        let mut mean = Vec::with_capacity(dim);
        let mut std = Vec::with_capacity(dim);

        for col in 0..dim {
            let present = rows.iter().filter_map(|r| r[col].filter(|v| v.is_finite()));
            let (count, sum) = present.fold((0usize, 0.0), |(n, s), v| (n + 1, s + v));
            if count == 0 {
                return Err(Error::DataIntegrity(format!(
                    "feature column {} has no values",
                    col
                )));
            }
            let col_fill = sum / count as f64;

            // Statistics of the imputed column
            let col_mean = imputed_column(rows, col, col_fill).sum::<f64>() / rows.len() as f64;
            let (lo, hi) = imputed_column(rows, col, col_fill)
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
            let variance = imputed_column(rows, col, col_fill)
                .map(|v| {
                    let d = v - col_mean;
                    d * d
                })
                .sum::<f64>()
                / rows.len() as f64;
            let col_std = variance.sqrt();
            let constant = lo == hi || col_std <= CONSTANT_TOLERANCE * col_mean.abs().max(1.0);

            fill.push(col_fill);
            mean.push(col_mean);
            std.push(if constant { 0.0 } else { col_std });
        }

        self.state = Some(FittedState { fill, mean, std });
        Ok(())
    }

    fn state(&self) -> Result<&FittedState> {
        self.state
            .as_ref()
            .ok_or(Error::NotFitted { component: "Normalizer" })
    }

    /// Standardize a complete vector: `(x - mean) / std`, or 0 for constant features
    pub fn transform(&self, vector: &Vector) -> Result<Vector> {
        let state = self.state()?;
        if vector.dim() != state.mean.len() {
            return Err(Error::InvalidDimension {
                expected: state.mean.len(),
                actual: vector.dim(),
            });
        }
        Ok(Vector::new(
            vector
                .as_slice()
                .iter()
                .zip(state.mean.iter().zip(state.std.iter()))
                .map(|(x, (m, s))| scale(*x, *m, *s))
                .collect(),
        ))
    }

    /// Impute missing cells with the fitted fill values, then standardize.
    /// Used on the reference table to produce the indexed vectors.
    pub fn transform_rows(&self, rows: &[Vec<FeatureValue>]) -> Result<Vec<Vector>> {
        let state = self.state()?;
        let dim = state.mean.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != dim) {
            return Err(Error::InvalidDimension {
                expected: dim,
                actual: bad.len(),
            });
        }
        Ok(rows
            .par_iter()
            .map(|row| {
                Vector::new(
                    row.iter()
                        .enumerate()
                        .map(|(col, cell)| {
                            let x = cell.filter(|v| v.is_finite()).unwrap_or(state.fill[col]);
                            scale(x, state.mean[col], state.std[col])
                        })
                        .collect(),
                )
            })
            .collect())
    }
}

fn imputed_column(
    rows: &[Vec<FeatureValue>],
    col: usize,
    fill: f64,
) -> impl Iterator<Item = f64> + '_ {
    rows.iter()
        .map(move |r| r[col].filter(|v| v.is_finite()).unwrap_or(fill))
}

#[inline]
fn scale(x: f64, mean: f64, std: f64) -> f64 {
    if std == 0.0 {
        0.0
    } else {
        (x - mean) / std
    }
}
