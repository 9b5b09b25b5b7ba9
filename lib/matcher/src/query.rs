//! Query validation
//!
//! Turns a user-supplied feature mapping into a full vector in catalog
//! order. Supplied values must be numeric and inside the feature's declared
//! range; absent features take the reference mean. Keys the catalog does
//! not know are ignored.

use serde_json::{Map, Value};
use soilmatch_core::{Error, FeatureCatalog, FeatureSpec, Result, Vector};
use std::collections::HashMap;

/// A validated query profile
#[derive(Debug, Clone, PartialEq)]
pub struct QueryVector {
    values: Vector,
    /// Keys filled from the reference mean
    defaulted: Vec<String>,
}

impl QueryVector {
    /// Build from already-numeric values
    pub fn from_values(catalog: &FeatureCatalog, supplied: &HashMap<String, f64>) -> Result<Self> {
        Self::build(catalog, |spec| supplied.get(&spec.key).map(|v| Ok(*v)))
    }

    /// Build from a JSON object. Numbers and numeric strings are accepted;
    /// anything else for a tracked key is rejected as non-numeric.
    pub fn from_json(catalog: &FeatureCatalog, supplied: &Map<String, Value>) -> Result<Self> {
        Self::build(catalog, |spec| supplied.get(&spec.key).map(|v| json_number(spec, v)))
    }

    fn build<F>(catalog: &FeatureCatalog, mut lookup: F) -> Result<Self>
    where
        F: FnMut(&FeatureSpec) -> Option<Result<f64>>,
    {
        let mut values = Vec::with_capacity(catalog.len());
        let mut defaulted = Vec::new();
        for spec in catalog {
            match lookup(spec) {
                Some(value) => values.push(check_range(spec, value?)?),
                None => {
                    values.push(spec.mean);
                    defaulted.push(spec.key.clone());
                }
            }
        }
        Ok(Self {
            values: Vector::new(values),
            defaulted,
        })
    }

    pub fn values(&self) -> &Vector {
        &self.values
    }

    pub fn into_vector(self) -> Vector {
        self.values
    }

    pub fn defaulted(&self) -> &[String] {
        &self.defaulted
    }
}

fn not_numeric(spec: &FeatureSpec) -> Error {
    Error::NotNumeric {
        feature: spec.key.clone(),
        min: spec.min,
        max: spec.max,
    }
}

fn json_number(spec: &FeatureSpec, value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| not_numeric(spec)),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| not_numeric(spec)),
        _ => Err(not_numeric(spec)),
    }
}

fn check_range(spec: &FeatureSpec, value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(not_numeric(spec));
    }
    if !spec.contains(value) {
        return Err(Error::OutOfRange {
            feature: spec.key.clone(),
            value,
            min: spec.min,
            max: spec.max,
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_absent_features_use_reference_mean() {
        let catalog = FeatureCatalog::soil_defaults();
        let query = QueryVector::from_json(&catalog, &object(json!({"TEXT": 4}))).unwrap();
        assert_eq!(query.values().as_slice(), &[4.0, 88.47, 92.47, 91.82, 3.11]);
        assert_eq!(query.defaulted().len(), 4);
    }

    #[test]
    fn test_boundaries_are_accepted() {
        let catalog = FeatureCatalog::soil_defaults();
        let query = QueryVector::from_json(
            &catalog,
            &object(json!({"TEXT": 8, "OC_TOP_P": 30, "PHYSCHIM": 1.0})),
        )
        .unwrap();
        assert_eq!(query.values().as_slice()[0], 8.0);
        assert_eq!(query.values().as_slice()[1], 30.0);
    }

    #[test]
    fn test_one_unit_outside_is_rejected() {
        let catalog = FeatureCatalog::soil_defaults();
        let err = QueryVector::from_json(&catalog, &object(json!({"TEXT": 9}))).unwrap_err();
        assert!(matches!(
            err,
            Error::OutOfRange { ref feature, min, max, .. } if feature == "TEXT" && min == 0.0 && max == 8.0
        ));
        assert_eq!(err.to_string(), "Value for TEXT must be between 0.00 and 8.00");

        let err = QueryVector::from_json(&catalog, &object(json!({"CEC_TOP_P": 39}))).unwrap_err();
        assert_eq!(err.validation_bounds(), Some(("CEC_TOP_P", 40.0, 100.0)));
    }

    #[test]
    fn test_numeric_strings_and_garbage() {
        let catalog = FeatureCatalog::soil_defaults();
        let query = QueryVector::from_json(&catalog, &object(json!({"TEXT": " 2.5 "}))).unwrap();
        assert_eq!(query.values().as_slice()[0], 2.5);

        for bad in [json!("sandy"), json!(null), json!(true), json!([1]), json!("NaN")] {
            let err = QueryVector::from_json(&catalog, &object(json!({"PHYSCHIM": bad}))).unwrap_err();
            assert!(matches!(err, Error::NotNumeric { ref feature, .. } if feature == "PHYSCHIM"));
        }
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let catalog = FeatureCatalog::soil_defaults();
        let query = QueryVector::from_json(&catalog, &object(json!({"FOO": "bar"}))).unwrap();
        assert_eq!(query.into_vector().as_slice(), catalog.means().as_slice());
    }

    #[test]
    fn test_from_values() {
        let catalog = FeatureCatalog::soil_defaults();
        let mut supplied = HashMap::new();
        supplied.insert("TEXT".to_string(), f64::INFINITY);
        assert!(matches!(
            QueryVector::from_values(&catalog, &supplied),
            Err(Error::NotNumeric { .. })
        ));
    }
}
