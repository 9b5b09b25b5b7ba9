// Soil polygon ingestion from GeoJSON feature collections
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use soilmatch_core::{Coord, Error, FeatureCatalog, Geometry, Polygon, SoilPolygon};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Property names tried, in order, for a polygon identifier
const ID_PROPERTIES: [&str; 3] = ["SMU", "id", "ID"];

/// Load soil polygons from a GeoJSON `FeatureCollection` (optionally gzipped).
///
/// Only properties named in `catalog` are kept. A tracked property that
/// is null or non-numeric becomes a missing cell; a tracked property absent
/// from every feature is a data-integrity error.
pub fn load_soil_polygons(path: &Path, catalog: &FeatureCatalog) -> Result<Vec<SoilPolygon>> {
    let reader = crate::open_reader(path)?;
    let document: Value = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse GeoJSON: {}", path.display()))?;
    let polygons = parse_feature_collection(&document, catalog)?;
    info!(path = %path.display(), polygons = polygons.len(), "Loaded soil polygons");
    Ok(polygons)
}

/// Convert a parsed `FeatureCollection` into soil polygons
pub fn parse_feature_collection(document: &Value, catalog: &FeatureCatalog) -> Result<Vec<SoilPolygon>> {
    if document.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
        return Err(anyhow!("GeoJSON document is not a FeatureCollection"));
    }
    let features = document
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("FeatureCollection has no features array"))?;

    if features.is_empty() {
        return Err(Error::DataIntegrity("soil feature collection is empty".to_string()).into());
    }

    let mut without_geometry = 0usize;
    let polygons: Vec<SoilPolygon> = features
        .iter()
        .map(|feature| {
            let polygon = parse_feature(feature, catalog);
            if polygon.geometry.is_none() {
                without_geometry += 1;
            }
            polygon
        })
        .collect();

    if without_geometry > 0 {
        warn!(count = without_geometry, "Soil polygons without usable geometry");
    }

    for key in catalog.keys() {
        if !polygons.iter().any(|p| p.has_column(key)) {
            return Err(Error::DataIntegrity(format!("feature {} not found in soil data", key)).into());
        }
    }

    Ok(polygons)
}

fn parse_feature(feature: &Value, catalog: &FeatureCatalog) -> SoilPolygon {
    let properties = feature.get("properties").and_then(Value::as_object);

    let mut values = BTreeMap::new();
    if let Some(props) = properties {
        for key in catalog.keys() {
            if let Some(v) = props.get(key) {
                values.insert(key.to_string(), numeric(v));
            }
        }
    }

    let geometry = feature.get("geometry").and_then(parse_geometry);
    let mut polygon = SoilPolygon::new(values, geometry);

    let id = properties
        .and_then(|props| ID_PROPERTIES.iter().find_map(|k| props.get(*k)))
        .or_else(|| feature.get("id"))
        .and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
    if let Some(id) = id {
        polygon = polygon.with_id(id);
    }
    polygon
}

fn numeric(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// `Polygon` and `MultiPolygon` are supported; anything else (or malformed
/// coordinates) yields no geometry for that row
fn parse_geometry(geometry: &Value) -> Option<Geometry> {
    let coordinates = geometry.get("coordinates")?;
    match geometry.get("type")?.as_str()? {
        "Polygon" => parse_polygon(coordinates).map(Geometry::Polygon),
        "MultiPolygon" => coordinates
            .as_array()?
            .iter()
            .map(parse_polygon)
            .collect::<Option<Vec<_>>>()
            .filter(|ps| !ps.is_empty())
            .map(Geometry::MultiPolygon),
        _ => None,
    }
}

fn parse_polygon(rings: &Value) -> Option<Polygon> {
    let mut rings = rings.as_array()?.iter().map(parse_ring);
    let exterior = rings.next()??;
    let holes = rings.collect::<Option<Vec<_>>>()?;
    Some(Polygon::new(exterior, holes))
}

fn parse_ring(ring: &Value) -> Option<Vec<Coord>> {
    ring.as_array()?
        .iter()
        .map(|position| {
            let position = position.as_array()?;
            let x = position.first()?.as_f64()?;
            let y = position.get(1)?.as_f64()?;
            Some(Coord::new(x, y))
        })
        .collect()
}
