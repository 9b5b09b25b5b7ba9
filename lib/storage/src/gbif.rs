// Occurrence ingestion from GBIF tab-separated exports
use anyhow::{Context, Result};
use soilmatch_core::{Error, OccurrenceRecord};
use std::io::BufRead;
use std::path::Path;
use tracing::{info, warn};

const LATITUDE: &str = "decimalLatitude";
const LONGITUDE: &str = "decimalLongitude";
const NAME: &str = "scientificName";
const COUNTRY: &str = "countryCode";

/// Result of reading an occurrence export
#[derive(Debug, Default)]
pub struct OccurrenceLoad {
    pub records: Vec<OccurrenceRecord>,
    /// Rows dropped for missing coordinates or names
    pub dropped: usize,
    /// Rows outside the requested country
    pub filtered: usize,
}

/// Load occurrences from a GBIF "simple" TSV export (optionally gzipped).
///
/// When `country` is set and the export has a `countryCode` column, rows
/// from other countries are skipped.
pub fn load_occurrences(path: &Path, country: Option<&str>) -> Result<OccurrenceLoad> {
    let reader = crate::open_reader(path)?;
    let load = parse_occurrences(reader, country)
        .with_context(|| format!("Failed to read occurrences: {}", path.display()))?;
    if load.dropped > 0 {
        warn!(dropped = load.dropped, "Occurrence rows without coordinates or name");
    }
    info!(
        path = %path.display(),
        records = load.records.len(),
        filtered = load.filtered,
        "Loaded occurrence records"
    );
    Ok(load)
}

/// Parse a TSV stream with a header row
pub fn parse_occurrences<R: BufRead>(reader: R, country: Option<&str>) -> Result<OccurrenceLoad> {
    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(Error::DataIntegrity("occurrence file is empty".to_string()).into()),
    };
    let columns: Vec<&str> = header.trim_end_matches(['\r', '\n']).split('\t').collect();
    let position = |name: &str| columns.iter().position(|c| c.trim() == name);

    let required = |name: &str| {
        position(name).ok_or_else(|| Error::DataIntegrity(format!("occurrence column {} not found", name)))
    };
    let lat_col = required(LATITUDE)?;
    let lon_col = required(LONGITUDE)?;
    let name_col = required(NAME)?;
    let country_col = country.filter(|c| !c.is_empty()).and(position(COUNTRY));

    let mut load = OccurrenceLoad::default();
    for line in lines {
        let line = line?;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let field = |idx: usize| fields.get(idx).map(|f| f.trim()).unwrap_or("");

        if let (Some(col), Some(code)) = (country_col, country) {
            if field(col) != code {
                load.filtered += 1;
                continue;
            }
        }

        let latitude = field(lat_col).parse::<f64>().ok().filter(|v| v.is_finite());
        let longitude = field(lon_col).parse::<f64>().ok().filter(|v| v.is_finite());
        let name = field(name_col);

        match (latitude, longitude) {
            (Some(lat), Some(lon)) if !name.is_empty() => {
                load.records.push(OccurrenceRecord::new(name, lat, lon));
            }
            _ => load.dropped += 1,
        }
    }
    Ok(load)
}
