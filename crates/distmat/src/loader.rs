use std::{fs::File, path::Path};

use serde::Deserialize;
use tracing::info;

use crate::{
    error::DistmatError,
    municipality::{Municipality, MunicipalityTable},
};

#[derive(Deserialize)]
struct MunicipalityRecord {
    #[serde(alias = "name", alias = "municipality")]
    id: String,

    #[serde(alias = "latitude")]
    lat: f64,

    #[serde(alias = "lng", alias = "longitude")]
    lon: f64,
}

fn validate(record: MunicipalityRecord) -> Result<Municipality, String> {
    if record.id.is_empty() {
        return Err("empty municipality id".to_string());
    }
    if !record.lat.is_finite() || !(-90.0..=90.0).contains(&record.lat) {
        return Err(format!("latitude {} out of range for {}", record.lat, record.id));
    }
    if !record.lon.is_finite() || !(-180.0..=180.0).contains(&record.lon) {
        return Err(format!("longitude {} out of range for {}", record.lon, record.id));
    }

    Ok(Municipality::new(record.id, record.lat, record.lon))
}

/// Reads an `id,lat,lon` CSV table. Every data row becomes exactly one municipality.
pub fn load_municipalities(path: &Path) -> Result<MunicipalityTable, DistmatError> {
    let file = File::open(path).map_err(|source| DistmatError::Load {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut table = MunicipalityTable::default();

    for (i, result) in reader.deserialize::<MunicipalityRecord>().enumerate() {
        // Header is line 1
        let fallback_line = i as u64 + 2;

        let record = match result {
            Ok(record) => record,
            Err(err) if err.is_io_error() => {
                return Err(DistmatError::Load {
                    path: path.to_path_buf(),
                    source: err.into(),
                });
            }
            Err(err) => {
                let line = err
                    .position()
                    .map(|position| position.line())
                    .unwrap_or(fallback_line);
                return Err(DistmatError::Parse {
                    path: path.to_path_buf(),
                    line,
                    message: err.to_string(),
                });
            }
        };

        let municipality = validate(record).map_err(|message| DistmatError::Parse {
            path: path.to_path_buf(),
            line: fallback_line,
            message,
        })?;

        table.push(municipality).map_err(|id| DistmatError::Parse {
            path: path.to_path_buf(),
            line: fallback_line,
            message: format!("duplicate municipality id {}", id),
        })?;
    }

    info!("Loaded {} municipalities from {:?}", table.len(), path);

    Ok(table)
}
