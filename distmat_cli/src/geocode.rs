use std::{
    fs::File,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, bail};
use clap::Args;
use distmat::municipality::Municipality;
use distmat_providers::google_geocoding_api::GoogleGeocodingClient;
use indicatif::ProgressBar;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{parsers, settings::Settings};

#[derive(Args)]
pub struct GeocodeArgs {
    /// CSV with a name column (place names or addresses)
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Coordinates CSV, usable as input of the compute command
    #[arg(short = 'o', long, default_value = "municipalities.csv")]
    output: PathBuf,

    /// HTTP timeout per request (e.g., "30s", "PT1M")
    #[arg(long, value_parser = parsers::parse_timeout)]
    timeout: Option<Duration>,
}

#[derive(Deserialize)]
struct NameRecord {
    #[serde(alias = "id", alias = "address", alias = "municipality")]
    name: String,
}

fn read_names(path: &Path) -> anyhow::Result<Vec<String>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut names = Vec::new();
    for record in reader.deserialize::<NameRecord>() {
        let record = record.with_context(|| format!("Failed to parse {:?}", path))?;
        if !record.name.is_empty() && !names.contains(&record.name) {
            names.push(record.name);
        }
    }

    Ok(names)
}

fn write_municipalities(path: &Path, municipalities: &[Municipality]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    for municipality in municipalities {
        writer.serialize(municipality)?;
    }
    writer.flush()?;

    Ok(())
}

pub async fn run(args: GeocodeArgs, settings: &Settings) -> anyhow::Result<()> {
    let names = read_names(&args.input)?;
    info!("Geocoding {} names from {:?}", names.len(), args.input);

    let client = GoogleGeocodingClient::new(settings.client_params(args.timeout))?;

    let bar = ProgressBar::new(names.len() as u64);
    let mut municipalities = Vec::with_capacity(names.len());
    let mut unresolved = Vec::new();

    for name in names {
        match client.geocode(&name).await {
            Ok(Some(point)) => municipalities.push(Municipality::new(name, point.y(), point.x())),
            Ok(None) => {
                warn!("No location found for {:?}", name);
                unresolved.push(name);
            }
            Err(err) => {
                warn!("Failed to geocode {:?}: {}", name, err);
                unresolved.push(name);
            }
        }
        bar.inc(1);
    }

    bar.finish_and_clear();

    write_municipalities(&args.output, &municipalities)?;
    info!(
        "Wrote {} coordinates to {:?}",
        municipalities.len(),
        args.output
    );

    if !unresolved.is_empty() {
        bail!(
            "{} names could not be geocoded: {}",
            unresolved.len(),
            unresolved.join(", ")
        );
    }

    Ok(())
}
