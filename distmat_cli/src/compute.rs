use std::{path::PathBuf, time::Duration};

use anyhow::bail;
use clap::{Args, ValueEnum};
use comfy_table::Table;
use distmat::{
    loader::load_municipalities,
    matrix_builder::{FailurePolicy, MAX_BATCH_SIZE, MatrixBuilder, MatrixBuilderParams},
    municipality::{Municipality, MunicipalityTable},
    pairs::PairSelection,
    result_writer::{ResultWriter, WriteMode},
};
use distmat_providers::{
    cache::{CachedMatrixService, FileCache},
    google_maps_api::GoogleMapsMatrixClient,
    travel_mode::TravelMode,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::{parsers, settings::Settings};

#[derive(Copy, Clone, ValueEnum)]
pub enum ModeArg {
    Driving,
    Walking,
    Bicycling,
    Transit,
}

impl From<ModeArg> for TravelMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Driving => TravelMode::Driving,
            ModeArg::Walking => TravelMode::Walking,
            ModeArg::Bicycling => TravelMode::Bicycling,
            ModeArg::Transit => TravelMode::Transit,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
pub enum PairsArg {
    All,
    ExcludeSelf,
    OneWay,
}

impl From<PairsArg> for PairSelection {
    fn from(pairs: PairsArg) -> Self {
        match pairs {
            PairsArg::All => PairSelection::All,
            PairsArg::ExcludeSelf => PairSelection::ExcludeSelf,
            PairsArg::OneWay => PairSelection::OneWay,
        }
    }
}

#[derive(Args)]
pub struct ComputeArgs {
    /// CSV with id, lat and lon columns
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Output CSV, parent folders are created
    #[arg(short = 'o', long, default_value = "results/distances.csv")]
    output: PathBuf,

    #[arg(short, long, value_enum, default_value_t = ModeArg::Driving)]
    mode: ModeArg,

    #[arg(long, value_enum, default_value_t = PairsArg::ExcludeSelf)]
    pairs: PairsArg,

    /// Pairs per request
    #[arg(long, default_value_t = MAX_BATCH_SIZE)]
    batch_size: usize,

    /// Append to the output instead of overwriting it
    #[arg(long)]
    append: bool,

    /// Stop at the first failed batch
    #[arg(long)]
    abort_on_error: bool,

    /// Restrict origins to these ids (comma separated)
    #[arg(long, value_delimiter = ',')]
    origins: Vec<String>,

    /// Restrict destinations to these ids (comma separated)
    #[arg(long, value_delimiter = ',')]
    destinations: Vec<String>,

    /// Folder for cached API responses, overrides DISTMAT_CACHE_FOLDER
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// HTTP timeout per request (e.g., "30s", "PT1M")
    #[arg(long, value_parser = parsers::parse_timeout)]
    timeout: Option<Duration>,
}

fn select_or_all(table: &MunicipalityTable, ids: &[String]) -> anyhow::Result<Vec<Municipality>> {
    if ids.is_empty() {
        Ok(table.as_slice().to_vec())
    } else {
        Ok(table.select(ids)?)
    }
}

pub async fn run(args: ComputeArgs, settings: &Settings) -> anyhow::Result<()> {
    let table = load_municipalities(&args.input)?;
    let origins = select_or_all(&table, &args.origins)?;
    let destinations = select_or_all(&table, &args.destinations)?;

    let cache = match args.cache_dir.or_else(|| settings.cache_folder.clone()) {
        Some(folder) => {
            info!("Caching responses in {:?}", folder);
            Some(FileCache::new(folder)?)
        }
        None => None,
    };

    let client = GoogleMapsMatrixClient::new(settings.client_params(args.timeout))?;
    let service = CachedMatrixService::new(client, cache);

    let builder = MatrixBuilder::new(
        &service,
        MatrixBuilderParams {
            batch_size: args.batch_size,
            mode: args.mode.into(),
            selection: args.pairs.into(),
            failure_policy: if args.abort_on_error {
                FailurePolicy::Abort
            } else {
                FailurePolicy::Continue
            },
        },
    )?;

    let batches = builder.plan(&origins, &destinations);
    let pairs: usize = batches.iter().map(|batch| batch.pair_count()).sum();

    let mode = if args.append {
        WriteMode::Append
    } else {
        WriteMode::Overwrite
    };
    let mut writer = ResultWriter::create(&args.output, mode)?;

    let bar = ProgressBar::new(batches.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar().template("[{bar:40}] {pos}/{len} batches ({elapsed})")?,
    );

    let report = builder
        .run_batches(&batches, |_, results| {
            writer.write_all(results)?;
            bar.inc(1);
            Ok(())
        })
        .await;

    bar.finish_and_clear();
    let report = report?;

    let mut table = Table::new();
    table.set_header(vec!["Summary", ""]);
    table.add_row(vec![
        "Municipalities".to_string(),
        describe_counts(origins.len(), destinations.len()),
    ]);
    table.add_row(vec!["Mode".to_string(), builder.params().mode.to_string()]);
    table.add_row(vec!["Pairs".to_string(), pairs.to_string()]);
    table.add_row(vec!["Requests".to_string(), report.requests.to_string()]);
    table.add_row(vec!["Rows written".to_string(), writer.rows().to_string()]);
    table.add_row(vec!["Failed batches".to_string(), report.failures.len().to_string()]);
    table.add_row(vec!["Output".to_string(), writer.path().display().to_string()]);
    println!("{table}");

    if !report.failures.is_empty() {
        bail!(
            "{} of {} batches failed, their pairs are missing from {}",
            report.failures.len(),
            report.requests,
            writer.path().display()
        );
    }

    Ok(())
}

fn describe_counts(origins: usize, destinations: usize) -> String {
    format!("{} origins, {} destinations", origins, destinations)
}
