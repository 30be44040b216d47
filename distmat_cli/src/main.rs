use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;

use crate::{compute::ComputeArgs, geocode::GeocodeArgs, settings::Settings};

mod compute;
mod geocode;
mod parsers;
mod settings;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute travel distances and durations between municipalities
    #[command(visible_alias = "c")]
    Compute {
        #[command(flatten)]
        args: ComputeArgs,
    },
    /// Resolve place names into a coordinates table
    #[command(visible_alias = "g")]
    Geocode {
        #[command(flatten)]
        args: GeocodeArgs,
    },
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let settings = Settings::from_env()?;

    match cli.command {
        Commands::Compute { args } => compute::run(args, &settings).await?,
        Commands::Geocode { args } => geocode::run(args, &settings).await?,
    }

    Ok(())
}
