use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{self, EnvFilter};

mod cli;

use cli::commands::{ExportCommand, FetchCommand, FiguresCommand, InspectCommand};
use opsd_energy::Config;

#[derive(Parser)]
#[command(name = "opsd-energy")]
#[command(about = "Fetch, clean and chart the Open Power System Data capacity and time-series datasets")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// YAML file with data directories and source URLs
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Project root that relative data directories resolve against
    #[arg(long, global = true)]
    data_root: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the SQLite databases into the raw data directory
    Fetch(FetchCommand),
    /// Load a dataset and print its shape, schema and first rows
    Inspect(InspectCommand),
    /// Rebuild the finalized figures
    Figures(FiguresCommand),
    /// Write the cleaned capacity table to the processed data directory
    Export(ExportCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let max_polars_threads = std::cmp::min(4, num_cpus::get());
    std::env::set_var("POLARS_MAX_THREADS", max_polars_threads.to_string());

    let base_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let http_filter = "hyper=error,hyper_util=error,reqwest=error,rustls=error,h2=error";

    tracing_subscriber::fmt()
        .with_max_level(base_level)
        .with_env_filter(EnvFilter::new(format!(
            "opsd_energy={},{}",
            if cli.verbose { "debug" } else { "info" },
            http_filter
        )))
        .init();

    info!("Starting opsd-energy v{}", env!("CARGO_PKG_VERSION"));
    info!("🧵 Limited Polars to {} threads", max_polars_threads);

    let mut config = match &cli.config {
        Some(path) => Config::from_yaml_file(path)?,
        None => Config::default(),
    };
    if let Some(root) = cli.data_root {
        config.data_root = root;
    }

    match cli.command {
        Commands::Fetch(cmd) => cmd.execute(&config).await,
        Commands::Inspect(cmd) => cmd.execute(&config),
        Commands::Figures(cmd) => cmd.execute(&config),
        Commands::Export(cmd) => cmd.execute(&config),
    }
}
