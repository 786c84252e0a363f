//! # tb_forecast
//!
//! Command-line front end for the incidence analysis.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use incidence_forecast::analysis::Analysis;
use incidence_forecast::config::AnalysisConfig;
use incidence_forecast::data::DataLoader;
use incidence_forecast::export::write_artifacts;
use incidence_forecast::updater::DataUpdater;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tb_forecast")]
#[command(about = "TB incidence forecasting", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every model and write the report artifacts
    Analyze {
        /// Input CSV with a period and an incidence column
        #[arg(short, long)]
        input: PathBuf,

        /// Directory receiving the artifacts
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Forecast horizon, overrides the configuration
        #[arg(long)]
        horizon: Option<usize>,

        /// Lookback window width, overrides the configuration
        #[arg(long)]
        window: Option<usize>,

        /// Network seed, overrides the configuration
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Merge new observations into a data file
    Update {
        /// Data file to update
        #[arg(short, long)]
        data: PathBuf,

        /// CSV with `ds,y` rows to merge
        #[arg(short, long)]
        incoming: PathBuf,
    },
}

fn analyze(
    input: PathBuf,
    output_dir: PathBuf,
    config: Option<PathBuf>,
    horizon: Option<usize>,
    window: Option<usize>,
    seed: Option<u64>,
) -> Result<()> {
    let mut config = match config {
        Some(path) => AnalysisConfig::from_json_file(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(horizon) = horizon {
        config.sequence.horizon = horizon;
    }
    if let Some(window) = window {
        config.sequence.window_width = window;
    }
    if let Some(seed) = seed {
        config.network.seed = seed;
    }

    let series = DataLoader::from_csv_with_frequency(&input, config.frequency)
        .with_context(|| format!("failed to load {}", input.display()))?;
    info!(observations = series.len(), input = %input.display(), "series loaded");

    let report = Analysis::new(config)?
        .run(&series)
        .context("analysis failed")?;
    let written = write_artifacts(&output_dir, &report)
        .with_context(|| format!("failed to write artifacts to {}", output_dir.display()))?;

    println!("{}", report);
    println!();
    for path in written {
        println!("  wrote {}", path.display());
    }
    Ok(())
}

fn update(data: PathBuf, incoming: PathBuf) -> Result<()> {
    let updater = DataUpdater::new(&data);
    let outcome = updater
        .apply_file(&incoming)
        .with_context(|| format!("failed to merge {} into {}", incoming.display(), data.display()))?;

    println!(
        "Added {} observations, {} total in {}",
        outcome.added,
        outcome.total,
        data.display()
    );
    if !outcome.report.is_clean() {
        println!(
            "Data checks: {} gaps, {} out-of-range values, {} duplicates",
            outcome.report.gaps.len(),
            outcome.report.out_of_range.len(),
            outcome.report.duplicates.len()
        );
    }

    let status = updater
        .status()
        .with_context(|| format!("failed to read status of {}", data.display()))?;
    println!("{}", status);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    match Cli::parse().command {
        Commands::Analyze {
            input,
            output_dir,
            config,
            horizon,
            window,
            seed,
        } => analyze(input, output_dir, config, horizon, window, seed),
        Commands::Update { data, incoming } => update(data, incoming),
    }
}
