//! Probe harness: runs a scenario of waveform generators and interrupts on a
//! simulated board and records pin samples as CSV and JSONL.

mod probe;
mod recorder;
mod scenario;

use std::path::PathBuf;

use clap::Parser;
use config as config_rs;
use thiserror::Error;

use crate::scenario::Scenario;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("scenario error: {0}")]
    Config(#[from] config_rs::ConfigError),
    #[error("invalid scenario: {0}")]
    Invalid(String),
    #[error("board error: {0}")]
    Sim(#[from] boardsim::SimError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Board probe CLI
#[derive(Parser, Debug)]
#[command(name = "boardsim-probe", about = "Samples generated pin signals and counts interrupts.")]
pub struct Cli {
    /// Scenario file (TOML)
    #[arg(short, long, default_value = "boardsim_simulator/scenario.toml")]
    scenario: String,

    /// Output directory for CSV/JSONL, overriding the scenario's
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO })
        .init();

    let mut scenario = Scenario::load(&cli.scenario).map_err(|e| {
        tracing::error!("Failed to load scenario '{}': {}", cli.scenario, e);
        e
    })?;
    if let Some(output) = cli.output {
        scenario.simulation.output_dir = output;
    }
    tracing::info!(
        "Probing {} for {} ms, sampling every {} us",
        scenario.board.model.name(),
        scenario.simulation.duration_ms,
        scenario.simulation.sample_interval_us
    );

    let summary = probe::run(&scenario)?;
    tracing::info!(
        samples = summary.samples,
        rows = summary.rows,
        "Wrote results to {}",
        scenario.simulation.output_dir.display()
    );
    for (pin, count) in &summary.interrupts {
        tracing::info!(pin, count, "interrupts fired");
    }
    Ok(())
}
