//! Command-line interface for the scenario runner.

use clap::Parser;
use std::path::PathBuf;

/// Deterministic combat scenario runner
#[derive(Parser, Debug)]
#[command(name = "skirmish")]
#[command(about = "Deterministic combat scenario runner")]
#[command(version)]
pub struct Args {
    /// Scenario JSON file to run
    #[arg(value_name = "SCENARIO_FILE")]
    pub scenario: PathBuf,

    /// Output path for the result JSON (overrides the scenario's setting)
    #[arg(long, value_name = "OUTPUT_PATH")]
    pub output: Option<PathBuf>,

    /// Tick limit override
    #[arg(long, value_name = "TICKS")]
    pub max_ticks: Option<u64>,

    /// Random seed override for deterministic reproduction
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,
}

pub fn parse_args() -> Args {
    Args::parse()
}
