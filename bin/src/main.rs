//! replica CLI binary.
//!
//! Provides command-line interface for index replication.

mod cmd;
mod data;
mod report;

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::RegressionArgs;
use crate::data::SourceArgs;
use crate::report::OutputFormat;

#[derive(Parser)]
#[command(name = "replica")]
#[command(about = "Index replication by rolling constrained regression", long_about = None)]
#[command(version)]
struct Cli {
    /// Log more (-v info, -vv debug, -vvv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert total-return prices into excess-return indices
    Excess {
        /// Price CSV, one column per instrument
        prices: PathBuf,

        /// Rate CSV
        #[arg(short, long)]
        rates: PathBuf,

        /// Column of the rate file to use
        #[arg(long, default_value = "3M")]
        rate_column: String,

        /// Rates are quoted in percent (2.5 = 2.5%)
        #[arg(long)]
        percent: bool,

        /// Day-count basis of the rate
        #[arg(long, default_value_t = 360.0)]
        basis: f64,

        #[command(flatten)]
        source: SourceArgs,

        /// Output CSV (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Simulate a rebalanced portfolio from a weight schedule
    Track {
        /// Price CSV, one column per instrument
        prices: PathBuf,

        /// Weight schedule CSV, one row per rebalancing date
        #[arg(short, long)]
        weights: PathBuf,

        /// Transaction cost rate on traded notional (0.001 = 10bp)
        #[arg(long, default_value_t = 0.0)]
        cost: f64,

        #[command(flatten)]
        source: SourceArgs,

        /// Output CSV for the track
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (text or json)
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Estimate rolling replication weights
    Estimate {
        /// Price CSV holding the target and the replicating instruments
        prices: PathBuf,

        /// Column of the target index
        #[arg(short, long)]
        target: String,

        /// JSON configuration (replication config format)
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        regression: RegressionArgs,

        #[command(flatten)]
        source: SourceArgs,

        /// Output CSV for the weights
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (text or json)
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Estimate weights, simulate the track and compare it with the target
    Replicate {
        /// Price CSV holding the target and the replicating instruments
        prices: PathBuf,

        /// Column of the target index
        #[arg(short, long)]
        target: String,

        /// Rate CSV
        #[arg(short, long)]
        rates: PathBuf,

        /// Column of the rate file to use
        #[arg(long, default_value = "3M")]
        rate_column: String,

        /// Rates are quoted in percent (2.5 = 2.5%)
        #[arg(long)]
        percent: bool,

        /// Transaction cost rate on traded notional
        #[arg(long)]
        cost: Option<f64>,

        /// JSON configuration (replication config format)
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        regression: RegressionArgs,

        #[command(flatten)]
        source: SourceArgs,

        /// Output CSV for target, track and excess-return track
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output CSV for the weight schedule
        #[arg(long)]
        weights_output: Option<PathBuf>,

        /// Output format (text or json)
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Excess {
            prices,
            rates,
            rate_column,
            percent,
            basis,
            source,
            output,
        } => cmd::excess::run_excess(
            &prices,
            &rates,
            &rate_column,
            percent,
            basis,
            &source,
            output.as_deref(),
        ),
        Commands::Track {
            prices,
            weights,
            cost,
            source,
            output,
            format,
        } => cmd::track::run_track(&prices, &weights, cost, &source, output.as_deref(), format),
        Commands::Estimate {
            prices,
            target,
            config,
            regression,
            source,
            output,
            format,
        } => {
            let config = cmd::load_config(config.as_deref(), &regression)?;
            cmd::estimate::run_estimate(&prices, &target, config, &source, output.as_deref(), format)
        }
        Commands::Replicate {
            prices,
            target,
            rates,
            rate_column,
            percent,
            cost,
            config,
            regression,
            source,
            output,
            weights_output,
            format,
        } => {
            let mut config = cmd::load_config(config.as_deref(), &regression)?;
            if let Some(cost) = cost {
                config.track.transaction_cost_rate = cost;
            }
            if percent {
                config.excess.rate_unit = replica_track::RateUnit::Percent;
            }
            cmd::replicate::run_replicate(
                &cmd::replicate::ReplicateInputs {
                    prices: &prices,
                    target: &target,
                    rates: &rates,
                    rate_column: &rate_column,
                },
                config,
                &source,
                output.as_deref(),
                weights_output.as_deref(),
                format,
            )
        }
    }
}
