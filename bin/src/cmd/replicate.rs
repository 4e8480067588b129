//! Replicate command implementation.

use std::path::Path;

use anyhow::Result;
use replica::{Replication, ReplicationConfig, ReplicationResult, WindowFailure};
use replica_track::TrackingReport;
use serde::Serialize;

use crate::data::{self, SourceArgs};
use crate::report::{self, OutputFormat, WeightRow};

/// Input files of a replication run.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReplicateInputs<'a> {
    pub(crate) prices: &'a Path,
    pub(crate) target: &'a str,
    pub(crate) rates: &'a Path,
    pub(crate) rate_column: &'a str,
}

#[derive(Debug, Serialize)]
struct ReplicateReport<'a> {
    target: &'a str,
    method: &'static str,
    final_track: f64,
    final_excess_track: f64,
    total_cost: f64,
    rebalances: usize,
    report: &'a TrackingReport,
    weights: Vec<WeightRow>,
    failures: &'a [WindowFailure],
}

impl<'a> ReplicateReport<'a> {
    fn new(target: &'a str, config: &ReplicationConfig, result: &'a ReplicationResult) -> Self {
        Self {
            target,
            method: config.regression.method.name(),
            final_track: last_value(result.track.values().iter()),
            final_excess_track: last_value(result.excess_track.values().iter()),
            total_cost: result.total_cost,
            rebalances: result.rebalances,
            report: &result.report,
            weights: report::weight_rows(&result.weights),
            failures: &result.failures,
        }
    }
}

fn last_value<'a>(values: impl Iterator<Item = &'a f64>) -> f64 {
    values.last().copied().unwrap_or(f64::NAN)
}

/// Run the full pipeline: estimate weights, simulate the track, express it in
/// excess of the financing rate and compare it with the target.
pub(crate) fn run_replicate(
    inputs: &ReplicateInputs<'_>,
    config: ReplicationConfig,
    source: &SourceArgs,
    output: Option<&Path>,
    weights_output: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let prices = data::load_table(inputs.prices, source)?;
    let rates = data::load_rates(inputs.rates, inputs.rate_column, source)?;

    let replication = Replication::new(config);
    let result = replication.run(&prices, &rates, inputs.target)?;

    if let Some(path) = output {
        data::save_table(&result.summary()?, Some(path))?;
    }
    if let Some(path) = weights_output {
        data::save_table(&result.weights, Some(path))?;
    }

    let summary = ReplicateReport::new(inputs.target, replication.config(), &result);
    match format {
        OutputFormat::Json => report::print_json(&summary)?,
        OutputFormat::Text => print_text(&summary, &result),
    }
    Ok(())
}

fn print_text(summary: &ReplicateReport<'_>, result: &ReplicationResult) {
    report::banner("Index Replication");
    println!("Target:      {}", summary.target);
    println!("Method:      {}", summary.method);
    println!(
        "Period:      {} to {}",
        result.track.dates().first().map_or_else(String::new, ToString::to_string),
        result.track.dates().last().map_or_else(String::new, ToString::to_string),
    );
    println!("Rebalances:  {}", summary.rebalances);
    println!();

    report::section("Performance");
    report::print_stats(summary.target, &summary.report.target);
    report::print_stats("Track", &summary.report.track);
    println!("Final track value:        {:>10.4}", summary.final_track);
    println!("Final excess-return value:{:>10.4}", summary.final_excess_track);
    println!();

    report::section("Tracking");
    println!("Observations:        {:>10}", summary.report.n_obs);
    println!(
        "Tracking Error:      {:>10.2}%",
        summary.report.tracking_error * 100.0
    );
    println!(
        "Mean Active Return:  {:>10.4}%",
        summary.report.mean_active_return * 100.0
    );
    println!("Correlation:         {:>10.4}", summary.report.correlation);
    println!("Transaction Costs:   {:>10.6}", summary.total_cost);
    println!();

    report::section("Weights");
    report::print_weights(&result.weights);

    if !summary.failures.is_empty() {
        report::section("Skipped Windows");
        for failure in summary.failures {
            println!("  {}  {}", failure.end, failure.error);
        }
        println!();
    }
}
