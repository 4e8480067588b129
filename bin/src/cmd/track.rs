//! Track command implementation.

use std::path::Path;

use anyhow::{Result, bail};
use replica_track::{TrackConfig, TrackSimulator, max_drawdown};
use replica_traits::Date;
use serde::Serialize;

use crate::data::{self, SourceArgs};
use crate::report::{self, OutputFormat};

#[derive(Debug, Serialize)]
struct TrackSummary {
    start: Date,
    end: Date,
    final_value: f64,
    total_cost: f64,
    rebalances: usize,
    max_drawdown: f64,
}

/// Simulate the portfolio described by a weight schedule.
///
/// The simulation starts on the first schedule date; prices are restricted to
/// the schedule's instruments.
pub(crate) fn run_track(
    prices: &Path,
    weights: &Path,
    cost: f64,
    source: &SourceArgs,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let prices = data::load_table(prices, source)?;
    let schedule = data::load_table(weights, source)?;
    let Some(start) = schedule.first_date() else {
        bail!("weight schedule {} is empty", weights.display());
    };
    let prices = prices.select(schedule.columns())?.slice_from(start);

    let simulator = TrackSimulator::new(TrackConfig {
        transaction_cost_rate: cost,
    });
    let output_track = simulator.simulate(&prices, &schedule)?;
    let track = &output_track.track;

    let levels = track.values().to_vec();
    let summary = TrackSummary {
        start,
        end: track.dates().last().copied().unwrap_or(start),
        final_value: levels.last().copied().unwrap_or(1.0),
        total_cost: output_track.total_cost,
        rebalances: output_track.rebalances,
        max_drawdown: max_drawdown(&levels),
    };

    if let Some(path) = output {
        data::save_table(&track.to_table(), Some(path))?;
    }

    match format {
        OutputFormat::Json => report::print_json(&summary)?,
        OutputFormat::Text => {
            report::banner("Track Simulation");
            println!("Period:       {} to {}", summary.start, summary.end);
            println!("Instruments:  {}", schedule.n_columns());
            println!("Cost rate:    {:.4}%", cost * 100.0);
            println!();
            println!("Final value:  {:>10.4}", summary.final_value);
            println!("Total cost:   {:>10.6}", summary.total_cost);
            println!("Rebalances:   {:>10}", summary.rebalances);
            println!("Max drawdown: {:>9.2}%", summary.max_drawdown * 100.0);
            println!();
        }
    }
    Ok(())
}
