//! Estimate command implementation.

use std::path::Path;

use anyhow::{Result, bail};
use replica::{Replication, ReplicationConfig};
use replica_regress::RollingEstimate;
use replica_traits::Date;
use serde::Serialize;

use crate::data::{self, SourceArgs};
use crate::report::{self, OutputFormat};

/// One rolling window in the JSON report.
#[derive(Debug, Serialize)]
struct WindowRow {
    start: Date,
    end: Date,
    iterations: Option<usize>,
    objective: Option<f64>,
    degenerate_columns: Vec<String>,
    weights: Vec<(String, f64)>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct EstimateReport {
    target: String,
    method: &'static str,
    periods: usize,
    windows: Vec<WindowRow>,
}

fn window_rows(estimate: &RollingEstimate) -> Vec<WindowRow> {
    estimate
        .fits()
        .iter()
        .map(|fit| match &fit.outcome {
            Ok(fitted) => WindowRow {
                start: fit.start_date,
                end: fit.end_date,
                iterations: Some(fitted.iterations),
                objective: Some(fitted.objective),
                degenerate_columns: fitted.degenerate_columns.clone(),
                weights: estimate
                    .columns()
                    .iter()
                    .cloned()
                    .zip(fitted.weights.iter().copied())
                    .collect(),
                error: None,
            },
            Err(e) => WindowRow {
                start: fit.start_date,
                end: fit.end_date,
                iterations: None,
                objective: None,
                degenerate_columns: Vec::new(),
                weights: Vec::new(),
                error: Some(e.to_string()),
            },
        })
        .collect()
}

/// Estimate rolling weights of the other price columns against `target`.
pub(crate) fn run_estimate(
    prices: &Path,
    target: &str,
    config: ReplicationConfig,
    source: &SourceArgs,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let prices = data::load_table(prices, source)?;
    if prices.column_index(target).is_none() {
        bail!("target column {target} not found in {}", prices.columns().join(", "));
    }

    let method = config.regression.method;
    let (sample_length, frequency) = (config.regression.sample_length, config.regression.frequency);
    let replication = Replication::new(config);
    let returns = replication.returns(&prices)?;
    let estimate = replication.estimate(&returns, target)?;
    let schedule = estimate.fitted_schedule()?;

    if let Some(path) = output {
        data::save_table(&schedule, Some(path))?;
    }

    match format {
        OutputFormat::Json => report::print_json(&EstimateReport {
            target: target.to_string(),
            method: method.name(),
            periods: returns.len(),
            windows: window_rows(&estimate),
        })?,
        OutputFormat::Text => {
            report::banner("Rolling Weight Estimation");
            println!("Target:      {target}");
            println!("Instruments: {}", estimate.columns().join(", "));
            println!("Method:      {}", method.name());
            println!("Periods:     {}", returns.len());
            println!("Window:      {} periods, every {}", sample_length, frequency);
            println!(
                "Fitted:      {} of {} windows",
                schedule.len(),
                estimate.len()
            );
            println!();

            if !schedule.is_empty() {
                report::section("Weights");
                report::print_weights(&schedule);
            }

            let degenerate: Vec<_> = estimate
                .fits()
                .iter()
                .filter_map(|fit| {
                    fit.outcome
                        .as_ref()
                        .ok()
                        .filter(|fitted| !fitted.degenerate_columns.is_empty())
                        .map(|fitted| (fit.end_date, fitted.degenerate_columns.join(", ")))
                })
                .collect();
            if !degenerate.is_empty() {
                report::section("Zero-Variance Instruments");
                for (end, columns) in degenerate {
                    println!("  {end}  {columns}");
                }
                println!();
            }

            let failures = estimate.failures();
            if !failures.is_empty() {
                report::section("Failed Windows");
                for (end, error) in failures {
                    println!("  {end}  {error}");
                }
                println!();
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;
    use replica_regress::{RegressionConfig, RegressionEstimator, WeightEstimator};
    use replica_traits::{TimeSeries, TimeTable};

    #[test]
    fn test_window_rows() {
        let start = Date::from_ymd_opt(2024, 1, 5).unwrap();
        let dates: Vec<Date> = (0..12)
            .map(|i| start.checked_add_days(Days::new(7 * i)).unwrap())
            .collect();
        let a: Vec<f64> = (0..12).map(|i| ((i * 7 % 5) as f64 - 2.0) * 0.01).collect();
        let b: Vec<f64> = (0..12).map(|i| ((i * 3 % 4) as f64 - 1.5) * 0.01).collect();
        let y: Vec<f64> = a.iter().zip(&b).map(|(a, b)| 0.3 * a + 0.7 * b).collect();

        let regressors = TimeTable::from_columns(
            dates.clone(),
            vec![("A".to_string(), a), ("B".to_string(), b)],
        )
        .unwrap();
        let target = TimeSeries::new("T", dates, y.into()).unwrap();
        let estimate = RegressionEstimator::new(RegressionConfig {
            sample_length: 6,
            frequency: 2,
            ..Default::default()
        })
        .estimate(&target, &regressors)
        .unwrap();

        let rows = window_rows(&estimate);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.error.is_none()));
        assert_eq!(rows[0].weights[0].0, "A");
        assert!((rows[0].weights[0].1 - 0.3).abs() < 1e-6);
    }
}
