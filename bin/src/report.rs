//! Terminal and JSON output.

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

use replica_track::SeriesStats;
use replica_traits::TimeTable;

/// Report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

pub(crate) fn banner(title: &str) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║{title:^62}║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");
}

pub(crate) fn section(title: &str) {
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{title}");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| anyhow::anyhow!("JSON serialization error: {}", e))?;
    println!("{json}");
    Ok(())
}

pub(crate) fn print_stats(label: &str, stats: &SeriesStats) {
    println!("{label}:");
    println!("  Total Return:      {:>10.2}%", stats.total_return * 100.0);
    println!("  Annualized Return: {:>10.2}%", stats.annualized_return * 100.0);
    println!("  Annualized Vol:    {:>10.2}%", stats.annualized_volatility * 100.0);
    println!("  Max Drawdown:      {:>10.2}%", stats.max_drawdown * 100.0);
    println!();
}

/// Print a weight schedule, one row per date.
pub(crate) fn print_weights(weights: &TimeTable) {
    print!("{:<12}", "Date");
    for name in weights.columns() {
        print!(" {name:>10}");
    }
    println!(" {:>10}", "Sum");
    println!("{}", "─".repeat(12 + 11 * (weights.n_columns() + 1)));
    for (i, date) in weights.dates().iter().enumerate() {
        let row = weights.row(i);
        print!("{:<12}", date.to_string());
        for w in row.iter() {
            print!(" {w:>10.4}");
        }
        println!(" {:>10.4}", row.sum());
    }
    println!();
}

/// Weights of one date, keyed by instrument, for JSON output.
#[derive(Debug, Serialize)]
pub(crate) struct WeightRow {
    pub(crate) date: replica_traits::Date,
    pub(crate) weights: Vec<(String, f64)>,
}

pub(crate) fn weight_rows(weights: &TimeTable) -> Vec<WeightRow> {
    weights
        .dates()
        .iter()
        .enumerate()
        .map(|(i, &date)| WeightRow {
            date,
            weights: weights
                .columns()
                .iter()
                .cloned()
                .zip(weights.row(i).iter().copied())
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use replica_traits::Date;

    #[test]
    fn test_weight_rows() {
        let table = TimeTable::from_columns(
            vec![Date::from_ymd_opt(2024, 1, 5).unwrap()],
            vec![("A".to_string(), vec![0.4]), ("B".to_string(), vec![0.6])],
        )
        .unwrap();
        let rows = weight_rows(&table);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].weights, vec![("A".to_string(), 0.4), ("B".to_string(), 0.6)]);

        let json = serde_json::to_string(&rows).unwrap();
        assert!(json.contains("\"date\":\"2024-01-05\""));
    }
}
