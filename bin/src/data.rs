//! Data loading utilities for the replica CLI.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use replica_data::{CsvSource, ISO_FORMAT, write_csv, write_csv_to};
use replica_traits::{Date, RateSeries, TimeTable};
use tracing::info;

/// How dates are written in the input files.
#[derive(Debug, Clone, Args)]
pub(crate) struct SourceArgs {
    /// Input dates are day-first (dd/mm/yyyy)
    #[arg(long)]
    pub(crate) day_first: bool,

    /// Explicit chrono format of the input dates (overrides --day-first)
    #[arg(long)]
    pub(crate) date_format: Option<String>,
}

impl SourceArgs {
    pub(crate) fn source(&self) -> CsvSource {
        let source = if self.day_first {
            CsvSource::day_first()
        } else {
            CsvSource::default()
        };
        match &self.date_format {
            Some(format) => source.with_date_format(format.clone()),
            None => source,
        }
    }
}

/// Load a date-indexed table.
pub(crate) fn load_table(path: &Path, source: &SourceArgs) -> Result<TimeTable> {
    let table = source
        .source()
        .read_table(path)
        .with_context(|| format!("reading {}", path.display()))?;
    info!(
        path = %path.display(),
        rows = table.len(),
        columns = table.n_columns(),
        "loaded table"
    );
    Ok(table)
}

/// Load one column of a rate file.
pub(crate) fn load_rates(path: &Path, column: &str, source: &SourceArgs) -> Result<RateSeries> {
    source
        .source()
        .read_series(path, column)
        .with_context(|| format!("reading column {column} of {}", path.display()))
}

/// Parse a `YYYY-MM-DD` command-line date.
pub(crate) fn parse_date(value: &str) -> Result<Date> {
    replica_data::parse_date(value, ISO_FORMAT).with_context(|| format!("invalid date {value}"))
}

/// Write a table to `output`, or to stdout when no path is given.
pub(crate) fn save_table(table: &TimeTable, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            write_csv(table, path).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), rows = table.len(), "wrote table");
            eprintln!("Wrote {} rows to {}", table.len(), path.display());
        }
        None => write_csv_to(table, &mut std::io::stdout().lock())?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use replica_data::DAY_FIRST_FORMAT;

    #[test]
    fn test_source_args() {
        let args = SourceArgs {
            day_first: false,
            date_format: None,
        };
        assert_eq!(args.source().date_format, ISO_FORMAT);

        let args = SourceArgs {
            day_first: true,
            date_format: None,
        };
        assert_eq!(args.source().date_format, DAY_FIRST_FORMAT);

        let args = SourceArgs {
            day_first: true,
            date_format: Some("%Y%m%d".to_string()),
        };
        assert_eq!(args.source().date_format, "%Y%m%d");
    }

    #[test]
    fn test_load_and_save_table() {
        let dir = std::env::temp_dir();
        let input = dir.join(format!("replica-cli-in-{}.csv", std::process::id()));
        let output = dir.join(format!("replica-cli-out-{}.csv", std::process::id()));
        std::fs::write(&input, "date,A,B\n2024-01-02,1.0,2.0\n2024-01-03,1.5,2.5\n").unwrap();
        let args = SourceArgs {
            day_first: false,
            date_format: None,
        };

        let table = load_table(&input, &args).unwrap();
        save_table(&table, Some(&output)).unwrap();
        let back = load_table(&output, &args).unwrap();
        std::fs::remove_file(&input).ok();
        std::fs::remove_file(&output).ok();

        assert_eq!(table.columns(), &["A", "B"]);
        assert_eq!(back.dates(), table.dates());
        assert_eq!(back.values(), table.values());
        assert!(load_table(&dir.join("replica-cli-missing.csv"), &args).is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-03-01").unwrap(), Date::from_ymd_opt(2024, 3, 1).unwrap());
        assert!(parse_date("01/03/2024").is_err());
    }
}
