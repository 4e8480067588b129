//! CSV sources.
//!
//! Files are expected to hold one date column and one numeric column per
//! instrument:
//!
//! ```text
//! date,SX5E,CAC,DAX
//! 04/01/2010,2966.5,3975.0,6048.3
//! ```
//!
//! Cells are read as text and converted here, so that dates in any chrono
//! format are accepted and unparseable numbers become NaN instead of failing
//! the whole file.

use std::io::Write;
use std::path::Path;

use ndarray::Array2;
use polars::prelude::*;
use tracing::debug;

use replica_traits::{Date, ReplicaError, Result, TimeSeries, TimeTable};

/// ISO dates, `2010-01-04`.
pub const ISO_FORMAT: &str = "%Y-%m-%d";

/// Day-first dates, `04/01/2010`.
pub const DAY_FIRST_FORMAT: &str = "%d/%m/%Y";

/// Parse a date string with a chrono format.
pub fn parse_date(value: &str, format: &str) -> Result<Date> {
    Date::parse_from_str(value.trim(), format)
        .map_err(|e| ReplicaError::InvalidDate(format!("{value:?} does not match {format}: {e}")))
}

/// Reader for date-indexed CSV files.
#[derive(Debug, Clone)]
pub struct CsvSource {
    /// Name of the date column (None = first column)
    pub date_column: Option<String>,
    /// chrono format of the dates
    pub date_format: String,
}

impl Default for CsvSource {
    fn default() -> Self {
        Self {
            date_column: None,
            date_format: ISO_FORMAT.to_string(),
        }
    }
}

impl CsvSource {
    /// Source for files with day-first dates.
    pub fn day_first() -> Self {
        Self {
            date_format: DAY_FIRST_FORMAT.to_string(),
            ..Default::default()
        }
    }

    /// Use `format` for the date column.
    #[must_use]
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// Read the date column from `name` instead of the first column.
    #[must_use]
    pub fn with_date_column(mut self, name: impl Into<String>) -> Self {
        self.date_column = Some(name.into());
        self
    }

    /// Read a CSV file into a table sorted by date.
    ///
    /// # Errors
    ///
    /// - `Io`/`Polars` if the file cannot be read
    /// - `MissingColumn` if the date column is absent
    /// - `InvalidDate` if a date does not parse
    /// - `InvalidData` if a date appears twice
    pub fn read_table(&self, path: impl AsRef<Path>) -> Result<TimeTable> {
        let path = path.as_ref();
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;
        debug!(
            path = %path.display(),
            rows = df.height(),
            columns = df.width(),
            "read csv"
        );
        self.table_from_frame(&df)
    }

    /// Read one column of a CSV file as a series.
    pub fn read_series(&self, path: impl AsRef<Path>, column: &str) -> Result<TimeSeries> {
        self.read_table(path)?.series(column)
    }

    /// Convert a frame of text columns into a table.
    pub fn table_from_frame(&self, df: &DataFrame) -> Result<TimeTable> {
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let date_name = match &self.date_column {
            Some(name) => name.clone(),
            None => names
                .first()
                .cloned()
                .ok_or_else(|| ReplicaError::InvalidData("file has no columns".to_string()))?,
        };

        let date_cells = df
            .column(&date_name)
            .map_err(|_| ReplicaError::MissingColumn(date_name.clone()))?
            .cast(&DataType::String)?;
        let dates = date_cells
            .str()?
            .into_iter()
            .map(|cell| {
                let cell = cell.ok_or_else(|| {
                    ReplicaError::InvalidDate(format!("empty cell in column {date_name}"))
                })?;
                parse_date(cell, &self.date_format)
            })
            .collect::<Result<Vec<Date>>>()?;

        let value_names: Vec<String> = names.into_iter().filter(|n| *n != date_name).collect();
        let mut raw = Array2::<f64>::from_elem((dates.len(), value_names.len()), f64::NAN);
        for (j, name) in value_names.iter().enumerate() {
            let column = df.column(name)?.cast(&DataType::Float64)?;
            for (i, value) in column.f64()?.into_iter().enumerate() {
                if let Some(value) = value {
                    raw[[i, j]] = value;
                }
            }
        }

        let mut order: Vec<usize> = (0..dates.len()).collect();
        order.sort_by_key(|&i| dates[i]);
        if let Some(pair) = order.windows(2).find(|pair| dates[pair[0]] == dates[pair[1]]) {
            return Err(ReplicaError::InvalidData(format!(
                "duplicate date {}",
                dates[pair[0]]
            )));
        }

        TimeTable::new(
            order.iter().map(|&i| dates[i]).collect(),
            value_names,
            raw.select(ndarray::Axis(0), &order),
        )
    }
}

/// Write a table to CSV with an ISO `date` column first.
pub fn write_csv(table: &TimeTable, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut file = std::fs::File::create(path)?;
    write_csv_to(table, &mut file)?;
    debug!(path = %path.display(), rows = table.len(), "wrote csv");
    Ok(())
}

/// Write a table as CSV to any writer, e.g. stdout.
pub fn write_csv_to<W: Write>(table: &TimeTable, writer: &mut W) -> Result<()> {
    let mut df = table.to_frame()?;
    CsvWriter::new(writer).include_header(true).finish(&mut df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::path::PathBuf;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("replica-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-01-15", ISO_FORMAT).unwrap(), date(2024, 1, 15));
        assert_eq!(parse_date("15/01/2024", DAY_FIRST_FORMAT).unwrap(), date(2024, 1, 15));
        assert!(matches!(
            parse_date("invalid", ISO_FORMAT),
            Err(ReplicaError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_read_day_first_unsorted() {
        let path = temp_file(
            "prices.csv",
            "Date,SX5E,DAX\n05/01/2010,2970.0,6050.5\n04/01/2010,2966.5,6048.3\n06/01/2010,n/a,6060.0\n",
        );
        let table = CsvSource::day_first().read_table(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(
            table.dates(),
            &[date(2010, 1, 4), date(2010, 1, 5), date(2010, 1, 6)]
        );
        assert_eq!(table.columns(), &["SX5E", "DAX"]);
        assert_abs_diff_eq!(table.values()[[0, 0]], 2966.5);
        assert_abs_diff_eq!(table.values()[[1, 1]], 6050.5);
        assert!(table.values()[[2, 0]].is_nan());
    }

    #[test]
    fn test_read_named_date_column() {
        let path = temp_file("rates.csv", "3M,day\n0.5,2020-01-02\n0.4,2020-01-03\n");
        let rates = CsvSource::default()
            .with_date_column("day")
            .read_series(&path, "3M")
            .unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(rates.name(), "3M");
        assert_eq!(rates.dates(), &[date(2020, 1, 2), date(2020, 1, 3)]);
        assert_abs_diff_eq!(rates.values()[1], 0.4);
    }

    #[test]
    fn test_table_from_frame() {
        let df = df! {
            "date" => ["2024-01-03", "2024-01-02"],
            "A" => [2.0, 1.0],
            "B" => [Some(20.0), None],
        }
        .unwrap();
        let table = CsvSource::default().table_from_frame(&df).unwrap();

        assert_eq!(table.dates(), &[date(2024, 1, 2), date(2024, 1, 3)]);
        assert_abs_diff_eq!(table.values()[[0, 0]], 1.0);
        assert!(table.values()[[0, 1]].is_nan());
        assert_abs_diff_eq!(table.values()[[1, 1]], 20.0);
    }

    #[test]
    fn test_duplicate_dates() {
        let path = temp_file("dupes.csv", "date,A\n2020-01-02,1\n2020-01-02,2\n");
        let result = CsvSource::default().read_table(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(ReplicaError::InvalidData(_))));
    }

    #[test]
    fn test_missing_date_column() {
        let path = temp_file("nodate.csv", "A,B\n1,2\n");
        let result = CsvSource::default().with_date_column("date").read_table(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(ReplicaError::MissingColumn(_))));
    }

    #[test]
    fn test_write_to_buffer() {
        let table = TimeTable::from_columns(
            vec![date(2024, 3, 1)],
            vec![("Track".to_string(), vec![1.0])],
        )
        .unwrap();
        let mut buffer = Vec::new();
        write_csv_to(&table, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("date,Track\n2024-03-01,1"));
    }

    #[test]
    fn test_write_then_read() {
        let table = TimeTable::from_columns(
            vec![date(2024, 3, 1), date(2024, 3, 4)],
            vec![
                ("A".to_string(), vec![0.25, 0.5]),
                ("B".to_string(), vec![0.75, 0.5]),
            ],
        )
        .unwrap();
        let path = std::env::temp_dir().join(format!("replica-{}-weights.csv", std::process::id()));
        write_csv(&table, &path).unwrap();
        let back = CsvSource::default().read_table(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(back.dates(), table.dates());
        assert_eq!(back.columns(), table.columns());
        for (a, b) in back.values().iter().zip(table.values().iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
    }
}
