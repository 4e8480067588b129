//! Date-indexed tables and series.
//!
//! Every table in the toolkit is a dense `ndarray` matrix with one row per
//! date and one column per instrument. Dates are strictly increasing and
//! column names are unique; both are checked on construction so downstream
//! code can index by position without re-validating.

use chrono::Datelike;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use polars::prelude::*;

use crate::error::{ReplicaError, Result};

// Re-export date type from chrono
pub use chrono::NaiveDate as Date;

/// An instrument identifier, e.g. `"SX5E"`.
pub type Symbol = String;

/// Days between 0001-01-01 (CE day 1) and 1970-01-01, the polars `Date` epoch.
pub const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Default name of the date column when converting to and from DataFrames.
pub const DATE_COLUMN: &str = "date";

/// Instrument prices indexed by date.
pub type PriceTable = TimeTable;

/// Target weights indexed by rebalancing date.
pub type WeightSchedule = TimeTable;

/// Excess-return index values indexed by date.
pub type ExcessReturnTable = TimeTable;

/// Annualized short rates indexed by date.
pub type RateSeries = TimeSeries;

/// Simulated portfolio values indexed by date.
pub type Track = TimeSeries;

/// Convert a date to days since the Unix epoch (polars `Date` physical value).
pub fn date_to_epoch_days(date: Date) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Convert days since the Unix epoch back to a date.
pub fn epoch_days_to_date(days: i32) -> Result<Date> {
    Date::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
        .ok_or_else(|| ReplicaError::InvalidDate(format!("day {days} out of range")))
}

fn check_increasing(dates: &[Date]) -> Result<()> {
    if let Some(pair) = dates.windows(2).find(|pair| pair[0] >= pair[1]) {
        return Err(ReplicaError::InvalidData(format!(
            "dates must be strictly increasing, found {} followed by {}",
            pair[0], pair[1]
        )));
    }
    Ok(())
}

/// A dense table of `f64` values with a date row index and named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeTable {
    dates: Vec<Date>,
    columns: Vec<Symbol>,
    values: Array2<f64>,
}

impl TimeTable {
    /// Create a table, validating shape, date ordering and column uniqueness.
    pub fn new(dates: Vec<Date>, columns: Vec<Symbol>, values: Array2<f64>) -> Result<Self> {
        if values.nrows() != dates.len() || values.ncols() != columns.len() {
            return Err(ReplicaError::ShapeMismatch(format!(
                "values are {}x{} but index has {} dates and {} columns",
                values.nrows(),
                values.ncols(),
                dates.len(),
                columns.len()
            )));
        }
        check_increasing(&dates)?;
        for (i, name) in columns.iter().enumerate() {
            if columns[..i].contains(name) {
                return Err(ReplicaError::InvalidData(format!("duplicate column: {name}")));
            }
        }
        Ok(Self {
            dates,
            columns,
            values,
        })
    }

    /// Build a table from per-column vectors.
    pub fn from_columns(dates: Vec<Date>, columns: Vec<(Symbol, Vec<f64>)>) -> Result<Self> {
        let n = dates.len();
        let mut values = Array2::zeros((n, columns.len()));
        let mut names = Vec::with_capacity(columns.len());
        for (j, (name, column)) in columns.into_iter().enumerate() {
            if column.len() != n {
                return Err(ReplicaError::ShapeMismatch(format!(
                    "column {name} has {} values, expected {n}",
                    column.len()
                )));
            }
            values.column_mut(j).assign(&Array1::from_vec(column));
            names.push(name);
        }
        Self::new(dates, names, values)
    }

    /// Row dates.
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// Column names.
    pub fn columns(&self) -> &[Symbol] {
        &self.columns
    }

    /// The underlying `dates x columns` matrix.
    pub const fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Number of rows.
    pub const fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the table has no rows.
    pub const fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Number of columns.
    pub const fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// First date, if any.
    pub fn first_date(&self) -> Option<Date> {
        self.dates.first().copied()
    }

    /// Last date, if any.
    pub fn last_date(&self) -> Option<Date> {
        self.dates.last().copied()
    }

    /// Values of row `i`.
    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.values.row(i)
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of a column by name.
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.column_index(name).map(|j| self.values.column(j))
    }

    /// Row position of a date.
    pub fn position(&self, date: Date) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Extract a column as a [`TimeSeries`].
    pub fn series(&self, name: &str) -> Result<TimeSeries> {
        let values = self
            .column(name)
            .ok_or_else(|| ReplicaError::MissingColumn(name.to_string()))?;
        Ok(TimeSeries {
            name: name.to_string(),
            dates: self.dates.clone(),
            values: values.to_owned(),
        })
    }

    /// Keep only the named columns, in the given order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let indices = names
            .iter()
            .map(|name| {
                self.column_index(name.as_ref())
                    .ok_or_else(|| ReplicaError::MissingColumn(name.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(
            self.dates.clone(),
            names.iter().map(|n| n.as_ref().to_string()).collect(),
            self.values.select(Axis(1), &indices),
        )
    }

    /// Drop a column by name.
    pub fn drop_column(&self, name: &str) -> Result<Self> {
        if self.column_index(name).is_none() {
            return Err(ReplicaError::MissingColumn(name.to_string()));
        }
        let keep: Vec<&str> = self
            .columns
            .iter()
            .map(String::as_str)
            .filter(|c| *c != name)
            .collect();
        self.select(&keep)
    }

    /// Keep the rows at the given positions.
    pub fn select_rows(&self, rows: &[usize]) -> Result<Self> {
        Self::new(
            rows.iter().map(|&i| self.dates[i]).collect(),
            self.columns.clone(),
            self.values.select(Axis(0), rows),
        )
    }

    /// Rows dated on or after `date`.
    pub fn slice_from(&self, date: Date) -> Self {
        let start = self.dates.partition_point(|d| *d < date);
        Self {
            dates: self.dates[start..].to_vec(),
            columns: self.columns.clone(),
            values: self.values.slice(ndarray::s![start.., ..]).to_owned(),
        }
    }

    /// Simple returns `x[t] / x[t-1] - 1`; the first row is dropped.
    pub fn pct_change(&self) -> Self {
        if self.len() < 2 {
            return Self {
                dates: Vec::new(),
                columns: self.columns.clone(),
                values: Array2::zeros((0, self.n_columns())),
            };
        }
        let current = self.values.slice(ndarray::s![1.., ..]);
        let previous = self.values.slice(ndarray::s![..-1, ..]);
        Self {
            dates: self.dates[1..].to_vec(),
            columns: self.columns.clone(),
            values: &current / &previous - 1.0,
        }
    }

    /// Convert to a DataFrame with a leading `date` column of polars `Date` dtype.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.n_columns() + 1);
        columns.push(date_column(&self.dates)?);
        for (j, name) in self.columns.iter().enumerate() {
            let values: Vec<f64> = self.values.column(j).to_vec();
            columns.push(Column::new(name.as_str().into(), values));
        }
        Ok(DataFrame::new(columns)?)
    }

    /// Build a table from a DataFrame. Every column other than `date_column`
    /// is cast to `f64`; nulls become NaN.
    pub fn from_frame(df: &DataFrame, date_column: &str) -> Result<Self> {
        let dates = read_dates(df, date_column)?;
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .filter(|s| s != date_column)
            .collect();

        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let values = read_f64(df, &name)?;
            columns.push((name, values));
        }
        Self::from_columns(dates, columns)
    }
}

/// A single named `f64` series with a date index.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    name: String,
    dates: Vec<Date>,
    values: Array1<f64>,
}

impl TimeSeries {
    /// Create a series, validating length and date ordering.
    pub fn new(name: impl Into<String>, dates: Vec<Date>, values: Array1<f64>) -> Result<Self> {
        let name = name.into();
        if dates.len() != values.len() {
            return Err(ReplicaError::ShapeMismatch(format!(
                "series {name} has {} dates but {} values",
                dates.len(),
                values.len()
            )));
        }
        check_increasing(&dates)?;
        Ok(Self {
            name,
            dates,
            values,
        })
    }

    /// Series name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Row dates.
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// Values.
    pub const fn values(&self) -> &Array1<f64> {
        &self.values
    }

    /// Number of observations.
    pub const fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the series is empty.
    pub const fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// First date, if any.
    pub fn first_date(&self) -> Option<Date> {
        self.dates.first().copied()
    }

    /// Rename the series.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Last finite value dated at or before `date`.
    pub fn value_as_of(&self, date: Date) -> Option<f64> {
        let end = self.dates.partition_point(|d| *d <= date);
        self.values
            .slice(ndarray::s![..end])
            .iter()
            .rev()
            .copied()
            .find(|v| v.is_finite())
    }

    /// Divide every value by the first one.
    pub fn rebased(&self) -> Self {
        let base = self.values.first().copied().unwrap_or(1.0);
        Self {
            name: self.name.clone(),
            dates: self.dates.clone(),
            values: &self.values / base,
        }
    }

    /// Wrap the series as a one-column table.
    pub fn to_table(&self) -> TimeTable {
        TimeTable {
            dates: self.dates.clone(),
            columns: vec![self.name.clone()],
            values: self.values.clone().insert_axis(Axis(1)),
        }
    }

    /// Convert to a two-column DataFrame (`date`, name).
    pub fn to_frame(&self) -> Result<DataFrame> {
        self.to_table().to_frame()
    }

    /// Read one value column and the date column from a DataFrame.
    pub fn from_frame(df: &DataFrame, date_column: &str, value_column: &str) -> Result<Self> {
        let dates = read_dates(df, date_column)?;
        let values = read_f64(df, value_column)?;
        Self::new(value_column, dates, Array1::from_vec(values))
    }
}

fn date_column(dates: &[Date]) -> Result<Column> {
    let days: Vec<i32> = dates.iter().map(|d| date_to_epoch_days(*d)).collect();
    let series = Series::new(DATE_COLUMN.into(), days).cast(&DataType::Date)?;
    Ok(series.into_column())
}

fn read_dates(df: &DataFrame, name: &str) -> Result<Vec<Date>> {
    let column = df
        .column(name)
        .map_err(|_| ReplicaError::MissingColumn(name.to_string()))?;
    let series = column.as_materialized_series();
    if series.dtype() != &DataType::Date {
        return Err(ReplicaError::InvalidData(format!(
            "column {name} has dtype {}, expected date",
            series.dtype()
        )));
    }
    let days = series.cast(&DataType::Int32)?;
    days.i32()?
        .into_iter()
        .map(|d| {
            d.ok_or_else(|| ReplicaError::InvalidDate(format!("null date in column {name}")))
                .and_then(epoch_days_to_date)
        })
        .collect()
}

fn read_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| ReplicaError::MissingColumn(name.to_string()))?;
    let series = column.as_materialized_series().cast(&DataType::Float64)?;
    Ok(series
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn d(day: u32) -> Date {
        Date::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample_table() -> TimeTable {
        TimeTable::from_columns(
            vec![d(1), d(2), d(3)],
            vec![
                ("A".to_string(), vec![100.0, 110.0, 99.0]),
                ("B".to_string(), vec![50.0, 50.0, 55.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_unsorted_dates() {
        let result = TimeTable::new(
            vec![d(2), d(1)],
            vec!["A".to_string()],
            Array2::zeros((2, 1)),
        );
        assert!(matches!(result, Err(ReplicaError::InvalidData(_))));
    }

    #[test]
    fn test_new_rejects_duplicate_columns() {
        let result = TimeTable::new(
            vec![d(1)],
            vec!["A".to_string(), "A".to_string()],
            Array2::zeros((1, 2)),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_new_rejects_bad_shape() {
        let result = TimeTable::new(vec![d(1)], vec!["A".to_string()], Array2::zeros((2, 1)));
        assert!(matches!(result, Err(ReplicaError::ShapeMismatch(_))));
    }

    #[test]
    fn test_select_and_drop() {
        let table = sample_table();
        let selected = table.select(&["B", "A"]).unwrap();
        assert_eq!(selected.columns(), &["B".to_string(), "A".to_string()]);
        assert_eq!(selected.values()[[0, 0]], 50.0);

        let dropped = table.drop_column("A").unwrap();
        assert_eq!(dropped.columns(), &["B".to_string()]);
        assert!(table.select(&["C"]).is_err());
    }

    #[test]
    fn test_pct_change() {
        let returns = sample_table().pct_change();
        assert_eq!(returns.len(), 2);
        assert_eq!(returns.dates()[0], d(2));
        assert_abs_diff_eq!(returns.values()[[0, 0]], 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(returns.values()[[1, 0]], -0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(returns.values()[[1, 1]], 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_slice_from() {
        let table = sample_table();
        let sliced = table.slice_from(d(2));
        assert_eq!(sliced.dates(), &[d(2), d(3)]);
        assert_eq!(sliced.row(0).to_vec(), vec![110.0, 50.0]);
    }

    #[test]
    fn test_value_as_of_skips_nan() {
        let series = TimeSeries::new("rate", vec![d(1), d(3), d(5)], array![0.01, f64::NAN, 0.03])
            .unwrap();
        assert_eq!(series.value_as_of(d(2)), Some(0.01));
        assert_eq!(series.value_as_of(d(4)), Some(0.01));
        assert_eq!(series.value_as_of(d(5)), Some(0.03));
        assert_eq!(series.value_as_of(Date::from_ymd_opt(2023, 12, 31).unwrap()), None);
    }

    #[test]
    fn test_frame_roundtrip_preserves_dates() {
        let table = sample_table();
        let df = table.to_frame().unwrap();
        assert_eq!(df.width(), 3);
        assert_eq!(df.column(DATE_COLUMN).unwrap().dtype(), &DataType::Date);

        let back = TimeTable::from_frame(&df, DATE_COLUMN).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_series_to_table() {
        let series = TimeSeries::new("Track", vec![d(1), d(2)], array![1.0, 1.1]).unwrap();
        let table = series.to_table();
        assert_eq!(table.columns(), &["Track".to_string()]);
        assert_eq!(table.values()[[1, 0]], 1.1);
        assert_eq!(table.series("Track").unwrap(), series);
    }

    #[test]
    fn test_epoch_days() {
        let epoch = Date::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(date_to_epoch_days(epoch), 0);
        assert_eq!(epoch_days_to_date(31).unwrap(), Date::from_ymd_opt(1970, 2, 1).unwrap());
    }
}
