//! Excess-return transform.
//!
//! Converts a total-return price table into an excess-return index by
//! subtracting a money-market financing accrual from every period's price
//! return:
//!
//! ```text
//! excess[t] = excess[t-1] * (price[t] / price[t-1] - rate[t-1] * days(t-1, t) / basis)
//! ```
//!
//! The rate observed at `t-1` finances the holding over `(t-1, t]`. Columns are
//! independent of each other.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use replica_traits::{
    Date, ExcessReturnTable, PriceTable, RateSeries, ReplicaError, Result, TimeSeries, TimeTable,
};

/// Quotation unit of the rate series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateUnit {
    /// `0.025` means 2.5%.
    #[default]
    Decimal,
    /// `2.5` means 2.5%.
    Percent,
}

impl RateUnit {
    /// Convert a quoted rate to a decimal rate.
    pub const fn to_decimal(self, rate: f64) -> f64 {
        match self {
            Self::Decimal => rate,
            Self::Percent => rate / 100.0,
        }
    }
}

/// Configuration for the excess-return transform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcessReturnConfig {
    /// Day-count basis of the rate (360 for money-market rates)
    pub day_count_basis: f64,
    /// Quotation unit of the rate series
    pub rate_unit: RateUnit,
}

impl Default for ExcessReturnConfig {
    fn default() -> Self {
        Self {
            day_count_basis: 360.0,
            rate_unit: RateUnit::Decimal,
        }
    }
}

/// Calendar days elapsed from `from` to `to`.
pub fn day_count(from: Date, to: Date) -> i64 {
    (to - from).num_days()
}

/// Excess-return transform.
///
/// # Example
///
/// ```rust,ignore
/// use replica_track::{ExcessReturn, ExcessReturnConfig};
///
/// let transform = ExcessReturn::new(ExcessReturnConfig::default());
/// let excess = transform.transform(&prices, &rates)?;
/// assert_eq!(excess.row(0).to_vec(), vec![1.0; prices.n_columns()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExcessReturn {
    config: ExcessReturnConfig,
}

impl ExcessReturn {
    /// Create a transform with the given configuration.
    pub const fn new(config: ExcessReturnConfig) -> Self {
        Self { config }
    }

    /// Transform every column of a price table.
    ///
    /// # Errors
    ///
    /// - `InsufficientData` if the table has no rows
    /// - `MisalignedIndex` if the first price date precedes the first usable rate
    /// - `InvalidConfig` if the day-count basis is not positive
    pub fn transform(&self, prices: &PriceTable, rates: &RateSeries) -> Result<ExcessReturnTable> {
        let accruals = self.accruals(prices.dates(), rates)?;
        let values = prices.values();
        let mut excess = Array2::<f64>::ones(values.raw_dim());

        for t in 1..prices.len() {
            let ratio = &values.row(t) / &values.row(t - 1);
            let previous = excess.row(t - 1).to_owned();
            excess
                .row_mut(t)
                .assign(&(previous * (ratio - accruals[t - 1])));
        }

        debug!(
            rows = prices.len(),
            columns = prices.n_columns(),
            "computed excess-return index"
        );
        TimeTable::new(prices.dates().to_vec(), prices.columns().to_vec(), excess)
    }

    /// Transform a single series, e.g. a simulated track.
    pub fn transform_series(&self, series: &TimeSeries, rates: &RateSeries) -> Result<TimeSeries> {
        let table = self.transform(&series.to_table(), rates)?;
        table.series(series.name())
    }

    /// Financing accrual for each step `(t-1, t]`, one entry per step.
    fn accruals(&self, dates: &[Date], rates: &RateSeries) -> Result<Array1<f64>> {
        let basis = self.config.day_count_basis;
        if !(basis.is_finite() && basis > 0.0) {
            return Err(ReplicaError::InvalidConfig(format!(
                "day count basis must be positive, got {basis}"
            )));
        }
        if dates.is_empty() {
            return Err(ReplicaError::InsufficientData(
                "price table has no rows".to_string(),
            ));
        }

        let on_grid = forward_fill_onto(dates, rates)?;
        Ok(dates
            .windows(2)
            .zip(on_grid.iter())
            .map(|(pair, &rate)| {
                self.config.rate_unit.to_decimal(rate) * day_count(pair[0], pair[1]) as f64 / basis
            })
            .collect())
    }
}

/// Sample `rates` onto `dates`, carrying the last finite observation forward.
fn forward_fill_onto(dates: &[Date], rates: &RateSeries) -> Result<Vec<f64>> {
    let rate_dates = rates.dates();
    let rate_values = rates.values();

    let mut filled = Vec::with_capacity(dates.len());
    let mut cursor = 0;
    let mut last: Option<f64> = None;

    for &date in dates {
        while cursor < rate_dates.len() && rate_dates[cursor] <= date {
            let value = rate_values[cursor];
            if value.is_finite() {
                last = Some(value);
            }
            cursor += 1;
        }
        match last {
            Some(rate) => filled.push(rate),
            None => {
                return Err(ReplicaError::MisalignedIndex(format!(
                    "no rate available on or before {date} (rates start {})",
                    rates
                        .first_date()
                        .map_or_else(|| "never".to_string(), |d| d.to_string())
                )));
            }
        }
    }
    Ok(filled)
}

/// Excess-return index of `prices` with the default money-market convention
/// (decimal rates, actual/360).
pub fn make_excess_return(prices: &PriceTable, rates: &RateSeries) -> Result<ExcessReturnTable> {
    ExcessReturn::default().transform(prices, rates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn d(month: u32, day: u32) -> Date {
        Date::from_ymd_opt(2024, month, day).unwrap()
    }

    fn prices() -> PriceTable {
        TimeTable::from_columns(
            vec![d(1, 1), d(1, 2), d(1, 5), d(1, 6)],
            vec![
                ("A".to_string(), vec![100.0, 101.0, 99.0, 102.0]),
                ("B".to_string(), vec![10.0, 10.0, 10.5, 10.5]),
            ],
        )
        .unwrap()
    }

    fn flat_rates(rate: f64) -> RateSeries {
        TimeSeries::new("rate", vec![d(1, 1)], array![rate]).unwrap()
    }

    #[test]
    fn test_config_default() {
        let config = ExcessReturnConfig::default();
        assert_eq!(config.day_count_basis, 360.0);
        assert_eq!(config.rate_unit, RateUnit::Decimal);
    }

    #[test]
    fn test_day_count() {
        assert_eq!(day_count(d(1, 2), d(1, 5)), 3);
        assert_eq!(day_count(d(1, 31), d(2, 1)), 1);
    }

    #[test]
    fn test_first_row_is_one() {
        let excess = make_excess_return(&prices(), &flat_rates(0.05)).unwrap();
        assert!(excess.row(0).iter().all(|&v| v == 1.0));
        assert_eq!(excess.dates(), prices().dates());
        assert_eq!(excess.columns(), prices().columns());
    }

    #[test]
    fn test_zero_rate_is_total_return_index() {
        let prices = prices();
        let excess = make_excess_return(&prices, &flat_rates(0.0)).unwrap();
        for (j, name) in prices.columns().iter().enumerate() {
            let column = prices.column(name).unwrap();
            for t in 0..prices.len() {
                assert_abs_diff_eq!(
                    excess.values()[[t, j]],
                    column[t] / column[0],
                    epsilon = 1e-12
                );
            }
        }
    }

    #[test]
    fn test_accrual_uses_calendar_days() {
        // B gains 5% over the three-day weekend step
        let excess = make_excess_return(&prices(), &flat_rates(0.036)).unwrap();
        let b = excess.column("B").unwrap();
        let step1 = 1.0 - 0.036 / 360.0;
        let step2 = step1 * (1.05 - 0.036 * 3.0 / 360.0);
        assert_abs_diff_eq!(b[1], step1, epsilon = 1e-12);
        assert_abs_diff_eq!(b[2], step2, epsilon = 1e-12);
    }

    #[test]
    fn test_percent_rates() {
        let decimal = make_excess_return(&prices(), &flat_rates(0.025)).unwrap();
        let percent = ExcessReturn::new(ExcessReturnConfig {
            rate_unit: RateUnit::Percent,
            ..Default::default()
        })
        .transform(&prices(), &flat_rates(2.5))
        .unwrap();
        for (a, b) in decimal.values().iter().zip(percent.values().iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_rate_uses_previous_date() {
        // Rate jumps on the last date; it must not affect the final step.
        let rates = TimeSeries::new("rate", vec![d(1, 1), d(1, 6)], array![0.0, 10.0]).unwrap();
        let excess = make_excess_return(&prices(), &rates).unwrap();
        let a = excess.column("A").unwrap();
        assert_abs_diff_eq!(a[3], 1.02, epsilon = 1e-12);
    }

    #[test]
    fn test_sparse_rates_forward_filled() {
        let rates = TimeSeries::new("rate", vec![d(1, 1), d(1, 3)], array![0.0, 0.36]).unwrap();
        let excess = make_excess_return(&prices(), &rates).unwrap();
        let b = excess.column("B").unwrap();
        // Step (1/5, 1/6] uses the 1/3 observation carried onto 1/5.
        assert_abs_diff_eq!(b[3], b[2] * (1.0 - 0.36 / 360.0), epsilon = 1e-12);
        // Step (1/2, 1/5] still uses the 1/1 rate carried onto 1/2.
        assert_abs_diff_eq!(b[2], 1.05, epsilon = 1e-12);
    }

    #[test]
    fn test_rates_starting_late_is_misaligned() {
        let rates = TimeSeries::new("rate", vec![d(1, 2)], array![0.01]).unwrap();
        let result = make_excess_return(&prices(), &rates);
        assert!(matches!(result, Err(ReplicaError::MisalignedIndex(_))));
    }

    #[test]
    fn test_empty_prices() {
        let empty = TimeTable::from_columns(vec![], vec![("A".to_string(), vec![])]).unwrap();
        let result = make_excess_return(&empty, &flat_rates(0.0));
        assert!(matches!(result, Err(ReplicaError::InsufficientData(_))));
    }

    #[test]
    fn test_negative_ratio_propagates() {
        let prices = TimeTable::from_columns(
            vec![d(1, 1), d(1, 2), d(1, 3)],
            vec![("X".to_string(), vec![1.0, -1.0, -2.0])],
        )
        .unwrap();
        let excess = make_excess_return(&prices, &flat_rates(0.0)).unwrap();
        let x = excess.column("X").unwrap();
        assert_eq!(x.to_vec(), vec![1.0, -1.0, -2.0]);
    }

    #[test]
    fn test_transform_series() {
        let track = TimeSeries::new("Track", vec![d(1, 1), d(1, 2)], array![1.0, 1.1]).unwrap();
        let excess = ExcessReturn::default()
            .transform_series(&track, &flat_rates(0.36))
            .unwrap();
        assert_eq!(excess.name(), "Track");
        assert_abs_diff_eq!(excess.values()[1], 1.1 - 0.001, epsilon = 1e-12);
    }
}
