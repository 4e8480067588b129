//! Excess-return command implementation.

use std::path::Path;

use anyhow::Result;
use replica_track::{ExcessReturn, ExcessReturnConfig, RateUnit};

use crate::data::{self, SourceArgs};

/// Convert every price column into an excess-return index and write the
/// result as CSV.
pub(crate) fn run_excess(
    prices: &Path,
    rates: &Path,
    rate_column: &str,
    percent: bool,
    basis: f64,
    source: &SourceArgs,
    output: Option<&Path>,
) -> Result<()> {
    let prices = data::load_table(prices, source)?;
    let rates = data::load_rates(rates, rate_column, source)?;

    let config = ExcessReturnConfig {
        day_count_basis: basis,
        rate_unit: if percent {
            RateUnit::Percent
        } else {
            RateUnit::Decimal
        },
    };
    let excess = ExcessReturn::new(config).transform(&prices, &rates)?;
    data::save_table(&excess, output)
}
