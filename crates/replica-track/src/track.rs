//! Track simulation.
//!
//! A track is the value path of a portfolio that starts at 1.0 and is
//! rebalanced to target weights on the dates of a weight schedule. The
//! simulation is a left scan over the price rows threading an explicit
//! [`PortfolioState`] (share holdings and cash) from one date to the next.
//!
//! Weights dated `t-1` are traded at the prices of `t`: the portfolio is first
//! marked to market at `t` with the holdings carried from `t-1`, the
//! transaction cost is charged, and the holdings are then reset so that each
//! instrument is worth `weight * value[t]`. Any residual goes to cash.
//!
//! The schedule row dated on the first price date is the opening allocation.
//! Like every other row it is traded again on the following date, which costs
//! nothing because the holdings still match it at `t0`. Weights that leave
//! cash or span several instruments are therefore reset once at `t1`; after
//! that a one-row schedule is held without further trades.

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use replica_traits::{PriceTable, ReplicaError, Result, TimeSeries, Track, WeightSchedule};

/// Name given to simulated tracks.
pub const TRACK_NAME: &str = "Track";

/// Configuration for the track simulator.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    /// Transaction cost charged on L1 turnover at each rebalance (0.001 = 10bp)
    pub transaction_cost_rate: f64,
}

/// Share holdings and cash between two dates of a simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioState {
    /// Shares held per instrument, in price-table column order
    pub shares: Array1<f64>,
    /// Cash balance
    pub cash: f64,
}

/// Rebalancing instruction applied during a [`PortfolioState::step`].
#[derive(Debug, Clone, Copy)]
pub struct Rebalance<'a> {
    /// Target weights, in price-table column order
    pub target: ArrayView1<'a, f64>,
    /// Transaction cost rate applied to turnover
    pub cost_rate: f64,
}

/// Result of one simulation step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// Holdings carried to the next step
    pub state: PortfolioState,
    /// Portfolio value at the new date
    pub value: f64,
    /// Transaction cost charged on this step
    pub cost: f64,
}

impl PortfolioState {
    /// Opening holdings for a unit portfolio: `shares = weight / price`, with
    /// whatever the weights leave unallocated held as cash.
    pub fn initial(weights: ArrayView1<'_, f64>, prices: ArrayView1<'_, f64>) -> Self {
        let shares = &weights / &prices;
        let cash = 1.0 - (&shares * &prices).sum();
        Self { shares, cash }
    }

    /// Value of the holdings at `prices`, cash included.
    pub fn market_value(&self, prices: ArrayView1<'_, f64>) -> f64 {
        (&self.shares * &prices).sum() + self.cash
    }

    /// Weight of each instrument in a portfolio worth `value`.
    pub fn current_weights(&self, prices: ArrayView1<'_, f64>, value: f64) -> Array1<f64> {
        &self.shares * &prices / value
    }

    /// Advance from `previous_prices` (portfolio worth `previous_value`) to
    /// `prices`, optionally rebalancing.
    pub fn step(
        self,
        previous_value: f64,
        previous_prices: ArrayView1<'_, f64>,
        prices: ArrayView1<'_, f64>,
        rebalance: Option<Rebalance<'_>>,
    ) -> StepOutcome {
        let Some(rebalance) = rebalance else {
            let value = self.market_value(prices);
            return StepOutcome {
                state: self,
                value,
                cost: 0.0,
            };
        };

        let drift = self.current_weights(previous_prices, previous_value);
        let turnover: f64 = (&rebalance.target - &drift).mapv(f64::abs).sum();
        let cost = rebalance.cost_rate * previous_value * turnover;
        let value = self.market_value(prices) - cost;

        let shares = &rebalance.target * value / &prices;
        let cash = value - (&shares * &prices).sum();

        StepOutcome {
            state: Self { shares, cash },
            value,
            cost,
        }
    }
}

/// Output of a simulation with its bookkeeping.
#[derive(Debug, Clone)]
pub struct TrackOutput {
    /// Portfolio value for every price date
    pub track: Track,
    /// Sum of transaction costs charged
    pub total_cost: f64,
    /// Number of rebalances executed
    pub rebalances: usize,
}

/// Track simulator.
///
/// # Example
///
/// ```rust,ignore
/// use replica_track::{TrackConfig, TrackSimulator};
///
/// let simulator = TrackSimulator::new(TrackConfig { transaction_cost_rate: 0.001 });
/// let output = simulator.simulate(&prices, &weights)?;
/// println!("costs: {:.4}", output.total_cost);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TrackSimulator {
    config: TrackConfig,
}

impl TrackSimulator {
    /// Create a simulator with the given configuration.
    pub const fn new(config: TrackConfig) -> Self {
        Self { config }
    }

    /// Simulate the portfolio over every date of `prices`.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` for a negative or non-finite cost rate
    /// - `InsufficientData` for an empty price table or weight schedule
    /// - `ShapeMismatch` when schedule and price columns differ
    /// - `MisalignedIndex` when a schedule date is off the price grid or the
    ///   schedule does not start on the first price date
    /// - `InvalidData` for non-finite prices or weights
    pub fn simulate(&self, prices: &PriceTable, schedule: &WeightSchedule) -> Result<TrackOutput> {
        let cost_rate = self.config.transaction_cost_rate;
        if !(cost_rate.is_finite() && cost_rate >= 0.0) {
            return Err(ReplicaError::InvalidConfig(format!(
                "transaction cost rate must be non-negative, got {cost_rate}"
            )));
        }
        if prices.is_empty() {
            return Err(ReplicaError::InsufficientData(
                "price table has no rows".to_string(),
            ));
        }
        if prices.values().iter().any(|p| !p.is_finite()) {
            return Err(ReplicaError::InvalidData(
                "price table contains non-finite values".to_string(),
            ));
        }

        let weights = align_schedule(prices, schedule)?;
        let rebalance_rows = rebalance_rows(prices, &weights)?;

        let n = prices.len();
        let mut values = Array1::<f64>::ones(n);
        let mut state = PortfolioState::initial(weights.row(0), prices.row(0));
        let mut total_cost = 0.0;
        let mut rebalances = 0;

        for t in 1..n {
            let rebalance = rebalance_rows[t - 1].map(|row| Rebalance {
                target: weights.row(row),
                cost_rate,
            });
            let outcome = state.step(values[t - 1], prices.row(t - 1), prices.row(t), rebalance);

            if rebalance.is_some() {
                rebalances += 1;
                debug!(
                    date = %prices.dates()[t],
                    value = outcome.value,
                    cost = outcome.cost,
                    "rebalanced"
                );
            }
            values[t] = outcome.value;
            total_cost += outcome.cost;
            state = outcome.state;
        }

        info!(
            dates = n,
            rebalances,
            total_cost,
            final_value = values[n - 1],
            "simulated track"
        );

        Ok(TrackOutput {
            track: TimeSeries::new(TRACK_NAME, prices.dates().to_vec(), values)?,
            total_cost,
            rebalances,
        })
    }
}

/// Reorder the schedule's columns to match the price table, rejecting any
/// instrument present on one side only.
fn align_schedule(prices: &PriceTable, schedule: &WeightSchedule) -> Result<WeightSchedule> {
    if schedule.is_empty() {
        return Err(ReplicaError::InsufficientData(
            "weight schedule has no rows".to_string(),
        ));
    }
    if let Some(extra) = schedule
        .columns()
        .iter()
        .find(|c| prices.column_index(c).is_none())
    {
        return Err(ReplicaError::ShapeMismatch(format!(
            "weight schedule instrument {extra} has no prices"
        )));
    }
    if let Some(missing) = prices
        .columns()
        .iter()
        .find(|c| schedule.column_index(c).is_none())
    {
        return Err(ReplicaError::ShapeMismatch(format!(
            "weight schedule has no weight for priced instrument {missing}"
        )));
    }

    let aligned = schedule.select(prices.columns())?;
    if aligned.values().iter().any(|w| !w.is_finite()) {
        return Err(ReplicaError::InvalidData(
            "weight schedule contains non-finite weights".to_string(),
        ));
    }
    Ok(aligned)
}

/// For every price row, the schedule row that rebalances on the next step.
/// The opening row also sets up the initial holdings.
fn rebalance_rows(prices: &PriceTable, schedule: &WeightSchedule) -> Result<Vec<Option<usize>>> {
    let first_price = prices.dates()[0];
    let first_weight = schedule.dates()[0];
    if first_weight != first_price {
        return Err(ReplicaError::MisalignedIndex(format!(
            "weight schedule starts {first_weight} but prices start {first_price}"
        )));
    }

    let mut rows = vec![None; prices.len()];
    for (row, date) in schedule.dates().iter().enumerate() {
        let position = prices.position(*date).ok_or_else(|| {
            ReplicaError::MisalignedIndex(format!("rebalancing date {date} is not a price date"))
        })?;
        rows[position] = Some(row);
    }
    Ok(rows)
}

/// Simulate a track with a flat transaction cost rate.
pub fn make_track(
    prices: &PriceTable,
    schedule: &WeightSchedule,
    transaction_cost_rate: f64,
) -> Result<Track> {
    TrackSimulator::new(TrackConfig {
        transaction_cost_rate,
    })
    .simulate(prices, schedule)
    .map(|output| output.track)
}
