//! End-to-end index replication.
//!
//! [`Replication::run`] takes daily prices holding the target index and its
//! candidate replicating instruments, plus a financing rate, and:
//!
//! 1. samples prices onto a periodic calendar (weekly by default) and takes
//!    returns, dropping rows where any instrument is missing
//! 2. estimates rolling weights of the instruments against the target
//! 3. simulates the replicating track on the daily grid merged with the
//!    rebalancing dates, starting at the first rebalancing date
//! 4. converts the track to excess return over the financing rate
//! 5. compares the track with the target rebased to 1.0

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use replica_data::{drop_incomplete_rows, forward_fill, reindex_as_of, union_dates, weekly_calendar};
use replica_regress::{
    RegressionConfig, RegressionEstimator, RollingEstimate, WeightBounds, WeightEstimator,
};
use replica_track::{
    ExcessReturn, ExcessReturnConfig, ReportConfig, TrackConfig, TrackSimulator, TrackingReport,
};
use replica_traits::{
    Date, PriceTable, RateSeries, ReplicaError, Result, TimeSeries, TimeTable, Track,
    WeightSchedule,
};

/// Name of the excess-return track.
pub const EXCESS_TRACK_NAME: &str = "Track ER";

/// Configuration for a replication run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationConfig {
    /// First calendar date (None = first price date)
    pub calendar_start: Option<Date>,
    /// Days between calendar dates
    pub calendar_step_days: u64,
    /// Rolling regression settings
    pub regression: RegressionConfig,
    /// Track simulation settings
    pub track: TrackConfig,
    /// Excess-return settings
    pub excess: ExcessReturnConfig,
    /// Tracking statistics settings
    pub report: ReportConfig,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            calendar_start: None,
            calendar_step_days: 7,
            regression: RegressionConfig {
                bounds: WeightBounds::long_only(),
                weight_sum: Some(1.0),
                ..Default::default()
            },
            track: TrackConfig::default(),
            excess: ExcessReturnConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

/// A regression window that could not be fitted.
#[derive(Debug, Clone, Serialize)]
pub struct WindowFailure {
    /// End date of the window
    pub end: Date,
    /// Reason
    pub error: String,
}

/// Output of a replication run.
#[derive(Debug, Clone)]
pub struct ReplicationResult {
    /// Fitted weights keyed by rebalancing date
    pub weights: WeightSchedule,
    /// Replicating track on the daily grid
    pub track: Track,
    /// Track in excess of the financing rate
    pub excess_track: Track,
    /// Target on the same grid, rebased to 1.0
    pub target: TimeSeries,
    /// Transaction costs charged over the run
    pub total_cost: f64,
    /// Rebalances executed
    pub rebalances: usize,
    /// Windows skipped because they failed to fit
    pub failures: Vec<WindowFailure>,
    /// Track against target
    pub report: TrackingReport,
}

impl ReplicationResult {
    /// Target, track and excess-return track side by side.
    pub fn summary(&self) -> Result<TimeTable> {
        TimeTable::from_columns(
            self.track.dates().to_vec(),
            vec![
                (self.target.name().to_string(), self.target.values().to_vec()),
                (self.track.name().to_string(), self.track.values().to_vec()),
                (
                    self.excess_track.name().to_string(),
                    self.excess_track.values().to_vec(),
                ),
            ],
        )
    }
}

/// Replication pipeline.
#[derive(Debug, Clone, Default)]
pub struct Replication {
    config: ReplicationConfig,
}

impl Replication {
    /// Create a pipeline with the given configuration.
    pub const fn new(config: ReplicationConfig) -> Self {
        Self { config }
    }

    /// The pipeline's configuration.
    pub const fn config(&self) -> &ReplicationConfig {
        &self.config
    }

    /// Periodic returns of every price column.
    ///
    /// Prices are forward-filled, sampled as of each calendar date and turned
    /// into simple returns; periods where any column is missing are dropped.
    pub fn returns(&self, prices: &PriceTable) -> Result<TimeTable> {
        let (first, last) = prices
            .first_date()
            .zip(prices.last_date())
            .ok_or_else(|| ReplicaError::InsufficientData("price table is empty".to_string()))?;
        let calendar = weekly_calendar(
            self.config.calendar_start.unwrap_or(first),
            last,
            self.config.calendar_step_days,
        )?;
        let sampled = reindex_as_of(&forward_fill(prices)?, &calendar)?;
        drop_incomplete_rows(&sampled.pct_change())
    }

    /// Rolling weights of every other column of `returns` against `target`.
    pub fn estimate(&self, returns: &TimeTable, target: &str) -> Result<RollingEstimate> {
        RegressionEstimator::new(self.config.regression.clone())
            .estimate(&returns.series(target)?, &returns.drop_column(target)?)
    }

    /// Replicate column `target` of `prices` with the other columns.
    ///
    /// Windows that fail to fit are skipped and listed in the result; the run
    /// fails only if no window could be fitted.
    ///
    /// # Errors
    ///
    /// - `MissingColumn` if `target` is not a price column
    /// - `InsufficientData` if the calendar leaves no regression window, or
    ///   every window failed
    /// - `MisalignedIndex` if the rates start after the first rebalancing date
    /// - any error of the estimator, simulator or excess-return transform
    pub fn run(
        &self,
        prices: &PriceTable,
        rates: &RateSeries,
        target: &str,
    ) -> Result<ReplicationResult> {
        if prices.column_index(target).is_none() {
            return Err(ReplicaError::MissingColumn(target.to_string()));
        }
        let returns = self.returns(prices)?;
        info!(
            index = target,
            instruments = prices.n_columns() - 1,
            periods = returns.len(),
            "sampled returns"
        );

        let estimate = self.estimate(&returns, target)?;
        let failures: Vec<WindowFailure> = estimate
            .failures()
            .into_iter()
            .map(|(end, error)| {
                warn!(%end, %error, "skipping window");
                WindowFailure {
                    end,
                    error: error.to_string(),
                }
            })
            .collect();
        let weights = estimate.fitted_schedule()?;
        let Some(start) = weights.first_date() else {
            return Err(ReplicaError::InsufficientData(format!(
                "all {} regression windows failed",
                estimate.len()
            )));
        };

        let daily = forward_fill(prices)?;
        let instruments = daily.drop_column(target)?;
        let grid = union_dates(instruments.slice_from(start).dates(), weights.dates());
        let output = TrackSimulator::new(self.config.track)
            .simulate(&reindex_as_of(&instruments, &grid)?, &weights)?;
        let excess_track = ExcessReturn::new(self.config.excess)
            .transform_series(&output.track, rates)?
            .with_name(EXCESS_TRACK_NAME);

        let target_levels = reindex_as_of(&daily.select(&[target])?, &grid)?
            .series(target)?
            .rebased();
        let report = TrackingReport::compare(&target_levels, &output.track, &self.config.report)?;

        info!(
            rebalances = output.rebalances,
            failed_windows = failures.len(),
            tracking_error = report.tracking_error,
            "replication complete"
        );

        Ok(ReplicationResult {
            weights,
            track: output.track,
            excess_track,
            target: target_levels,
            total_cost: output.total_cost,
            rebalances: output.rebalances,
            failures,
            report,
        })
    }
}
