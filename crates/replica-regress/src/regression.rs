//! Rolling-window constrained regression.
//!
//! [`RegressionEstimator`] regresses a target return series on a table of
//! regressor returns over every rolling window and keys the fitted weights by
//! the window's last date. Three methods share the same loop:
//!
//! - [`RegressionMethod::Ols`]: least squares on raw returns
//! - [`RegressionMethod::StandardizedOls`]: target and regressors divided by
//!   their in-window sample standard deviation (no demeaning), coefficients
//!   mapped back with `target_std / regressor_std`
//! - [`RegressionMethod::Lasso`]: standardized, plus an L1 penalty of
//!   `lambda * n` where `n` is the length of the whole series
//!
//! Regressors with zero in-window variance are left out of the standardized
//! fit and receive a stored weight of `0.0`.
//!
//! Failures inside a window (infeasible constraints, non-convergence, bad
//! data) are recorded on that window only; see [`RollingEstimate`].

use ndarray::parallel::prelude::*;
use ndarray::{Array1, Array2, Axis, s};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use replica_traits::stats::{scale_by_std, scale_columns};
use replica_traits::{Date, ReplicaError, Result, Symbol, TimeSeries, TimeTable, WeightSchedule};

use crate::estimator::WeightEstimator;
use crate::solver::{Constraints, Problem, SolverConfig, solve};
use crate::window::{RollingWindows, Window, window_count};

/// Regression flavour.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegressionMethod {
    /// Least squares on raw returns
    #[default]
    Ols,
    /// Least squares on volatility-standardized returns
    StandardizedOls,
    /// Standardized least squares with an L1 penalty `lambda * n * sum|z|`
    Lasso {
        /// Penalty multiplier, scaled by the full series length
        lambda: f64,
    },
}

impl RegressionMethod {
    /// Whether returns are standardized before fitting.
    pub const fn is_standardized(&self) -> bool {
        !matches!(self, Self::Ols)
    }

    /// Short identifier.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ols => "ols",
            Self::StandardizedOls => "ols_er",
            Self::Lasso { .. } => "lasso_er",
        }
    }

    /// L1 multiplier for a series of `n` rows.
    fn penalty(&self, n: usize) -> f64 {
        match self {
            Self::Lasso { lambda } => lambda * n as f64,
            _ => 0.0,
        }
    }
}

/// Per-weight bounds; `None` leaves that side unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WeightBounds {
    /// Lower bound applied to every weight
    pub lower: Option<f64>,
    /// Upper bound applied to every weight
    pub upper: Option<f64>,
}

impl WeightBounds {
    /// No bounds.
    pub const fn unbounded() -> Self {
        Self {
            lower: None,
            upper: None,
        }
    }

    /// Weights in `[0, inf)`.
    pub const fn long_only() -> Self {
        Self {
            lower: Some(0.0),
            upper: None,
        }
    }

    /// Weights in `[lower, upper]`.
    pub const fn between(lower: f64, upper: f64) -> Self {
        Self {
            lower: Some(lower),
            upper: Some(upper),
        }
    }

    fn constraints(&self, budget: Option<f64>) -> Constraints {
        Constraints {
            lower: self.lower.unwrap_or(f64::NEG_INFINITY),
            upper: self.upper.unwrap_or(f64::INFINITY),
            budget,
        }
    }
}

/// Configuration for rolling regression.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionConfig {
    /// Rows per window, excluding the end row (a window holds `sample_length + 1` rows)
    pub sample_length: usize,
    /// Rows between consecutive window starts
    pub frequency: usize,
    /// Bounds applied to every fitted coefficient
    pub bounds: WeightBounds,
    /// Required sum of the fitted coefficients (None = no budget constraint)
    pub weight_sum: Option<f64>,
    /// Regression flavour
    pub method: RegressionMethod,
    /// Solver settings
    pub solver: SolverConfig,
    /// Fit windows on the rayon thread pool
    pub parallel: bool,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            sample_length: 52, // one year of weekly returns
            frequency: 13,     // quarterly rebalancing
            bounds: WeightBounds::unbounded(),
            weight_sum: None,
            method: RegressionMethod::Ols,
            solver: SolverConfig::default(),
            parallel: false,
        }
    }
}

impl RegressionConfig {
    /// Check the configuration for values no window could be fitted with.
    pub fn validate(&self) -> Result<()> {
        if self.sample_length == 0 {
            return Err(ReplicaError::InvalidConfig(
                "sample_length must be positive".to_string(),
            ));
        }
        if self.frequency == 0 {
            return Err(ReplicaError::InvalidConfig(
                "frequency must be positive".to_string(),
            ));
        }
        let Constraints { lower, upper, .. } = self.bounds.constraints(None);
        if lower.is_nan() || upper.is_nan() || lower > upper {
            return Err(ReplicaError::InvalidConfig(format!(
                "invalid weight bounds [{lower}, {upper}]"
            )));
        }
        if let Some(sum) = self.weight_sum
            && !sum.is_finite()
        {
            return Err(ReplicaError::InvalidConfig(format!(
                "weight_sum must be finite, got {sum}"
            )));
        }
        if let RegressionMethod::Lasso { lambda } = self.method
            && !(lambda.is_finite() && lambda >= 0.0)
        {
            return Err(ReplicaError::InvalidConfig(format!(
                "lambda must be non-negative, got {lambda}"
            )));
        }
        if self.solver.max_iterations == 0 {
            return Err(ReplicaError::InvalidConfig(
                "solver max_iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Coefficients fitted on one window.
#[derive(Debug, Clone)]
pub struct FittedWindow {
    /// Stored weights, one per regressor (rescaled for standardized methods)
    pub weights: Array1<f64>,
    /// Objective value at the optimum, in the space the fit was done in
    pub objective: f64,
    /// Solver iterations (0 for a direct solve)
    pub iterations: usize,
    /// Regressors with zero in-window variance (weight forced to 0.0)
    pub degenerate_columns: Vec<Symbol>,
}

/// Outcome of one rolling window.
#[derive(Debug)]
pub struct WindowFit {
    /// Row range of the window
    pub window: Window,
    /// Date of the first row
    pub start_date: Date,
    /// Date of the last row; the weights are keyed by it
    pub end_date: Date,
    /// Fitted weights or the window's error
    pub outcome: Result<FittedWindow>,
}

impl WindowFit {
    /// Whether the window was fitted.
    pub const fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Result of a rolling estimation: one [`WindowFit`] per window.
#[derive(Debug)]
pub struct RollingEstimate {
    columns: Vec<Symbol>,
    fits: Vec<WindowFit>,
}

impl RollingEstimate {
    /// Regressor names, in weight order.
    pub fn columns(&self) -> &[Symbol] {
        &self.columns
    }

    /// Per-window outcomes, ordered by end date.
    pub fn fits(&self) -> &[WindowFit] {
        &self.fits
    }

    /// Number of windows.
    pub const fn len(&self) -> usize {
        self.fits.len()
    }

    /// Whether there are no windows.
    pub const fn is_empty(&self) -> bool {
        self.fits.is_empty()
    }

    /// End dates and errors of the failed windows.
    pub fn failures(&self) -> Vec<(Date, &ReplicaError)> {
        self.fits
            .iter()
            .filter_map(|fit| fit.outcome.as_ref().err().map(|e| (fit.end_date, e)))
            .collect()
    }

    /// Weight schedule over every window.
    ///
    /// # Errors
    ///
    /// Returns `WindowFailed` for the first window that could not be fitted.
    pub fn into_schedule(self) -> Result<WeightSchedule> {
        let mut dates = Vec::with_capacity(self.fits.len());
        let mut rows = Vec::with_capacity(self.fits.len());
        for fit in self.fits {
            match fit.outcome {
                Ok(fitted) => {
                    dates.push(fit.end_date);
                    rows.push(fitted.weights);
                }
                Err(source) => {
                    return Err(ReplicaError::WindowFailed {
                        end: fit.end_date,
                        source: Box::new(source),
                    });
                }
            }
        }
        stack_schedule(dates, self.columns, &rows)
    }

    /// Weight schedule over the successfully fitted windows only.
    pub fn fitted_schedule(&self) -> Result<WeightSchedule> {
        let (dates, rows): (Vec<Date>, Vec<Array1<f64>>) = self
            .fits
            .iter()
            .filter_map(|fit| {
                fit.outcome
                    .as_ref()
                    .ok()
                    .map(|fitted| (fit.end_date, fitted.weights.clone()))
            })
            .unzip();
        stack_schedule(dates, self.columns.clone(), &rows)
    }
}

fn stack_schedule(
    dates: Vec<Date>,
    columns: Vec<Symbol>,
    rows: &[Array1<f64>],
) -> Result<WeightSchedule> {
    let mut values = Array2::zeros((rows.len(), columns.len()));
    for (mut target, row) in values.axis_iter_mut(Axis(0)).zip(rows) {
        target.assign(row);
    }
    TimeTable::new(dates, columns, values)
}

/// Rolling-window weight estimator.
///
/// # Examples
///
/// ```rust,no_run
/// use replica_regress::{RegressionConfig, RegressionEstimator, RegressionMethod, WeightEstimator};
/// # fn run(target: &replica_traits::TimeSeries, regressors: &replica_traits::TimeTable) -> replica_traits::Result<()> {
/// let estimator = RegressionEstimator::new(RegressionConfig {
///     method: RegressionMethod::Lasso { lambda: 1e-4 },
///     weight_sum: Some(1.0),
///     ..Default::default()
/// });
/// let schedule = estimator.estimate(target, regressors)?.into_schedule()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RegressionEstimator {
    config: RegressionConfig,
}

impl RegressionEstimator {
    /// Create an estimator with the given configuration.
    pub const fn new(config: RegressionConfig) -> Self {
        Self { config }
    }

    /// The estimator's configuration.
    pub const fn config(&self) -> &RegressionConfig {
        &self.config
    }

    fn fit_window(
        &self,
        window: Window,
        target: &TimeSeries,
        regressors: &TimeTable,
        penalty: f64,
    ) -> WindowFit {
        let dates = regressors.dates();
        let outcome = self.fit_rows(window, target, regressors, penalty);
        match &outcome {
            Ok(fitted) => debug!(
                window = window.index,
                end = %dates[window.end],
                iterations = fitted.iterations,
                objective = fitted.objective,
                "fitted window"
            ),
            Err(e) => warn!(window = window.index, end = %dates[window.end], error = %e, "window failed"),
        }
        WindowFit {
            window,
            start_date: dates[window.start],
            end_date: dates[window.end],
            outcome,
        }
    }

    fn fit_rows(
        &self,
        window: Window,
        target: &TimeSeries,
        regressors: &TimeTable,
        penalty: f64,
    ) -> Result<FittedWindow> {
        let rows = s![window.start..=window.end];
        let y = target.values().slice(rows);
        let x = regressors.values().slice(s![window.start..=window.end, ..]);
        if y.iter().chain(x.iter()).any(|v| !v.is_finite()) {
            return Err(ReplicaError::InvalidData(format!(
                "non-finite returns in rows {}..={}",
                window.start, window.end
            )));
        }

        let constraints = self.config.bounds.constraints(self.config.weight_sum);

        if !self.config.method.is_standardized() {
            let solution = solve(
                &Problem {
                    x,
                    y,
                    penalty,
                    constraints,
                },
                &self.config.solver,
            )?;
            return Ok(FittedWindow {
                weights: solution.weights,
                objective: solution.objective,
                iterations: solution.iterations,
                degenerate_columns: Vec::new(),
            });
        }

        // Zero-variance columns stay in the problem as identically zero columns:
        // they take no part in the fit but still count toward bounds and budget.
        let (x_scaled, x_scales) = scale_columns(x);
        let (y_scaled, y_scale) = scale_by_std(y);

        let degenerate_columns: Vec<Symbol> = x_scales
            .iter()
            .zip(regressors.columns())
            .filter(|(scale, _)| !scale.applied)
            .map(|(_, name)| name.clone())
            .collect();
        if !degenerate_columns.is_empty() {
            debug!(
                window = window.index,
                columns = ?degenerate_columns,
                "zero-variance regressors neutralized"
            );
        }

        let solution = solve(
            &Problem {
                x: x_scaled.view(),
                y: y_scaled.view(),
                penalty,
                constraints,
            },
            &self.config.solver,
        )?;

        let weights = solution
            .weights
            .iter()
            .zip(&x_scales)
            .map(|(&z, scale)| {
                if scale.applied {
                    z * y_scale.scale() / scale.std
                } else {
                    0.0
                }
            })
            .collect();

        Ok(FittedWindow {
            weights,
            objective: solution.objective,
            iterations: solution.iterations,
            degenerate_columns,
        })
    }
}

impl WeightEstimator for RegressionEstimator {
    fn estimate(&self, target: &TimeSeries, regressors: &TimeTable) -> Result<RollingEstimate> {
        self.config.validate()?;
        if target.dates() != regressors.dates() {
            return Err(ReplicaError::ShapeMismatch(format!(
                "target {} has {} dates, regressors have {} (indices must match)",
                target.name(),
                target.len(),
                regressors.len()
            )));
        }
        if regressors.n_columns() == 0 {
            return Err(ReplicaError::InvalidData("no regressors".to_string()));
        }

        let n = regressors.len();
        let RegressionConfig {
            sample_length,
            frequency,
            ..
        } = self.config;
        let count = window_count(n, sample_length, frequency);
        if count == 0 {
            return Err(ReplicaError::InsufficientData(format!(
                "{n} rows leave no window of length {sample_length} at frequency {frequency}"
            )));
        }

        let penalty = self.config.method.penalty(n);
        info!(
            method = self.name(),
            windows = count,
            regressors = regressors.n_columns(),
            "estimating rolling weights"
        );

        let windows: Vec<Window> = RollingWindows::new(n, sample_length, frequency).collect();
        let fits: Vec<WindowFit> = if self.config.parallel {
            windows
                .par_iter()
                .map(|&window| self.fit_window(window, target, regressors, penalty))
                .collect()
        } else {
            windows
                .iter()
                .map(|&window| self.fit_window(window, target, regressors, penalty))
                .collect()
        };

        Ok(RollingEstimate {
            columns: regressors.columns().to_vec(),
            fits,
        })
    }

    fn name(&self) -> &str {
        self.config.method.name()
    }
}

fn run(
    target: &TimeSeries,
    regressors: &TimeTable,
    config: RegressionConfig,
) -> Result<WeightSchedule> {
    RegressionEstimator::new(config)
        .estimate(target, regressors)?
        .into_schedule()
}

/// Rolling least squares on raw returns.
pub fn ols_regression(
    target: &TimeSeries,
    regressors: &TimeTable,
    sample_length: usize,
    frequency: usize,
    bounds: WeightBounds,
    weight_sum: Option<f64>,
) -> Result<WeightSchedule> {
    run(
        target,
        regressors,
        RegressionConfig {
            sample_length,
            frequency,
            bounds,
            weight_sum,
            method: RegressionMethod::Ols,
            ..Default::default()
        },
    )
}

/// Rolling least squares on standardized excess returns.
pub fn ols_regression_er(
    target: &TimeSeries,
    regressors: &TimeTable,
    sample_length: usize,
    frequency: usize,
    bounds: WeightBounds,
    weight_sum: Option<f64>,
) -> Result<WeightSchedule> {
    run(
        target,
        regressors,
        RegressionConfig {
            sample_length,
            frequency,
            bounds,
            weight_sum,
            method: RegressionMethod::StandardizedOls,
            ..Default::default()
        },
    )
}

/// Rolling L1-penalized least squares on standardized excess returns.
pub fn lasso_regression_er(
    target: &TimeSeries,
    regressors: &TimeTable,
    sample_length: usize,
    frequency: usize,
    lambda: f64,
    bounds: WeightBounds,
    weight_sum: Option<f64>,
) -> Result<WeightSchedule> {
    run(
        target,
        regressors,
        RegressionConfig {
            sample_length,
            frequency,
            bounds,
            weight_sum,
            method: RegressionMethod::Lasso { lambda },
            ..Default::default()
        },
    )
}
