//! Rolling-window weight estimation for replica.
//!
//! This crate fits the weights of a replicating portfolio by regressing the
//! returns of a target on the returns of its constituents over rolling
//! windows. Every fit is a constrained least-squares problem (per-weight
//! bounds, optional budget, optional L1 penalty) solved by ADMM.
//!
//! # Examples
//!
//! ```rust,no_run
//! use replica_regress::{WeightBounds, ols_regression};
//! # fn run(target: &replica_traits::TimeSeries, regressors: &replica_traits::TimeTable) -> replica_traits::Result<()> {
//! // One year of weekly returns, re-fitted every quarter, long-only and fully invested
//! let weights = ols_regression(target, regressors, 52, 13, WeightBounds::long_only(), Some(1.0))?;
//! # Ok(())
//! # }
//! ```

mod estimator;
mod regression;
pub mod solver;
pub mod window;

// Re-export main types
pub use estimator::WeightEstimator;
pub use regression::{
    FittedWindow, RegressionConfig, RegressionEstimator, RegressionMethod, RollingEstimate,
    WeightBounds, WindowFit, lasso_regression_er, ols_regression, ols_regression_er,
};
pub use solver::{Constraints, Problem, Solution, SolverConfig, objective, solve};
pub use window::{RollingWindows, Window, window_count};
