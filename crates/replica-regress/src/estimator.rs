//! Core trait definition for weight estimators.

use replica_traits::{Result, TimeSeries, TimeTable};

use crate::regression::RollingEstimate;

/// Estimates a replicating weight schedule from return histories.
///
/// Implementors fit one set of weights per rolling window. All implementations
/// must be thread-safe (Send + Sync) so estimators can be shared across the
/// rayon pool.
///
/// # Examples
///
/// ```rust,no_run
/// use replica_regress::{RollingEstimate, WeightEstimator};
/// use replica_traits::{TimeSeries, TimeTable};
///
/// struct Fixed;
///
/// impl WeightEstimator for Fixed {
///     fn estimate(&self, _target: &TimeSeries, _regressors: &TimeTable) -> replica_traits::Result<RollingEstimate> {
///         Err(replica_traits::ReplicaError::Other("not implemented".into()))
///     }
///
///     fn name(&self) -> &str {
///         "fixed"
///     }
/// }
/// ```
pub trait WeightEstimator: Send + Sync {
    /// Fit weights of `regressors` that track `target`, one set per window.
    ///
    /// # Arguments
    ///
    /// * `target` - Returns of the series to replicate
    /// * `regressors` - Returns of the replicating instruments, on the same dates
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Target and regressors do not share a date index
    /// - The configuration is invalid
    /// - The series is too short for a single window
    ///
    /// Failures of individual windows are reported inside the returned
    /// [`RollingEstimate`], not as an error.
    fn estimate(&self, target: &TimeSeries, regressors: &TimeTable) -> Result<RollingEstimate>;

    /// Name of this estimation method.
    fn name(&self) -> &str;
}
