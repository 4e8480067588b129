#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/replica/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! # replica
//!
//! replica is an umbrella crate that re-exports all replica sub-crates and
//! adds the end-to-end [`Replication`] pipeline on top of them.
//!
//! ## Crate Organization
//!
//! - [`traits`] - Tables, series, errors ([`TimeTable`], [`ReplicaError`])
//! - [`track`] - Excess-return transform and track simulation
//! - [`regress`] - Rolling constrained regression ([`WeightEstimator`])
//! - [`data`] - CSV ingestion and calendar alignment
//!
//! ## Architecture
//!
//! 1. **Data** is loaded into date-indexed tables and sampled onto a calendar
//! 2. **Estimators** fit one weight vector per rolling window
//! 3. **Simulators** turn a weight schedule into a portfolio value path
//! 4. **Transforms** express that path in excess of a financing rate

/// Version information for the replica crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod pipeline;

pub use pipeline::{
    EXCESS_TRACK_NAME, Replication, ReplicationConfig, ReplicationResult, WindowFailure,
};

// ============================================================================
// Core Types
// ============================================================================

/// Core types for replica.
///
/// - [`TimeTable`] - Dense date-indexed table (prices, weights, excess returns)
/// - [`TimeSeries`] - Single date-indexed series (rates, tracks)
/// - [`ReplicaError`] - Error type shared by every crate
pub mod traits {
    pub use replica_traits::*;
}

// Re-export core types at top level for convenience
pub use replica_traits::{
    Date, PriceTable, RateSeries, ReplicaError, Result, Symbol, TimeSeries, TimeTable, Track,
    WeightSchedule,
};

// ============================================================================
// Track Simulation
// ============================================================================

/// Excess-return transform and track simulation.
///
/// ```text
/// excess[t] = excess[t-1] * (p[t] / p[t-1] - rate[t-1] * days(t-1, t) / 360)
/// ```
///
/// # Example
///
/// ```ignore
/// use replica::track::{make_excess_return, make_track};
///
/// let track = make_track(&prices, &weights, 0.0005)?;
/// let excess = make_excess_return(&prices, &rates)?;
/// ```
pub mod track {
    pub use replica_track::*;
}

pub use replica_track::{ExcessReturn, TrackSimulator, TrackingReport};

// ============================================================================
// Weight Estimation
// ============================================================================

/// Rolling-window weight estimation.
///
/// ## Available Methods
///
/// - **Ols**: least squares on raw returns
/// - **StandardizedOls**: least squares on returns divided by their window
///   volatility
/// - **Lasso**: standardized, with an L1 penalty
///
/// # Example
///
/// ```ignore
/// use replica::regress::{WeightBounds, lasso_regression_er};
///
/// let weights = lasso_regression_er(&target, &regressors, 52, 13, 1e-4, WeightBounds::long_only(), None)?;
/// ```
pub mod regress {
    pub use replica_regress::*;
}

pub use replica_regress::{RegressionEstimator, WeightEstimator};

// ============================================================================
// Data
// ============================================================================

/// CSV ingestion and calendar alignment.
pub mod data {
    pub use replica_data::*;
}

// ============================================================================
// Prelude
// ============================================================================

/// Prelude module for convenient imports.
///
/// ```ignore
/// use replica::prelude::*;
/// ```
pub mod prelude {
    pub use crate::traits::*;
    pub use crate::{Replication, ReplicationConfig, ReplicationResult};
    pub use replica_regress::{
        RegressionConfig, RegressionEstimator, RegressionMethod, WeightBounds, WeightEstimator,
    };
    pub use replica_track::{
        ExcessReturn, ExcessReturnConfig, RateUnit, TrackConfig, TrackSimulator, TrackingReport,
    };
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert!(parts.len() >= 2, "Version should have at least major.minor");
    }

    #[test]
    fn test_re_exports() {
        fn _accept_estimator(_estimator: &dyn WeightEstimator) {}
        _accept_estimator(&RegressionEstimator::default());
    }

    #[test]
    fn test_error_types() {
        let _result: Result<()> = Ok(());
        let _error: ReplicaError = ReplicaError::InvalidData("test".to_string());
    }
}
