#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/replica/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

//! Core types for the replica index replication toolkit.
//!
//! This crate provides the date-indexed containers every other replica crate
//! exchanges (price tables, rate series, weight schedules, tracks), the shared
//! error type, and the statistics used for column standardization.

/// The version of the replica-traits crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Module declarations
pub mod error;
pub mod stats;
pub mod types;

// Re-exports
pub use error::{ReplicaError, Result};
pub use types::{
    DATE_COLUMN, Date, ExcessReturnTable, PriceTable, RateSeries, Symbol, TimeSeries, TimeTable,
    Track, WeightSchedule,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }
}
