//! Excess-return transform and track simulation for replica.
//!
//! This crate turns weights into value paths:
//! - [`ExcessReturn`] converts total-return prices into excess-return indices
//!   net of a floating financing rate (actual/360 by default)
//! - [`TrackSimulator`] simulates a rebalanced portfolio with transaction costs
//! - [`TrackingReport`] compares a track with the target it replicates
//!
//! # Example
//!
//! ```rust,ignore
//! use replica_track::{make_excess_return, make_track};
//!
//! let track = make_track(&prices, &weights, 0.0)?;
//! let excess = make_excess_return(&prices, &rates)?;
//! ```

pub mod excess;
pub mod metrics;
pub mod track;

// Re-export main types
pub use excess::{ExcessReturn, ExcessReturnConfig, RateUnit, day_count, make_excess_return};
pub use metrics::{ReportConfig, SeriesStats, TrackingReport, max_drawdown};
pub use track::{
    PortfolioState, Rebalance, StepOutcome, TRACK_NAME, TrackConfig, TrackOutput, TrackSimulator,
    make_track,
};
