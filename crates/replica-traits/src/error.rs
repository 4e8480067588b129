//! Error types for the replica toolkit.
//!
//! Every fallible operation in the workspace reports a [`ReplicaError`]. The
//! variants follow how failures propagate: index and shape problems abort a
//! whole transform or simulation, while solver failures are scoped to a single
//! regression window.

use thiserror::Error;

/// The main error type for replica operations.
#[derive(Debug, Error)]
pub enum ReplicaError {
    /// A rate or weight date cannot be placed on the price grid, e.g. it
    /// precedes the first price date needed to forward-fill or simulate.
    #[error("Misaligned index: {0}")]
    MisalignedIndex(String),

    /// Two tables that must share dates or columns do not.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Bounds and budget constraint together admit no solution.
    #[error("Constraint infeasible: {0}")]
    ConstraintInfeasible(String),

    /// The solver hit its iteration cap before meeting its tolerances.
    #[error("Solver did not converge after {iterations} iterations")]
    NotConverged {
        /// Number of iterations performed.
        iterations: usize,
    },

    /// A rolling regression window failed; other windows are unaffected.
    #[error("Window ending {end} failed: {source}")]
    WindowFailed {
        /// End date of the failed window.
        end: chrono::NaiveDate,
        /// The window's error.
        source: Box<ReplicaError>,
    },

    /// Error due to invalid or malformed data.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Error due to an invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error when data is insufficient for the requested operation.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Error when a required column is missing from the data.
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// Error when a date is out of range or invalid.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Error from Polars operations.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases.
    #[error("Error: {0}")]
    Other(String),
}

impl From<String> for ReplicaError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for ReplicaError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

/// A specialized Result type for replica operations.
pub type Result<T> = std::result::Result<T, ReplicaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReplicaError::MisalignedIndex("2020-01-01".to_string());
        assert_eq!(err.to_string(), "Misaligned index: 2020-01-01");

        let err = ReplicaError::NotConverged { iterations: 50 };
        assert_eq!(
            err.to_string(),
            "Solver did not converge after 50 iterations"
        );
    }

    #[test]
    fn test_window_failed_display() {
        let err = ReplicaError::WindowFailed {
            end: chrono::NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
            source: Box::new(ReplicaError::ConstraintInfeasible("sum 5 > 2".to_string())),
        };
        assert_eq!(
            err.to_string(),
            "Window ending 2024-06-28 failed: Constraint infeasible: sum 5 > 2"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_from_str() {
        let err: ReplicaError = "boom".into();
        assert!(matches!(err, ReplicaError::Other(ref s) if s == "boom"));
    }

    #[test]
    fn test_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ReplicaError = io.into();
        assert!(matches!(err, ReplicaError::Io(_)));
    }
}
