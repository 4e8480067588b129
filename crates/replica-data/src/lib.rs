//! Data loading and calendar utilities for replica.
//!
//! - [`CsvSource`] reads date-indexed CSV files into [`TimeTable`]s
//! - [`calendar`] samples tables onto a rebalancing calendar the way the
//!   replication pipeline needs them
//!
//! [`TimeTable`]: replica_traits::TimeTable

pub mod calendar;
pub mod source;

// Re-export main types
pub use calendar::{drop_incomplete_rows, forward_fill, reindex_as_of, union_dates, weekly_calendar};
pub use source::{CsvSource, DAY_FIRST_FORMAT, ISO_FORMAT, parse_date, write_csv, write_csv_to};
