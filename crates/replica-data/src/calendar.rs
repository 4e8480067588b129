//! Calendar alignment.
//!
//! Daily prices are sampled onto a periodic rebalancing calendar before
//! returns are taken, and back onto a merged daily grid for simulation. Every
//! sampling here is "as of": a calendar date takes the last row dated on or
//! before it, never a later one.

use chrono::Days;
use ndarray::Axis;
use tracing::debug;

use replica_traits::{Date, ReplicaError, Result, TimeTable};

/// Carry the last finite value of each column forward over NaN cells.
///
/// Leading NaNs stay NaN.
pub fn forward_fill(table: &TimeTable) -> Result<TimeTable> {
    let mut values = table.values().clone();
    for mut column in values.axis_iter_mut(Axis(1)) {
        let mut last = f64::NAN;
        for value in column.iter_mut() {
            if value.is_finite() {
                last = *value;
            } else {
                *value = last;
            }
        }
    }
    TimeTable::new(table.dates().to_vec(), table.columns().to_vec(), values)
}

/// Dates from `start` to `end` inclusive, every `step_days` calendar days.
pub fn weekly_calendar(start: Date, end: Date, step_days: u64) -> Result<Vec<Date>> {
    if step_days == 0 {
        return Err(ReplicaError::InvalidConfig(
            "calendar step must be at least one day".to_string(),
        ));
    }
    let step = Days::new(step_days);
    Ok(std::iter::successors(Some(start), |d| d.checked_add_days(step))
        .take_while(|d| *d <= end)
        .collect())
}

/// Sample `table` onto `calendar`: each calendar date takes the last row
/// dated on or before it.
///
/// Calendar dates before the first row are dropped.
///
/// # Errors
///
/// Returns `InvalidData` if `calendar` is not strictly increasing.
pub fn reindex_as_of(table: &TimeTable, calendar: &[Date]) -> Result<TimeTable> {
    let dates = table.dates();
    let mut kept = Vec::with_capacity(calendar.len());
    let mut rows = Vec::with_capacity(calendar.len());
    for &date in calendar {
        let end = dates.partition_point(|d| *d <= date);
        if end > 0 {
            kept.push(date);
            rows.push(end - 1);
        }
    }
    let dropped = calendar.len() - kept.len();
    if dropped > 0 {
        debug!(dropped, "calendar dates before first observation");
    }
    TimeTable::new(kept, table.columns().to_vec(), table.values().select(Axis(0), &rows))
}

/// Drop every row holding a non-finite value.
pub fn drop_incomplete_rows(table: &TimeTable) -> Result<TimeTable> {
    let rows: Vec<usize> = (0..table.len())
        .filter(|&i| table.row(i).iter().all(|v| v.is_finite()))
        .collect();
    if rows.len() < table.len() {
        debug!(dropped = table.len() - rows.len(), "dropped incomplete rows");
    }
    table.select_rows(&rows)
}

/// Sorted union of two strictly increasing date grids.
pub fn union_dates(a: &[Date], b: &[Date]) -> Vec<Date> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                merged.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                merged.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                merged.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    merged.extend_from_slice(&a[i..]);
    merged.extend_from_slice(&b[j..]);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd_opt(y, m, d).unwrap()
    }

    fn daily() -> TimeTable {
        TimeTable::from_columns(
            vec![
                date(2024, 1, 2),
                date(2024, 1, 3),
                date(2024, 1, 5),
                date(2024, 1, 8),
                date(2024, 1, 9),
            ],
            vec![
                ("A".to_string(), vec![1.0, 2.0, 3.0, 4.0, 5.0]),
                ("B".to_string(), vec![f64::NAN, 20.0, f64::NAN, 40.0, f64::NAN]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_forward_fill() {
        let filled = forward_fill(&daily()).unwrap();
        let b = filled.column("B").unwrap();
        assert!(b[0].is_nan());
        assert_abs_diff_eq!(b[2], 20.0);
        assert_abs_diff_eq!(b[4], 40.0);
        assert_eq!(filled.column("A").unwrap(), daily().column("A").unwrap());
    }

    #[test]
    fn test_weekly_calendar() {
        let calendar = weekly_calendar(date(2024, 1, 1), date(2024, 1, 29), 7).unwrap();
        assert_eq!(calendar.len(), 5);
        assert_eq!(calendar[4], date(2024, 1, 29));
        assert!(weekly_calendar(date(2024, 1, 1), date(2024, 1, 2), 0).is_err());
        assert!(
            weekly_calendar(date(2024, 2, 1), date(2024, 1, 1), 7)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_reindex_as_of() {
        let calendar = [date(2024, 1, 1), date(2024, 1, 4), date(2024, 1, 8)];
        let sampled = reindex_as_of(&daily(), &calendar).unwrap();

        // Jan 1 precedes the data and is dropped; Jan 4 takes Jan 3.
        assert_eq!(sampled.dates(), &[date(2024, 1, 4), date(2024, 1, 8)]);
        assert_abs_diff_eq!(sampled.values()[[0, 0]], 2.0);
        assert_abs_diff_eq!(sampled.values()[[1, 0]], 4.0);
    }

    #[test]
    fn test_drop_incomplete_rows() {
        let complete = drop_incomplete_rows(&daily()).unwrap();
        assert_eq!(complete.dates(), &[date(2024, 1, 3), date(2024, 1, 8)]);
    }

    #[test]
    fn test_union_dates() {
        let a = [date(2024, 1, 1), date(2024, 1, 3), date(2024, 1, 5)];
        let b = [date(2024, 1, 2), date(2024, 1, 3), date(2024, 1, 9)];
        assert_eq!(
            union_dates(&a, &b),
            vec![
                date(2024, 1, 1),
                date(2024, 1, 2),
                date(2024, 1, 3),
                date(2024, 1, 5),
                date(2024, 1, 9)
            ]
        );
        assert_eq!(union_dates(&a, &[]), a.to_vec());
    }
}
