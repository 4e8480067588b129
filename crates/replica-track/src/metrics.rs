//! Tracking statistics.
//!
//! Descriptive comparison of a replicating track against its target: period
//! returns are taken on the dates both series share, and tracking error is the
//! annualized standard deviation of the return difference.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use replica_traits::stats::{correlation, mean, sample_std};
use replica_traits::{ReplicaError, Result, TimeSeries};

/// Configuration for tracking statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Number of observation periods per year for annualization
    pub periods_per_year: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            periods_per_year: 252,
        }
    }
}

/// Performance of a single value series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesStats {
    /// Total return over the period
    pub total_return: f64,
    /// Annualized (geometric) return
    pub annualized_return: f64,
    /// Annualized volatility of period returns
    pub annualized_volatility: f64,
    /// Maximum peak-to-trough drawdown, as a positive fraction
    pub max_drawdown: f64,
}

impl SeriesStats {
    fn from_levels(levels: &[f64], returns: &Array1<f64>, periods_per_year: f64) -> Self {
        let total_return = match (levels.first(), levels.last()) {
            (Some(first), Some(last)) => last / first - 1.0,
            _ => f64::NAN,
        };
        let n_years = returns.len() as f64 / periods_per_year;
        let annualized_return = if n_years > 0.0 {
            (1.0 + total_return).powf(1.0 / n_years) - 1.0
        } else {
            f64::NAN
        };

        Self {
            total_return,
            annualized_return,
            annualized_volatility: sample_std(returns.view()) * periods_per_year.sqrt(),
            max_drawdown: max_drawdown(levels),
        }
    }
}

/// Comparison of a track against the target it replicates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingReport {
    /// Number of period returns compared
    pub n_obs: usize,
    /// Target statistics
    pub target: SeriesStats,
    /// Track statistics
    pub track: SeriesStats,
    /// Annualized standard deviation of (track - target) returns
    pub tracking_error: f64,
    /// Mean (track - target) return per period
    pub mean_active_return: f64,
    /// Correlation of period returns
    pub correlation: f64,
}

impl TrackingReport {
    /// Compare `track` with `target` on their common dates.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientData` if the series share fewer than three dates.
    pub fn compare(target: &TimeSeries, track: &TimeSeries, config: &ReportConfig) -> Result<Self> {
        let (target_levels, track_levels) = common_levels(target, track);
        if target_levels.len() < 3 {
            return Err(ReplicaError::InsufficientData(format!(
                "{} and {} share {} dates, need at least 3",
                target.name(),
                track.name(),
                target_levels.len()
            )));
        }

        let target_returns = simple_returns(&target_levels);
        let track_returns = simple_returns(&track_levels);
        let active = &track_returns - &target_returns;
        let periods_per_year = config.periods_per_year as f64;

        Ok(Self {
            n_obs: active.len(),
            target: SeriesStats::from_levels(&target_levels, &target_returns, periods_per_year),
            track: SeriesStats::from_levels(&track_levels, &track_returns, periods_per_year),
            tracking_error: sample_std(active.view()) * periods_per_year.sqrt(),
            mean_active_return: mean(active.view()),
            correlation: correlation(target_returns.view(), track_returns.view()),
        })
    }
}

fn common_levels(a: &TimeSeries, b: &TimeSeries) -> (Vec<f64>, Vec<f64>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a.dates()[i].cmp(&b.dates()[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                left.push(a.values()[i]);
                right.push(b.values()[j]);
                i += 1;
                j += 1;
            }
        }
    }
    (left, right)
}

fn simple_returns(levels: &[f64]) -> Array1<f64> {
    levels.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Maximum drawdown of a level series, as a positive fraction of the peak.
pub fn max_drawdown(levels: &[f64]) -> f64 {
    let mut max_dd = 0.0;
    let mut peak = f64::NEG_INFINITY;

    for &level in levels {
        if level > peak {
            peak = level;
        }
        if peak > 0.0 {
            let dd = (peak - level) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use replica_traits::Date;

    fn dates(n: u32) -> Vec<Date> {
        (1..=n)
            .map(|d| Date::from_ymd_opt(2024, 5, d).unwrap())
            .collect()
    }

    #[test]
    fn test_report_config_default() {
        assert_eq!(ReportConfig::default().periods_per_year, 252);
    }

    #[test]
    fn test_identical_series() {
        let series =
            TimeSeries::new("x", dates(5), array![1.0, 1.01, 0.99, 1.02, 1.03]).unwrap();
        let report =
            TrackingReport::compare(&series, &series, &ReportConfig::default()).unwrap();

        assert_eq!(report.n_obs, 4);
        assert_abs_diff_eq!(report.tracking_error, 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(report.correlation, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(report.target.total_return, 0.03, epsilon = 1e-12);
        assert_abs_diff_eq!(report.track.max_drawdown, 0.02 / 1.01, epsilon = 1e-12);
    }

    #[test]
    fn test_compare_uses_common_dates() {
        let target = TimeSeries::new("t", dates(4), array![1.0, 1.1, 1.0, 1.2]).unwrap();
        let track = TimeSeries::new(
            "r",
            vec![dates(4)[0], dates(4)[1], dates(4)[3]],
            array![1.0, 1.1, 1.2],
        )
        .unwrap();
        let report = TrackingReport::compare(&target, &track, &ReportConfig::default()).unwrap();
        assert_eq!(report.n_obs, 2);
        assert_abs_diff_eq!(report.mean_active_return, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_compare_needs_overlap() {
        let a = TimeSeries::new("a", dates(2), array![1.0, 1.1]).unwrap();
        let result = TrackingReport::compare(&a, &a, &ReportConfig::default());
        assert!(matches!(result, Err(ReplicaError::InsufficientData(_))));
    }

    #[test]
    fn test_max_drawdown() {
        assert_abs_diff_eq!(max_drawdown(&[1.0, 1.2, 0.9, 1.3]), 0.25, epsilon = 1e-12);
        assert_eq!(max_drawdown(&[1.0, 1.1, 1.2]), 0.0);
    }
}
