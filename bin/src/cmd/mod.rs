//! CLI subcommand modules.
//!
//! This module contains the implementations for all replica CLI subcommands
//! and the regression options they share.

pub(crate) mod estimate;
pub(crate) mod excess;
pub(crate) mod replicate;
pub(crate) mod track;

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use replica::ReplicationConfig;
use replica_regress::RegressionMethod;

use crate::data::parse_date;

/// Regression method names accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum MethodArg {
    /// Least squares on raw returns
    Ols,
    /// Least squares on volatility-standardized returns
    OlsEr,
    /// Standardized least squares with an L1 penalty (needs --lambda)
    LassoEr,
}

/// Regression overrides; each flag given replaces the configured value.
#[derive(Debug, Clone, Default, Args)]
pub(crate) struct RegressionArgs {
    /// Regression method
    #[arg(short, long, value_enum)]
    pub(crate) method: Option<MethodArg>,

    /// L1 penalty multiplier for lasso-er
    #[arg(long)]
    pub(crate) lambda: Option<f64>,

    /// Periods per window (a window holds one more observation)
    #[arg(long)]
    pub(crate) sample_length: Option<usize>,

    /// Periods between window starts
    #[arg(long)]
    pub(crate) frequency: Option<usize>,

    /// Lower bound on every weight
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) lower: Option<f64>,

    /// Upper bound on every weight
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) upper: Option<f64>,

    /// Required sum of the weights
    #[arg(long, allow_negative_numbers = true, conflicts_with = "no_budget")]
    pub(crate) weight_sum: Option<f64>,

    /// Do not constrain the sum of the weights
    #[arg(long)]
    pub(crate) no_budget: bool,

    /// First calendar date (YYYY-MM-DD)
    #[arg(long)]
    pub(crate) start: Option<String>,

    /// Days between calendar dates
    #[arg(long)]
    pub(crate) step_days: Option<u64>,

    /// Fit windows in parallel
    #[arg(long)]
    pub(crate) parallel: bool,
}

impl RegressionArgs {
    /// Apply the flags given on the command line to `config`.
    pub(crate) fn apply(&self, config: &mut ReplicationConfig) -> Result<()> {
        let regression = &mut config.regression;

        if let Some(method) = self.method {
            regression.method = match method {
                MethodArg::Ols => RegressionMethod::Ols,
                MethodArg::OlsEr => RegressionMethod::StandardizedOls,
                MethodArg::LassoEr => {
                    let Some(lambda) = self.lambda else {
                        bail!("--method lasso-er needs --lambda");
                    };
                    RegressionMethod::Lasso { lambda }
                }
            };
        } else if let Some(lambda) = self.lambda {
            match &mut regression.method {
                RegressionMethod::Lasso { lambda: current } => *current = lambda,
                _ => bail!("--lambda only applies to --method lasso-er"),
            }
        }

        if let Some(sample_length) = self.sample_length {
            regression.sample_length = sample_length;
        }
        if let Some(frequency) = self.frequency {
            regression.frequency = frequency;
        }
        if self.lower.is_some() {
            regression.bounds.lower = self.lower;
        }
        if self.upper.is_some() {
            regression.bounds.upper = self.upper;
        }
        if self.no_budget {
            regression.weight_sum = None;
        } else if self.weight_sum.is_some() {
            regression.weight_sum = self.weight_sum;
        }
        if self.parallel {
            regression.parallel = true;
        }

        if let Some(start) = &self.start {
            config.calendar_start = Some(parse_date(start)?);
        }
        if let Some(step) = self.step_days {
            config.calendar_step_days = step;
        }
        Ok(())
    }
}

/// Load a JSON configuration (or the defaults) and apply command-line overrides.
pub(crate) fn load_config(path: Option<&Path>, overrides: &RegressionArgs) -> Result<ReplicationConfig> {
    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => ReplicationConfig::default(),
    };
    overrides.apply(&mut config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use replica_regress::WeightBounds;

    #[test]
    fn test_defaults_untouched() {
        let config = load_config(None, &RegressionArgs::default()).unwrap();
        assert_eq!(config.regression.weight_sum, Some(1.0));
        assert_eq!(config.regression.bounds, WeightBounds::long_only());
        assert_eq!(config.regression.method, RegressionMethod::Ols);
    }

    #[test]
    fn test_overrides() {
        let args = RegressionArgs {
            method: Some(MethodArg::LassoEr),
            lambda: Some(0.001),
            sample_length: Some(26),
            upper: Some(0.5),
            no_budget: true,
            start: Some("2010-01-04".to_string()),
            ..Default::default()
        };
        let config = load_config(None, &args).unwrap();
        assert_eq!(config.regression.method, RegressionMethod::Lasso { lambda: 0.001 });
        assert_eq!(config.regression.sample_length, 26);
        assert_eq!(config.regression.bounds.upper, Some(0.5));
        assert_eq!(config.regression.bounds.lower, Some(0.0));
        assert_eq!(config.regression.weight_sum, None);
        assert_eq!(
            config.calendar_start,
            chrono::NaiveDate::from_ymd_opt(2010, 1, 4)
        );
    }

    #[test]
    fn test_lasso_needs_lambda() {
        let args = RegressionArgs {
            method: Some(MethodArg::LassoEr),
            ..Default::default()
        };
        assert!(load_config(None, &args).is_err());

        let args = RegressionArgs {
            lambda: Some(0.1),
            ..Default::default()
        };
        assert!(load_config(None, &args).is_err());
    }

    #[test]
    fn test_config_file() {
        let path = std::env::temp_dir().join(format!("replica-cli-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"regression": {"method": {"kind": "standardized_ols"}}}"#).unwrap();
        let config = load_config(Some(&path), &RegressionArgs::default()).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.regression.method, RegressionMethod::StandardizedOls);
        // Unspecified sections keep their defaults
        assert_eq!(config.calendar_step_days, 7);
    }
}
