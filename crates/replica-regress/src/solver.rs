//! Constrained least-squares solver.
//!
//! Solves
//!
//! ```text
//! minimize    ||X z - y||^2 + penalty * ||z||_1
//! subject to  lower <= z_j <= upper    for every j
//!             sum(z) = budget          (only when a budget is set)
//! ```
//!
//! with ADMM, splitting `z = u`. The `z`-step minimizes the quadratic term plus
//! the budget equality exactly through its KKT system, using a Cholesky factor
//! of `2 X'X + rho I`. The `u`-step is the proximal operator of the separable
//! L1 + box term: soft-threshold, then clip. `rho` is adapted by residual
//! balancing. Without bounds or penalty the KKT system of `2 X'X` is solved
//! directly, falling back to ADMM when `X'X` is singular.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use replica_traits::{ReplicaError, Result};

/// Relative pivot size below which a matrix is treated as singular.
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Residual ratio that triggers a `rho` update.
const RESIDUAL_BALANCE: f64 = 10.0;

/// Maximum factor by which adaptation may move `rho` away from its start.
const RHO_RANGE: f64 = 1e6;

/// Configuration for the ADMM solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Iteration cap; hitting it is reported as non-convergence
    pub max_iterations: usize,
    /// Absolute tolerance on primal and dual residuals
    pub abs_tolerance: f64,
    /// Relative tolerance on primal and dual residuals
    pub rel_tolerance: f64,
    /// Initial penalty parameter (None = mean diagonal of 2 X'X)
    pub rho: Option<f64>,
    /// Iterations between penalty parameter updates (0 = never)
    pub adapt_interval: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50_000,
            abs_tolerance: 1e-10,
            rel_tolerance: 1e-9,
            rho: None,
            adapt_interval: 10,
        }
    }
}

/// Feasible set of the coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraints {
    /// Lower bound on every coefficient (may be `-inf`)
    pub lower: f64,
    /// Upper bound on every coefficient (may be `+inf`)
    pub upper: f64,
    /// Required sum of the coefficients
    pub budget: Option<f64>,
}

impl Constraints {
    /// No bounds and no budget.
    pub const UNCONSTRAINED: Self = Self {
        lower: f64::NEG_INFINITY,
        upper: f64::INFINITY,
        budget: None,
    };

    const fn is_boxed(&self) -> bool {
        self.lower.is_finite() || self.upper.is_finite()
    }

    /// Check that bounds and budget admit at least one point for `m` coefficients.
    pub fn check_feasible(&self, m: usize) -> Result<()> {
        if self.lower.is_nan() || self.upper.is_nan() || self.lower > self.upper {
            return Err(ReplicaError::ConstraintInfeasible(format!(
                "bounds [{}, {}] are empty",
                self.lower, self.upper
            )));
        }
        if let Some(budget) = self.budget {
            let min_sum = m as f64 * self.lower;
            let max_sum = m as f64 * self.upper;
            if !budget.is_finite() || budget < min_sum || budget > max_sum {
                return Err(ReplicaError::ConstraintInfeasible(format!(
                    "weight sum {budget} outside [{min_sum}, {max_sum}] for {m} weights"
                )));
            }
        }
        Ok(())
    }
}

/// A least-squares problem over one window.
#[derive(Debug, Clone, Copy)]
pub struct Problem<'a> {
    /// Regressors, one row per observation
    pub x: ArrayView2<'a, f64>,
    /// Target observations
    pub y: ArrayView1<'a, f64>,
    /// L1 penalty multiplier (0 for plain least squares)
    pub penalty: f64,
    /// Feasible set
    pub constraints: Constraints,
}

/// Solver output.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Optimal coefficients
    pub weights: Array1<f64>,
    /// Objective value at `weights`
    pub objective: f64,
    /// ADMM iterations used (0 for a direct solve)
    pub iterations: usize,
}

/// Penalized sum of squared residuals `||x z - y||^2 + penalty * ||z||_1`.
pub fn objective(
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
    z: ArrayView1<'_, f64>,
    penalty: f64,
) -> f64 {
    let residuals = x.dot(&z) - y;
    let l1 = if penalty == 0.0 {
        0.0
    } else {
        penalty * z.mapv(f64::abs).sum()
    };
    residuals.dot(&residuals) + l1
}

/// Solve a constrained least-squares problem.
///
/// # Errors
///
/// - `InvalidData` for mismatched dimensions or no coefficients
/// - `ConstraintInfeasible` when bounds and budget exclude every point
/// - `NotConverged` when the iteration cap is reached
pub fn solve(problem: &Problem<'_>, config: &SolverConfig) -> Result<Solution> {
    let (n, m) = problem.x.dim();
    if m == 0 {
        return Err(ReplicaError::InvalidData("no regressors".to_string()));
    }
    if problem.y.len() != n {
        return Err(ReplicaError::InvalidData(format!(
            "{} target observations for {n} regressor rows",
            problem.y.len()
        )));
    }
    if !(problem.penalty.is_finite() && problem.penalty >= 0.0) {
        return Err(ReplicaError::InvalidConfig(format!(
            "penalty must be non-negative, got {}",
            problem.penalty
        )));
    }
    problem.constraints.check_feasible(m)?;

    let gram = 2.0 * problem.x.t().dot(&problem.x);
    let linear = 2.0 * problem.x.t().dot(&problem.y);

    if !problem.constraints.is_boxed()
        && problem.penalty == 0.0
        && let Some(factor) = KktFactor::new(&gram, 0.0)
    {
        let weights = factor.solve(&linear, problem.constraints.budget);
        return Ok(Solution {
            objective: objective(problem.x, problem.y, weights.view(), 0.0),
            weights,
            iterations: 0,
        });
    }

    admm(problem, &gram, &linear, config)
}

fn admm(
    problem: &Problem<'_>,
    gram: &Array2<f64>,
    linear: &Array1<f64>,
    config: &SolverConfig,
) -> Result<Solution> {
    let m = gram.nrows();
    let Constraints {
        lower,
        upper,
        budget,
    } = problem.constraints;
    let root_m = (m as f64).sqrt();

    let rho_start = config
        .rho
        .filter(|r| r.is_finite() && *r > 0.0)
        .unwrap_or_else(|| default_rho(gram));
    let (rho_min, rho_max) = (rho_start / RHO_RANGE, rho_start * RHO_RANGE);
    let mut rho = rho_start;
    let mut factor = refactor(gram, rho)?;

    let mut u = Array1::<f64>::zeros(m).mapv(|v| v.clamp(lower, upper));
    let mut w = Array1::<f64>::zeros(m);

    for iteration in 1..=config.max_iterations {
        let rhs = linear + &((&u - &w) * rho);
        let z = factor.solve(&rhs, budget);

        let threshold = problem.penalty / rho;
        let u_next = (&z + &w).mapv(|v| shrink(v, threshold).clamp(lower, upper));
        w = w + &z - &u_next;

        let primal = norm(&(&z - &u_next));
        let dual = rho * norm(&(&u_next - &u));
        u = u_next;

        let primal_tol = root_m * config.abs_tolerance + config.rel_tolerance * norm(&z).max(norm(&u));
        let dual_tol = root_m * config.abs_tolerance + config.rel_tolerance * rho * norm(&w);

        if primal <= primal_tol && dual <= dual_tol {
            return Ok(Solution {
                objective: objective(problem.x, problem.y, u.view(), problem.penalty),
                weights: u,
                iterations: iteration,
            });
        }

        if config.adapt_interval > 0 && iteration % config.adapt_interval == 0 {
            let target = if primal > RESIDUAL_BALANCE * dual {
                rho * 2.0
            } else if dual > RESIDUAL_BALANCE * primal {
                rho * 0.5
            } else {
                rho
            };
            let next = target.clamp(rho_min, rho_max);
            if next != rho {
                // scaled dual variable follows rho
                w *= rho / next;
                rho = next;
                factor = refactor(gram, rho)?;
            }
        }
    }

    Err(ReplicaError::NotConverged {
        iterations: config.max_iterations,
    })
}

fn default_rho(gram: &Array2<f64>) -> f64 {
    let rho = gram.diag().sum() / gram.nrows() as f64;
    if rho.is_finite() && rho > 0.0 { rho } else { 1.0 }
}

fn refactor(gram: &Array2<f64>, rho: f64) -> Result<KktFactor> {
    KktFactor::new(gram, rho).ok_or_else(|| {
        ReplicaError::InvalidData("regressor Gram matrix is not positive definite".to_string())
    })
}

/// Soft-thresholding operator.
fn shrink(v: f64, threshold: f64) -> f64 {
    if threshold == 0.0 {
        v
    } else {
        v.signum() * (v.abs() - threshold).max(0.0)
    }
}

fn norm(v: &Array1<f64>) -> f64 {
    v.dot(v).sqrt()
}

/// Factorization of `A = gram + rho I` for repeated KKT solves of
/// `A z + nu 1 = b, sum(z) = budget`.
#[derive(Debug, Clone)]
struct KktFactor {
    lower: Array2<f64>,
    /// `A^-1 1`
    ones: Array1<f64>,
    /// `1' A^-1 1`
    ones_dot: f64,
}

impl KktFactor {
    fn new(gram: &Array2<f64>, rho: f64) -> Option<Self> {
        let m = gram.nrows();
        let a = gram + &(Array2::<f64>::eye(m) * rho);
        let lower = cholesky(&a)?;
        let ones = cholesky_solve(&lower, &Array1::ones(m));
        let ones_dot = ones.sum();
        Some(Self {
            lower,
            ones,
            ones_dot,
        })
    }

    fn solve(&self, rhs: &Array1<f64>, budget: Option<f64>) -> Array1<f64> {
        let z = cholesky_solve(&self.lower, rhs);
        match budget {
            None => z,
            Some(budget) => {
                let nu = (z.sum() - budget) / self.ones_dot;
                z - &self.ones * nu
            }
        }
    }
}

/// Lower-triangular Cholesky factor of a symmetric positive definite matrix.
/// Returns `None` when a pivot is not clearly positive.
fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let scale = a
        .diag()
        .iter()
        .fold(0.0_f64, |acc, v| acc.max(v.abs()))
        .max(f64::MIN_POSITIVE);
    let mut l = Array2::<f64>::zeros((n, n));

    for j in 0..n {
        let mut pivot = a[[j, j]];
        for k in 0..j {
            pivot -= l[[j, k]] * l[[j, k]];
        }
        if !(pivot.is_finite() && pivot > PIVOT_TOLERANCE * scale) {
            return None;
        }
        let pivot = pivot.sqrt();
        l[[j, j]] = pivot;

        for i in (j + 1)..n {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = sum / pivot;
        }
    }
    Some(l)
}

/// Solve `L L' x = b` by forward and back substitution.
fn cholesky_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * y[k];
        }
        y[i] = sum / l[[i, i]];
    }

    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = y[i];
        for k in (i + 1)..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }
    x
}
