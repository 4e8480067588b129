//! Statistical helpers shared by the estimators and reports.
//!
//! Scaling here divides by the sample standard deviation without removing the
//! mean: a regression on scaled columns keeps its zero intercept, and the
//! coefficients map back to original units by a plain ratio of deviations.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Deviation at or below which a column counts as constant. Such columns are
/// not scaled: [`scale_by_std`] neutralizes them to zeros and the estimators
/// store a zero weight for them.
pub const MIN_STD_THRESHOLD: f64 = 1e-10;

/// Sample standard deviation (N-1 denominator). NaN for fewer than two values.
pub fn sample_std(values: ArrayView1<'_, f64>) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let mean = values.sum() / n as f64;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    variance.sqrt()
}

/// Arithmetic mean. NaN for an empty input.
pub fn mean(values: ArrayView1<'_, f64>) -> f64 {
    if values.is_empty() {
        f64::NAN
    } else {
        values.sum() / values.len() as f64
    }
}

/// Pearson correlation of two equally long slices. NaN when either side is
/// constant or the inputs are shorter than two observations.
pub fn correlation(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return f64::NAN;
    }
    let a = a.slice(ndarray::s![..n]);
    let b = b.slice(ndarray::s![..n]);
    let mean_a = mean(a);
    let mean_b = mean(b);

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a == 0.0 || var_b == 0.0 {
        f64::NAN
    } else {
        cov / (var_a * var_b).sqrt()
    }
}

/// Result of scaling a single vector by its standard deviation.
#[derive(Debug, Clone, Copy)]
pub struct ScaleResult {
    /// The computed sample standard deviation.
    pub std: f64,
    /// Whether the scaling was applied (false if variance was too low).
    pub applied: bool,
}

impl ScaleResult {
    /// Divisor used for the scaling: the deviation when applied, otherwise a
    /// neutral 1.0.
    pub const fn scale(&self) -> f64 {
        if self.applied { self.std } else { 1.0 }
    }
}

/// Divide a vector by its sample standard deviation.
///
/// A (near) constant vector cannot be scaled; it is returned as zeros with
/// `applied = false`.
pub fn scale_by_std(values: ArrayView1<'_, f64>) -> (Array1<f64>, ScaleResult) {
    let std = sample_std(values);
    let applied = std.is_finite() && std > MIN_STD_THRESHOLD;
    let scaled = if applied {
        values.mapv(|x| x / std)
    } else {
        Array1::zeros(values.len())
    };
    (scaled, ScaleResult { std, applied })
}

/// Column-wise [`scale_by_std`].
///
/// Returns the scaled matrix and one [`ScaleResult`] per column. Degenerate
/// columns become identically zero.
pub fn scale_columns(x: ArrayView2<'_, f64>) -> (Array2<f64>, Vec<ScaleResult>) {
    let mut scaled = Array2::zeros(x.raw_dim());
    let mut results = Vec::with_capacity(x.ncols());
    for (j, column) in x.axis_iter(Axis(1)).enumerate() {
        let (values, result) = scale_by_std(column);
        scaled.column_mut(j).assign(&values);
        results.push(result);
    }
    (scaled, results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_sample_std() {
        let values = array![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_abs_diff_eq!(sample_std(values.view()), 2.5_f64.sqrt(), epsilon = 1e-12);
        assert!(sample_std(array![1.0].view()).is_nan());
    }

    #[test]
    fn test_scale_by_std_does_not_demean() {
        let values = array![2.0, 4.0, 6.0];
        let (scaled, result) = scale_by_std(values.view());

        assert!(result.applied);
        assert_abs_diff_eq!(result.std, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(scaled[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(scaled[2], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sample_std(scaled.view()), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_near_constant_values_are_neutralized() {
        let values = array![0.01, 0.01 + 1e-12, 0.01];
        let (scaled, result) = scale_by_std(values.view());
        assert!(result.std <= MIN_STD_THRESHOLD);
        assert!(!result.applied);
        assert_eq!(result.scale(), 1.0);
        assert!(scaled.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_scale_constant_values() {
        let values = array![5.0, 5.0, 5.0, 5.0];
        let (scaled, result) = scale_by_std(values.view());

        assert!(!result.applied);
        assert_eq!(result.scale(), 1.0);
        assert!(scaled.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_scale_columns_neutralizes_degenerate_column() {
        let x = array![[1.0, 3.0], [2.0, 3.0], [3.0, 3.0]];
        let (scaled, results) = scale_columns(x.view());

        assert!(results[0].applied);
        assert!(!results[1].applied);
        assert_abs_diff_eq!(scaled[[2, 0]], 3.0, epsilon = 1e-12);
        assert!(scaled.column(1).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_min_std_threshold() {
        let values = array![1.0, 1.0 + 1e-12, 1.0 - 1e-12, 1.0 + 2e-12];
        let (_, result) = scale_by_std(values.view());
        assert!(!result.applied);
    }

    #[test]
    fn test_correlation() {
        let a = array![1.0, 2.0, 3.0, 4.0];
        let b = array![2.0, 4.0, 6.0, 8.0];
        let c = array![4.0, 3.0, 2.0, 1.0];
        assert_abs_diff_eq!(correlation(a.view(), b.view()), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(correlation(a.view(), c.view()), -1.0, epsilon = 1e-12);
        assert!(correlation(a.view(), array![1.0, 1.0, 1.0, 1.0].view()).is_nan());
    }
}
