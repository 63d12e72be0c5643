//! Dense linear algebra for small regressions
//!
//! Factor models have a handful of regressors, so normal equations solved by
//! Gaussian elimination with partial pivoting are accurate enough and keep
//! the crate free of a LAPACK dependency.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, s};

/// Relative pivot threshold below which a system is treated as singular
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Prepend an intercept column of ones
pub(crate) fn with_intercept(x: ArrayView2<'_, f64>) -> Array2<f64> {
    let mut z = Array2::<f64>::ones((x.nrows(), x.ncols() + 1));
    z.slice_mut(s![.., 1..]).assign(&x);
    z
}

/// Solve `A x = b` for square `A`
///
/// Returns `None` when `A` is (numerically) singular.
pub(crate) fn solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n == 0 || a.ncols() != n || b.len() != n {
        return None;
    }

    let scale = a.diag().iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return None;
    }

    let mut m = a.clone();
    let mut rhs = b.clone();

    for col in 0..n {
        // Partial pivoting
        let pivot_row = (col..n)
            .max_by(|&i, &j| m[[i, col]].abs().total_cmp(&m[[j, col]].abs()))
            .unwrap_or(col);
        if m[[pivot_row, col]].abs() <= PIVOT_TOLERANCE * scale {
            return None;
        }
        if pivot_row != col {
            for k in 0..n {
                m.swap([col, k], [pivot_row, k]);
            }
            rhs.swap(col, pivot_row);
        }

        let pivot = m[[col, col]];
        for row in (col + 1)..n {
            let factor = m[[row, col]] / pivot;
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                m[[row, k]] -= factor * m[[col, k]];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    // Back substitution
    let mut x = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| m[[row, k]] * x[k]).sum();
        x[row] = (rhs[row] - tail) / m[[row, row]];
    }

    x.iter().all(|v| v.is_finite()).then_some(x)
}

/// Weighted least squares coefficients for design `z` (intercept included)
///
/// Solves `(Z' W Z) b = Z' W y`. `None` signals a singular design.
pub(crate) fn weighted_least_squares(
    z: &Array2<f64>,
    y: ArrayView1<'_, f64>,
    weights: Option<&Array1<f64>>,
) -> Option<Array1<f64>> {
    let zw = match weights {
        Some(w) => z * &w.view().insert_axis(Axis(1)),
        None => z.clone(),
    };
    let gram = zw.t().dot(z);
    let moment = zw.t().dot(&y);
    solve(&gram, &moment)
}

/// Residual sum of squares of `y - z b`
pub(crate) fn residual_sum_of_squares(
    z: &Array2<f64>,
    y: ArrayView1<'_, f64>,
    coefficients: &Array1<f64>,
) -> f64 {
    let fitted = z.dot(coefficients);
    y.iter()
        .zip(fitted.iter())
        .map(|(yi, fi)| (yi - fi).powi(2))
        .sum()
}
