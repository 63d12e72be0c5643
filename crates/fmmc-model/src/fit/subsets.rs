//! Best-subset variable selection
//!
//! Exhaustively evaluates every subset of one up to `max_size` candidate
//! factors and keeps the one with the lowest Bayesian information criterion,
//! so a larger subset wins only when its fit improves enough to pay for the
//! extra coefficients. Candidate counts in factor models are small, so
//! enumeration is cheap.

use super::FitError;
use super::linalg::{residual_sum_of_squares, weighted_least_squares, with_intercept};
use ndarray::{ArrayView1, ArrayView2, Axis};

/// Column positions of the best subset of at most `max_size` factors
pub(crate) fn best_subset(
    y: ArrayView1<'_, f64>,
    x: ArrayView2<'_, f64>,
    max_size: usize,
) -> Result<Vec<usize>, FitError> {
    let n_factors = x.ncols();
    if max_size == 0 || max_size > n_factors {
        return Err(FitError::InvalidSubsetSize {
            size: max_size,
            n_factors,
        });
    }

    let n = y.len() as f64;
    // Exact fits all land on the floor and the penalty breaks the tie
    let mse_floor = f64::EPSILON * (y.dot(&y) / n).max(f64::MIN_POSITIVE);

    let mut best: Option<(f64, Vec<usize>)> = None;
    for size in 1..=max_size {
        for subset in Combinations::new(n_factors, size) {
            let z = with_intercept(x.select(Axis(1), &subset).view());
            let Some(coefficients) = weighted_least_squares(&z, y, None) else {
                continue;
            };
            let mse = (residual_sum_of_squares(&z, y, &coefficients) / n).max(mse_floor);
            let bic = n * mse.ln() + (size + 1) as f64 * n.ln();
            if best.as_ref().is_none_or(|(best_bic, _)| bic < *best_bic) {
                best = Some((bic, subset));
            }
        }
    }

    best.map(|(_, subset)| subset).ok_or(FitError::Singular)
}

/// Lexicographic k-combinations of `0..n`
#[derive(Debug)]
struct Combinations {
    n: usize,
    current: Option<Vec<usize>>,
}

impl Combinations {
    fn new(n: usize, k: usize) -> Self {
        let current = (k <= n).then(|| (0..k).collect());
        Self { n, current }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let out = self.current.clone()?;
        let k = out.len();

        // Advance to the next combination, or finish
        let mut next = out.clone();
        let pivot = (0..k).rev().find(|&i| next[i] < self.n - k + i);
        self.current = pivot.map(|i| {
            next[i] += 1;
            for j in (i + 1)..k {
                next[j] = next[j - 1] + 1;
            }
            next
        });

        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    #[test]
    fn test_combinations() {
        let all: Vec<_> = Combinations::new(4, 2).collect();
        assert_eq!(
            all,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
        assert_eq!(Combinations::new(5, 5).count(), 1);
        assert_eq!(Combinations::new(6, 3).count(), 20);
    }

    #[test]
    fn test_best_subset_finds_true_driver() {
        let n = 60;
        let x = Array2::from_shape_fn((n, 4), |(t, j)| ((t * (j + 3)) as f64 * 0.31).sin());
        // Only factor 2 drives returns
        let y = Array1::from_shape_fn(n, |t| 0.01 + 1.5 * x[[t, 2]]);

        let subset = best_subset(y.view(), x.view(), 1).unwrap();
        assert_eq!(subset, vec![2]);
        // Extra capacity is not spent on factors that add nothing
        let subset = best_subset(y.view(), x.view(), 3).unwrap();
        assert_eq!(subset, vec![2]);
    }

    #[test]
    fn test_best_subset_grows_for_real_drivers() {
        let n = 80;
        let x = Array2::from_shape_fn((n, 5), |(t, j)| ((t * (j + 2)) as f64 * 0.37).cos());
        let noise = Array1::from_shape_fn(n, |t| 0.05 * ((t * 7) as f64 * 1.13).sin());
        let y = Array1::from_shape_fn(n, |t| 0.8 * x[[t, 1]] - 0.6 * x[[t, 3]] + noise[t]);

        assert_eq!(best_subset(y.view(), x.view(), 2).unwrap(), vec![1, 3]);
        assert_eq!(best_subset(y.view(), x.view(), 5).unwrap().len(), 2);
    }

    #[test]
    fn test_best_subset_rejects_bad_size() {
        let x = Array2::<f64>::zeros((10, 3));
        let y = Array1::<f64>::zeros(10);
        assert!(matches!(
            best_subset(y.view(), x.view(), 0),
            Err(FitError::InvalidSubsetSize { size: 0, .. })
        ));
        assert!(matches!(
            best_subset(y.view(), x.view(), 4),
            Err(FitError::InvalidSubsetSize { size: 4, .. })
        ));
    }
}
