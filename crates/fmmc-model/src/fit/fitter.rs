//! Default time-series factor model fitter

use super::config::SelectionPolicy;
use super::regression::estimate;
use super::subsets::best_subset;
use super::{FactorModelFitter, FitError, FitRequest, FitResult};
use ndarray::{Array1, Axis};

/// Regression of one asset's returns on factor returns
///
/// Fits only rows where the response and every factor are observed. With
/// [`SelectionPolicy::Subsets`] the subset of at most `max_subset_size`
/// factors with the lowest least-squares BIC is chosen, then refitted with
/// the configured method; factors outside the subset get a `None` beta.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeSeriesFitter;

impl TimeSeriesFitter {
    /// Create the default fitter
    pub const fn new() -> Self {
        Self
    }
}

impl FactorModelFitter for TimeSeriesFitter {
    fn fit(&self, request: &FitRequest<'_>) -> Result<FitResult, FitError> {
        let (n_rows, n_factors) = request.design.dim();
        if request.response.len() != n_rows {
            return Err(FitError::DimensionMismatch {
                expected: n_rows,
                actual: request.response.len(),
            });
        }
        if request.index.len() != n_rows {
            return Err(FitError::DimensionMismatch {
                expected: n_rows,
                actual: request.index.len(),
            });
        }
        if request.factor_names.len() != n_factors {
            return Err(FitError::DimensionMismatch {
                expected: n_factors,
                actual: request.factor_names.len(),
            });
        }

        // Complete observations only
        let rows: Vec<usize> = (0..n_rows)
            .filter(|&t| {
                !request.response[t].is_nan() && request.design.row(t).iter().all(|v| !v.is_nan())
            })
            .collect();
        let y = request.response.select(Axis(0), &rows);
        let x = request.design.select(Axis(0), &rows);

        let selected: Vec<usize> = match request.config.selection {
            SelectionPolicy::None => (0..n_factors).collect(),
            SelectionPolicy::Subsets => {
                let size = request
                    .config
                    .max_subset_size
                    .unwrap_or_else(|| super::default_subset_size(n_factors));
                // Too few rows for even the smallest model
                if rows.len() < size + 2 {
                    return Err(FitError::InsufficientObservations {
                        required: size + 2,
                        actual: rows.len(),
                    });
                }
                best_subset(y.view(), x.view(), size)?
            }
        };

        let x_selected = x.select(Axis(1), &selected);
        let coefficients = estimate(
            y.view(),
            x_selected.view(),
            request.config.method,
            request.config.decay,
        )?;

        let mut beta = vec![None; n_factors];
        for (slot, &column) in selected.iter().enumerate() {
            beta[column] = Some(coefficients.beta[slot]);
        }

        Ok(FitResult {
            alpha: coefficients.alpha,
            beta,
            r_squared: r_squared(&y, &coefficients.residuals),
            residuals: coefficients.residuals,
            residual_index: rows.iter().map(|&t| request.index[t]).collect(),
        })
    }
}

fn r_squared(y: &Array1<f64>, residuals: &Array1<f64>) -> f64 {
    let mean = y.mean().unwrap_or(0.0);
    let total: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let unexplained: f64 = residuals.iter().map(|e| e * e).sum();
    1.0 - unexplained / total
}
