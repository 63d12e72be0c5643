//! Single-equation regression estimators
//!
//! Fits `y = alpha + X beta + e` for one asset with LS, DLS or Huber robust
//! regression. Residuals are always reported unweighted.

use super::FitError;
use super::config::FitMethod;
use super::linalg::{weighted_least_squares, with_intercept};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Huber tuning constant (95% efficiency under normal errors)
const HUBER_K: f64 = 1.345;

/// Consistency constant turning the MAD into a normal scale estimate
const MAD_SCALE: f64 = 0.6745;

/// Maximum IRLS iterations for the robust fit
const MAX_ITERATIONS: usize = 50;

/// Relative coefficient change at which IRLS stops
const CONVERGENCE_TOLERANCE: f64 = 1e-8;

/// Estimated coefficients and residuals
#[derive(Debug, Clone)]
pub(crate) struct Coefficients {
    pub(crate) alpha: f64,
    pub(crate) beta: Array1<f64>,
    pub(crate) residuals: Array1<f64>,
}

/// Fit with the requested method
pub(crate) fn estimate(
    y: ArrayView1<'_, f64>,
    x: ArrayView2<'_, f64>,
    method: FitMethod,
    decay: f64,
) -> Result<Coefficients, FitError> {
    let n = y.len();
    let required = x.ncols() + 2;
    if n < required {
        return Err(FitError::InsufficientObservations {
            required,
            actual: n,
        });
    }

    let z = with_intercept(x);
    let coefficients = match method {
        FitMethod::Ls => weighted_least_squares(&z, y, None).ok_or(FitError::Singular)?,
        FitMethod::Dls => {
            if !(decay > 0.0 && decay <= 1.0) {
                return Err(FitError::InvalidDecay(decay));
            }
            let weights = discount_weights(n, decay);
            weighted_least_squares(&z, y, Some(&weights)).ok_or(FitError::Singular)?
        }
        FitMethod::Robust => huber_irls(&z, y)?,
    };

    let residuals = &y - &z.dot(&coefficients);
    Ok(Coefficients {
        alpha: coefficients[0],
        beta: coefficients.slice(ndarray::s![1..]).to_owned(),
        residuals,
    })
}

/// Weights `decay^(n-1-t)`: the most recent observation has weight one
pub(crate) fn discount_weights(n: usize, decay: f64) -> Array1<f64> {
    Array1::from_iter((0..n).map(|t| decay.powi((n - 1 - t) as i32)))
}

/// Huber M-estimator by iteratively reweighted least squares
fn huber_irls(z: &Array2<f64>, y: ArrayView1<'_, f64>) -> Result<Array1<f64>, FitError> {
    let mut coefficients = weighted_least_squares(z, y, None).ok_or(FitError::Singular)?;

    for iteration in 0..MAX_ITERATIONS {
        let residuals = &y - &z.dot(&coefficients);
        let scale = median_absolute_deviation(&residuals) / MAD_SCALE;
        if scale <= f64::EPSILON {
            // Exact fit on at least half of the sample
            break;
        }

        let weights = residuals.mapv(|r| {
            let u = (r / scale).abs();
            if u <= HUBER_K { 1.0 } else { HUBER_K / u }
        });
        let updated = weighted_least_squares(z, y, Some(&weights)).ok_or(FitError::Singular)?;

        let change = (&updated - &coefficients)
            .iter()
            .fold(0.0_f64, |m, d| m.max(d.abs()));
        let size = coefficients.iter().fold(0.0_f64, |m, c| m.max(c.abs()));
        coefficients = updated;

        if change <= CONVERGENCE_TOLERANCE * (1.0 + size) {
            tracing::trace!("Huber IRLS converged after {} iterations", iteration + 1);
            break;
        }
    }

    Ok(coefficients)
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let n = values.len();
    if n == 0 {
        0.0
    } else if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    }
}

fn median_absolute_deviation(values: &Array1<f64>) -> f64 {
    let mut buf = values.to_vec();
    let center = median(&mut buf);
    let mut deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&mut deviations)
}
