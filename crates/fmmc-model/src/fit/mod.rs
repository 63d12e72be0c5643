//! Time-series factor model fitting
//!
//! The engine only needs per-asset alpha, beta and residuals, so fitting sits
//! behind the [`FactorModelFitter`] trait. [`TimeSeriesFitter`] is the default
//! implementation.

pub mod config;
pub mod fitter;
mod linalg;
mod regression;
mod subsets;

pub use config::{FitConfig, FitMethod, SelectionPolicy, default_subset_size};
pub use fitter::TimeSeriesFitter;

use crate::series::Ordinal;
use ndarray::{Array1, ArrayView1, ArrayView2};
use thiserror::Error;

/// Errors raised by a factor model fit
#[derive(Debug, Error)]
pub enum FitError {
    /// Too few complete observations for the number of parameters
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientObservations {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// Normal equations are singular
    #[error("Design matrix is singular")]
    Singular,

    /// Subset size outside `1..=K`
    #[error("Invalid subset size {size} for {n_factors} factors")]
    InvalidSubsetSize {
        /// Requested subset size
        size: usize,
        /// Number of candidate factors
        n_factors: usize,
    },

    /// DLS decay outside `(0, 1]`
    #[error("Invalid decay parameter: {0} (must be in (0, 1])")]
    InvalidDecay(f64),

    /// Request arrays disagree in shape
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },
}

/// Aligned data for fitting one asset
///
/// `response` and `design` share the row layout of `index`. Rows where the
/// response or any factor is missing are skipped by the fitter.
#[derive(Debug, Clone, Copy)]
pub struct FitRequest<'a> {
    /// Asset name
    pub asset: &'a str,
    /// Candidate factor names, one per design column
    pub factor_names: &'a [String],
    /// Asset returns (`NaN` where missing)
    pub response: ArrayView1<'a, f64>,
    /// Factor returns (T x K)
    pub design: ArrayView2<'a, f64>,
    /// Row keys
    pub index: &'a [Ordinal],
    /// Resolved configuration
    pub config: &'a FitConfig,
}

/// Fitted single-asset factor model
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    /// Intercept
    pub alpha: f64,
    /// One coefficient per candidate factor; `None` when not selected
    pub beta: Vec<Option<f64>>,
    /// Residuals over the fitting sample
    pub residuals: Array1<f64>,
    /// Keys of the fitting sample
    pub residual_index: Vec<Ordinal>,
    /// Coefficient of determination
    pub r_squared: f64,
}

impl FitResult {
    /// Number of observations used in the fit
    pub fn n_obs(&self) -> usize {
        self.residuals.len()
    }

    /// Whether any candidate factor was dropped
    pub fn has_dropped_factors(&self) -> bool {
        self.beta.iter().any(Option::is_none)
    }
}

/// Fits one asset's returns on a set of factors
pub trait FactorModelFitter: Send + Sync {
    /// Fit the model described by `request`
    fn fit(&self, request: &FitRequest<'_>) -> Result<FitResult, FitError>;
}

impl<F: FactorModelFitter + ?Sized> FactorModelFitter for &F {
    fn fit(&self, request: &FitRequest<'_>) -> Result<FitResult, FitError> {
        (**self).fit(request)
    }
}
