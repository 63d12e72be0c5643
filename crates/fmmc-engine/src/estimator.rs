//! Risk and performance estimators
//!
//! An [`Estimator`] maps a return series to one or more numbers. Estimators
//! are plain values passed where they are needed; any closure with the
//! signature `Fn(&Array1<f64>) -> Result<Array1<f64>, EstimatorError>` is one.
//!
//! The built-in tail measures follow the historical-simulation convention and
//! report losses as positive numbers.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised by an estimator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimatorError {
    /// Not enough observations
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// Invalid estimator parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Estimator-specific failure
    #[error("Estimator failed: {0}")]
    Failed(String),
}

/// Maps a return series to a statistic vector
pub trait Estimator: Send + Sync {
    /// Evaluate on `returns`
    fn estimate(&self, returns: &Array1<f64>) -> Result<Array1<f64>, EstimatorError>;

    /// Labels for the `width` output values
    fn labels(&self, width: usize) -> Vec<String> {
        default_labels(width)
    }
}

impl<F> Estimator for F
where
    F: Fn(&Array1<f64>) -> Result<Array1<f64>, EstimatorError> + Send + Sync,
{
    fn estimate(&self, returns: &Array1<f64>) -> Result<Array1<f64>, EstimatorError> {
        self(returns)
    }
}

impl fmt::Debug for dyn Estimator + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Estimator")
            .field("labels", &self.labels(1))
            .finish()
    }
}

/// `estimate` for a single output, `estimate_1..` otherwise
pub fn default_labels(width: usize) -> Vec<String> {
    if width == 1 {
        vec!["estimate".to_string()]
    } else {
        (1..=width).map(|i| format!("estimate_{i}")).collect()
    }
}

fn require(returns: &Array1<f64>, required: usize) -> Result<(), EstimatorError> {
    if returns.len() < required {
        return Err(EstimatorError::InsufficientData {
            required,
            actual: returns.len(),
        });
    }
    Ok(())
}

fn check_level(level: f64) -> Result<(), EstimatorError> {
    if !(level > 0.0 && level < 1.0) {
        return Err(EstimatorError::InvalidParameter(format!(
            "confidence level {level} must be in (0, 1)"
        )));
    }
    Ok(())
}

fn sample_std(returns: &Array1<f64>) -> f64 {
    let n = returns.len() as f64;
    let mean = returns.sum() / n;
    (returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
}

/// Sample quantile with linear interpolation between order statistics
fn quantile(returns: &Array1<f64>, p: f64) -> f64 {
    let mut sorted = returns.to_vec();
    sorted.sort_by(f64::total_cmp);
    let h = (sorted.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Arithmetic mean return
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Mean;

impl Estimator for Mean {
    fn estimate(&self, returns: &Array1<f64>) -> Result<Array1<f64>, EstimatorError> {
        require(returns, 1)?;
        Ok(Array1::from_elem(1, returns.sum() / returns.len() as f64))
    }

    fn labels(&self, _width: usize) -> Vec<String> {
        vec!["mean".to_string()]
    }
}

/// Sample standard deviation
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StdDev;

impl Estimator for StdDev {
    fn estimate(&self, returns: &Array1<f64>) -> Result<Array1<f64>, EstimatorError> {
        require(returns, 2)?;
        Ok(Array1::from_elem(1, sample_std(returns)))
    }

    fn labels(&self, _width: usize) -> Vec<String> {
        vec!["sd".to_string()]
    }
}

/// Historical Value-at-Risk at confidence `level`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ValueAtRisk {
    /// Confidence level (default: 0.95)
    pub level: f64,
}

impl Default for ValueAtRisk {
    fn default() -> Self {
        Self { level: 0.95 }
    }
}

impl Estimator for ValueAtRisk {
    fn estimate(&self, returns: &Array1<f64>) -> Result<Array1<f64>, EstimatorError> {
        check_level(self.level)?;
        require(returns, 1)?;
        Ok(Array1::from_elem(1, -quantile(returns, 1.0 - self.level)))
    }

    fn labels(&self, _width: usize) -> Vec<String> {
        vec!["VaR".to_string()]
    }
}

/// Historical expected shortfall at confidence `level`
///
/// Mean loss over returns at or below the `1 - level` quantile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExpectedShortfall {
    /// Confidence level (default: 0.95)
    pub level: f64,
}

impl Default for ExpectedShortfall {
    fn default() -> Self {
        Self { level: 0.95 }
    }
}

impl Estimator for ExpectedShortfall {
    fn estimate(&self, returns: &Array1<f64>) -> Result<Array1<f64>, EstimatorError> {
        check_level(self.level)?;
        require(returns, 1)?;
        let threshold = quantile(returns, 1.0 - self.level);
        let tail: Vec<f64> = returns.iter().copied().filter(|&r| r <= threshold).collect();
        // The minimum always lies in the tail
        let mean_tail = tail.iter().sum::<f64>() / tail.len().max(1) as f64;
        Ok(Array1::from_elem(1, -mean_tail))
    }

    fn labels(&self, _width: usize) -> Vec<String> {
        vec!["ES".to_string()]
    }
}

/// Per-period Sharpe ratio
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SharpeRatio {
    /// Per-period risk-free rate
    pub risk_free: f64,
}

impl Estimator for SharpeRatio {
    fn estimate(&self, returns: &Array1<f64>) -> Result<Array1<f64>, EstimatorError> {
        require(returns, 2)?;
        let sd = sample_std(returns);
        if sd < 1e-12 {
            return Err(EstimatorError::Failed(
                "zero volatility, Sharpe ratio undefined".to_string(),
            ));
        }
        let excess = returns.sum() / returns.len() as f64 - self.risk_free;
        Ok(Array1::from_elem(1, excess / sd))
    }

    fn labels(&self, _width: usize) -> Vec<String> {
        vec!["sharpe".to_string()]
    }
}

/// Several estimators evaluated together, outputs concatenated
#[derive(Default)]
pub struct Combined {
    parts: Vec<Box<dyn Estimator>>,
}

impl Combined {
    /// Start an empty combination
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an estimator
    pub fn with(mut self, estimator: impl Estimator + 'static) -> Self {
        self.parts.push(Box::new(estimator));
        self
    }
}

impl fmt::Debug for Combined {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Combined")
            .field("parts", &self.parts.len())
            .finish()
    }
}

impl Estimator for Combined {
    fn estimate(&self, returns: &Array1<f64>) -> Result<Array1<f64>, EstimatorError> {
        let mut out = Vec::with_capacity(self.parts.len());
        for part in &self.parts {
            out.extend(part.estimate(returns)?.iter().copied());
        }
        Ok(Array1::from(out))
    }

    fn labels(&self, width: usize) -> Vec<String> {
        let labels: Vec<String> = self.parts.iter().flat_map(|p| p.labels(1)).collect();
        if labels.len() == width {
            labels
        } else {
            default_labels(width)
        }
    }
}
