//! Bootstrap statistic that rebuilds the FMMC distribution per replicate
//!
//! Each replicate resamples rows of the joint sample `[factors | returns]`,
//! blanks the leading returns so the resample has the same short history as
//! the asset, rebuilds the distribution on the result and evaluates the
//! estimator on the rebuilt simulated returns.

use crate::distribution::{BuildError, DistributionBuilder, FmmcObject};
use crate::estimator::{Estimator, EstimatorError};
use fmmc_model::fit::{FactorModelFitter, FitConfig, SelectionPolicy};
use fmmc_model::series::{DataError, FactorMatrix, ReturnSeries, ordinal_sequence};
use ndarray::{Array1, Array2, Axis, s};
use rand::Rng;
use thiserror::Error;

/// Replicate failures
#[derive(Debug, Error)]
pub enum ResampleError {
    /// Rebuilding the distribution failed
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Estimator failed on the rebuilt returns
    #[error(transparent)]
    Estimator(#[from] EstimatorError),

    /// Resampled data is malformed
    #[error(transparent)]
    Data(#[from] DataError),

    /// No row positions to draw from
    #[error("Cannot resample from an empty index pool")]
    EmptyPool,
}

/// Per-object settings shared by every replicate
#[derive(Debug, Clone)]
pub struct BootstrapConfig<'a> {
    /// Rows per resample: complete-case factor rows of the original data
    pub full_length: usize,

    /// Observed return rows at the end of each resample
    pub observed_length: usize,

    /// Statistic evaluated on each rebuilt distribution
    pub estimator: &'a dyn Estimator,

    /// Refit configuration: the original method, no variable selection
    pub fit: FitConfig,
}

impl<'a> BootstrapConfig<'a> {
    /// Derive the configuration for resampling `object`
    pub fn for_object(object: &FmmcObject, estimator: &'a dyn Estimator) -> Self {
        let args = object.args();
        Self {
            full_length: object.full_length(),
            observed_length: object.observed_length(),
            estimator,
            fit: FitConfig {
                selection: SelectionPolicy::None,
                max_subset_size: None,
                ..args.clone()
            },
        }
    }

    /// Leading rows of each resample whose return is blanked
    pub const fn missing_length(&self) -> usize {
        self.full_length.saturating_sub(self.observed_length)
    }
}

/// Replicate statistic over one object's joint sample
#[derive(Debug)]
pub struct ResamplingStatistic<'a, F> {
    builder: &'a DistributionBuilder<F>,
    asset: &'a str,
    factor_names: &'a [String],
    joint: Array2<f64>,
    config: BootstrapConfig<'a>,
}

impl<'a, F: FactorModelFitter> ResamplingStatistic<'a, F> {
    /// Statistic over `object`'s joint sample
    pub fn new(
        builder: &'a DistributionBuilder<F>,
        object: &'a FmmcObject,
        config: BootstrapConfig<'a>,
    ) -> Self {
        Self {
            builder,
            asset: object.asset(),
            factor_names: object.factor_names(),
            joint: object.joint_sample(),
            config,
        }
    }

    /// Shared replicate settings
    pub const fn config(&self) -> &BootstrapConfig<'a> {
        &self.config
    }

    /// Rows in the joint sample
    pub fn joint_len(&self) -> usize {
        self.joint.nrows()
    }

    /// Draw one resample of `full_length` rows from `pool`
    ///
    /// `pool` holds joint-sample row positions, typically the bootstrap's own
    /// resample. Rows are re-keyed `1..=full_length` and the first
    /// `missing_length` returns are set to `NaN`.
    pub fn draw<R: Rng>(
        &self,
        pool: &[usize],
        rng: &mut R,
    ) -> Result<(ReturnSeries, FactorMatrix), ResampleError> {
        if pool.is_empty() {
            return Err(ResampleError::EmptyPool);
        }
        let rows: Vec<usize> = (0..self.config.full_length)
            .map(|_| pool[rng.gen_range(0..pool.len())])
            .collect();
        if let Some(&bad) = rows.iter().find(|&&r| r >= self.joint.nrows()) {
            return Err(DataError::RowOutOfBounds {
                row: bad,
                rows: self.joint.nrows(),
            }
            .into());
        }

        let sample = self.joint.select(Axis(0), &rows);
        let k = self.factor_names.len();
        let mut returns = sample.column(k).to_owned();
        let missing = self.config.missing_length().min(returns.len());
        returns.slice_mut(s![..missing]).fill(f64::NAN);

        let index = ordinal_sequence(rows.len());
        let factors = FactorMatrix::new(
            self.factor_names.to_vec(),
            index.clone(),
            sample.slice(s![.., ..k]).to_owned(),
        )?;
        let returns = ReturnSeries::new(self.asset, index, returns)?;
        Ok((returns, factors))
    }

    /// Evaluate the estimator on one rebuilt resample
    pub fn evaluate<R: Rng>(
        &self,
        pool: &[usize],
        rng: &mut R,
    ) -> Result<Array1<f64>, ResampleError> {
        let (returns, factors) = self.draw(pool, rng)?;
        let rebuilt = self.builder.build(&returns, &factors, &self.config.fit)?;
        let statistic = self
            .config
            .estimator
            .estimate(rebuilt.bootdist().returns.values())?;
        Ok(statistic)
    }
}
