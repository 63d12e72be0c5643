//! Multi-asset FMMC
//!
//! Two independent fan-outs, never nested in one pool: [`FmmcEngine::fmmc`]
//! runs one task per asset, and [`FmmcEngine::estimate_with_standard_error`]
//! runs one task per bootstrap replicate for each asset in turn. Either way
//! the pool is created by the call and released when it returns.

use crate::config::FmmcOptions;
use crate::table::{EstimateTable, TableError};
use fmmc_engine::{
    BootstrapError, BuildError, BuildOutcome, DistributionBuilder, Estimator, EstimatorError,
    FmmcObject, PoolError, WorkerPool, standard_error,
};
use fmmc_model::series::{FactorMatrix, ReturnsMatrix};
use fmmc_model::{FactorModelFitter, TimeSeriesFitter};
use ndarray::Array2;
use rayon::prelude::*;
use thiserror::Error;

/// Batch errors
#[derive(Debug, Error)]
pub enum FmmcError {
    /// Worker pool could not be started
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// Point estimate failed
    #[error("Estimate failed for {asset}: {source}")]
    Estimate {
        /// Asset name
        asset: String,
        /// Estimator error
        #[source]
        source: EstimatorError,
    },

    /// Bootstrap standard error failed
    #[error("Standard error failed for {asset}: {source}")]
    StandardError {
        /// Asset name
        asset: String,
        /// Bootstrap error
        #[source]
        source: BootstrapError,
    },

    /// Estimator output width differs between assets
    #[error("Estimator returned {actual} values for {asset}, expected {expected}")]
    InconsistentEstimate {
        /// Asset name
        asset: String,
        /// Width of the first asset's estimate
        expected: usize,
        /// Width for this asset
        actual: usize,
    },

    /// Result table could not be assembled
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Runs FMMC over many assets with one fitter
#[derive(Debug, Clone, Default)]
pub struct FmmcEngine<F = TimeSeriesFitter> {
    builder: DistributionBuilder<F>,
}

impl<F: FactorModelFitter> FmmcEngine<F> {
    /// Engine around `fitter`
    pub const fn new(fitter: F) -> Self {
        Self {
            builder: DistributionBuilder::new(fitter),
        }
    }

    /// Per-asset distribution builder
    pub const fn builder(&self) -> &DistributionBuilder<F> {
        &self.builder
    }

    /// Build every asset's distribution, keeping failures
    ///
    /// Outcomes are in asset column order. Tasks share only the read-only
    /// inputs, so sequential and parallel runs succeed for the same assets.
    pub fn build_all(
        &self,
        returns: &ReturnsMatrix,
        factors: &FactorMatrix,
        options: &FmmcOptions,
    ) -> Result<Vec<BuildOutcome>, FmmcError> {
        let task = |column: usize| self.build_column(returns, column, factors, options);
        let outcomes = if options.parallel {
            let pool = WorkerPool::new(options.num_threads)?;
            pool.install(|| {
                (0..returns.n_assets())
                    .into_par_iter()
                    .map(task)
                    .collect::<Vec<_>>()
            })
        } else {
            (0..returns.n_assets()).map(task).collect()
        };
        Ok(outcomes)
    }

    /// Build every asset's distribution, dropping assets that fail
    ///
    /// # Arguments
    /// * `returns` - Asset returns, one column per asset
    /// * `factors` - Factor returns shared by every asset
    /// * `options` - Fit configuration and parallelism
    ///
    /// # Returns
    /// * Distributions of the assets that could be fitted, in column order
    pub fn fmmc(
        &self,
        returns: &ReturnsMatrix,
        factors: &FactorMatrix,
        options: &FmmcOptions,
    ) -> Result<Vec<FmmcObject>, FmmcError> {
        let outcomes = self.build_all(returns, factors, options)?;
        let total = outcomes.len();
        let objects: Vec<FmmcObject> = outcomes.into_iter().filter_map(Result::ok).collect();
        if objects.len() < total {
            tracing::warn!(
                "FMMC dropped {} of {} assets",
                total - objects.len(),
                total
            );
        }
        tracing::info!("Built FMMC distributions for {} assets", objects.len());
        Ok(objects)
    }

    /// Point estimates and optional bootstrap standard errors
    ///
    /// Without an estimator the table has one all-missing `estimate` column.
    /// When `options.parallel` is set, one pool serves the standard errors
    /// of every asset and is released before returning, including on error.
    pub fn estimate_with_standard_error(
        &self,
        objects: &[FmmcObject],
        estimator: Option<&dyn Estimator>,
        options: &FmmcOptions,
    ) -> Result<EstimateTable, FmmcError> {
        let assets: Vec<String> = objects.iter().map(|o| o.asset().to_string()).collect();
        let Some(estimator) = estimator else {
            return Ok(EstimateTable::missing(assets));
        };

        let mut rows = Vec::with_capacity(objects.len());
        for object in objects {
            let estimate = estimator
                .estimate(object.bootdist().returns.values())
                .map_err(|source| {
                    tracing::warn!("Estimator failed for {}: {}", object.asset(), source);
                    FmmcError::Estimate {
                        asset: object.asset().to_string(),
                        source,
                    }
                })?;
            rows.push(estimate.to_vec());
        }
        let width = rows.first().map_or(1, Vec::len);
        let estimates = stack(&assets, &rows, width)?;

        let standard_errors = if options.compute_se {
            let pool = if options.parallel {
                Some(WorkerPool::new(options.num_threads)?)
            } else {
                None
            };
            let mut rows = Vec::with_capacity(objects.len());
            for object in objects {
                let se = standard_error(
                    &self.builder,
                    object,
                    estimator,
                    &options.bootstrap,
                    pool.as_ref(),
                )
                .map_err(|source| {
                    tracing::warn!(
                        "Standard error failed for {}, dropping estimates of {} assets: {}",
                        object.asset(),
                        objects.len(),
                        source
                    );
                    FmmcError::StandardError {
                        asset: object.asset().to_string(),
                        source,
                    }
                })?;
                rows.push(se.to_vec());
            }
            Some(stack(&assets, &rows, width)?)
        } else {
            None
        };

        Ok(EstimateTable::new(
            assets,
            estimator.labels(width),
            estimates,
            standard_errors,
        )?)
    }

    fn build_column(
        &self,
        returns: &ReturnsMatrix,
        column: usize,
        factors: &FactorMatrix,
        options: &FmmcOptions,
    ) -> BuildOutcome {
        let series = returns.column(column).map_err(|source| {
            let asset = returns.names()[column].clone();
            tracing::warn!("No FMMC distribution for {}: {}", asset, source);
            BuildError::Data { asset, source }
        })?;
        self.builder.build(&series, factors, &options.fit)
    }
}

fn stack(assets: &[String], rows: &[Vec<f64>], width: usize) -> Result<Array2<f64>, FmmcError> {
    let mut out = Array2::<f64>::zeros((rows.len(), width));
    for (i, (asset, row)) in assets.iter().zip(rows).enumerate() {
        if row.len() != width {
            return Err(FmmcError::InconsistentEstimate {
                asset: asset.clone(),
                expected: width,
                actual: row.len(),
            });
        }
        for (j, value) in row.iter().enumerate() {
            out[[i, j]] = *value;
        }
    }
    Ok(out)
}

/// [`FmmcEngine::fmmc`] with the default fitter
pub fn fmmc(
    returns: &ReturnsMatrix,
    factors: &FactorMatrix,
    options: &FmmcOptions,
) -> Result<Vec<FmmcObject>, FmmcError> {
    FmmcEngine::new(TimeSeriesFitter).fmmc(returns, factors, options)
}

/// [`FmmcEngine::estimate_with_standard_error`] with the default fitter
pub fn estimate_with_standard_error(
    objects: &[FmmcObject],
    estimator: Option<&dyn Estimator>,
    options: &FmmcOptions,
) -> Result<EstimateTable, FmmcError> {
    FmmcEngine::new(TimeSeriesFitter).estimate_with_standard_error(objects, estimator, options)
}
