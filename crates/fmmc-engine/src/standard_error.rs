//! Bootstrapped standard errors of FMMC estimates

use crate::bootstrap::{BootstrapError, BootstrapSettings, bootstrap};
use crate::distribution::{DistributionBuilder, FmmcObject};
use crate::estimator::Estimator;
use crate::pool::WorkerPool;
use crate::resample::{BootstrapConfig, ResamplingStatistic};
use fmmc_model::fit::FactorModelFitter;
use ndarray::{Array1, Array2};

/// Standard error of `estimator` on `object`'s simulated returns
///
/// Every replicate resamples the joint sample, rebuilds the distribution
/// with the object's fit method and no variable selection, and evaluates the
/// estimator. The result is the per-statistic sample standard deviation of
/// the replicates.
///
/// # Arguments
/// * `builder` - Builder used for every refit
/// * `object` - Distribution to resample
/// * `estimator` - Statistic whose spread is measured
/// * `settings` - Replicate count and seed
/// * `pool` - Runs replicates in parallel when given
///
/// # Returns
/// * One standard error per estimator output, or the first replicate failure
pub fn standard_error<F: FactorModelFitter>(
    builder: &DistributionBuilder<F>,
    object: &FmmcObject,
    estimator: &dyn Estimator,
    settings: &BootstrapSettings,
    pool: Option<&WorkerPool>,
) -> Result<Array1<f64>, BootstrapError> {
    let config = BootstrapConfig::for_object(object, estimator);
    tracing::debug!(
        "Bootstrapping {} with {} replicates ({} of {} rows observed)",
        object.asset(),
        settings.replicates,
        config.observed_length,
        config.full_length
    );
    let statistic = ResamplingStatistic::new(builder, object, config);
    let replicates = bootstrap(statistic.joint_len(), settings, pool, |indices, rng| {
        statistic.evaluate(indices, rng)
    })?;
    Ok(column_std(&replicates))
}

/// Column sample standard deviation (`n - 1` denominator)
///
/// Zero for every column when there are fewer than two rows.
pub fn column_std(replicates: &Array2<f64>) -> Array1<f64> {
    let n = replicates.nrows();
    if n < 2 {
        return Array1::zeros(replicates.ncols());
    }
    Array1::from_iter(replicates.columns().into_iter().map(|col| {
        let mean = col.sum() / n as f64;
        let ss: f64 = col.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    }))
}
