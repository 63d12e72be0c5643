//! Nonparametric bootstrap driver
//!
//! Runs a statistic on `replicates` resamples of `0..n_rows`. Each replicate
//! owns an RNG seeded with `seed + replicate`, so results do not depend on
//! whether replicates run sequentially or across a [`WorkerPool`].
//!
//! A failing replicate fails the whole bootstrap. Dropping it would bias any
//! spread computed from the surviving replicates.

use crate::pool::WorkerPool;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use thiserror::Error;

/// Boxed statistic error
pub type StatisticError = Box<dyn StdError + Send + Sync>;

/// Bootstrap errors
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Zero replicates requested
    #[error("Bootstrap needs at least one replicate")]
    NoReplicates,

    /// Nothing to resample
    #[error("Bootstrap data has no rows")]
    EmptyData,

    /// A replicate's statistic failed
    #[error("Replicate {replicate} failed: {source}")]
    Replicate {
        /// Replicate number
        replicate: usize,
        /// Statistic error
        #[source]
        source: StatisticError,
    },

    /// Replicates disagree on the statistic length
    #[error("Replicate {replicate} returned {actual} values, expected {expected}")]
    InconsistentStatistic {
        /// Replicate number
        replicate: usize,
        /// Length of the first replicate
        expected: usize,
        /// Length of this replicate
        actual: usize,
    },
}

/// Bootstrap settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapSettings {
    /// Number of replicates (default: 100)
    pub replicates: usize,

    /// Base RNG seed (default: 42)
    pub seed: u64,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            replicates: 100,
            seed: 42,
        }
    }
}

impl BootstrapSettings {
    /// Settings with `replicates` replicates and the default seed
    pub fn with_replicates(replicates: usize) -> Self {
        Self {
            replicates,
            ..Default::default()
        }
    }
}

/// Draw `n` row positions from `0..n` with replacement
pub fn resample_indices<R: Rng>(n: usize, rng: &mut R) -> Vec<usize> {
    (0..n).map(|_| rng.gen_range(0..n)).collect()
}

/// Run `statistic` on `settings.replicates` resamples of `0..n_rows`
///
/// # Arguments
/// * `n_rows` - Rows in the data being resampled
/// * `settings` - Replicate count and seed
/// * `pool` - Runs replicates in parallel when given, sequentially otherwise
/// * `statistic` - Receives the resampled row positions and the replicate RNG
///
/// # Returns
/// * Replicate statistics, one row per replicate
pub fn bootstrap<S, E>(
    n_rows: usize,
    settings: &BootstrapSettings,
    pool: Option<&WorkerPool>,
    statistic: S,
) -> Result<Array2<f64>, BootstrapError>
where
    S: Fn(&[usize], &mut StdRng) -> Result<Array1<f64>, E> + Sync,
    E: Into<StatisticError>,
{
    if settings.replicates == 0 {
        return Err(BootstrapError::NoReplicates);
    }
    if n_rows == 0 {
        return Err(BootstrapError::EmptyData);
    }

    let run = |replicate: usize| -> Result<Array1<f64>, BootstrapError> {
        let mut rng = StdRng::seed_from_u64(settings.seed.wrapping_add(replicate as u64));
        let indices = resample_indices(n_rows, &mut rng);
        statistic(&indices, &mut rng).map_err(|source| BootstrapError::Replicate {
            replicate,
            source: source.into(),
        })
    };

    let statistics: Vec<Array1<f64>> = match pool {
        Some(pool) => pool.install(|| {
            (0..settings.replicates)
                .into_par_iter()
                .map(run)
                .collect::<Result<Vec<_>, _>>()
        })?,
        None => (0..settings.replicates)
            .map(run)
            .collect::<Result<Vec<_>, _>>()?,
    };
    tracing::debug!("Completed {} bootstrap replicates", statistics.len());

    stack_rows(&statistics)
}

fn stack_rows(rows: &[Array1<f64>]) -> Result<Array2<f64>, BootstrapError> {
    let width = rows.first().map_or(0, Array1::len);
    let mut out = Array2::<f64>::zeros((rows.len(), width));
    for (replicate, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(BootstrapError::InconsistentStatistic {
                replicate,
                expected: width,
                actual: row.len(),
            });
        }
        out.row_mut(replicate).assign(row);
    }
    Ok(out)
}
