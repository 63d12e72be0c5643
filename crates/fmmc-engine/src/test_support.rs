//! Synthetic data shared by unit tests

use fmmc_model::fit::{FitConfig, TimeSeriesFitter};
use fmmc_model::series::{FactorMatrix, ReturnSeries};
use ndarray::{Array1, Array2, s};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::distribution::{DistributionBuilder, FmmcObject};

pub(crate) fn factor_matrix(n: usize, k: usize, seed: u64) -> FactorMatrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let dist = Normal::new(0.0, 0.02).unwrap();
    let values = Array2::from_shape_fn((n, k), |_| dist.sample(&mut rng));
    FactorMatrix::from_values((1..=k).map(|j| format!("F{j}")).collect(), values).unwrap()
}

pub(crate) fn asset_returns(
    name: &str,
    factors: &FactorMatrix,
    missing: usize,
    seed: u64,
) -> ReturnSeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.005).unwrap();
    let beta = Array1::from_shape_fn(factors.ncols(), |j| 0.5 + 0.25 * j as f64);
    let mut values = factors
        .values()
        .dot(&beta)
        .mapv(|v| 0.001 + v + noise.sample(&mut rng));
    values.slice_mut(s![..missing]).fill(f64::NAN);
    ReturnSeries::new(name, factors.index().to_vec(), values).unwrap()
}

/// Object with every factor kept, fitted by least squares
pub(crate) fn fmmc_object(n: usize, k: usize, missing: usize) -> FmmcObject {
    let factors = factor_matrix(n, k, 11);
    let returns = asset_returns("ASSET", &factors, missing, 12);
    DistributionBuilder::new(TimeSeriesFitter)
        .build(&returns, &factors, &FitConfig::without_selection(Default::default()))
        .unwrap()
}
