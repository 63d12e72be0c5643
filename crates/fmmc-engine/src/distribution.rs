//! Joint empirical distribution of factor returns and residuals
//!
//! For one asset, [`DistributionBuilder::build`] fits the factor model
//!
//! ```text
//! r_t = α + f_t · β + ε_t
//! ```
//!
//! and pairs every factor observation with the residual of the same period.
//! Those pairs form the joint empirical distribution used for simulation:
//! resampling rows of `(f_t, ε_t)` and recombining them with `α` and `β`
//! yields simulated returns without any parametric assumption.
//!
//! A failed build is an ordinary `Err` value; callers processing many assets
//! drop it and carry on.

use fmmc_model::fit::{
    FactorModelFitter, FitConfig, FitError, FitRequest, FitResult, TimeSeriesFitter,
};
use fmmc_model::series::{DataError, FactorMatrix, Join, ReturnSeries, align};
use ndarray::{Array1, Array2, s};
use rand::Rng;
use thiserror::Error;

/// Reasons an asset yields no FMMC distribution
#[derive(Debug, Error)]
pub enum BuildError {
    /// Return or factor input has no usable rows
    #[error("Invalid input for {asset}: {reason}")]
    InputShape {
        /// Asset name
        asset: String,
        /// What is wrong with the input
        reason: String,
    },

    /// Factor history cannot cover the asset's history
    #[error("{asset} has {return_rows} return rows but only {factor_rows} factor rows")]
    InsufficientHistory {
        /// Asset name
        asset: String,
        /// Complete-case factor rows
        factor_rows: usize,
        /// Return rows, missing prefix included
        return_rows: usize,
    },

    /// External fitter failed
    #[error("Could not fit factor model for {asset}: {source}")]
    Fit {
        /// Asset name
        asset: String,
        /// Underlying fit error
        #[source]
        source: FitError,
    },

    /// Every factor was dropped by the fit
    #[error("No factor with a fitted beta remains for {asset}")]
    NoSurvivingFactors {
        /// Asset name
        asset: String,
    },

    /// Intermediate series could not be formed
    #[error("Data error for {asset}: {source}")]
    Data {
        /// Asset name
        asset: String,
        /// Underlying data error
        #[source]
        source: DataError,
    },
}

impl BuildError {
    /// Asset the error refers to
    pub fn asset(&self) -> &str {
        match self {
            Self::InputShape { asset, .. }
            | Self::InsufficientHistory { asset, .. }
            | Self::Fit { asset, .. }
            | Self::NoSurvivingFactors { asset }
            | Self::Data { asset, .. } => asset,
        }
    }
}

/// Outcome of building one asset's distribution
pub type BuildOutcome = Result<FmmcObject, BuildError>;

/// Simulated returns and the factor rows they were built from
#[derive(Debug, Clone)]
pub struct BootDist {
    /// `α + f_t · β + ε_t` over the joint sample
    pub returns: ReturnSeries,
    /// Surviving factors, row-aligned with `returns`
    pub factors: FactorMatrix,
}

/// Inputs the distribution was built from
#[derive(Debug, Clone)]
pub struct ObservedData {
    /// Original return series, missing prefix included
    pub returns: ReturnSeries,
    /// Complete-case factor matrix restricted to surviving factors
    pub factors: FactorMatrix,
}

/// FMMC distribution for one asset
///
/// Immutable once built. `bootdist.returns` and `bootdist.factors` always
/// have the same number of rows.
#[derive(Debug, Clone)]
pub struct FmmcObject {
    bootdist: BootDist,
    data: ObservedData,
    args: FitConfig,
    alpha: f64,
    beta: Array1<f64>,
    residuals: Array1<f64>,
}

impl FmmcObject {
    /// Asset name
    pub fn asset(&self) -> &str {
        self.data.returns.name()
    }

    /// Joint sample and simulated returns
    pub const fn bootdist(&self) -> &BootDist {
        &self.bootdist
    }

    /// Original inputs
    pub const fn data(&self) -> &ObservedData {
        &self.data
    }

    /// Effective fit configuration
    pub const fn args(&self) -> &FitConfig {
        &self.args
    }

    /// Fitted intercept
    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Fitted betas of the surviving factors
    pub const fn beta(&self) -> &Array1<f64> {
        &self.beta
    }

    /// Surviving factor names
    pub fn factor_names(&self) -> &[String] {
        self.bootdist.factors.names()
    }

    /// Residuals, row-aligned with `bootdist`
    pub const fn residuals(&self) -> &Array1<f64> {
        &self.residuals
    }

    /// Rows in the joint sample
    pub fn joint_len(&self) -> usize {
        self.bootdist.returns.len()
    }

    /// Full history length: complete-case factor rows
    pub fn full_length(&self) -> usize {
        self.data.factors.nrows()
    }

    /// Observed history length of the asset
    ///
    /// `rows(R) - first_observed + 1` with a one-based first position, i.e.
    /// the length of the observed suffix.
    pub fn observed_length(&self) -> usize {
        self.data.returns.observed_len()
    }

    /// `[bootdist.factors | bootdist.returns]` as one matrix
    pub fn joint_sample(&self) -> Array2<f64> {
        let factors = self.bootdist.factors.values();
        let k = factors.ncols();
        let mut joint = Array2::<f64>::zeros((factors.nrows(), k + 1));
        joint.slice_mut(s![.., ..k]).assign(factors);
        joint.column_mut(k).assign(self.bootdist.returns.values());
        joint
    }

    /// Simulate returns over the full factor history
    ///
    /// Every complete-case factor row is combined with a residual drawn with
    /// replacement from the fitted residuals, backfilling the periods where
    /// the asset itself was not observed.
    pub fn backfill<R: Rng>(&self, rng: &mut R) -> Result<ReturnSeries, DataError> {
        let factors = &self.data.factors;
        let n_resid = self.residuals.len();
        let mut simulated = factors.values().dot(&self.beta) + self.alpha;
        if n_resid > 0 {
            simulated.mapv_inplace(|v| v + self.residuals[rng.gen_range(0..n_resid)]);
        }
        ReturnSeries::new(self.asset(), factors.index().to_vec(), simulated)
    }
}

/// Builds [`FmmcObject`]s with a given factor model fitter
#[derive(Debug, Clone, Default)]
pub struct DistributionBuilder<F = TimeSeriesFitter> {
    fitter: F,
}

impl<F: FactorModelFitter> DistributionBuilder<F> {
    /// Create a builder around `fitter`
    pub const fn new(fitter: F) -> Self {
        Self { fitter }
    }

    /// The underlying fitter
    pub const fn fitter(&self) -> &F {
        &self.fitter
    }

    /// Build the FMMC distribution of one asset
    ///
    /// Failures are logged and returned; they never panic.
    ///
    /// # Arguments
    /// * `returns` - Asset returns, possibly with a missing prefix
    /// * `factors` - Factor returns covering at least the asset's rows
    /// * `config` - Fit configuration, resolved against the factor count
    pub fn build(
        &self,
        returns: &ReturnSeries,
        factors: &FactorMatrix,
        config: &FitConfig,
    ) -> BuildOutcome {
        let outcome = self.try_build(returns, factors, config);
        match &outcome {
            Ok(object) => tracing::debug!(
                "Built FMMC distribution for {} ({} joint rows, {} factors)",
                object.asset(),
                object.joint_len(),
                object.beta.len()
            ),
            Err(err) => tracing::warn!("No FMMC distribution for {}: {}", err.asset(), err),
        }
        outcome
    }

    fn try_build(
        &self,
        returns: &ReturnSeries,
        factors: &FactorMatrix,
        config: &FitConfig,
    ) -> BuildOutcome {
        let asset = returns.name();
        let shape_error = |reason: &str| BuildError::InputShape {
            asset: asset.to_string(),
            reason: reason.to_string(),
        };
        let data_error = |source: DataError| BuildError::Data {
            asset: asset.to_string(),
            source,
        };

        if returns.is_empty() {
            return Err(shape_error("return series has no rows"));
        }
        if factors.nrows() == 0 {
            return Err(shape_error("factor matrix has no rows"));
        }

        let factors_data = factors.complete_cases();
        let (factor_rows, return_rows) = (factors_data.nrows(), returns.len());
        if factor_rows < return_rows {
            return Err(BuildError::InsufficientHistory {
                asset: asset.to_string(),
                factor_rows,
                return_rows,
            });
        }

        // Outer join: every ordinal seen on either side
        let design = align(returns.index(), factors_data.index(), Join::Outer);
        let response = Array1::from_iter(
            design
                .left
                .iter()
                .map(|row| row.map_or(f64::NAN, |i| returns.values()[i])),
        );
        let mut x = Array2::from_elem((design.len(), factors_data.ncols()), f64::NAN);
        for (t, row) in design.right.iter().enumerate() {
            if let Some(i) = row {
                x.row_mut(t).assign(&factors_data.values().row(*i));
            }
        }

        let resolved = config.resolve(factors_data.ncols());
        let fit = self
            .fitter
            .fit(&FitRequest {
                asset,
                factor_names: factors_data.names(),
                response: response.view(),
                design: x.view(),
                index: &design.index,
                config: &resolved,
            })
            .and_then(|fit| check_fit_shape(fit, factors_data.ncols()))
            .map_err(|source| BuildError::Fit {
                asset: asset.to_string(),
                source,
            })?;

        // Factors without a beta are dropped rather than failing the asset
        let surviving: Vec<usize> = fit
            .beta
            .iter()
            .enumerate()
            .filter_map(|(j, b)| b.map(|_| j))
            .collect();
        if surviving.is_empty() {
            return Err(BuildError::NoSurvivingFactors {
                asset: asset.to_string(),
            });
        }
        if surviving.len() < factors_data.ncols() {
            let dropped: Vec<&str> = fit
                .beta
                .iter()
                .zip(factors_data.names())
                .filter(|(b, _)| b.is_none())
                .map(|(_, name)| name.as_str())
                .collect();
            tracing::warn!("Dropping factors {:?} with missing beta for {}", dropped, asset);
        }
        let factors_data = factors_data
            .select_columns(&surviving)
            .map_err(data_error)?;
        let beta = Array1::from_iter(surviving.iter().filter_map(|&j| fit.beta[j]));

        // Inner join: periods with both factor returns and a residual
        let joint = align(factors_data.index(), &fit.residual_index, Join::Inner);
        let factor_rows: Vec<usize> = joint.left.iter().flatten().copied().collect();
        let residuals = Array1::from_iter(joint.right.iter().flatten().map(|&i| fit.residuals[i]));
        let boot_factors = factors_data
            .take_rows(&factor_rows, joint.index.clone())
            .map_err(data_error)?;

        let simulated = boot_factors.values().dot(&beta) + fit.alpha + &residuals;
        let boot_returns =
            ReturnSeries::new(asset, joint.index, simulated).map_err(data_error)?;

        Ok(FmmcObject {
            bootdist: BootDist {
                returns: boot_returns,
                factors: boot_factors,
            },
            data: ObservedData {
                returns: returns.clone(),
                factors: factors_data,
            },
            args: resolved,
            alpha: fit.alpha,
            beta,
            residuals,
        })
    }
}

/// Reject fitter output that does not line up with the request
fn check_fit_shape(fit: FitResult, n_factors: usize) -> Result<FitResult, FitError> {
    if fit.beta.len() != n_factors {
        return Err(FitError::DimensionMismatch {
            expected: n_factors,
            actual: fit.beta.len(),
        });
    }
    if fit.residual_index.len() != fit.residuals.len() {
        return Err(FitError::DimensionMismatch {
            expected: fit.residuals.len(),
            actual: fit.residual_index.len(),
        });
    }
    Ok(fit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fmmc_model::fit::{FitMethod, SelectionPolicy};
    use fmmc_model::series::ordinal_sequence;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};
    use rstest::rstest;

    fn factor_matrix(n: usize, k: usize, seed: u64) -> FactorMatrix {
        let mut rng = StdRng::seed_from_u64(seed);
        let dist = Normal::new(0.0, 0.02).unwrap();
        let values = Array2::from_shape_fn((n, k), |_| dist.sample(&mut rng));
        FactorMatrix::from_values((1..=k).map(|j| format!("F{j}")).collect(), values).unwrap()
    }

    fn asset(factors: &FactorMatrix, betas: &[f64], missing: usize, seed: u64) -> ReturnSeries {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, 0.005).unwrap();
        let beta = Array1::from(betas.to_vec());
        let mut values = factors.values().dot(&beta).mapv(|v| 0.001 + v + noise.sample(&mut rng));
        values.slice_mut(ndarray::s![..missing]).fill(f64::NAN);
        ReturnSeries::new("ASSET", factors.index().to_vec(), values).unwrap()
    }

    fn no_selection() -> FitConfig {
        FitConfig::without_selection(FitMethod::Ls)
    }

    #[rstest]
    #[case(0, FitMethod::Ls)]
    #[case(40, FitMethod::Ls)]
    #[case(40, FitMethod::Dls)]
    #[case(80, FitMethod::Robust)]
    fn test_joint_sample_rows_match(#[case] missing: usize, #[case] method: FitMethod) {
        let factors = factor_matrix(200, 3, 1);
        let returns = asset(&factors, &[1.0, 0.4, -0.2], missing, 2);
        let builder = DistributionBuilder::<TimeSeriesFitter>::default();

        let object = builder
            .build(&returns, &factors, &FitConfig::without_selection(method))
            .unwrap();

        assert_eq!(object.bootdist().returns.len(), object.bootdist().factors.nrows());
        assert_eq!(object.joint_len(), 200 - missing);
        assert_eq!(object.full_length(), 200);
        assert_eq!(object.observed_length(), 200 - missing);
        assert_eq!(object.args().method, method);
    }

    #[test]
    fn test_simulated_returns_reproduce_observed() {
        let factors = factor_matrix(120, 2, 3);
        let returns = asset(&factors, &[0.9, 0.3], 20, 4);
        let object = DistributionBuilder::new(TimeSeriesFitter)
            .build(&returns, &factors, &no_selection())
            .unwrap();

        // alpha + f.beta + residual is the observation itself
        let observed = returns.observed();
        for (sim, obs) in object.bootdist().returns.values().iter().zip(observed.iter()) {
            assert_relative_eq!(*sim, *obs, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_short_factor_history_fails() {
        let factors = factor_matrix(50, 2, 5);
        let long_factors = factor_matrix(80, 2, 6);
        let returns = asset(&long_factors, &[1.0, 0.5], 0, 7);

        let result =
            DistributionBuilder::new(TimeSeriesFitter).build(&returns, &factors, &no_selection());
        assert!(matches!(
            result,
            Err(BuildError::InsufficientHistory {
                factor_rows: 50,
                return_rows: 80,
                ..
            })
        ));
    }

    #[test]
    fn test_missing_factor_rows_count_against_history() {
        let mut values = factor_matrix(60, 2, 8).values().clone();
        values[[10, 1]] = f64::NAN;
        let factors = FactorMatrix::from_values(vec!["F1".into(), "F2".into()], values).unwrap();
        let returns = asset(&factor_matrix(60, 2, 8), &[1.0, 0.5], 0, 9);

        let result =
            DistributionBuilder::new(TimeSeriesFitter).build(&returns, &factors, &no_selection());
        assert!(matches!(result, Err(BuildError::InsufficientHistory { .. })));
    }

    #[test]
    fn test_empty_returns_is_shape_error() {
        let factors = factor_matrix(30, 2, 10);
        let returns = ReturnSeries::from_values("EMPTY", Array1::zeros(0)).unwrap();

        let result =
            DistributionBuilder::new(TimeSeriesFitter).build(&returns, &factors, &no_selection());
        let err = result.unwrap_err();
        assert!(matches!(err, BuildError::InputShape { .. }));
        assert_eq!(err.asset(), "EMPTY");
    }

    #[test]
    fn test_fit_failure_names_asset() {
        let factors = factor_matrix(30, 2, 11);
        // Only three observed returns
        let returns = asset(&factors, &[1.0, 0.5], 27, 12);

        let err = DistributionBuilder::new(TimeSeriesFitter)
            .build(&returns, &factors, &no_selection())
            .unwrap_err();
        assert!(matches!(err, BuildError::Fit { .. }));
        assert!(err.to_string().contains("ASSET"));
    }

    #[test]
    fn test_subset_selection_drops_factors() {
        let factors = factor_matrix(150, 5, 13);
        let returns = asset(&factors, &[1.1, 0.0, 0.0, 0.0, 0.8], 0, 14);

        let object = DistributionBuilder::new(TimeSeriesFitter)
            .build(&returns, &factors, &FitConfig::default())
            .unwrap();

        // At most floor((5 - 1) / 2) = 2 factors kept; both drivers survive
        assert_eq!(object.args().selection, SelectionPolicy::Subsets);
        assert_eq!(object.args().max_subset_size, Some(2));
        assert_eq!(object.bootdist().factors.ncols(), 5 - 3);
        assert_eq!(object.data().factors.ncols(), 2);
        assert_eq!(object.factor_names(), &["F1".to_string(), "F5".to_string()]);
        assert!(object.bootdist().returns.values().iter().all(|v| v.is_finite()));
    }

    #[derive(Debug)]
    struct DropSecond;

    impl FactorModelFitter for DropSecond {
        fn fit(&self, request: &FitRequest<'_>) -> Result<FitResult, FitError> {
            let mut fit = TimeSeriesFitter.fit(request)?;
            fit.beta[1] = None;
            Ok(fit)
        }
    }

    #[test]
    fn test_custom_fitter_missing_beta() {
        let factors = factor_matrix(100, 3, 15);
        let returns = asset(&factors, &[1.0, 0.5, 0.2], 10, 16);

        let object = DistributionBuilder::new(DropSecond)
            .build(&returns, &factors, &no_selection())
            .unwrap();
        assert_eq!(object.bootdist().factors.ncols(), 2);
        assert_eq!(object.beta().len(), 2);
        assert!(object.bootdist().returns.values().iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn test_joint_sample_layout() {
        let factors = factor_matrix(80, 2, 17);
        let returns = asset(&factors, &[1.0, 0.5], 0, 18);
        let object = DistributionBuilder::new(TimeSeriesFitter)
            .build(&returns, &factors, &no_selection())
            .unwrap();

        let joint = object.joint_sample();
        assert_eq!(joint.dim(), (80, 3));
        assert_eq!(joint.column(2), object.bootdist().returns.values().view());
    }

    #[test]
    fn test_backfill_covers_full_history() {
        let factors = factor_matrix(100, 2, 19);
        let returns = asset(&factors, &[1.0, 0.5], 60, 20);
        let object = DistributionBuilder::new(TimeSeriesFitter)
            .build(&returns, &factors, &no_selection())
            .unwrap();

        let mut rng = StdRng::seed_from_u64(99);
        let backfilled = object.backfill(&mut rng).unwrap();
        assert_eq!(backfilled.len(), 100);
        assert_eq!(backfilled.observed_len(), 100);
        assert_eq!(backfilled.index(), ordinal_sequence(100).as_slice());
    }
}
