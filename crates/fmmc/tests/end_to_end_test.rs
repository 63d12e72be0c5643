//! End-to-end FMMC: per-asset distributions, estimates and standard errors

use approx::assert_relative_eq;
use fmmc::engine::{Combined, ExpectedShortfall, Mean, StdDev, ValueAtRisk};
use fmmc::model::series::{FactorMatrix, ReturnsMatrix};
use fmmc::model::{FitConfig, FitMethod};
use fmmc::{FmmcOptions, estimate_with_standard_error, fmmc};
use ndarray::{Array1, Array2, s};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use rstest::rstest;

/// Four factors over 100 periods; assets A, B and C fit, D has two returns
fn universe() -> (ReturnsMatrix, FactorMatrix) {
    let (n, k) = (100, 4);
    let mut rng = StdRng::seed_from_u64(2024);
    let factor_dist = Normal::new(0.0, 0.02).unwrap();
    let noise = Normal::new(0.0, 0.01).unwrap();
    let values = Array2::from_shape_fn((n, k), |_| factor_dist.sample(&mut rng));
    let factors = FactorMatrix::from_values(
        vec![
            "MKT".to_string(),
            "SMB".to_string(),
            "HML".to_string(),
            "MOM".to_string(),
        ],
        values,
    )
    .unwrap();

    let specs: [(&str, [f64; 4], usize); 4] = [
        ("A", [1.0, 0.2, 0.0, 0.1], 0),
        ("B", [0.8, -0.3, 0.5, 0.0], 30),
        ("C", [1.2, 0.0, -0.2, 0.4], 60),
        ("D", [0.9, 0.1, 0.1, 0.1], 98),
    ];
    let mut returns = Array2::<f64>::zeros((n, specs.len()));
    for (a, (_, beta, missing)) in specs.iter().enumerate() {
        let beta = Array1::from(beta.to_vec());
        let mut col = factors
            .values()
            .dot(&beta)
            .mapv(|v| 0.001 + v + noise.sample(&mut rng));
        col.slice_mut(s![..*missing]).fill(f64::NAN);
        returns.column_mut(a).assign(&col);
    }
    let names = specs.iter().map(|(name, _, _)| name.to_string()).collect();
    (ReturnsMatrix::from_values(names, returns).unwrap(), factors)
}

fn options(parallel: bool) -> FmmcOptions {
    let mut options = FmmcOptions::from_json(r#"{ "bootstrap": { "replicates": 50, "seed": 1 } }"#)
        .unwrap();
    options.parallel = parallel;
    options.num_threads = Some(2);
    options
}

#[rstest]
#[case(false)]
#[case(true)]
fn test_mean_with_standard_errors(#[case] parallel: bool) {
    let (returns, factors) = universe();
    let opts = options(parallel);

    let objects = fmmc(&returns, &factors, &opts).unwrap();
    let names: Vec<&str> = objects.iter().map(|o| o.asset()).collect();
    assert_eq!(names, ["A", "B", "C"]);

    let table = estimate_with_standard_error(&objects, Some(&Mean), &opts).unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.labels(), ["mean"]);
    assert!(table.row("D").is_none());

    let se = table.standard_errors().unwrap();
    for (i, asset) in table.assets().iter().enumerate() {
        assert!(table.estimates()[[i, 0]].is_finite(), "{asset}");
        assert!(se[[i, 0]].is_finite() && se[[i, 0]] >= 0.0, "{asset}");
    }
}

#[test]
fn test_sequential_and_parallel_tables_agree() {
    let (returns, factors) = universe();
    let sequential = {
        let opts = options(false);
        let objects = fmmc(&returns, &factors, &opts).unwrap();
        estimate_with_standard_error(&objects, Some(&StdDev), &opts).unwrap()
    };
    let parallel = {
        let opts = options(true);
        let objects = fmmc(&returns, &factors, &opts).unwrap();
        estimate_with_standard_error(&objects, Some(&StdDev), &opts).unwrap()
    };
    assert_eq!(sequential, parallel);
}

#[test]
fn test_no_estimator() {
    let (returns, factors) = universe();
    let opts = options(false);
    let objects = fmmc(&returns, &factors, &opts).unwrap();

    let table = estimate_with_standard_error(&objects, None, &opts).unwrap();
    assert_eq!(table.len(), objects.len());
    assert_eq!(table.assets(), ["A", "B", "C"]);
    assert_eq!(table.labels(), ["estimate"]);
    assert!(table.estimates().iter().all(|v| v.is_nan()));
    assert!(table.standard_errors().is_none());
}

#[test]
fn test_tail_risk_table_records() {
    let (returns, factors) = universe();
    let opts = FmmcOptions {
        fit: FitConfig::without_selection(FitMethod::Robust),
        ..options(true)
    };
    let objects = fmmc(&returns, &factors, &opts).unwrap();
    assert!(objects.iter().all(|o| o.factor_names().len() == 4));

    let estimator = Combined::new()
        .with(ValueAtRisk::default())
        .with(ExpectedShortfall::default());
    let table = estimate_with_standard_error(&objects, Some(&estimator), &opts).unwrap();
    assert_eq!(table.labels(), ["VaR", "ES"]);

    let row = table.row("B").unwrap();
    assert!(row.estimates[1] >= row.estimates[0]);

    let records = table.to_records();
    assert_eq!(records.len(), 6);
    assert!(records.iter().all(|r| r.standard_error.is_some()));
}

#[test]
fn test_simulated_history_matches_observed_returns() {
    let (returns, factors) = universe();
    let opts = FmmcOptions {
        fit: FitConfig::without_selection(FitMethod::Ls),
        compute_se: false,
        ..FmmcOptions::default()
    };
    let objects = fmmc(&returns, &factors, &opts).unwrap();
    let b = &objects[1];

    // alpha + f·beta + residual reproduces the observed returns exactly
    let observed = b.data().returns.observed();
    assert_eq!(b.joint_len(), 70);
    for (sim, obs) in b.bootdist().returns.values().iter().zip(observed.iter()) {
        assert_relative_eq!(*sim, *obs, epsilon = 1e-10);
    }
}
