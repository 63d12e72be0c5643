#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fmmc/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod bootstrap;
pub mod distribution;
pub mod estimator;
pub mod pool;
pub mod resample;
pub mod standard_error;

#[cfg(test)]
mod test_support;

// Re-export main types
pub use bootstrap::{BootstrapError, BootstrapSettings, bootstrap};
pub use distribution::{
    BootDist, BuildError, BuildOutcome, DistributionBuilder, FmmcObject, ObservedData,
};
pub use estimator::{
    Combined, Estimator, EstimatorError, ExpectedShortfall, Mean, SharpeRatio, StdDev, ValueAtRisk,
};
pub use pool::{PoolError, WorkerPool};
pub use resample::{BootstrapConfig, ResampleError, ResamplingStatistic};
pub use standard_error::{column_std, standard_error};
