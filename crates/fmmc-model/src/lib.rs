#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fmmc/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod fit;
pub mod series;

// Re-export main types
pub use fit::{
    FactorModelFitter, FitConfig, FitError, FitMethod, FitRequest, FitResult, SelectionPolicy,
    TimeSeriesFitter,
};
pub use series::{DataError, FactorMatrix, Ordinal, ReturnSeries, ReturnsMatrix};
