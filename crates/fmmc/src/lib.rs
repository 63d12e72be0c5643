#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fmmc/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod batch;
pub mod config;
pub mod table;

// Re-export main types from sub-crates
pub use fmmc_engine as engine;
pub use fmmc_model as model;

pub use batch::{FmmcEngine, FmmcError, estimate_with_standard_error, fmmc};
pub use config::FmmcOptions;
pub use table::{EstimateRecord, EstimateRow, EstimateTable, TableError};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
