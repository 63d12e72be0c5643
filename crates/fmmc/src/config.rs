//! Batch configuration

use fmmc_engine::BootstrapSettings;
use fmmc_model::FitConfig;
use serde::{Deserialize, Serialize};

/// Options for [`crate::fmmc`] and [`crate::estimate_with_standard_error`]
///
/// Every field has a default, so a JSON document only needs the fields it
/// changes:
///
/// ```
/// use fmmc::FmmcOptions;
///
/// let options = FmmcOptions::from_json(
///     r#"{
///         "parallel": true,
///         "fit": { "method": "Robust" },
///         "bootstrap": { "replicates": 200 }
///     }"#,
/// )
/// .unwrap();
/// assert!(options.parallel);
/// assert_eq!(options.bootstrap.replicates, 200);
/// assert!(options.compute_se);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FmmcOptions {
    /// Run on a worker pool created for the call (default: false)
    pub parallel: bool,

    /// Worker count; one per CPU when None
    pub num_threads: Option<usize>,

    /// Bootstrap standard errors alongside estimates (default: true)
    pub compute_se: bool,

    /// Factor model fit configuration
    pub fit: FitConfig,

    /// Bootstrap replicate count and seed
    pub bootstrap: BootstrapSettings,
}

impl Default for FmmcOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            num_threads: None,
            compute_se: true,
            fit: FitConfig::default(),
            bootstrap: BootstrapSettings::default(),
        }
    }
}

impl FmmcOptions {
    /// Parse options from a JSON document
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Same options, run in parallel
    pub fn parallel(self) -> Self {
        Self {
            parallel: true,
            ..self
        }
    }
}
