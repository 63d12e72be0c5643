//! Per-asset estimate table

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Table construction errors
#[derive(Debug, Error)]
pub enum TableError {
    /// A component does not match the table shape
    #[error("{what} has shape {actual:?}, expected {expected:?}")]
    Shape {
        /// Offending component
        what: &'static str,
        /// Expected (rows, columns)
        expected: (usize, usize),
        /// Actual (rows, columns)
        actual: (usize, usize),
    },
}

/// Estimates (and standard errors) keyed by asset and statistic label
///
/// Rows follow the order of the FMMC objects the table was computed from.
/// Equality compares floats directly, so a table holding missing (`NaN`)
/// estimates never equals anything, itself included.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateTable {
    assets: Vec<String>,
    labels: Vec<String>,
    estimates: Array2<f64>,
    standard_errors: Option<Array2<f64>>,
}

/// One asset's row of an [`EstimateTable`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimateRow<'a> {
    /// Asset name
    pub asset: &'a str,
    /// Point estimates, one per label
    pub estimates: ArrayView1<'a, f64>,
    /// Standard errors, one per label
    pub standard_errors: Option<ArrayView1<'a, f64>>,
}

/// Long-format record: one asset and one statistic
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EstimateRecord {
    /// Asset name
    pub asset: String,
    /// Statistic label
    pub label: String,
    /// Point estimate; `None` when missing
    pub estimate: Option<f64>,
    /// Bootstrap standard error, when computed
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub standard_error: Option<f64>,
}

impl EstimateTable {
    /// Assemble a table, checking every component against `assets x labels`
    pub fn new(
        assets: Vec<String>,
        labels: Vec<String>,
        estimates: Array2<f64>,
        standard_errors: Option<Array2<f64>>,
    ) -> Result<Self, TableError> {
        let expected = (assets.len(), labels.len());
        if estimates.dim() != expected {
            return Err(TableError::Shape {
                what: "estimates",
                expected,
                actual: estimates.dim(),
            });
        }
        if let Some(se) = &standard_errors
            && se.dim() != expected
        {
            return Err(TableError::Shape {
                what: "standard errors",
                expected,
                actual: se.dim(),
            });
        }
        Ok(Self {
            assets,
            labels,
            estimates,
            standard_errors,
        })
    }

    /// Table with a single all-missing `estimate` column
    pub fn missing(assets: Vec<String>) -> Self {
        let estimates = Array2::from_elem((assets.len(), 1), f64::NAN);
        Self {
            assets,
            labels: vec!["estimate".to_string()],
            estimates,
            standard_errors: None,
        }
    }

    /// Row labels
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Column labels
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Point estimates (assets x labels)
    pub const fn estimates(&self) -> &Array2<f64> {
        &self.estimates
    }

    /// Standard errors (assets x labels), when computed
    pub const fn standard_errors(&self) -> Option<&Array2<f64>> {
        self.standard_errors.as_ref()
    }

    /// Number of assets
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the table has no assets
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Look up an asset's row
    pub fn row(&self, asset: &str) -> Option<EstimateRow<'_>> {
        let i = self.assets.iter().position(|a| a == asset)?;
        Some(EstimateRow {
            asset: &self.assets[i],
            estimates: self.estimates.row(i),
            standard_errors: self.standard_errors.as_ref().map(|se| se.row(i)),
        })
    }

    /// Flatten into one record per asset and label
    pub fn to_records(&self) -> Vec<EstimateRecord> {
        let mut records = Vec::with_capacity(self.assets.len() * self.labels.len());
        for (i, asset) in self.assets.iter().enumerate() {
            for (j, label) in self.labels.iter().enumerate() {
                records.push(EstimateRecord {
                    asset: asset.clone(),
                    label: label.clone(),
                    estimate: observed(self.estimates[[i, j]]),
                    standard_error: self.standard_errors.as_ref().map(|se| se[[i, j]]),
                });
            }
        }
        records
    }

    /// Records as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_records())
    }
}

fn observed(value: f64) -> Option<f64> {
    (!value.is_nan()).then_some(value)
}

impl fmt::Display for EstimateTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.assets.iter().map(String::len).max().unwrap_or(0).max(5);
        write!(f, "{:<width$}", "asset")?;
        for label in &self.labels {
            write!(f, " {label:>12}")?;
            if self.standard_errors.is_some() {
                write!(f, " {:>12}", format!("se({label})"))?;
            }
        }
        writeln!(f)?;

        for (i, asset) in self.assets.iter().enumerate() {
            write!(f, "{asset:<width$}")?;
            for j in 0..self.labels.len() {
                write!(f, " {:>12.6}", self.estimates[[i, j]])?;
                if let Some(se) = &self.standard_errors {
                    write!(f, " {:>12.6}", se[[i, j]])?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
