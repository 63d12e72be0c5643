//! Fit configuration
//!
//! [`FitConfig::resolve`] turns a user configuration into the effective one
//! stored alongside every FMMC distribution, so that resample refits reproduce
//! the same fitting behavior.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Regression method used to estimate alpha and beta
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitMethod {
    /// Ordinary least squares
    #[default]
    #[serde(rename = "LS")]
    Ls,
    /// Discounted least squares (exponentially decaying weights)
    #[serde(rename = "DLS")]
    Dls,
    /// Huber M-estimation via iteratively reweighted least squares
    #[serde(rename = "Robust")]
    Robust,
}

impl fmt::Display for FitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ls => write!(f, "LS"),
            Self::Dls => write!(f, "DLS"),
            Self::Robust => write!(f, "Robust"),
        }
    }
}

/// Variable selection applied before the final fit
///
/// Deserialisation goes through [`SelectionPolicy::parse`], so unknown
/// policy names become [`SelectionPolicy::Subsets`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum SelectionPolicy {
    /// Use every factor
    None,
    /// Best subset of a fixed size
    #[default]
    Subsets,
}

impl SelectionPolicy {
    /// Parse a policy name
    ///
    /// Only `"none"` selects [`SelectionPolicy::None`]; every other value,
    /// recognised or not, is coerced to [`SelectionPolicy::Subsets`].
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "none" => Self::None,
            "subsets" => Self::Subsets,
            other => {
                tracing::warn!(
                    "Unrecognised variable selection {:?}; falling back to subsets",
                    other
                );
                Self::Subsets
            }
        }
    }
}

impl From<String> for SelectionPolicy {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Subsets => write!(f, "subsets"),
        }
    }
}

/// Factor model fit configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Regression method (default: LS)
    pub method: FitMethod,

    /// Variable selection policy (default: subsets)
    pub selection: SelectionPolicy,

    /// Maximum number of factors kept by subset selection
    /// When None, resolves to floor((K - 1) / 2)
    pub max_subset_size: Option<usize>,

    /// Decay factor for DLS weights (default: 0.95)
    pub decay: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            method: FitMethod::Ls,
            selection: SelectionPolicy::Subsets,
            max_subset_size: None,
            decay: 0.95,
        }
    }
}

impl FitConfig {
    /// Configuration with every factor kept
    pub fn without_selection(method: FitMethod) -> Self {
        Self {
            method,
            selection: SelectionPolicy::None,
            ..Default::default()
        }
    }

    /// Fill derived defaults for a model with `n_factors` candidates
    pub fn resolve(&self, n_factors: usize) -> Self {
        let max_subset_size = match self.selection {
            SelectionPolicy::Subsets => Some(
                self.max_subset_size
                    .unwrap_or_else(|| default_subset_size(n_factors)),
            ),
            SelectionPolicy::None => self.max_subset_size,
        };
        Self {
            max_subset_size,
            ..self.clone()
        }
    }
}

/// floor((K - 1) / 2)
pub const fn default_subset_size(n_factors: usize) -> usize {
    n_factors.saturating_sub(1) / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_fit_config_default() {
        let config = FitConfig::default();
        assert_eq!(config.method, FitMethod::Ls);
        assert_eq!(config.selection, SelectionPolicy::Subsets);
        assert!(config.max_subset_size.is_none());
        assert_eq!(config.decay, 0.95);
    }

    #[rstest]
    #[case(1, 0)]
    #[case(2, 0)]
    #[case(3, 1)]
    #[case(4, 1)]
    #[case(5, 2)]
    #[case(10, 4)]
    fn test_default_subset_size(#[case] n_factors: usize, #[case] expected: usize) {
        assert_eq!(default_subset_size(n_factors), expected);
        let resolved = FitConfig::default().resolve(n_factors);
        assert_eq!(resolved.max_subset_size, Some(expected));
    }

    #[test]
    fn test_explicit_subset_size_is_kept() {
        let config = FitConfig {
            max_subset_size: Some(3),
            ..Default::default()
        };
        assert_eq!(config.resolve(10).max_subset_size, Some(3));
    }

    #[test]
    fn test_no_selection_leaves_subset_size_unset() {
        let resolved = FitConfig::without_selection(FitMethod::Dls).resolve(6);
        assert_eq!(resolved.selection, SelectionPolicy::None);
        assert!(resolved.max_subset_size.is_none());
        assert_eq!(resolved.method, FitMethod::Dls);
    }

    #[rstest]
    #[case("none", SelectionPolicy::None)]
    #[case("NONE", SelectionPolicy::None)]
    #[case("subsets", SelectionPolicy::Subsets)]
    #[case("stepwise", SelectionPolicy::Subsets)]
    #[case("lars", SelectionPolicy::Subsets)]
    #[case("", SelectionPolicy::Subsets)]
    fn test_selection_parse(#[case] name: &str, #[case] expected: SelectionPolicy) {
        assert_eq!(SelectionPolicy::parse(name), expected);
    }

    #[test]
    fn test_config_from_json() {
        let config: FitConfig =
            serde_json::from_str(r#"{"method": "DLS", "selection": "stepwise", "decay": 0.9}"#)
                .unwrap();
        assert_eq!(config.method, FitMethod::Dls);
        assert_eq!(config.selection, SelectionPolicy::Subsets);
        assert_eq!(config.decay, 0.9);

        let json = serde_json::to_string(&FitConfig::without_selection(FitMethod::Robust)).unwrap();
        assert!(json.contains(r#""selection":"none""#));
        assert!(json.contains(r#""method":"Robust""#));
    }
}
