//! Asset return series
//!
//! A [`ReturnSeries`] holds exactly one asset. Missing observations are `NaN`
//! and may only appear before the first observed value, so an asset with a
//! short history is a full-length series with a missing prefix.

use super::index::{Ordinal, check_increasing, ordinal_sequence};
use super::{DataError, check_unique_names};
use ndarray::{Array1, Array2, ArrayView1};

/// Returns of a single asset keyed by ordinal
#[derive(Debug, Clone)]
pub struct ReturnSeries {
    name: String,
    index: Vec<Ordinal>,
    values: Array1<f64>,
}

impl ReturnSeries {
    /// Create a series, validating the index and the missing-prefix layout
    pub fn new(
        name: impl Into<String>,
        index: Vec<Ordinal>,
        values: Array1<f64>,
    ) -> Result<Self, DataError> {
        let name = name.into();
        if index.len() != values.len() {
            return Err(DataError::LengthMismatch {
                what: "return index",
                expected: values.len(),
                actual: index.len(),
            });
        }
        check_increasing(&index)?;

        if let Some(first) = values.iter().position(|v| !v.is_nan()) {
            if let Some(offset) = values.iter().skip(first).position(|v| v.is_nan()) {
                return Err(DataError::InteriorMissing {
                    name,
                    position: first + offset,
                });
            }
        }

        Ok(Self {
            name,
            index,
            values,
        })
    }

    /// Create a series keyed `1..=n`
    pub fn from_values(name: impl Into<String>, values: Array1<f64>) -> Result<Self, DataError> {
        let index = ordinal_sequence(values.len());
        Self::new(name, index, values)
    }

    /// Asset name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordinal index
    pub fn index(&self) -> &[Ordinal] {
        &self.index
    }

    /// Values, `NaN` where missing
    pub const fn values(&self) -> &Array1<f64> {
        &self.values
    }

    /// Total number of rows, missing prefix included
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series has no rows at all
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Zero-based position of the first observed value
    pub fn first_observed(&self) -> Option<usize> {
        self.values.iter().position(|v| !v.is_nan())
    }

    /// Length of the observed suffix
    pub fn observed_len(&self) -> usize {
        self.first_observed().map_or(0, |first| self.len() - first)
    }

    /// Observed values only
    pub fn observed(&self) -> ArrayView1<'_, f64> {
        let first = self.first_observed().unwrap_or(self.len());
        self.values.slice(ndarray::s![first..])
    }
}

/// Returns of several assets sharing one ordinal index
#[derive(Debug, Clone)]
pub struct ReturnsMatrix {
    names: Vec<String>,
    index: Vec<Ordinal>,
    values: Array2<f64>,
}

impl ReturnsMatrix {
    /// Create a matrix with one column per asset
    ///
    /// Column layout is not validated here; [`ReturnsMatrix::column`] checks
    /// each asset individually so that one malformed asset does not reject
    /// the whole batch.
    pub fn new(
        names: Vec<String>,
        index: Vec<Ordinal>,
        values: Array2<f64>,
    ) -> Result<Self, DataError> {
        let (rows, cols) = values.dim();
        if names.len() != cols {
            return Err(DataError::LengthMismatch {
                what: "asset names",
                expected: cols,
                actual: names.len(),
            });
        }
        if index.len() != rows {
            return Err(DataError::LengthMismatch {
                what: "returns index",
                expected: rows,
                actual: index.len(),
            });
        }
        check_increasing(&index)?;
        check_unique_names(&names)?;

        Ok(Self {
            names,
            index,
            values,
        })
    }

    /// Create a matrix keyed `1..=n`
    pub fn from_values(names: Vec<String>, values: Array2<f64>) -> Result<Self, DataError> {
        let index = ordinal_sequence(values.nrows());
        Self::new(names, index, values)
    }

    /// Asset names
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Ordinal index
    pub fn index(&self) -> &[Ordinal] {
        &self.index
    }

    /// Raw values (T x N)
    pub const fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Number of assets
    pub fn n_assets(&self) -> usize {
        self.names.len()
    }

    /// Number of rows
    pub fn nrows(&self) -> usize {
        self.index.len()
    }

    /// Extract one asset as a validated series
    pub fn column(&self, position: usize) -> Result<ReturnSeries, DataError> {
        let name = self
            .names
            .get(position)
            .ok_or_else(|| DataError::UnknownColumn(format!("#{position}")))?;
        ReturnSeries::new(
            name.clone(),
            self.index.clone(),
            self.values.column(position).to_owned(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, array};

    #[test]
    fn test_missing_prefix_is_accepted() {
        let series =
            ReturnSeries::from_values("A", array![f64::NAN, f64::NAN, 0.01, 0.02, -0.01]).unwrap();
        assert_eq!(series.len(), 5);
        assert_eq!(series.first_observed(), Some(2));
        assert_eq!(series.observed_len(), 3);
        assert_eq!(series.observed().len(), 3);
    }

    #[test]
    fn test_interior_missing_is_rejected() {
        let result = ReturnSeries::from_values("A", array![0.01, f64::NAN, 0.02]);
        assert!(matches!(
            result,
            Err(DataError::InteriorMissing { position: 1, .. })
        ));
    }

    #[test]
    fn test_all_missing_has_no_observations() {
        let series = ReturnSeries::from_values("A", Array1::from_elem(4, f64::NAN)).unwrap();
        assert_eq!(series.first_observed(), None);
        assert_eq!(series.observed_len(), 0);
        assert!(series.observed().is_empty());
    }

    #[test]
    fn test_index_length_mismatch() {
        let result = ReturnSeries::new("A", ordinal_sequence(2), array![0.1, 0.2, 0.3]);
        assert!(matches!(result, Err(DataError::LengthMismatch { .. })));
    }

    #[test]
    fn test_returns_matrix_columns() {
        let values = array![[f64::NAN, 0.01], [0.02, 0.03], [0.01, -0.02]];
        let matrix = ReturnsMatrix::from_values(vec!["A".into(), "B".into()], values).unwrap();
        assert_eq!(matrix.n_assets(), 2);

        let a = matrix.column(0).unwrap();
        assert_eq!(a.name(), "A");
        assert_eq!(a.observed_len(), 2);
        assert!(matrix.column(2).is_err());
    }

    #[test]
    fn test_returns_matrix_rejects_duplicate_names() {
        let values = Array2::<f64>::zeros((3, 2));
        let result = ReturnsMatrix::from_values(vec!["A".into(), "A".into()], values);
        assert!(matches!(result, Err(DataError::DuplicateName(_))));
    }
}
