//! Factor return matrix

use super::index::{Ordinal, check_increasing, ordinal_sequence};
use super::{DataError, check_unique_names};
use ndarray::{Array2, ArrayView1, Axis};

/// Factor returns (T x K) keyed by ordinal, one named column per factor
#[derive(Debug, Clone, PartialEq)]
pub struct FactorMatrix {
    names: Vec<String>,
    index: Vec<Ordinal>,
    values: Array2<f64>,
}

impl FactorMatrix {
    /// Create a factor matrix
    ///
    /// Requires at least one factor, unique names and a strictly increasing
    /// index. Missing values (`NaN`) are allowed and removed by
    /// [`FactorMatrix::complete_cases`].
    pub fn new(
        names: Vec<String>,
        index: Vec<Ordinal>,
        values: Array2<f64>,
    ) -> Result<Self, DataError> {
        let (rows, cols) = values.dim();
        if cols == 0 || names.is_empty() {
            return Err(DataError::NoFactors);
        }
        if names.len() != cols {
            return Err(DataError::LengthMismatch {
                what: "factor names",
                expected: cols,
                actual: names.len(),
            });
        }
        if index.len() != rows {
            return Err(DataError::LengthMismatch {
                what: "factor index",
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

    /// Create a factor matrix keyed `1..=n`
    pub fn from_values(names: Vec<String>, values: Array2<f64>) -> Result<Self, DataError> {
        let index = ordinal_sequence(values.nrows());
        Self::new(names, index, values)
    }

    /// Factor names
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Ordinal index
    pub fn index(&self) -> &[Ordinal] {
        &self.index
    }

    /// Raw values (T x K)
    pub const fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Number of rows
    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    /// Number of factors
    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    /// Column by factor name
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|j| self.values.column(j))
    }

    /// Drop every row containing a missing value
    pub fn complete_cases(&self) -> Self {
        let rows: Vec<usize> = self
            .values
            .outer_iter()
            .enumerate()
            .filter(|(_, row)| row.iter().all(|v| !v.is_nan()))
            .map(|(i, _)| i)
            .collect();

        if rows.len() == self.nrows() {
            return self.clone();
        }

        Self {
            names: self.names.clone(),
            index: rows.iter().map(|&i| self.index[i]).collect(),
            values: self.values.select(Axis(0), &rows),
        }
    }

    /// Keep only the given column positions, in the given order
    pub fn select_columns(&self, columns: &[usize]) -> Result<Self, DataError> {
        if columns.is_empty() {
            return Err(DataError::NoFactors);
        }
        if let Some(&bad) = columns.iter().find(|&&c| c >= self.ncols()) {
            return Err(DataError::UnknownColumn(format!("#{bad}")));
        }

        Self::new(
            columns.iter().map(|&c| self.names[c].clone()).collect(),
            self.index.clone(),
            self.values.select(Axis(1), columns),
        )
    }

    /// Keep only the named factors
    pub fn select_names(&self, names: &[String]) -> Result<Self, DataError> {
        let columns = names
            .iter()
            .map(|name| {
                self.names
                    .iter()
                    .position(|n| n == name)
                    .ok_or_else(|| DataError::UnknownColumn(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.select_columns(&columns)
    }

    /// Keep the given rows, re-keyed with `index`
    ///
    /// Rows may repeat, which is how bootstrap resamples are materialised.
    pub fn take_rows(&self, rows: &[usize], index: Vec<Ordinal>) -> Result<Self, DataError> {
        if let Some(&bad) = rows.iter().find(|&&r| r >= self.nrows()) {
            return Err(DataError::RowOutOfBounds {
                row: bad,
                rows: self.nrows(),
            });
        }
        Self::new(
            self.names.clone(),
            index,
            self.values.select(Axis(0), rows),
        )
    }
}
