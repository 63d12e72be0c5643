//! Time-ordered return and factor data
//!
//! Every series is keyed by an integer [`Ordinal`] rather than a calendar
//! date. Original and resampled data use the same key type, so alignment
//! behaves identically for both.

pub mod factors;
pub mod index;
pub mod returns;

pub use factors::FactorMatrix;
pub use index::{Alignment, Join, Ordinal, align, ordinal_sequence};
pub use returns::{ReturnSeries, ReturnsMatrix};

use thiserror::Error;

/// Errors raised while constructing or reshaping series
#[derive(Debug, Error)]
pub enum DataError {
    /// Two parallel collections disagree in length
    #[error("Length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        /// What was being matched
        what: &'static str,
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Ordinal index is not strictly increasing
    #[error("Index is not strictly increasing at position {position}")]
    NonMonotonicIndex {
        /// First offending position
        position: usize,
    },

    /// Factor matrix without any factor columns
    #[error("Factor matrix must have at least one factor")]
    NoFactors,

    /// Column name appears more than once
    #[error("Duplicate column name: {0}")]
    DuplicateName(String),

    /// Missing value after the first observed value
    #[error("Series {name} has a missing value at position {position} after its first observation")]
    InteriorMissing {
        /// Series name
        name: String,
        /// Position of the missing value
        position: usize,
    },

    /// Requested column does not exist
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Row position outside the matrix
    #[error("Row {row} out of bounds for {rows} rows")]
    RowOutOfBounds {
        /// Requested row
        row: usize,
        /// Number of rows
        rows: usize,
    },
}

/// Reject duplicated column names
pub(crate) fn check_unique_names(names: &[String]) -> Result<(), DataError> {
    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) {
            return Err(DataError::DuplicateName(name.clone()));
        }
    }
    Ok(())
}
