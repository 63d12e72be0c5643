//! Ordinal observation index and index alignment
//!
//! An [`Ordinal`] is a plain integer key. The only property the engine relies
//! on is strict monotonicity: two rows with the same ordinal refer to the same
//! observation. Bootstrap resamples are re-keyed `1..=n`, which keeps them
//! evenly spaced without any calendar semantics.

use super::DataError;
use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Integer observation key
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    From,
    Into,
    Serialize,
    Deserialize,
)]
pub struct Ordinal(u64);

impl Ordinal {
    /// Create an ordinal from its raw value
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw integer value
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Evenly spaced index `1..=len`
pub fn ordinal_sequence(len: usize) -> Vec<Ordinal> {
    (1..=len as u64).map(Ordinal).collect()
}

/// Validate that an index is strictly increasing
pub(crate) fn check_increasing(index: &[Ordinal]) -> Result<(), DataError> {
    match index.windows(2).position(|w| w[0] >= w[1]) {
        Some(position) => Err(DataError::NonMonotonicIndex {
            position: position + 1,
        }),
        None => Ok(()),
    }
}

/// Join semantics for [`align`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Join {
    /// Keep ordinals present on both sides
    Inner,
    /// Keep ordinals present on either side
    Outer,
}

/// Result of aligning two sorted indices
///
/// `left[i]` and `right[i]` hold the source row of `index[i]` on each side,
/// or `None` when that side has no observation for the ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    /// Combined index
    pub index: Vec<Ordinal>,
    /// Source rows on the left side
    pub left: Vec<Option<usize>>,
    /// Source rows on the right side
    pub right: Vec<Option<usize>>,
}

impl Alignment {
    /// Number of aligned rows
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the alignment is empty
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Merge two strictly increasing indices
pub fn align(left: &[Ordinal], right: &[Ordinal], join: Join) -> Alignment {
    let capacity = match join {
        Join::Inner => left.len().min(right.len()),
        Join::Outer => left.len().max(right.len()),
    };
    let mut out = Alignment {
        index: Vec::with_capacity(capacity),
        left: Vec::with_capacity(capacity),
        right: Vec::with_capacity(capacity),
    };

    let (mut i, mut j) = (0, 0);
    while i < left.len() || j < right.len() {
        let step = match (left.get(i), right.get(j)) {
            (Some(l), Some(r)) if l == r => (Some(i), Some(j), *l),
            (Some(l), Some(r)) if l < r => (Some(i), None, *l),
            (Some(_), Some(r)) => (None, Some(j), *r),
            (Some(l), None) => (Some(i), None, *l),
            (None, Some(r)) => (None, Some(j), *r),
            (None, None) => break,
        };
        let (li, rj, key) = step;
        if li.is_some() {
            i += 1;
        }
        if rj.is_some() {
            j += 1;
        }
        if join == Join::Inner && (li.is_none() || rj.is_none()) {
            continue;
        }
        out.index.push(key);
        out.left.push(li);
        out.right.push(rj);
    }

    out
}
