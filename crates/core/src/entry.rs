//! Scalar cells and array elements sharing one key space.

use crate::key::{MAX_INDEX, SCALAR_INDEX};
use crate::{Error, Result, StateValue};

/// One persisted row, viewed by role.
///
/// Scalars and array elements for the same `(protocol, base_key, path_str)`
/// are told apart only by their index; callers use one shape per path.
#[derive(Clone, Debug, PartialEq)]
pub enum CacheEntry {
    Scalar(StateValue),
    ArrayElement { index: u64, value: StateValue },
}

impl CacheEntry {
    /// Classify a stored `(index, value)` pair.
    pub fn from_stored(index: i64, value: StateValue) -> Result<Self> {
        match index {
            SCALAR_INDEX => Ok(CacheEntry::Scalar(value)),
            i if i >= 0 => Ok(CacheEntry::ArrayElement {
                index: i as u64,
                value,
            }),
            other => Err(Error::InvalidPath(format!("negative array index {other}"))),
        }
    }

    /// Index as persisted. Element indices above `MAX_INDEX` have no stored form.
    pub fn stored_index(&self) -> Result<i64> {
        match self {
            CacheEntry::Scalar(_) => Ok(SCALAR_INDEX),
            CacheEntry::ArrayElement { index, .. } => i64::try_from(*index)
                .map_err(|_| Error::InvalidPath(format!("array index {index} exceeds {MAX_INDEX}"))),
        }
    }

    pub fn is_array_item(&self) -> bool {
        matches!(self, CacheEntry::ArrayElement { .. })
    }
}
