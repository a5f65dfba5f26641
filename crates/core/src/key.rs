//! Logical key paths and the composite primary key they map onto.
//!
//! A caller addresses cached state with an ordered list of segments. The first
//! segment is the *base key* (usually an account address); the rest is the
//! *sub path*, which is serialized into a stable string so that scalar and
//! array lookups for the same logical path land on the same `path_str`.
//!
//! Every persisted row is identified by `(protocol, base_key, path_str, index)`.
//! Scalars live at [`SCALAR_INDEX`]; array elements occupy `0..len` densely.

use crate::{Error, Result};
use std::fmt;

/// Reserved index marking a scalar entry.
pub const SCALAR_INDEX: i64 = -1;

/// Highest index an array element may occupy.
pub const MAX_INDEX: i64 = i64::MAX;

/// A caller-supplied logical key: a bare string or an ordered segment list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    /// Create a key path from ordered segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Split into `(base_key, sub_path)`, or `None` for an empty path.
    pub fn split(&self) -> Option<(&str, &[String])> {
        self.0
            .split_first()
            .map(|(base, rest)| (base.as_str(), rest))
    }

    /// Normalize into a base key and encoded sub path.
    ///
    /// Fails with [`Error::EmptyKeyPath`] when there is no base key.
    pub fn resolve(&self) -> Result<ResolvedKey> {
        let (base_key, sub_path) = self.split().ok_or(Error::EmptyKeyPath)?;
        Ok(ResolvedKey {
            base_key: base_key.to_string(),
            path_str: encode_path(sub_path)?,
        })
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl From<&str> for KeyPath {
    fn from(key: &str) -> Self {
        Self(vec![key.to_string()])
    }
}

impl From<String> for KeyPath {
    fn from(key: String) -> Self {
        Self(vec![key])
    }
}

impl From<Vec<String>> for KeyPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl From<Vec<&str>> for KeyPath {
    fn from(segments: Vec<&str>) -> Self {
        Self::new(segments)
    }
}

impl From<&[&str]> for KeyPath {
    fn from(segments: &[&str]) -> Self {
        Self::new(segments.iter().copied())
    }
}

impl From<&[String]> for KeyPath {
    fn from(segments: &[String]) -> Self {
        Self(segments.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for KeyPath {
    fn from(segments: [&str; N]) -> Self {
        Self::new(segments)
    }
}

/// A normalized key path: base key plus the stable encoding of its sub path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResolvedKey {
    base_key: String,
    path_str: String,
}

impl ResolvedKey {
    pub fn base_key(&self) -> &str {
        &self.base_key
    }

    pub fn path_str(&self) -> &str {
        &self.path_str
    }

    /// Decode the sub path segments.
    pub fn path(&self) -> Result<Vec<String>> {
        decode_path(&self.path_str)
    }

    /// Primary key of the scalar entry at this path.
    pub fn scalar_key(&self, protocol: &str) -> EntryKey {
        self.entry_key(protocol, SCALAR_INDEX)
    }

    /// Primary key of array element `index` at this path.
    pub fn element_key(&self, protocol: &str, index: u64) -> Result<EntryKey> {
        let index = i64::try_from(index)
            .map_err(|_| Error::InvalidPath(format!("array index {index} out of range")))?;
        Ok(self.entry_key(protocol, index))
    }

    fn entry_key(&self, protocol: &str, index: i64) -> EntryKey {
        EntryKey {
            protocol: protocol.to_string(),
            base_key: self.base_key.clone(),
            path_str: self.path_str.clone(),
            index,
        }
    }
}

/// The store's composite primary key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey {
    pub protocol: String,
    pub base_key: String,
    pub path_str: String,
    pub index: i64,
}

impl EntryKey {
    pub fn is_scalar(&self) -> bool {
        self.index == SCALAR_INDEX
    }
}

/// Serialize a sub path as a JSON array of strings.
///
/// The encoding is injective: `["a", "b/c"]` and `["a", "b", "c"]` never collide.
pub fn encode_path(sub_path: &[String]) -> Result<String> {
    Ok(serde_json::to_string(sub_path)?)
}

/// Inverse of [`encode_path`].
pub fn decode_path(path_str: &str) -> Result<Vec<String>> {
    serde_json::from_str(path_str)
        .map_err(|e| Error::InvalidPath(format!("{path_str:?}: {e}")))
}
