//! Core domain types for the chaincache protocol state cache.
//!
//! This crate defines the pieces every backend shares:
//! - Key paths and their normalization into `(base_key, sub_path)`
//! - The composite primary key and the scalar sentinel index
//! - Cached values with lossless 256-bit integer serialization
//! - Configuration

pub mod config;
pub mod entry;
pub mod error;
pub mod key;
pub mod value;

pub use entry::CacheEntry;
pub use error::{Error, Result};
pub use key::{EntryKey, KeyPath, MAX_INDEX, ResolvedKey, SCALAR_INDEX, decode_path, encode_path};
pub use primitive_types::U256;
pub use value::{StateValue, WIDE_INTEGER_TAG};
