//! Record storage for pocket-classroom.
//!
//! A [`RecordStore`] is a flat key-value namespace of raw string values. It
//! knows nothing about capsules: the services encode and decode JSON on top
//! of it. Two backends are provided, [`SqliteStore`] for durable storage and
//! [`MemoryStore`] for tests and throwaway sessions.

pub mod keys;
mod memory;
pub mod migrations;
pub mod schema;
mod sqlite;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::{Error, Result};

pub use keys::Keys;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A single write in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Store `value` under `key`, replacing any existing value.
    Put {
        /// Record key.
        key: String,
        /// Raw value.
        value: String,
    },
    /// Remove `key` if present.
    Delete {
        /// Record key.
        key: String,
    },
}

impl WriteOp {
    /// Create a put operation.
    #[must_use]
    pub fn put(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a delete operation.
    #[must_use]
    pub fn delete(key: impl Into<String>) -> Self {
        Self::Delete { key: key.into() }
    }

    /// The key this operation touches.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Put { key, .. } | Self::Delete { key } => key,
        }
    }
}

/// Key-value persistence over raw strings.
///
/// Implementations log failures and return them as [`Error`]s; they never
/// panic on a bad backend.
pub trait RecordStore: std::fmt::Debug {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written or is full.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Returns `true` if a value was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn delete(&self, key: &str) -> Result<bool>;

    /// Apply every operation in `batch`, or none of them.
    ///
    /// # Errors
    ///
    /// Returns an error if any operation fails; the store is left unchanged.
    fn apply(&self, batch: &[WriteOp]) -> Result<()>;

    /// List keys starting with `prefix`, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Size of the backing storage in bytes, if known.
    fn size_bytes(&self) -> u64 {
        0
    }
}

/// Statistics about a record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of capsule documents.
    pub capsules: usize,
    /// Number of progress records.
    pub progress_records: usize,
    /// Size of the backing storage in bytes (0 for memory stores).
    pub size_bytes: u64,
}

/// Collect statistics for the records under `keys`.
///
/// # Errors
///
/// Returns an error if keys cannot be listed.
pub fn stats(store: &dyn RecordStore, keys: &Keys) -> Result<StoreStats> {
    Ok(StoreStats {
        capsules: store.keys_with_prefix(&keys.capsule_prefix())?.len(),
        progress_records: store.keys_with_prefix(&keys.progress_prefix())?.len(),
        size_bytes: store.size_bytes(),
    })
}

/// Read and decode a JSON record.
pub(crate) fn read_json<T: DeserializeOwned>(
    store: &dyn RecordStore,
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw).map(Some).map_err(|source| {
        warn!("Corrupt record at {}: {}", key, source);
        Error::CorruptRecord {
            key: key.to_string(),
            source,
        }
    })
}

/// Encode a value as a JSON put operation.
pub(crate) fn put_json<T: Serialize>(key: impl Into<String>, value: &T) -> Result<WriteOp> {
    Ok(WriteOp::put(key, serde_json::to_string(value)?))
}
