//! In-process record store.

use std::cell::RefCell;
use std::collections::BTreeMap;

use tracing::{trace, warn};

use super::{RecordStore, WriteOp};
use crate::error::{Error, Result};

/// A record store held in memory.
///
/// An optional quota caps the total bytes of keys plus values. Writes that
/// would exceed it fail with [`Error::QuotaExceeded`] and leave the store
/// unchanged.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RefCell<BTreeMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    /// Create an empty, unbounded store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store limited to `quota` bytes.
    #[must_use]
    pub fn with_quota(quota: usize) -> Self {
        Self {
            records: RefCell::new(BTreeMap::new()),
            quota: Some(quota),
        }
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    /// Check if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    fn used_bytes(records: &BTreeMap<String, String>) -> usize {
        records.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.records.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.apply(&[WriteOp::put(key, value)])
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let removed = self.records.borrow_mut().remove(key).is_some();
        trace!("Deleted {} (present: {})", key, removed);
        Ok(removed)
    }

    fn apply(&self, batch: &[WriteOp]) -> Result<()> {
        let mut records = self.records.borrow_mut();
        let mut staged = records.clone();

        for op in batch {
            match op {
                WriteOp::Put { key, value } => {
                    staged.insert(key.clone(), value.clone());
                    if let Some(quota) = self.quota {
                        if Self::used_bytes(&staged) > quota {
                            warn!("Quota of {} bytes exceeded writing {}", quota, key);
                            return Err(Error::QuotaExceeded {
                                key: key.clone(),
                                quota,
                            });
                        }
                    }
                }
                WriteOp::Delete { key } => {
                    staged.remove(key);
                }
            }
        }

        *records = staged;
        trace!("Applied batch of {} operations", batch.len());
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .records
            .borrow()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_delete() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v".to_string()));
        assert_eq!(store.len(), 1);

        assert!(store.delete("k").unwrap());
        assert!(!store.delete("k").unwrap());
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_set_overwrites() {
        let store = MemoryStore::new();
        store.set("k", "one").unwrap();
        store.set("k", "two").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("two".to_string()));
    }

    #[test]
    fn test_apply_batch() {
        let store = MemoryStore::new();
        store.set("old", "x").unwrap();

        store
            .apply(&[
                WriteOp::put("a", "1"),
                WriteOp::put("b", "2"),
                WriteOp::delete("old"),
            ])
            .unwrap();

        assert_eq!(store.keys_with_prefix("").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_quota_rejects_whole_batch() {
        let store = MemoryStore::with_quota(10);
        store.set("a", "1234").unwrap();

        let err = store
            .apply(&[WriteOp::delete("a"), WriteOp::put("big", "0123456789")])
            .unwrap_err();
        assert!(matches!(err, Error::QuotaExceeded { .. }));

        // First op of the failed batch was not applied
        assert_eq!(store.get("a").unwrap(), Some("1234".to_string()));
        assert!(store.get("big").unwrap().is_none());
    }

    #[test]
    fn test_keys_with_prefix_sorted() {
        let store = MemoryStore::new();
        store.set("p_b", "").unwrap();
        store.set("p_a", "").unwrap();
        store.set("q_a", "").unwrap();

        assert_eq!(store.keys_with_prefix("p_").unwrap(), vec!["p_a", "p_b"]);
    }
}
