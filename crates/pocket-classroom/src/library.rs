//! Capsule service: the only writer of capsule documents and the index.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::capsule::{Capsule, IndexEntry};
use crate::error::{Error, Result};
use crate::storage::{put_json, read_json, Keys, RecordStore, WriteOp};
use crate::transfer::{self, ExportEnvelope};

/// Creates, updates, deletes, lists, exports and imports capsules.
#[derive(Debug)]
pub struct CapsuleService<'a> {
    store: &'a dyn RecordStore,
    keys: Keys,
}

/// Generate a fresh capsule id.
#[must_use]
pub fn new_capsule_id() -> String {
    Uuid::new_v4().simple().to_string()
}

impl<'a> CapsuleService<'a> {
    /// Create a service over `store` using the key layout in `keys`.
    #[must_use]
    pub fn new(store: &'a dyn RecordStore, keys: Keys) -> Self {
        Self { store, keys }
    }

    /// Validate and persist a capsule, returning its id.
    ///
    /// A capsule without an id is new and gets an id and `created_at`. An
    /// existing capsule keeps the `created_at` already on disk. The document
    /// and its index entry are written together; on error nothing is written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the capsule is rejected, or a storage
    /// error if it cannot be written.
    pub fn save(&self, capsule: Capsule) -> Result<String> {
        let mut capsule = capsule.normalized()?;
        let now = Utc::now();

        let id = match capsule.id.take().filter(|id| !id.trim().is_empty()) {
            Some(id) => {
                let stored: Option<Capsule> = read_json(self.store, &self.keys.capsule(&id))?;
                capsule.created_at = stored
                    .and_then(|c| c.created_at)
                    .or(capsule.created_at)
                    .or(Some(now));
                id
            }
            None => {
                capsule.created_at = Some(now);
                new_capsule_id()
            }
        };
        capsule.id = Some(id.clone());
        capsule.last_updated = Some(now);

        let entry = IndexEntry::from_capsule(&capsule)
            .ok_or_else(|| Error::internal("saved capsule is missing id or timestamp"))?;
        let mut index = self.list_index()?;
        match index.iter_mut().find(|e| e.id == id) {
            Some(existing) => *existing = entry,
            None => index.push(entry),
        }

        self.store.apply(&[
            put_json(self.keys.capsule(&id), &capsule)?,
            put_json(self.keys.index(), &index)?,
        ])?;

        info!("Saved capsule {} ({})", id, capsule.title);
        Ok(id)
    }

    /// Load a capsule document.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be read or decoded.
    pub fn load(&self, id: &str) -> Result<Option<Capsule>> {
        read_json(self.store, &self.keys.capsule(id))
    }

    /// Load a capsule, treating absence as an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapsuleNotFound`] if there is no such capsule.
    pub fn require(&self, id: &str) -> Result<Capsule> {
        self.load(id)?.ok_or_else(|| Error::not_found(id))
    }

    /// Delete a capsule, its index entry and its progress record.
    ///
    /// All three are removed in one batch. Returns `false` if no document
    /// existed; any stale index entry is still removed.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the batch cannot be applied.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let capsule_key = self.keys.capsule(id);
        let existed = self.store.get(&capsule_key)?.is_some();

        let mut index = self.list_index()?;
        let before = index.len();
        index.retain(|e| e.id != id);
        if !existed && index.len() == before {
            debug!("Delete of unknown capsule {}", id);
            return Ok(false);
        }

        self.store.apply(&[
            WriteOp::delete(capsule_key),
            put_json(self.keys.index(), &index)?,
            WriteOp::delete(self.keys.progress(id)),
        ])?;

        if existed {
            info!("Deleted capsule {}", id);
        } else {
            warn!("Removed stale index entry for missing capsule {}", id);
        }
        Ok(existed)
    }

    /// All index entries, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be read or decoded.
    pub fn list_index(&self) -> Result<Vec<IndexEntry>> {
        Ok(read_json(self.store, &self.keys.index())?.unwrap_or_default())
    }

    /// Export a capsule as pretty-printed JSON, or `None` if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the capsule cannot be read or serialized.
    pub fn export(&self, id: &str) -> Result<Option<String>> {
        let Some(capsule) = self.load(id)? else {
            return Ok(None);
        };
        ExportEnvelope::new(capsule).to_json_pretty().map(Some)
    }

    /// Import an exported document as a new capsule, returning its id.
    ///
    /// The source id and creation time are discarded so the import never
    /// collides with a local copy of the same capsule.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the document is rejected; storage is
    /// untouched in that case.
    pub fn import(&self, json_text: &str) -> Result<String> {
        let capsule = transfer::parse_import(json_text)?;
        let id = self.save(capsule)?;
        info!("Imported capsule {}", id);
        Ok(id)
    }
}
