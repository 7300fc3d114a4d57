//! Per-capsule study progress.
//!
//! Each operation is an independent read-modify-write of one record;
//! concurrent writers resolve last-write-wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::capsule::Capsule;
use crate::error::{Error, Result, ValidationError};
use crate::storage::{put_json, read_json, Keys, RecordStore};

/// Highest possible quiz score.
pub const MAX_SCORE: u8 = 100;

/// Study state for one capsule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    /// Known (`true`), unknown (`false`) or not yet marked (`None`), per card.
    #[serde(default)]
    pub flashcard_status: Vec<Option<bool>>,
    /// Best quiz score so far, 0..=100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_score: Option<u8>,
    /// When the capsule was last studied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_studied: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// Status of card `index`, or `None` if never marked.
    #[must_use]
    pub fn status(&self, index: usize) -> Option<bool> {
        self.flashcard_status.get(index).copied().flatten()
    }
}

/// Result of recording a quiz score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreOutcome {
    /// The score just recorded.
    pub score: u8,
    /// The best score after recording.
    pub best: u8,
    /// Whether `score` beat the previous best.
    pub new_best: bool,
}

/// Reads and writes progress records.
#[derive(Debug)]
pub struct ProgressService<'a> {
    store: &'a dyn RecordStore,
    keys: Keys,
}

impl<'a> ProgressService<'a> {
    /// Create a service over `store` using the key layout in `keys`.
    #[must_use]
    pub fn new(store: &'a dyn RecordStore, keys: Keys) -> Self {
        Self { store, keys }
    }

    /// The stored record, or an empty one.
    ///
    /// Never fails: unreadable records are logged and treated as empty.
    #[must_use]
    pub fn load_progress(&self, id: &str) -> ProgressRecord {
        match read_json(self.store, &self.keys.progress(id)) {
            Ok(Some(record)) => record,
            Ok(None) => ProgressRecord::default(),
            Err(e) => {
                warn!("Ignoring unreadable progress for {}: {}", id, e);
                ProgressRecord::default()
            }
        }
    }

    /// Replace the stored record and stamp `last_studied`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the record cannot be written.
    pub fn save_progress(&self, id: &str, mut record: ProgressRecord) -> Result<ProgressRecord> {
        record.last_studied = Some(Utc::now());
        self.store
            .apply(&[put_json(self.keys.progress(id), &record)?])?;
        debug!("Saved progress for {}", id);
        Ok(record)
    }

    /// Mark flashcard `index` as known or unknown.
    ///
    /// The capsule must exist and have a card at `index`, so status never
    /// grows past the capsule's card count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapsuleNotFound`] for an unknown capsule,
    /// [`ValidationError::FlashcardOutOfRange`] for a position past the last
    /// card, or a storage error if the record cannot be written.
    pub fn record_flashcard_status(
        &self,
        id: &str,
        index: usize,
        known: bool,
    ) -> Result<ProgressRecord> {
        let count = self.card_count(id)?;
        if index >= count {
            return Err(ValidationError::FlashcardOutOfRange { index, count }.into());
        }

        let mut record = self.load_progress(id);
        if record.flashcard_status.len() <= index {
            // index < count, so this cannot overflow
            record.flashcard_status.resize(index + 1, None);
        }
        record.flashcard_status[index] = Some(known);
        self.save_progress(id, record)
    }

    /// Record a quiz score, keeping the best one.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ScoreOutOfRange`] for scores above 100, or a
    /// storage error if the record cannot be written.
    pub fn record_best_score(&self, id: &str, score: u32) -> Result<ScoreOutcome> {
        let score = u8::try_from(score)
            .ok()
            .filter(|s| *s <= MAX_SCORE)
            .ok_or(ValidationError::ScoreOutOfRange(score))?;

        let mut record = self.load_progress(id);
        let previous = record.best_score.unwrap_or(0);
        let best = previous.max(score);
        record.best_score = Some(best);
        self.save_progress(id, record)?;

        let new_best = score > previous;
        if new_best {
            info!("New best score for {}: {}%", id, score);
        }
        Ok(ScoreOutcome {
            score,
            best,
            new_best,
        })
    }

    fn card_count(&self, id: &str) -> Result<usize> {
        let capsule: Capsule =
            read_json(self.store, &self.keys.capsule(id))?.ok_or_else(|| Error::not_found(id))?;
        Ok(capsule.flashcards.len())
    }
}
