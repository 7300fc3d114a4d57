//! `pocket-classroom` - local study capsules
//!
//! This library stores capsules of notes, flashcards, quiz questions and
//! resource links in a key-value record store, tracks per-capsule study
//! progress, and moves capsules in and out as versioned JSON exports.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod capsule;
pub mod cli;
pub mod config;
pub mod error;
pub mod library;
pub mod logging;
pub mod progress;
pub mod storage;
pub mod study;
pub mod transfer;

pub use capsule::{Capsule, Flashcard, IndexEntry, Level, QuizQuestion, Resource};
pub use config::Config;
pub use error::{Error, Result, ValidationError};
pub use library::CapsuleService;
pub use logging::init_logging;
pub use progress::{ProgressRecord, ProgressService, ScoreOutcome};
pub use storage::{Keys, MemoryStore, RecordStore, SqliteStore, StoreStats};
