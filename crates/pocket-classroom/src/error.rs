//! Error types for pocket-classroom.
//!
//! Storage failures, configuration problems and capsule validation failures
//! all surface through [`Error`]. Validation failures carry a
//! [`ValidationError`] so the presentation layer can tell a rejected capsule
//! apart from a broken database.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for pocket-classroom operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// A stored value could not be decoded.
    #[error("corrupt record at key '{key}': {source}")]
    CorruptRecord {
        /// The record key.
        key: String,
        /// The decode failure.
        #[source]
        source: serde_json::Error,
    },

    /// A write would exceed the store's capacity.
    #[error("storage quota of {quota} bytes exceeded writing '{key}'")]
    QuotaExceeded {
        /// The key being written.
        key: String,
        /// Store capacity in bytes.
        quota: usize,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Domain Errors ===
    /// A capsule or import document was rejected.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// No capsule exists with the given id.
    #[error("capsule not found: {id}")]
    CapsuleNotFound {
        /// The requested capsule id.
        id: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Reasons a capsule, import document or study result is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The capsule title is empty.
    #[error("capsule title is required")]
    MissingTitle,

    /// An imported title is missing or not a string.
    #[error("capsule title is required and must be a string")]
    InvalidTitle,

    /// A resource URL does not parse.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// No notes, flashcards, quiz questions or resources remain.
    #[error("capsule must contain at least one note, flashcard, quiz question, or resource")]
    EmptyCapsule,

    /// A quiz answer index names a blank or missing option.
    #[error("question '{question}' has no usable option at index {index}")]
    InvalidCorrectIndex {
        /// The question text.
        question: String,
        /// The rejected index.
        index: usize,
    },

    /// An import document carries the wrong schema tag.
    #[error("invalid schema '{found}', expected 'pocket-classroom/v1'")]
    SchemaMismatch {
        /// The schema value found, or empty if absent.
        found: String,
    },

    /// An import document is not valid capsule JSON.
    #[error("malformed import document: {0}")]
    MalformedImport(String),

    /// A quiz score outside 0..=100.
    #[error("score {0} is outside 0..=100")]
    ScoreOutOfRange(u32),

    /// A flashcard position past the end of the capsule's cards.
    #[error("flashcard {index} does not exist ({count} cards)")]
    FlashcardOutOfRange {
        /// The rejected position.
        index: usize,
        /// Cards in the capsule.
        count: usize,
    },
}

/// A specialized Result type for pocket-classroom operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a capsule-not-found error.
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::CapsuleNotFound { id: id.into() }
    }

    /// Check if this error is a rejected capsule or document.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this error indicates a missing capsule.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::CapsuleNotFound { .. })
    }

    /// The validation failure, if this is one.
    #[must_use]
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(v) => Some(v),
            _ => None,
        }
    }
}
