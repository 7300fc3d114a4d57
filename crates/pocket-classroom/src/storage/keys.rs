//! Record key layout.
//!
//! All records share one flat namespace:
//!
//! | Key | Value |
//! |---|---|
//! | `<prefix>capsules_index` | JSON array of index entries |
//! | `<prefix>capsule_<id>` | JSON capsule document |
//! | `<prefix>progress_<id>` | JSON progress record |

/// Prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "pc_";

const INDEX_SUFFIX: &str = "capsules_index";
const CAPSULE_SEGMENT: &str = "capsule_";
const PROGRESS_SEGMENT: &str = "progress_";

/// Builds record keys for a given prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keys {
    prefix: String,
}

impl Default for Keys {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl Keys {
    /// Create a key builder for `prefix`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The configured prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Key of the capsule summary index.
    #[must_use]
    pub fn index(&self) -> String {
        format!("{}{INDEX_SUFFIX}", self.prefix)
    }

    /// Key of a capsule document.
    #[must_use]
    pub fn capsule(&self, id: &str) -> String {
        format!("{}{CAPSULE_SEGMENT}{id}", self.prefix)
    }

    /// Key of a progress record.
    #[must_use]
    pub fn progress(&self, id: &str) -> String {
        format!("{}{PROGRESS_SEGMENT}{id}", self.prefix)
    }

    /// Prefix shared by every capsule document key.
    #[must_use]
    pub fn capsule_prefix(&self) -> String {
        format!("{}{CAPSULE_SEGMENT}", self.prefix)
    }

    /// Prefix shared by every progress record key.
    #[must_use]
    pub fn progress_prefix(&self) -> String {
        format!("{}{PROGRESS_SEGMENT}", self.prefix)
    }
}
