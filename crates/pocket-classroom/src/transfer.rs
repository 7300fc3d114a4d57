//! Export/import wire format.
//!
//! An export is the capsule document with two extra top-level fields,
//! `schema` and `exportedAt`, pretty-printed as JSON.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capsule::Capsule;
use crate::error::{Result, ValidationError};

/// Schema tag written to, and required on, every export.
pub const SCHEMA: &str = "pocket-classroom/v1";

/// Runs of whitespace and dashes, collapsed to one `-` in slugs.
static SEPARATOR_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s-]+").expect("Invalid separator pattern"));

/// A capsule wrapped for export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnvelope {
    /// Always [`SCHEMA`].
    pub schema: String,
    /// When the export was produced.
    pub exported_at: DateTime<Utc>,
    /// The exported document.
    #[serde(flatten)]
    pub capsule: Capsule,
}

impl ExportEnvelope {
    /// Wrap `capsule` with the current schema tag and time.
    #[must_use]
    pub fn new(capsule: Capsule) -> Self {
        Self {
            schema: SCHEMA.to_string(),
            exported_at: Utc::now(),
            capsule,
        }
    }

    /// Serialize as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Parse and check an import document, returning the capsule it carries.
///
/// The returned capsule has no `id` or timestamps; whatever the document
/// carried for them is discarded unchecked. Content is checked for presence only,
/// full normalization happens on save.
///
/// # Errors
///
/// Returns a validation error for malformed JSON, a schema other than
/// [`SCHEMA`], a missing or non-string title, or a document without content.
pub fn parse_import(json_text: &str) -> Result<Capsule> {
    let mut doc: Value = serde_json::from_str(json_text)
        .map_err(|e| ValidationError::MalformedImport(e.to_string()))?;

    let Some(fields) = doc.as_object_mut() else {
        return Err(ValidationError::MalformedImport("expected a JSON object".to_string()).into());
    };

    match fields.remove("schema") {
        Some(Value::String(schema)) if schema == SCHEMA => {}
        Some(Value::String(found)) => return Err(ValidationError::SchemaMismatch { found }.into()),
        Some(other) => {
            return Err(ValidationError::SchemaMismatch {
                found: other.to_string(),
            }
            .into())
        }
        None => {
            return Err(ValidationError::SchemaMismatch {
                found: String::new(),
            }
            .into())
        }
    }
    // Identity and timestamps are assigned locally on import.
    for field in ["exportedAt", "id", "createdAt", "lastUpdated"] {
        fields.remove(field);
    }

    match fields.get("title") {
        Some(Value::String(title)) if !title.trim().is_empty() => {}
        _ => return Err(ValidationError::InvalidTitle.into()),
    }

    let capsule: Capsule = serde_json::from_value(doc)
        .map_err(|e| ValidationError::MalformedImport(e.to_string()))?;

    if !capsule.has_content() {
        return Err(ValidationError::EmptyCapsule.into());
    }
    Ok(capsule)
}

/// Turn a title into a file-name slug.
///
/// Lowercases, drops anything outside `[a-z0-9 -]`, turns whitespace runs
/// into `-` and collapses repeated dashes.
#[must_use]
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped: String = lowered
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == ' ' || *c == '-')
        .collect();

    SEPARATOR_RUNS
        .replace_all(stripped.trim(), "-")
        .into_owned()
}

/// File name used when exporting a capsule with `title`.
#[must_use]
pub fn export_file_name(title: &str) -> String {
    let slug = slugify(title);
    if slug.is_empty() {
        "pocket-classroom-capsule.json".to_string()
    } else {
        format!("pocket-classroom-{slug}.json")
    }
}
