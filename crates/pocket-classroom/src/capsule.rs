//! Capsule documents and their summary index entries.
//!
//! A capsule is the unit of study material: resources, notes, flashcards and
//! quiz questions for one topic. Documents are stored as camelCase JSON.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::error::ValidationError;

/// Difficulty level of a capsule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Introductory material.
    Beginner,
    /// Assumes some background.
    Intermediate,
    /// Assumes solid background.
    Advanced,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Beginner => write!(f, "beginner"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::Advanced => write!(f, "advanced"),
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            other => Err(format!("unknown level '{other}'")),
        }
    }
}

/// Older documents store an unset level as `""`.
fn empty_level_as_none<'de, D>(deserializer: D) -> Result<Option<Level>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// A labelled link to external material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Display label.
    pub label: String,
    /// Absolute URL.
    pub url: String,
}

/// A two-sided recall card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    /// Prompt side.
    pub front: String,
    /// Answer side.
    pub back: String,
}

/// A multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    /// Question text.
    pub question: String,
    /// Answer options, in display order.
    pub options: Vec<String>,
    /// Index of the correct option.
    #[serde(default)]
    pub correct_index: usize,
    /// Shown after answering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// A bundle of study material for one topic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capsule {
    /// Unique identifier, assigned on first save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Title (required).
    #[serde(default)]
    pub title: String,

    /// Subject area.
    #[serde(default)]
    pub subject: String,

    /// Free-form description.
    #[serde(default)]
    pub description: String,

    /// Difficulty level.
    #[serde(
        default,
        deserialize_with = "empty_level_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub level: Option<Level>,

    /// External links.
    #[serde(default)]
    pub resources: Vec<Resource>,

    /// Plain-text notes.
    #[serde(default)]
    pub notes: Vec<String>,

    /// Recall cards.
    #[serde(default)]
    pub flashcards: Vec<Flashcard>,

    /// Quiz questions.
    #[serde(default)]
    pub quiz: Vec<QuizQuestion>,

    /// When the capsule was first saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// When the capsule was last saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Capsule {
    /// Create an unsaved capsule with the given title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Set the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Set the level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Append a note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Append a resource link.
    #[must_use]
    pub fn with_resource(mut self, label: impl Into<String>, url: impl Into<String>) -> Self {
        self.resources.push(Resource {
            label: label.into(),
            url: url.into(),
        });
        self
    }

    /// Append a flashcard.
    #[must_use]
    pub fn with_flashcard(mut self, front: impl Into<String>, back: impl Into<String>) -> Self {
        self.flashcards.push(Flashcard {
            front: front.into(),
            back: back.into(),
        });
        self
    }

    /// Append a quiz question.
    #[must_use]
    pub fn with_question(mut self, question: QuizQuestion) -> Self {
        self.quiz.push(question);
        self
    }

    /// Check if any content collection is non-empty.
    #[must_use]
    pub fn has_content(&self) -> bool {
        !(self.resources.is_empty()
            && self.notes.is_empty()
            && self.flashcards.is_empty()
            && self.quiz.is_empty())
    }

    /// Compare everything except identity and timestamps.
    #[must_use]
    pub fn content_eq(&self, other: &Self) -> bool {
        self.title == other.title
            && self.subject == other.subject
            && self.description == other.description
            && self.level == other.level
            && self.resources == other.resources
            && self.notes == other.notes
            && self.flashcards == other.flashcards
            && self.quiz == other.quiz
    }

    /// Trim and filter the capsule's content and check it is saveable.
    ///
    /// Blank resource rows, notes, half-filled flashcards and quiz rows
    /// without a question or any option are dropped. Blank quiz options are
    /// removed and `correct_index` is shifted so it still names the same
    /// option.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an empty title, a resource URL that
    /// does not parse, a quiz answer pointing at a blank or missing option, or
    /// a capsule with nothing left after filtering.
    pub fn normalized(self) -> Result<Self, ValidationError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(ValidationError::MissingTitle);
        }

        let mut resources = Vec::with_capacity(self.resources.len());
        for resource in self.resources {
            let label = resource.label.trim();
            let url = resource.url.trim();
            if label.is_empty() || url.is_empty() {
                continue;
            }
            Url::parse(url).map_err(|e| ValidationError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            resources.push(Resource {
                label: label.to_string(),
                url: url.to_string(),
            });
        }

        let notes = self
            .notes
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect();

        let flashcards = self
            .flashcards
            .iter()
            .map(|c| (c.front.trim(), c.back.trim()))
            .filter(|(front, back)| !front.is_empty() && !back.is_empty())
            .map(|(front, back)| Flashcard {
                front: front.to_string(),
                back: back.to_string(),
            })
            .collect();

        let mut quiz = Vec::with_capacity(self.quiz.len());
        for question in self.quiz {
            if let Some(q) = normalize_question(question)? {
                quiz.push(q);
            }
        }

        let capsule = Self {
            id: self.id,
            title,
            subject: self.subject.trim().to_string(),
            description: self.description.trim().to_string(),
            level: self.level,
            resources,
            notes,
            flashcards,
            quiz,
            created_at: self.created_at,
            last_updated: self.last_updated,
        };

        if capsule.has_content() {
            Ok(capsule)
        } else {
            Err(ValidationError::EmptyCapsule)
        }
    }
}

fn normalize_question(q: QuizQuestion) -> Result<Option<QuizQuestion>, ValidationError> {
    let question = q.question.trim().to_string();
    let options: Vec<String> = q.options.iter().map(|o| o.trim().to_string()).collect();

    if question.is_empty() || options.iter().all(String::is_empty) {
        return Ok(None);
    }

    if options.get(q.correct_index).map_or(true, String::is_empty) {
        return Err(ValidationError::InvalidCorrectIndex {
            question,
            index: q.correct_index,
        });
    }

    let correct_index = options[..q.correct_index]
        .iter()
        .filter(|o| !o.is_empty())
        .count();

    Ok(Some(QuizQuestion {
        question,
        options: options.into_iter().filter(|o| !o.is_empty()).collect(),
        correct_index,
        explanation: q
            .explanation
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty()),
    }))
}

/// Summary of a capsule for listing without loading the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    /// Capsule id.
    pub id: String,
    /// Capsule title.
    pub title: String,
    /// Capsule subject.
    #[serde(default)]
    pub subject: String,
    /// Capsule level.
    #[serde(
        default,
        deserialize_with = "empty_level_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub level: Option<Level>,
    /// When the capsule was last saved.
    pub last_updated: DateTime<Utc>,
}

impl IndexEntry {
    /// Build the entry for a saved capsule.
    ///
    /// Returns `None` if the capsule has no id or timestamp yet.
    #[must_use]
    pub fn from_capsule(capsule: &Capsule) -> Option<Self> {
        Some(Self {
            id: capsule.id.clone()?,
            title: capsule.title.clone(),
            subject: capsule.subject.clone(),
            level: capsule.level,
            last_updated: capsule.last_updated?,
        })
    }
}

/// Sort entries by `last_updated`, newest first.
pub fn sort_newest_first(entries: &mut [IndexEntry]) {
    entries.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn question(options: &[&str], correct_index: usize) -> QuizQuestion {
        QuizQuestion {
            question: "Pick one".to_string(),
            options: options.iter().map(|s| (*s).to_string()).collect(),
            correct_index,
            explanation: None,
        }
    }

    #[test]
    fn test_level_parse_and_display() {
        assert_eq!("Beginner".parse::<Level>().unwrap(), Level::Beginner);
        assert_eq!(Level::Advanced.to_string(), "advanced");
        assert!("expert".parse::<Level>().is_err());
    }

    #[test]
    fn test_capsule_json_field_names() {
        let capsule = Capsule::new("T")
            .with_level(Level::Intermediate)
            .with_question(question(&["a", "b"], 1));
        let json = serde_json::to_string(&capsule).unwrap();

        assert!(json.contains("\"correctIndex\":1"));
        assert!(json.contains("\"level\":\"intermediate\""));
        assert!(!json.contains("\"id\""));
    }

    #[test]
    fn test_deserialize_legacy_document() {
        let json = r#"{
            "id": "lx3k9a0b1c",
            "title": "Biology",
            "subject": "",
            "level": "",
            "description": "",
            "notes": ["Cells"],
            "quiz": [{"question": "Q", "options": ["x"], "correctIndex": 0, "explanation": ""}],
            "createdAt": "2024-03-01T10:00:00.000Z",
            "lastUpdated": "2024-03-02T10:00:00.000Z"
        }"#;
        let capsule: Capsule = serde_json::from_str(json).unwrap();

        assert_eq!(capsule.id.as_deref(), Some("lx3k9a0b1c"));
        assert!(capsule.level.is_none());
        assert!(capsule.resources.is_empty());
        assert_eq!(capsule.quiz[0].explanation.as_deref(), Some(""));
        assert!(capsule.created_at.is_some());
    }

    #[test]
    fn test_normalized_rejects_blank_title() {
        let capsule = Capsule::new("   ").with_note("note");
        assert_eq!(capsule.normalized(), Err(ValidationError::MissingTitle));
    }

    #[test]
    fn test_normalized_rejects_empty_content() {
        let capsule = Capsule::new("Empty")
            .with_note("   ")
            .with_flashcard("front only", "")
            .with_resource("", "https://example.com")
            .with_question(question(&["", ""], 0));
        assert_eq!(capsule.normalized(), Err(ValidationError::EmptyCapsule));
    }

    #[test]
    fn test_normalized_rejects_bad_url() {
        let capsule = Capsule::new("Links").with_resource("Docs", "not a url");
        let err = capsule.normalized().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidUrl { ref url, .. } if url == "not a url"));
    }

    #[test]
    fn test_normalized_trims_and_drops_blank_rows() {
        let capsule = Capsule::new("  Algebra  ")
            .with_subject(" Math ")
            .with_note("  first  ")
            .with_note("")
            .with_resource("Docs", "  https://example.com/a  ")
            .with_resource("No url", "")
            .with_flashcard(" 2+2 ", " 4 ")
            .normalized()
            .unwrap();

        assert_eq!(capsule.title, "Algebra");
        assert_eq!(capsule.subject, "Math");
        assert_eq!(capsule.notes, vec!["first"]);
        assert_eq!(capsule.resources.len(), 1);
        assert_eq!(capsule.resources[0].url, "https://example.com/a");
        assert_eq!(capsule.flashcards[0].front, "2+2");
    }

    #[test]
    fn test_quiz_blank_options_keep_correct_answer() {
        let capsule = Capsule::new("Quiz")
            .with_question(question(&["", "Paris", "", "Rome"], 3))
            .normalized()
            .unwrap();

        let q = &capsule.quiz[0];
        assert_eq!(q.options, vec!["Paris", "Rome"]);
        assert_eq!(q.options[q.correct_index], "Rome");
    }

    #[test]
    fn test_quiz_correct_index_on_blank_option_rejected() {
        let err = Capsule::new("Quiz")
            .with_question(question(&["a", "", "c"], 1))
            .normalized()
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidCorrectIndex { index: 1, .. }
        ));
    }

    #[test]
    fn test_quiz_correct_index_out_of_range_rejected() {
        let err = Capsule::new("Quiz")
            .with_question(question(&["a", "b"], 5))
            .normalized()
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidCorrectIndex { .. }));
    }

    #[test]
    fn test_quiz_row_without_question_dropped() {
        let mut q = question(&["a"], 0);
        q.question = "  ".to_string();
        let capsule = Capsule::new("Quiz")
            .with_note("keep me")
            .with_question(q)
            .normalized()
            .unwrap();
        assert!(capsule.quiz.is_empty());
    }

    #[test]
    fn test_empty_explanation_becomes_none() {
        let mut q = question(&["a"], 0);
        q.explanation = Some("  ".to_string());
        let capsule = Capsule::new("Quiz").with_question(q).normalized().unwrap();
        assert!(capsule.quiz[0].explanation.is_none());
    }

    #[test]
    fn test_index_entry_requires_saved_capsule() {
        let mut capsule = Capsule::new("T").with_note("n");
        assert!(IndexEntry::from_capsule(&capsule).is_none());

        capsule.id = Some("abc".to_string());
        capsule.last_updated = Some(Utc::now());
        let entry = IndexEntry::from_capsule(&capsule).unwrap();
        assert_eq!(entry.id, "abc");
        assert_eq!(entry.title, "T");
    }

    #[test]
    fn test_sort_newest_first() {
        let now = Utc::now();
        let entry = |id: &str, age: i64| IndexEntry {
            id: id.to_string(),
            title: id.to_string(),
            subject: String::new(),
            level: None,
            last_updated: now - Duration::minutes(age),
        };
        let mut entries = vec![entry("old", 30), entry("new", 1), entry("mid", 10)];
        sort_newest_first(&mut entries);

        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }
}
