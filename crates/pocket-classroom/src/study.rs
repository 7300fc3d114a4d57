//! Study helpers built on capsules and progress records.

use chrono::{DateTime, Utc};

use crate::capsule::{Capsule, QuizQuestion};
use crate::progress::ProgressRecord;

/// A note matching a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteMatch {
    /// Position of the note in the capsule.
    pub index: usize,
    /// The note text.
    pub text: String,
    /// Byte offset of the first match, if the query was non-empty.
    pub offset: Option<usize>,
}

/// Case-insensitive substring search over a capsule's notes.
///
/// An empty or blank query matches every note. Case folding is per
/// character, so a note and a query fold the same way regardless of
/// surrounding letters.
#[must_use]
pub fn search_notes(capsule: &Capsule, query: &str) -> Vec<NoteMatch> {
    let needle = fold_case(query.trim()).text;
    capsule
        .notes
        .iter()
        .enumerate()
        .filter_map(|(index, note)| {
            if needle.is_empty() {
                return Some(NoteMatch {
                    index,
                    text: note.clone(),
                    offset: None,
                });
            }
            fold_case(note).find(&needle).map(|offset| NoteMatch {
                index,
                text: note.clone(),
                offset: Some(offset),
            })
        })
        .collect()
}

/// Lowercased text plus, per lowercased char, the byte offset of the source
/// char it came from.
struct Folded {
    text: String,
    origins: Vec<(usize, usize)>,
}

impl Folded {
    /// Byte offset in the source text where `needle` first matches.
    fn find(&self, needle: &str) -> Option<usize> {
        let at = self.text.find(needle)?;
        let slot = self.origins.partition_point(|(folded, _)| *folded <= at);
        self.origins.get(slot.checked_sub(1)?).map(|(_, source)| *source)
    }
}

fn fold_case(source: &str) -> Folded {
    let mut text = String::with_capacity(source.len());
    let mut origins = Vec::with_capacity(source.len());
    for (offset, c) in source.char_indices() {
        for lower in c.to_lowercase() {
            origins.push((text.len(), offset));
            text.push(lower);
        }
    }
    Folded { text, origins }
}

/// How one quiz question was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionFeedback {
    /// The option picked, or `None` if skipped.
    pub chosen: Option<usize>,
    /// The right option.
    pub correct_index: usize,
    /// Whether `chosen` is the right option.
    pub is_correct: bool,
}

/// Outcome of a graded quiz attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResult {
    /// Correctly answered questions.
    pub correct: usize,
    /// Questions in the quiz.
    pub total: usize,
    /// Rounded percentage, 0..=100.
    pub score: u32,
    /// One entry per question, in quiz order.
    pub feedback: Vec<QuestionFeedback>,
}

/// Grade `answers` (one per question, `None` for skipped) against `quiz`.
///
/// Missing answers count as wrong. An empty quiz scores 0.
#[must_use]
pub fn grade_quiz(quiz: &[QuizQuestion], answers: &[Option<usize>]) -> QuizResult {
    let feedback: Vec<_> = quiz
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let chosen = answers.get(i).copied().flatten();
            QuestionFeedback {
                chosen,
                correct_index: q.correct_index,
                is_correct: chosen == Some(q.correct_index),
            }
        })
        .collect();

    let total = quiz.len();
    let correct = feedback.iter().filter(|f| f.is_correct).count();
    let score = if total == 0 {
        0
    } else {
        // Integer round-half-up of correct * 100 / total
        let scaled = correct * 200 / total;
        u32::try_from(scaled.div_ceil(2)).unwrap_or(100)
    };

    QuizResult {
        correct,
        total,
        score,
        feedback,
    }
}

/// Flashcard recall counts for a capsule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlashcardSummary {
    /// Cards marked known.
    pub known: usize,
    /// Cards marked unknown.
    pub unknown: usize,
    /// Cards never marked.
    pub unseen: usize,
    /// Cards in the capsule.
    pub total: usize,
}

/// Count known, unknown and unmarked cards.
///
/// Status entries beyond the capsule's current card count are ignored.
#[must_use]
pub fn flashcard_summary(capsule: &Capsule, progress: &ProgressRecord) -> FlashcardSummary {
    let total = capsule.flashcards.len();
    let mut summary = FlashcardSummary {
        total,
        ..FlashcardSummary::default()
    };
    for index in 0..total {
        match progress.status(index) {
            Some(true) => summary.known += 1,
            Some(false) => summary.unknown += 1,
            None => summary.unseen += 1,
        }
    }
    summary
}

/// Human-readable age of `ts` relative to `now`.
#[must_use]
pub fn time_ago(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(ts);
    let mins = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("1 {unit} ago")
        } else {
            format!("{n} {unit}s ago")
        }
    };

    if mins < 1 {
        "Just now".to_string()
    } else if mins < 60 {
        plural(mins, "minute")
    } else if hours < 24 {
        plural(hours, "hour")
    } else if days < 7 {
        plural(days, "day")
    } else {
        ts.format("%Y-%m-%d").to_string()
    }
}
