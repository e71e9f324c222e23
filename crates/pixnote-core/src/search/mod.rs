//! Client-side substring search over mirrored records.
//!
//! Matching only sees what has already been paginated into the mirror; there
//! is no remote full-text index behind it.

use std::collections::BTreeSet;

use crate::models::{Note, Payload, Record};

/// A normalized, non-empty, case-insensitive substring query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextQuery {
    needle: String,
}

impl TextQuery {
    /// Returns `None` for empty or whitespace-only input.
    pub fn parse(raw: &str) -> Option<Self> {
        let needle = raw.trim().to_lowercase();
        if needle.is_empty() {
            None
        } else {
            Some(Self { needle })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.needle
    }

    /// Match against any searchable field of the payload.
    pub fn matches<P: Payload>(&self, payload: &P) -> bool {
        payload
            .text_fields()
            .iter()
            .any(|(_, text)| self.matches_text(text))
    }

    /// Match against a single named field; unknown fields never match.
    pub fn matches_field<P: Payload>(&self, payload: &P, field: &str) -> bool {
        payload
            .text_fields()
            .iter()
            .any(|(name, text)| *name == field && self.matches_text(text))
    }

    fn matches_text(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.needle)
    }
}

/// Filter records by case-insensitive text query; an empty query keeps everything.
#[must_use]
pub fn filter_records<P: Payload>(records: &[Record<P>], query: &str) -> Vec<Record<P>> {
    let Some(query) = TextQuery::parse(query) else {
        return records.to_vec();
    };
    records
        .iter()
        .filter(|record| query.matches(&record.payload))
        .cloned()
        .collect()
}

/// Return a sorted, deduplicated tag list discovered across notes.
#[must_use]
pub fn collect_note_tags(notes: &[Record<Note>]) -> Vec<String> {
    let mut tags = BTreeSet::new();
    for note in notes {
        for tag in note.payload.tags() {
            tags.insert(tag);
        }
    }
    tags.into_iter().collect()
}

/// Keep notes carrying the given tag (case-insensitive, leading `#` optional).
#[must_use]
pub fn filter_notes_by_tag(notes: &[Record<Note>], tag: &str) -> Vec<Record<Note>> {
    let tag = tag.trim().trim_start_matches('#').to_lowercase();
    if tag.is_empty() {
        return notes.to_vec();
    }
    notes
        .iter()
        .filter(|note| note.payload.tags().iter().any(|candidate| *candidate == tag))
        .cloned()
        .collect()
}
