//! Note model

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

use super::record::{Payload, RemoteId};
use crate::error::{Error, Result};

const SUMMARY_CHARS: usize = 120;

/// A written note, optionally attached to a photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Short title
    #[serde(default)]
    pub title: String,
    /// Free text body; `#tags` are parsed from it
    pub content: String,
    /// Remote id of the photo this note was written about
    #[serde(default)]
    pub photo_ref: Option<RemoteId>,
}

impl Note {
    /// Create a new note with the given title and content
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            photo_ref: None,
        }
    }

    #[must_use]
    pub fn about_photo(mut self, photo: RemoteId) -> Self {
        self.photo_ref = Some(photo);
        self
    }

    /// Hashtags found in the content
    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        extract_tags(&self.content)
    }

    /// Get the title, or the first content line, truncated to `max_len` characters
    #[must_use]
    pub fn title_preview(&self, max_len: usize) -> String {
        let source = if self.title.trim().is_empty() {
            self.content.lines().next().unwrap_or("")
        } else {
            self.title.as_str()
        };
        source.trim().chars().take(max_len).collect()
    }

    /// Check if the note has neither title nor content (whitespace-only counts as empty)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty() && self.content.trim().is_empty()
    }
}

impl Payload for Note {
    const FAMILY: &'static str = "notes";

    fn text_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("title", self.title.clone()),
            ("content", self.content.clone()),
        ]
    }

    fn summary(&self) -> String {
        self.title_preview(SUMMARY_CHARS)
    }

    fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::InvalidInput("Note cannot be empty".into()));
        }
        Ok(())
    }
}

/// Hashtags in `text`, lowercased, deduplicated and sorted.
///
/// A tag starts with a letter and continues with letters, digits, `_` or `-`:
///
/// ```
/// use pixnote_core::models::extract_tags;
///
/// assert_eq!(
///     extract_tags("Sunset at #Beach, #beach again, #2024 #road-trip"),
///     vec!["beach", "road-trip"]
/// );
/// ```
#[must_use]
pub fn extract_tags(text: &str) -> Vec<String> {
    static TAG_PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = TAG_PATTERN
        .get_or_init(|| Regex::new(r"#([a-zA-Z][a-zA-Z0-9_-]*)").expect("tag pattern compiles"));
    pattern
        .captures_iter(text)
        .map(|capture| capture[1].to_lowercase())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
