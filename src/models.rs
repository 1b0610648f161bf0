//! Core data models used throughout Marko.
//!
//! A [`Note`] is never cached: every read re-parses the file from disk, so
//! the values here are projections of whatever the store held at read time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File extension that marks a file in the store root as a note.
pub const NOTE_EXTENSION: &str = ".md";

/// A parsed note.
///
/// `content` is the header-stripped body for `get`, and always empty for
/// `list`. Search results use [`SearchHit`] instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Metadata-only projection used by list views.
    pub fn without_content(mut self) -> Self {
        self.content.clear();
        self
    }
}

/// Header fields recognized by the parser. Unknown keys are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderFields {
    pub title: Option<String>,
    pub tags: Vec<String>,
    /// Raw `YYYY-MM-DD` string; validated only when building a [`Note`].
    pub created: Option<String>,
    pub updated: Option<String>,
}

/// A ranked search result with a highlighted excerpt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub excerpt: String,
    /// Negated bm25 rank; higher is more relevant.
    pub score: f64,
}

/// Request body for `POST /api/notes` and `PUT /api/notes/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotePayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: String,
}

/// Maps a file name to its canonical note id by stripping [`NOTE_EXTENSION`].
pub fn note_id(file_name: &str) -> &str {
    file_name.strip_suffix(NOTE_EXTENSION).unwrap_or(file_name)
}

/// Maps an id to its file name by appending [`NOTE_EXTENSION`] if missing.
pub fn file_name(id: &str) -> String {
    if id.ends_with(NOTE_EXTENSION) {
        id.to_string()
    } else {
        format!("{}{}", id, NOTE_EXTENSION)
    }
}
