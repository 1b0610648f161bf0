//! Error types for note storage and search.
//!
//! [`NoteError`] covers every failure the store, the search index, and the
//! synchronization layer can report. The HTTP layer maps each variant to a
//! status code; CLI and bootstrap code wrap it in `anyhow`.

use thiserror::Error;

/// Result type alias using [`NoteError`].
pub type Result<T> = std::result::Result<T, NoteError>;

#[derive(Error, Debug)]
pub enum NoteError {
    /// No note file exists for the identifier (after extension normalization).
    #[error("note not found: {id}")]
    NotFound { id: String },

    /// The identifier resolves outside the store root or contains a separator.
    #[error("invalid path for note id: {id}")]
    InvalidPath { id: String },

    /// Empty identifier, empty query, or malformed request body.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Underlying file-system failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The search engine rejected the query text.
    #[error("query syntax error: {0}")]
    QuerySyntax(String),

    /// The search index could not be opened; search is disabled.
    #[error("search index unavailable: {0}")]
    IndexUnavailable(String),

    /// Any other search-engine failure (pool, transaction, statement).
    #[error("index error: {0}")]
    Index(#[from] sqlx::Error),
}

impl NoteError {
    pub fn not_found(id: impl Into<String>) -> Self {
        NoteError::NotFound { id: id.into() }
    }

    pub fn invalid_path(id: impl Into<String>) -> Self {
        NoteError::InvalidPath { id: id.into() }
    }

    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        NoteError::InvalidArgument(reason.into())
    }

    /// Returns true for errors caused by the caller's input rather than
    /// the environment.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            NoteError::NotFound { .. }
                | NoteError::InvalidPath { .. }
                | NoteError::InvalidArgument(_)
                | NoteError::QuerySyntax(_)
        )
    }
}
