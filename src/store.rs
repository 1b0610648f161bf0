//! File-backed note store.
//!
//! Each note is one `<id>.md` file directly under the store root. The store
//! owns a single reader/writer lock: `list`/`get` take it shared,
//! `save`/`delete` take it exclusive, so no reader observes a file while a
//! store write to it is in progress. Two saves to the same id are ordered
//! by lock acquisition; the later one wins.
//!
//! Identifiers are validated before any file-system call. An id that
//! contains a path separator, or that resolves (lexically) to the root
//! itself or anywhere outside it, fails with [`NoteError::InvalidPath`].

use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{NoteError, Result};
use crate::models::{file_name, note_id, Note, NOTE_EXTENSION};
use crate::parser::parse_note;

pub struct NoteStore {
    root: PathBuf,
    lock: RwLock<()>,
}

impl NoteStore {
    /// Create a store over `root`. The directory is created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let absolute = std::path::absolute(&root).unwrap_or(root);
        Self {
            root: clean_path(&absolute),
            lock: RwLock::new(()),
        }
    }

    /// The cleaned, absolute store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List every note under the root, without content.
    ///
    /// Files that cannot be read are skipped. A root that does not exist
    /// yet holds no notes.
    pub async fn list(&self) -> Result<Vec<Note>> {
        let _guard = self.lock.read().await;

        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut notes = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let id = note_id(name);
            if id.is_empty() || !name.ends_with(NOTE_EXTENSION) {
                continue;
            }
            match entry.file_type().await {
                Ok(ft) if ft.is_file() => {}
                _ => continue,
            }

            match read_note(&entry.path(), id).await {
                Ok(note) => notes.push(note.without_content()),
                Err(e) => warn!(file = %name, error = %e, "skipping unreadable note"),
            }
        }

        notes.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(notes)
    }

    /// Read one note with its full body.
    ///
    /// `id` may be given with or without the `.md` extension: the literal
    /// name is tried first, then the name with the extension appended.
    pub async fn get(&self, id: &str) -> Result<Note> {
        ensure_id(id)?;
        let literal = self.resolve(id, id)?;
        let with_ext = self.resolve(id, &file_name(id))?;

        let _guard = self.lock.read().await;

        let path = if is_file(&literal).await { literal } else { with_ext };
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| NoteError::invalid_path(id))?;

        read_note(&path, note_id(name)).await.map_err(|e| match e {
            NoteError::Io(io) if io.kind() == ErrorKind::NotFound => NoteError::not_found(id),
            other => other,
        })
    }

    /// Write `content` as the note `id`, replacing any existing file.
    ///
    /// Returns the canonical id (extension stripped).
    pub async fn save(&self, id: &str, content: &str) -> Result<String> {
        ensure_id(id)?;
        let name = file_name(id);
        self.resolve(id, id)?;
        let path = self.resolve(id, &name)?;

        let _guard = self.lock.write().await;

        fs::create_dir_all(&self.root).await?;
        fs::write(&path, content).await?;
        debug!(id = %id, path = %path.display(), "note saved");

        Ok(note_id(&name).to_string())
    }

    /// Remove the note `id`. Returns the canonical id.
    pub async fn delete(&self, id: &str) -> Result<String> {
        ensure_id(id)?;
        let name = file_name(id);
        self.resolve(id, id)?;
        let path = self.resolve(id, &name)?;

        let _guard = self.lock.write().await;

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(NoteError::not_found(id)),
            Err(e) => return Err(e.into()),
        }
        debug!(id = %id, "note deleted");

        Ok(note_id(&name).to_string())
    }

    /// Join `name` onto the root and check it stays strictly inside it.
    fn resolve(&self, id: &str, name: &str) -> Result<PathBuf> {
        if name.contains(['/', '\\', '\0']) {
            return Err(NoteError::invalid_path(id));
        }
        let path = clean_path(&self.root.join(name));
        if path == self.root || !path.starts_with(&self.root) {
            return Err(NoteError::invalid_path(id));
        }
        Ok(path)
    }
}

fn ensure_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(NoteError::invalid_argument("note id must not be empty"));
    }
    Ok(())
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

async fn read_note(path: &Path, id: &str) -> Result<Note> {
    let raw = fs::read(path).await?;
    let modified = fs::metadata(path)
        .await?
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    Ok(parse_note(id, &raw, modified))
}

/// Lexically normalize a path: drop `.` and resolve `..` against the
/// preceding component. Does not touch the file system or follow links.
fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
