//! Local persistence of the current snapshot and of named snippets.
//!
//! Storage never interrupts editing: write failures are logged and dropped,
//! unreadable or corrupt files load as "nothing saved".

use crate::error::{PreviewError, PreviewResult};
use crate::snapshot::CodeSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persistence contract used by the application shell.
pub trait SnapshotStore {
    fn save(&self, snapshot: &CodeSnapshot);
    fn load(&self) -> Option<CodeSnapshot>;
}

/// Stores the snapshot as `{"html":..,"css":..,"js":..}` in one file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonFileStore {
    fn save(&self, snapshot: &CodeSnapshot) {
        if let Err(e) = write_json(&self.path, snapshot) {
            tracing::warn!(error = %e, "could not save playground state");
        }
    }

    fn load(&self) -> Option<CodeSnapshot> {
        read_json(&self.path)
    }
}

/// A saved, named copy of the three buffers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub name: String,
    #[serde(flatten)]
    pub code: CodeSnapshot,
    #[serde(rename = "date")]
    pub saved_at: DateTime<Utc>,
}

/// Saved snippets, newest first, persisted as a JSON array.
#[derive(Debug)]
pub struct SnippetLibrary {
    path: PathBuf,
    snippets: Vec<Snippet>,
}

impl SnippetLibrary {
    /// Load the library at `path`. A missing or corrupt file gives an empty library.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let snippets = read_json(&path).unwrap_or_default();
        Self { path, snippets }
    }

    pub fn list(&self) -> &[Snippet] {
        &self.snippets
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    /// Save `code` at the front of the list. A blank name becomes `Snippet N`.
    pub fn save(&mut self, name: Option<&str>, code: CodeSnapshot, now: DateTime<Utc>) -> &Snippet {
        let name = match name.map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => format!("Snippet {}", self.snippets.len() + 1),
        };
        self.snippets.insert(
            0,
            Snippet {
                name,
                code,
                saved_at: now,
            },
        );
        self.persist();
        &self.snippets[0]
    }

    pub fn get(&self, index: usize) -> PreviewResult<&Snippet> {
        self.snippets
            .get(index)
            .ok_or(PreviewError::SnippetOutOfRange {
                index,
                len: self.snippets.len(),
            })
    }

    pub fn delete(&mut self, index: usize) -> PreviewResult<Snippet> {
        if index >= self.snippets.len() {
            return Err(PreviewError::SnippetOutOfRange {
                index,
                len: self.snippets.len(),
            });
        }
        let removed = self.snippets.remove(index);
        self.persist();
        Ok(removed)
    }

    fn persist(&self) {
        if let Err(e) = write_json(&self.path, &self.snippets) {
            tracing::warn!(error = %e, "could not save snippets");
        }
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> PreviewResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PreviewError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(|e| PreviewError::io(path, e))
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Option<T> {
    let raw = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt saved state");
            None
        }
    }
}
