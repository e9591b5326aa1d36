//! Project directory I/O: the three source files as one snapshot.

use crate::config::ProjectFiles;
use anyhow::Context;
use codeplay_preview::{CodeSnapshot, EditorTab};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub fn source_path(dir: &Path, files: &ProjectFiles, tab: EditorTab) -> PathBuf {
    let name = match tab {
        EditorTab::Html => &files.html,
        EditorTab::Css => &files.css,
        EditorTab::Js => &files.js,
    };
    dir.join(name)
}

/// Read one source file. A missing file reads as empty.
pub fn read_source(path: &Path) -> anyhow::Result<String> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e).with_context(|| format!("read {}", path.display())),
    }
}

pub fn read_project(dir: &Path, files: &ProjectFiles) -> anyhow::Result<CodeSnapshot> {
    let mut snapshot = CodeSnapshot::default();
    for tab in EditorTab::ALL {
        let text = read_source(&source_path(dir, files, tab))?;
        snapshot = snapshot.with(tab, text);
    }
    Ok(snapshot)
}

/// True if none of the three source files exist.
pub fn is_unset(dir: &Path, files: &ProjectFiles) -> bool {
    EditorTab::ALL
        .iter()
        .all(|tab| !source_path(dir, files, *tab).exists())
}

pub fn write_project(dir: &Path, files: &ProjectFiles, snapshot: &CodeSnapshot) -> anyhow::Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    for tab in EditorTab::ALL {
        let path = source_path(dir, files, tab);
        fs::write(&path, snapshot.get(tab)).with_context(|| format!("write {}", path.display()))?;
    }
    Ok(())
}
