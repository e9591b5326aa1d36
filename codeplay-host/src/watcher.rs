//! Poll loop that mirrors the project's source files into the editor buffers.

use crate::config::ProjectFiles;
use crate::project::{read_source, source_path};
use codeplay_preview::{EditorTab, SourceBuffers};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::MissedTickBehavior;

/// Last seen (modified time, length) per file; unchanged files are not re-read.
type Fingerprint = Option<(SystemTime, u64)>;

fn fingerprint(path: &std::path::Path) -> Fingerprint {
    let meta = std::fs::metadata(path).ok()?;
    Some((meta.modified().ok()?, meta.len()))
}

/// Watch `dir` until the task is aborted, pushing changed file contents into `buffers`.
pub async fn watch_project(
    dir: PathBuf,
    files: ProjectFiles,
    buffers: Arc<SourceBuffers>,
    interval: Duration,
) {
    let mut seen: HashMap<EditorTab, Fingerprint> = HashMap::new();
    let mut tick = tokio::time::interval(interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tick.tick().await;
        for tab in EditorTab::ALL {
            let path = source_path(&dir, &files, tab);
            let current = fingerprint(&path);
            if seen.get(&tab) == Some(&current) {
                continue;
            }
            match read_source(&path) {
                Ok(text) => {
                    seen.insert(tab, current);
                    if buffers.set(tab, text) {
                        tracing::info!(file = %path.display(), "source changed");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "could not read source"),
            }
        }
    }
}
