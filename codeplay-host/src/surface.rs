//! Render surface backed by a host page on disk.
//!
//! The page embeds the preview in a sandboxed iframe. A browser that has it
//! open notices new renders through a small stamp script next to it.

use codeplay_preview::surface::stamp_script;
use codeplay_preview::{
    embed_page, BridgePort, EmbedOptions, LiveReload, PreviewError, PreviewResult, RenderSurface,
};
use std::fs;
use std::path::{Path, PathBuf};

pub struct FileSurface {
    output: PathBuf,
    options: EmbedOptions,
    renders: u64,
}

impl FileSurface {
    /// `live_reload_ms` adds the reload poller to the page; `None` writes a static page.
    pub fn new(output: impl Into<PathBuf>, live_reload_ms: Option<u64>) -> Self {
        let output = output.into();
        let live_reload = live_reload_ms.map(|interval_ms| LiveReload {
            stamp_src: stamp_file_name(&output),
            interval_ms,
        });
        Self {
            output,
            options: EmbedOptions {
                live_reload,
                ..EmbedOptions::default()
            },
            renders: 0,
        }
    }

    pub fn stamp_path(&self) -> PathBuf {
        self.output.with_file_name(stamp_file_name(&self.output))
    }
}

fn stamp_file_name(output: &Path) -> String {
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("preview");
    format!("{}.stamp.js", stem)
}

/// Write through a temporary sibling and rename, so readers never see half a page.
fn write_atomic(path: &Path, contents: &str) -> PreviewResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PreviewError::io(parent, e))?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents).map_err(|e| PreviewError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| PreviewError::io(path, e))
}

impl RenderSurface for FileSurface {
    fn render(&mut self, document: &str, _port: BridgePort) -> PreviewResult<()> {
        // Console output is shown by the page itself; nothing posts back over `_port`.
        write_atomic(&self.output, &embed_page(document, &self.options))?;
        if self.options.live_reload.is_some() {
            write_atomic(&self.stamp_path(), &stamp_script(document))?;
        }
        self.renders += 1;
        tracing::info!(path = %self.output.display(), render = self.renders, "preview updated");
        Ok(())
    }
}
