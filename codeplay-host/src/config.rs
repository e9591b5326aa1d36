//! Host configuration, read from `codeplay.yaml` in the project directory.

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "codeplay.yaml";

/// File names of the three sources inside a project directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProjectFiles {
    pub html: String,
    pub css: String,
    pub js: String,
}

impl Default for ProjectFiles {
    fn default() -> Self {
        Self {
            html: "index.html".to_string(),
            css: "style.css".to_string(),
            js: "script.js".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Quiet period before an edit burst is rendered.
    pub debounce_ms: u64,
    /// How often the watcher checks the source files.
    pub poll_interval_ms: u64,
    /// How often an open preview page checks for a newer render. 0 disables.
    pub live_reload_ms: u64,
    pub files: ProjectFiles,
    /// Preview page, relative to the project directory unless absolute.
    pub output: PathBuf,
    pub state_file: PathBuf,
    pub snippets_file: PathBuf,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 400,
            poll_interval_ms: 100,
            live_reload_ms: 500,
            files: ProjectFiles::default(),
            output: PathBuf::from("preview.html"),
            state_file: PathBuf::from(".codeplay/state.json"),
            snippets_file: PathBuf::from(".codeplay/snippets.json"),
        }
    }
}

impl HostConfig {
    /// Load `explicit` if given, else `<dir>/codeplay.yaml` if it exists, else defaults.
    pub fn load(dir: &Path, explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let candidate = dir.join(CONFIG_FILE_NAME);
                if !candidate.exists() {
                    return Ok(Self::default());
                }
                candidate
            }
        };
        let bytes = std::fs::read(&path).with_context(|| format!("read {}", path.display()))?;
        Self::from_yaml(&bytes).with_context(|| format!("parse {}", path.display()))
    }

    pub fn from_yaml(bytes: &[u8]) -> anyhow::Result<Self> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let config: HostConfig = serde_yaml::from_slice(bytes)?;
        if config.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be greater than 0");
        }
        Ok(config)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn live_reload(&self) -> Option<u64> {
        (self.live_reload_ms > 0).then_some(self.live_reload_ms)
    }

    /// Resolve a configured path against the project directory.
    pub fn resolve(dir: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            dir.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(HostConfig::from_yaml(b"").unwrap(), HostConfig::default());
        assert_eq!(HostConfig::from_yaml(b"\n  \n").unwrap(), HostConfig::default());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = b"debounce_ms: 250\nfiles:\n  js: app.js\noutput: out/live.html\n";
        let config = HostConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert_eq!(config.files.js, "app.js");
        assert_eq!(config.files.html, "index.html");
        assert_eq!(config.output, PathBuf::from("out/live.html"));
        assert_eq!(config.poll_interval_ms, 100);
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        assert!(HostConfig::from_yaml(b"debounce_ms: soon").is_err());
        assert!(HostConfig::from_yaml(b"poll_interval_ms: 0").is_err());
    }

    #[test]
    fn live_reload_zero_disables() {
        let config = HostConfig::from_yaml(b"live_reload_ms: 0").unwrap();
        assert_eq!(config.live_reload(), None);
        assert_eq!(HostConfig::default().live_reload(), Some(500));
    }

    #[test]
    fn resolve_keeps_absolute_paths() {
        let dir = Path::new("/work/demo");
        assert_eq!(
            HostConfig::resolve(dir, Path::new("preview.html")),
            PathBuf::from("/work/demo/preview.html")
        );
        assert_eq!(
            HostConfig::resolve(dir, Path::new("/tmp/p.html")),
            PathBuf::from("/tmp/p.html")
        );
    }
}
