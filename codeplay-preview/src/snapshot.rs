//! Source state: the three editor buffers and the snapshots they publish.

use crate::error::PreviewError;
use crate::templates::{DEFAULT_TEMPLATE, TEMPLATES};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::watch;

/// One point-in-time view of all three buffers. Never mutated after construction.
///
/// Serialized as `{"html": .., "css": .., "js": ..}`, the shape shared by
/// persistence, share links and snippets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeSnapshot {
    #[serde(rename = "html", default)]
    markup: String,
    #[serde(rename = "css", default)]
    style: String,
    #[serde(rename = "js", default)]
    script: String,
}

impl CodeSnapshot {
    pub fn new(
        markup: impl Into<String>,
        style: impl Into<String>,
        script: impl Into<String>,
    ) -> Self {
        Self {
            markup: markup.into(),
            style: style.into(),
            script: script.into(),
        }
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn style(&self) -> &str {
        &self.style
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    /// Buffer content for a tab.
    pub fn get(&self, tab: EditorTab) -> &str {
        match tab {
            EditorTab::Html => &self.markup,
            EditorTab::Css => &self.style,
            EditorTab::Js => &self.script,
        }
    }

    /// A new snapshot with one buffer replaced.
    pub fn with(&self, tab: EditorTab, text: impl Into<String>) -> Self {
        let mut next = self.clone();
        let text = text.into();
        match tab {
            EditorTab::Html => next.markup = text,
            EditorTab::Css => next.style = text,
            EditorTab::Js => next.script = text,
        }
        next
    }

    pub fn is_empty(&self) -> bool {
        self.markup.is_empty() && self.style.is_empty() && self.script.is_empty()
    }
}

/// The currently selected editor buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorTab {
    #[default]
    Html,
    Css,
    Js,
}

impl EditorTab {
    pub const ALL: [EditorTab; 3] = [EditorTab::Html, EditorTab::Css, EditorTab::Js];

    /// Tab for a 1-based shortcut number (Ctrl+1, Ctrl+2, Ctrl+3).
    pub fn from_shortcut(n: u8) -> Option<Self> {
        match n {
            1 => Some(EditorTab::Html),
            2 => Some(EditorTab::Css),
            3 => Some(EditorTab::Js),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EditorTab::Html => "html",
            EditorTab::Css => "css",
            EditorTab::Js => "js",
        }
    }
}

impl fmt::Display for EditorTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EditorTab {
    type Err = PreviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(EditorTab::Html),
            "css" => Ok(EditorTab::Css),
            "js" | "javascript" => Ok(EditorTab::Js),
            other => Err(PreviewError::UnknownTab {
                tab: other.to_string(),
            }),
        }
    }
}

/// Explicit state container for the three buffers.
///
/// Editing surfaces mutate it; the preview pipeline only reads snapshots and
/// subscribes to changes. Every change publishes a whole new [`CodeSnapshot`].
pub struct SourceBuffers {
    tx: watch::Sender<CodeSnapshot>,
    active: EditorTab,
}

impl SourceBuffers {
    pub fn new(initial: CodeSnapshot) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            tx,
            active: EditorTab::default(),
        }
    }

    /// Buffers seeded with the default starter template.
    pub fn with_default_template() -> Self {
        Self::new(TEMPLATES[DEFAULT_TEMPLATE].to_snapshot())
    }

    pub fn snapshot(&self) -> CodeSnapshot {
        self.tx.borrow().clone()
    }

    /// Change notifications. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<CodeSnapshot> {
        self.tx.subscribe()
    }

    /// Replace one buffer. Subscribers are notified only if the text changed.
    pub fn set(&self, tab: EditorTab, text: impl Into<String>) -> bool {
        let text = text.into();
        self.tx.send_if_modified(|current| {
            if current.get(tab) == text {
                return false;
            }
            *current = current.with(tab, text);
            true
        })
    }

    pub fn set_markup(&self, text: impl Into<String>) -> bool {
        self.set(EditorTab::Html, text)
    }

    pub fn set_style(&self, text: impl Into<String>) -> bool {
        self.set(EditorTab::Css, text)
    }

    pub fn set_script(&self, text: impl Into<String>) -> bool {
        self.set(EditorTab::Js, text)
    }

    /// Replace all three buffers at once (loading saved or shared state).
    pub fn replace(&self, snapshot: CodeSnapshot) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        })
    }

    /// Empty all three buffers.
    pub fn clear(&self) -> bool {
        self.replace(CodeSnapshot::default())
    }

    /// Restore the default starter template.
    pub fn reset(&self) -> bool {
        self.replace(TEMPLATES[DEFAULT_TEMPLATE].to_snapshot())
    }

    /// Load a starter template by index. Returns false for an unknown index.
    pub fn load_template(&self, index: usize) -> bool {
        match TEMPLATES.get(index) {
            Some(t) => {
                self.replace(t.to_snapshot());
                true
            }
            None => false,
        }
    }

    pub fn active_tab(&self) -> EditorTab {
        self.active
    }

    pub fn set_active_tab(&mut self, tab: EditorTab) {
        self.active = tab;
    }
}

impl Default for SourceBuffers {
    fn default() -> Self {
        Self::with_default_template()
    }
}
