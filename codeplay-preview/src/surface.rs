//! Isolated render surface contract and the host page that embeds a preview.

use crate::bridge::BridgePort;
use crate::compositor::escape_html;
use crate::error::PreviewResult;
use std::collections::hash_map::DefaultHasher;
use std::fmt::Write;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

/// Something that can show a composed document in an isolated context.
///
/// Each call replaces the previous guest context entirely. Messages the new
/// guest posts are delivered through `port`; the previous port is already
/// retired by the time this is called.
pub trait RenderSurface: Send {
    fn render(&mut self, document: &str, port: BridgePort) -> PreviewResult<()>;
}

/// Capabilities granted to the guest document. Same-origin access, top-level
/// navigation, forms and popups are never granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxPolicy {
    pub allow_scripts: bool,
    pub allow_modals: bool,
}

impl SandboxPolicy {
    pub const PREVIEW: SandboxPolicy = SandboxPolicy {
        allow_scripts: true,
        allow_modals: true,
    };

    /// Value for the iframe `sandbox` attribute.
    pub fn to_attribute(&self) -> String {
        let mut tokens = Vec::new();
        if self.allow_scripts {
            tokens.push("allow-scripts");
        }
        if self.allow_modals {
            tokens.push("allow-modals");
        }
        tokens.join(" ")
    }
}

impl Default for SandboxPolicy {
    fn default() -> Self {
        Self::PREVIEW
    }
}

/// Reload hook for host pages served from disk: the page re-fetches
/// `stamp_src` every `interval_ms` and reloads when the stamp it defines differs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveReload {
    pub stamp_src: String,
    pub interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedOptions {
    pub title: String,
    pub policy: SandboxPolicy,
    pub live_reload: Option<LiveReload>,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            title: "Live Preview".to_string(),
            policy: SandboxPolicy::PREVIEW,
            live_reload: None,
        }
    }
}

const HOST_STYLES: &str = "html,body{margin:0;height:100%;background:#0f0f1a;color:#e4e4e7;font-family:system-ui,sans-serif;}\
body{display:flex;flex-direction:column;}\
#preview{flex:1;width:100%;border:0;background:#fff;}\
#console{margin:0;max-height:30vh;overflow:auto;padding:0.5rem 1rem;font:12px/1.5 monospace;border-top:1px solid #3f3f46;}\
#console .error{color:#f87171;}";

const HOST_BRIDGE_LISTENER: &str = r#"(function () {
  var frame = document.getElementById('preview');
  var out = document.getElementById('console');
  window.addEventListener('message', function (event) {
    if (event.source !== frame.contentWindow) return;
    var msg = event.data;
    if (!msg || msg.channel !== 'console' || !Array.isArray(msg.args)) return;
    var line = document.createElement('div');
    line.className = msg.level === 'error' ? 'error' : 'log';
    line.textContent = msg.args.join(' ');
    out.appendChild(line);
  });
})();"#;

/// Stable fingerprint of a document, used as a reload stamp.
pub fn document_stamp(document: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    document.hash(&mut hasher);
    hasher.finish()
}

/// Script body defining the reload stamp for a document.
pub fn stamp_script(document: &str) -> String {
    format!("window.__codeplayStamp = \"{:016x}\";\n", document_stamp(document))
}

/// Builds a host page that shows `document` in a sandboxed iframe and prints
/// bridge messages from that frame into a console panel.
pub fn embed_page(document: &str, options: &EmbedOptions) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{}</title>
<style>{}</style>
</head>
<body>
<iframe id="preview" title="Live Preview" sandbox="{}" srcdoc="{}"></iframe>
<pre id="console"></pre>
<script>
{}
</script>
"#,
        escape_html(&options.title),
        HOST_STYLES,
        options.policy.to_attribute(),
        escape_html(document),
        HOST_BRIDGE_LISTENER,
    );
    if let Some(reload) = &options.live_reload {
        let _ = write!(
            html,
            r#"<script>
(function () {{
  var current = "{:016x}";
  setInterval(function () {{
    var s = document.createElement('script');
    s.src = "{}?t=" + Date.now();
    s.onload = s.onerror = function () {{
      s.remove();
      if (window.__codeplayStamp && window.__codeplayStamp !== current) location.reload();
    }};
    document.head.appendChild(s);
  }}, {});
}})();
</script>
"#,
            document_stamp(document),
            escape_html(&reload.stamp_src),
            reload.interval_ms,
        );
    }
    html.push_str("</body>\n</html>\n");
    html
}

/// Shared, optional handle to the render surface. Rendering into an empty
/// slot is a silent no-op.
#[derive(Clone, Default)]
pub struct SurfaceSlot {
    inner: Arc<Mutex<Option<Box<dyn RenderSurface>>>>,
}

impl SurfaceSlot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(surface: impl RenderSurface + 'static) -> Self {
        let slot = Self::empty();
        slot.attach(surface);
        slot
    }

    /// Install a surface, replacing any previous one.
    pub fn attach(&self, surface: impl RenderSurface + 'static) {
        if let Ok(mut guard) = self.inner.lock() {
            *guard = Some(Box::new(surface));
        }
    }

    pub fn detach(&self) -> Option<Box<dyn RenderSurface>> {
        self.inner.lock().ok().and_then(|mut guard| guard.take())
    }

    pub fn is_attached(&self) -> bool {
        self.inner.lock().map(|g| g.is_some()).unwrap_or(false)
    }

    /// Run `f` against the surface if one is attached. Returns `None` when the slot is empty.
    pub fn with_surface<R>(&self, f: impl FnOnce(&mut dyn RenderSurface) -> R) -> Option<R> {
        let mut guard = self.inner.lock().ok()?;
        let surface = guard.as_mut()?;
        Some(f(&mut **surface))
    }
}

/// Surface that keeps the last document in memory. Useful for embedding
/// hosts that ship the document elsewhere themselves, and for tests.
#[derive(Clone, Default)]
pub struct MemorySurface {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    last: Option<String>,
    renders: u64,
    port: Option<BridgePort>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of renders so far. Only the latest document is kept.
    pub fn render_count(&self) -> u64 {
        self.state.lock().map(|s| s.renders).unwrap_or_default()
    }

    pub fn last_document(&self) -> Option<String> {
        self.state.lock().ok().and_then(|s| s.last.clone())
    }

    /// Port of the most recent guest context.
    pub fn port(&self) -> Option<BridgePort> {
        self.state.lock().ok().and_then(|s| s.port.clone())
    }
}

impl RenderSurface for MemorySurface {
    fn render(&mut self, document: &str, port: BridgePort) -> PreviewResult<()> {
        if let Ok(mut state) = self.state.lock() {
            state.last = Some(document.to_string());
            state.renders += 1;
            state.port = Some(port);
        }
        Ok(())
    }
}
