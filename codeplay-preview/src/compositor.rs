//! Document compositor: merges one snapshot into one self-contained document.
//!
//! Pure and deterministic. The same snapshot always yields the same bytes.

use crate::bridge::BRIDGE_SHIM;
use crate::snapshot::CodeSnapshot;
use regex::Regex;
use std::fmt::Write;
use std::sync::OnceLock;

/// Inline error display for a script that throws while running.
const FAILURE_REPORT: &str = r#"  (function (e) {
    var pre = document.createElement('pre');
    pre.setAttribute('style', 'color:red;padding:1rem;font-size:13px;white-space:pre-wrap;');
    pre.textContent = String(e);
    (document.body || document.documentElement).appendChild(pre);
    console.error(String(e));
  })(err);"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeOptions {
    /// Optional `<title>`; escaped before embedding.
    pub title: Option<String>,
    /// Inject the console/error bridge shim ahead of the user script.
    pub bridge: bool,
}

impl ComposeOptions {
    /// Options for the live preview.
    pub fn preview() -> Self {
        Self {
            title: None,
            bridge: true,
        }
    }

    /// Options for a standalone export: no bridge, titled.
    pub fn export(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            bridge: false,
        }
    }
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self::preview()
    }
}

/// Builds the live preview document for a snapshot.
pub fn compose_document(snapshot: &CodeSnapshot) -> String {
    compose_with(snapshot, &ComposeOptions::preview())
}

/// Builds a document for a snapshot with explicit options.
pub fn compose_with(snapshot: &CodeSnapshot, options: &ComposeOptions) -> String {
    let mut doc = String::with_capacity(
        snapshot.markup().len() + snapshot.style().len() + snapshot.script().len() + 2048,
    );
    // Writing into a String cannot fail.
    let _ = write_document(&mut doc, snapshot, options);
    doc
}

fn write_document(
    out: &mut String,
    snapshot: &CodeSnapshot,
    options: &ComposeOptions,
) -> std::fmt::Result {
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    out.push_str("<meta charset=\"UTF-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    if let Some(title) = &options.title {
        writeln!(out, "<title>{}</title>", escape_html(title))?;
    }
    writeln!(out, "<style>{}</style>", escape_style_text(snapshot.style()))?;
    out.push_str("</head>\n<body>\n");
    writeln!(out, "{}", snapshot.markup())?;
    if options.bridge {
        writeln!(out, "<script>\n{}\n</script>", BRIDGE_SHIM)?;
    }
    writeln!(
        out,
        "<script>\ntry {{\n{}\n}} catch (err) {{\n{}\n}}\n</script>",
        escape_script_text(snapshot.script()),
        FAILURE_REPORT
    )?;
    out.push_str("</body>\n</html>\n");
    Ok(())
}

fn script_breakout() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</(script)|<!--").unwrap())
}

fn style_breakout() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</(style)").unwrap())
}

/// Makes untrusted script text safe to place inside `<script>..</script>`.
///
/// `</script` becomes `<\/script` and `<!--` becomes `<\x21--`. Both escapes
/// read back as the original characters inside JS string and template literals
/// and inside regex literals, with or without the `u` flag.
pub fn escape_script_text(script: &str) -> String {
    script_breakout()
        .replace_all(script, |caps: &regex::Captures| match caps.get(1) {
            Some(tag) => format!("<\\/{}", tag.as_str()),
            None => "<\\x21--".to_string(),
        })
        .into_owned()
}

/// Makes untrusted CSS safe to place inside `<style>..</style>`.
/// `\/` is a valid CSS escape for `/`.
pub fn escape_style_text(style: &str) -> String {
    style_breakout()
        .replace_all(style, "<\\/$1")
        .into_owned()
}

/// Escapes text for element content and double-quoted attribute values.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
