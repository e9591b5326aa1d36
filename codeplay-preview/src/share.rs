//! Share links: a snapshot encoded into the URL fragment as `#code=<base64 json>`.
//!
//! Decoding never fails loudly. Anything malformed yields `None` and the
//! caller keeps its defaults.

use crate::snapshot::CodeSnapshot;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;

const FRAGMENT_KEY: &str = "code=";

/// Encode a snapshot as URL-safe base64 (no padding) of its JSON form.
pub fn encode_share(snapshot: &CodeSnapshot) -> String {
    let json = serde_json::to_string(snapshot).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json.as_bytes())
}

/// Decode a share payload. Accepts both base64 alphabets, padded or not,
/// so links produced by browsers' `btoa` still open.
pub fn decode_share(encoded: &str) -> Option<CodeSnapshot> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return None;
    }
    let bytes = [&URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD_NO_PAD, &STANDARD]
        .into_iter()
        .find_map(|engine| engine.decode(encoded).ok())?;
    let json = String::from_utf8(bytes).ok()?;
    match serde_json::from_str::<CodeSnapshot>(&json) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring malformed share payload");
            None
        }
    }
}

/// Full share link: `base` with any existing fragment replaced by `#code=..`.
pub fn share_url(base: &str, snapshot: &CodeSnapshot) -> String {
    let base = base.split('#').next().unwrap_or(base);
    format!("{}#{}{}", base, FRAGMENT_KEY, encode_share(snapshot))
}

/// Extract and decode the `#code=` fragment of a link (or a bare fragment).
pub fn decode_url(url: &str) -> Option<CodeSnapshot> {
    let (_, fragment) = url.split_once('#')?;
    let payload = fragment.strip_prefix(FRAGMENT_KEY)?;
    decode_share(payload)
}
