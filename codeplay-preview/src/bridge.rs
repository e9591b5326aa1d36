//! Console/error bridge between the guest document and the host.
//!
//! The guest side is [`BRIDGE_SHIM`], injected by the compositor ahead of the
//! user script. It posts `{"channel":"console","level":..,"args":[..]}` to the
//! parent window. The host side is [`BridgeHub`]: surfaces hand raw payloads
//! to the [`BridgePort`] of the guest context that produced them, and the hub
//! fans them out in arrival order. Ports of torn-down contexts are inert.

use crate::error::{PreviewError, PreviewResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Broadcast capacity per hub; slow subscribers past this lag and skip messages.
const BRIDGE_CAPACITY: usize = 64;

/// Guest-side shim. Redefines `console.log` / `console.error` to keep their
/// original behavior and forward every call, and reports uncaught errors as
/// `"<message> (line N)"` at error level.
pub const BRIDGE_SHIM: &str = r#"(function () {
  var post = function (level, args) {
    try {
      window.parent.postMessage({ channel: 'console', level: level, args: args }, '*');
    } catch (e) {}
  };
  var show = function (value) {
    if (typeof value === 'string') return value;
    if (value instanceof Error) return String(value);
    if (value !== null && typeof value === 'object') {
      try { return JSON.stringify(value); } catch (e) {}
    }
    return String(value);
  };
  var wrap = function (level) {
    var original = console[level];
    console[level] = function () {
      var args = Array.prototype.slice.call(arguments);
      if (original) original.apply(console, args);
      post(level, args.map(show));
    };
  };
  wrap('log');
  wrap('error');
  window.onerror = function (msg, src, line) {
    post('error', [String(msg) + ' (line ' + line + ')']);
  };
})();"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeChannel {
    Console,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeLevel {
    Log,
    Error,
}

impl fmt::Display for BridgeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeLevel::Log => f.write_str("log"),
            BridgeLevel::Error => f.write_str("error"),
        }
    }
}

/// One console call or uncaught error forwarded out of the guest document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeMessage {
    pub channel: BridgeChannel,
    pub level: BridgeLevel,
    pub args: Vec<String>,
}

impl BridgeMessage {
    pub fn log<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(BridgeLevel::Log, args)
    }

    pub fn error<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(BridgeLevel::Error, args)
    }

    fn new<I, S>(level: BridgeLevel, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            channel: BridgeChannel::Console,
            level,
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Decode a payload as posted by the shim.
    pub fn from_json(raw: &str) -> PreviewResult<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| PreviewError::InvalidBridgeMessage(e.to_string()))?;
        match value.get("channel").and_then(|c| c.as_str()) {
            Some("console") => {}
            Some(other) => {
                return Err(PreviewError::UnknownBridgeChannel {
                    channel: other.to_string(),
                })
            }
            None => {
                return Err(PreviewError::InvalidBridgeMessage(
                    "missing 'channel'".to_string(),
                ))
            }
        }
        serde_json::from_value(value).map_err(|e| PreviewError::InvalidBridgeMessage(e.to_string()))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl fmt::Display for BridgeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.args.join(" "))
    }
}

#[derive(Default)]
struct ContextState {
    next: u64,
    current: Option<u64>,
}

struct HubInner {
    tx: broadcast::Sender<BridgeMessage>,
    context: Mutex<ContextState>,
}

impl HubInner {
    fn is_current(&self, id: u64) -> bool {
        self.context
            .lock()
            .map(|ctx| ctx.current == Some(id))
            .unwrap_or(false)
    }
}

/// Host-side end of the bridge. Cloning shares the same hub.
#[derive(Clone)]
pub struct BridgeHub {
    inner: Arc<HubInner>,
}

impl BridgeHub {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(BRIDGE_CAPACITY);
        Self {
            inner: Arc::new(HubInner {
                tx,
                context: Mutex::new(ContextState::default()),
            }),
        }
    }

    /// Register a listener. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeMessage> {
        self.inner.tx.subscribe()
    }

    /// Start a new guest context. The port of the previous context stops delivering.
    pub fn begin_context(&self) -> BridgePort {
        let id = match self.inner.context.lock() {
            Ok(mut ctx) => {
                ctx.next += 1;
                ctx.current = Some(ctx.next);
                ctx.next
            }
            Err(_) => 0,
        };
        BridgePort {
            inner: Arc::clone(&self.inner),
            context: id,
        }
    }

    /// Retire the current guest context without starting a new one.
    pub fn teardown(&self) {
        if let Ok(mut ctx) = self.inner.context.lock() {
            ctx.current = None;
        }
    }

    /// Id of the live guest context, if any.
    pub fn current_context(&self) -> Option<u64> {
        self.inner.context.lock().ok().and_then(|ctx| ctx.current)
    }
}

impl Default for BridgeHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Delivery handle bound to one guest context.
#[derive(Clone)]
pub struct BridgePort {
    inner: Arc<HubInner>,
    context: u64,
}

impl BridgePort {
    pub fn context_id(&self) -> u64 {
        self.context
    }

    pub fn is_live(&self) -> bool {
        self.inner.is_current(self.context)
    }

    /// Deliver a message. Returns false when this context has been torn down.
    pub fn post(&self, message: BridgeMessage) -> bool {
        if !self.is_live() {
            tracing::debug!(context = self.context, "dropping bridge message from retired context");
            return false;
        }
        // No subscribers is fine: messages are not buffered.
        let _ = self.inner.tx.send(message);
        true
    }

    /// Decode and deliver a raw payload posted by the shim.
    pub fn post_json(&self, raw: &str) -> PreviewResult<bool> {
        let message = BridgeMessage::from_json(raw)?;
        Ok(self.post(message))
    }
}
