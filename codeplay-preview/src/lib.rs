//! # codeplay live preview pipeline
//!
//! Turns three independently edited buffers (HTML, CSS, JavaScript) into a
//! single self-contained document and pushes it into an isolated render
//! surface, coalescing bursts of edits so the preview stays responsive.
//!
//! ## Pipeline
//! - [`SourceBuffers`] holds the three buffers and publishes [`CodeSnapshot`]s
//! - [`DebouncedScheduler`] waits for a quiet period and keeps only the latest snapshot
//! - [`compose_document`] builds the preview document, including the console bridge shim
//! - a [`RenderSurface`] shows the document; guest console output comes back through [`BridgeHub`]
//!
//! [`PreviewSession`] wires all of the above together.
//!
//! ## Example
//! ```ignore
//! use codeplay_preview::{
//!     BridgeHub, CodeSnapshot, PreviewSession, SourceBuffers, SurfaceSlot, DEFAULT_DEBOUNCE,
//! };
//!
//! let buffers = SourceBuffers::new(CodeSnapshot::new("<p>hi</p>", "p{color:red}", "console.log('a')"));
//! let bridge = BridgeHub::new();
//! let mut console = bridge.subscribe();
//! let session = PreviewSession::start(&buffers, SurfaceSlot::empty(), bridge, DEFAULT_DEBOUNCE);
//! ```

pub mod bridge;
pub mod compositor;
pub mod error;
pub mod export;
pub mod scheduler;
pub mod session;
pub mod share;
pub mod snapshot;
pub mod storage;
pub mod surface;
pub mod templates;

// --- Core types ---
pub use bridge::{BridgeChannel, BridgeHub, BridgeLevel, BridgeMessage, BridgePort, BRIDGE_SHIM};
pub use compositor::{compose_document, compose_with, ComposeOptions};
pub use error::{PreviewError, PreviewResult};
pub use scheduler::{DebouncedScheduler, Debouncer, RenderEvent, SchedulerHandle, DEFAULT_DEBOUNCE};
pub use session::PreviewSession;
pub use snapshot::{CodeSnapshot, EditorTab, SourceBuffers};
pub use surface::{
    embed_page, EmbedOptions, LiveReload, MemorySurface, RenderSurface, SandboxPolicy, SurfaceSlot,
};

// --- Shell-facing contracts ---
pub use export::{export_bundle, export_html, ExportBundle, EXPORT_ZIP_NAME};
pub use share::{decode_share, decode_url, encode_share, share_url};
pub use storage::{JsonFileStore, Snippet, SnippetLibrary, SnapshotStore};
pub use templates::{Template, DEFAULT_TEMPLATE, TEMPLATES};
