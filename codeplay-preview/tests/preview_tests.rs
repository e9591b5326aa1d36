use codeplay_preview::compositor::escape_script_text;
use codeplay_preview::{
    compose_document, decode_share, encode_share, BridgeHub, BridgeLevel, BridgeMessage,
    CodeSnapshot, MemorySurface, PreviewSession, SourceBuffers, SurfaceSlot, DEFAULT_DEBOUNCE,
};
use pretty_assertions::assert_eq;
use std::time::Duration;
use tokio::time::Instant;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Byte offsets of every `</script` (any case) in a document.
fn script_end_tags(doc: &str) -> Vec<usize> {
    let lower = doc.to_ascii_lowercase();
    lower.match_indices("</script").map(|(i, _)| i).collect()
}

// Compositor tests
#[test]
fn test_compose_is_deterministic() {
    let snaps = [
        CodeSnapshot::default(),
        CodeSnapshot::new("<p>hi</p>", "p{color:red}", "console.log('a')"),
        CodeSnapshot::new("<div>", "}", "throw 1"),
    ];
    for snap in &snaps {
        assert_eq!(compose_document(snap), compose_document(snap));
    }
}

#[test]
fn test_empty_snapshot_is_well_formed() {
    let doc = compose_document(&CodeSnapshot::default());
    assert!(doc.starts_with("<!DOCTYPE html>"));
    assert!(doc.contains("<meta charset=\"UTF-8\">"));
    assert!(doc.contains("<meta name=\"viewport\""));
    assert!(doc.contains("<style></style>"));
    assert!(doc.trim_end().ends_with("</html>"));
    assert_eq!(script_end_tags(&doc).len(), 2);
}

#[test]
fn test_markup_and_style_are_embedded() {
    let doc = compose_document(&CodeSnapshot::new("<p>hi</p>", "p{color:red}", ""));
    assert!(doc.contains("<style>p{color:red}</style>"));
    let body = doc.find("<body>").unwrap();
    let markup = doc.find("<p>hi</p>").unwrap();
    assert!(markup > body);
}

#[test]
fn test_closing_tag_in_script_stays_inside_script() {
    let js = "var s = '</script><h1>pwned</h1>';";
    let doc = compose_document(&CodeSnapshot::new("", "", js));

    // Only the two script elements the compositor writes are ever closed.
    let ends = script_end_tags(&doc);
    assert_eq!(ends.len(), 2);
    let user_start = doc.find(&escape_script_text(js)).unwrap();
    assert!(user_start < ends[1]);
    assert!(ends[1] > doc.find("catch (err)").unwrap());
    assert!(doc.contains("<\\/script><h1>pwned</h1>"));
}

#[test]
fn test_closing_tag_in_style_stays_inside_style() {
    let doc = compose_document(&CodeSnapshot::new("", "a::before{content:'</STYLE><b>'}", ""));
    assert_eq!(doc.to_ascii_lowercase().matches("</style").count(), 1);
}

#[test]
fn test_script_is_wrapped_in_failure_boundary() {
    let doc = compose_document(&CodeSnapshot::new("", "", "throw new Error(\"x\")"));
    let try_at = doc.find("try {\nthrow new Error(\"x\")\n}").unwrap();
    let catch_at = doc.find("catch (err)").unwrap();
    assert!(try_at < catch_at);
    // The error is shown in the body and reported through the bridge.
    assert!(doc.contains("document.createElement('pre')"));
    assert!(doc.contains("pre.textContent = String(e)"));
    assert!(doc.contains("console.error(String(e))"));
    // The shim runs first, in its own script element, so later messages still flow.
    let shim_at = doc.find("window.onerror").unwrap();
    assert!(shim_at < try_at);
}

// Share tests
#[test]
fn test_share_roundtrip() {
    let snaps = [
        CodeSnapshot::default(),
        CodeSnapshot::new("<p>hi</p>", "p{color:red}", "console.log('a')"),
        CodeSnapshot::new("\n\t\"quoted\"", "/* ✓ */", "`${1 + 1}`"),
    ];
    for snap in snaps {
        assert_eq!(decode_share(&encode_share(&snap)), Some(snap));
    }
}

// Session tests
#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_end_to_end_render_and_console() {
    let buffers = SourceBuffers::new(CodeSnapshot::new(
        "<p>hi</p>",
        "p{color:red}",
        "console.log('a')",
    ));
    let surface = MemorySurface::new();
    let bridge = BridgeHub::new();
    let mut console = bridge.subscribe();
    let session = PreviewSession::start(
        &buffers,
        SurfaceSlot::with(surface.clone()),
        bridge,
        DEFAULT_DEBOUNCE,
    );
    assert!(session.is_pending());

    tokio::time::sleep(ms(450)).await;
    assert!(!session.is_pending());
    let doc = surface.last_document().unwrap();
    assert!(doc.contains("<p>hi</p>"));
    assert!(doc.contains("<style>p{color:red}</style>"));

    // What the shim posts for console.log('a').
    let port = surface.port().unwrap();
    let delivered = port
        .post_json(r#"{"channel":"console","level":"log","args":["a"]}"#)
        .unwrap();
    assert!(delivered);
    let msg = console.recv().await.unwrap();
    assert_eq!(msg.level, BridgeLevel::Log);
    assert_eq!(msg.args, vec!["a"]);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_typing_burst_renders_latest_once() {
    let buffers = SourceBuffers::new(CodeSnapshot::default());
    let surface = MemorySurface::new();
    let session = PreviewSession::start(
        &buffers,
        SurfaceSlot::with(surface.clone()),
        BridgeHub::new(),
        ms(400),
    );
    tokio::time::sleep(ms(500)).await;
    assert_eq!(surface.render_count(), 1);

    let start = Instant::now();
    buffers.set_markup("<p>S1</p>");
    tokio::time::sleep(ms(50)).await;
    buffers.set_style("p{}");
    tokio::time::sleep(ms(50)).await;
    buffers.set_markup("<p>S3</p>");

    let mut pending = session.pending();
    pending.wait_for(|p| !*p).await.unwrap();
    let elapsed = start.elapsed();
    assert!(elapsed >= ms(500) && elapsed < ms(510), "rendered at {:?}", elapsed);

    tokio::time::sleep(ms(1000)).await;
    assert_eq!(surface.render_count(), 2);
    let doc = surface.last_document().unwrap();
    assert!(doc.contains("<p>S3</p>"));
    assert!(doc.contains("<style>p{}</style>"));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_stale_context_messages_are_ignored() {
    let buffers = SourceBuffers::new(CodeSnapshot::new("", "", "1"));
    let surface = MemorySurface::new();
    let bridge = BridgeHub::new();
    let mut console = bridge.subscribe();
    let _session = PreviewSession::start(
        &buffers,
        SurfaceSlot::with(surface.clone()),
        bridge,
        ms(400),
    );
    tokio::time::sleep(ms(450)).await;
    let first = surface.port().unwrap();

    buffers.set_script("2");
    tokio::time::sleep(ms(450)).await;
    let second = surface.port().unwrap();

    assert!(!first.post(BridgeMessage::log(["old"])));
    assert!(second.post(BridgeMessage::error(["new"])));
    let msg = console.recv().await.unwrap();
    assert_eq!(msg, BridgeMessage::error(["new"]));
    assert!(console.try_recv().is_err());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_missing_surface_skips_render() {
    let buffers = SourceBuffers::new(CodeSnapshot::new("<i>x</i>", "", ""));
    let session = PreviewSession::start(&buffers, SurfaceSlot::empty(), BridgeHub::new(), ms(400));
    tokio::time::sleep(ms(450)).await;
    assert!(!session.is_pending());
    assert_eq!(session.bridge().current_context(), None);

    let surface = MemorySurface::new();
    session.attach_surface(surface.clone());
    assert_eq!(surface.render_count(), 0);
    tokio::time::sleep(ms(450)).await;
    assert!(surface.last_document().unwrap().contains("<i>x</i>"));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_teardown_cancels_pending_render() {
    let buffers = SourceBuffers::new(CodeSnapshot::new("<i>x</i>", "", ""));
    let surface = MemorySurface::new();
    let bridge = BridgeHub::new();
    let session = PreviewSession::start(
        &buffers,
        SurfaceSlot::with(surface.clone()),
        bridge.clone(),
        ms(400),
    );
    tokio::time::sleep(ms(100)).await;
    session.shutdown();
    buffers.set_markup("<i>y</i>");
    tokio::time::sleep(ms(2000)).await;
    assert_eq!(surface.render_count(), 0);
    assert_eq!(bridge.current_context(), None);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_detach_retires_guest_context() {
    let buffers = SourceBuffers::new(CodeSnapshot::default());
    let surface = MemorySurface::new();
    let session = PreviewSession::start(
        &buffers,
        SurfaceSlot::with(surface.clone()),
        BridgeHub::new(),
        ms(400),
    );
    tokio::time::sleep(ms(450)).await;
    let port = surface.port().unwrap();
    assert!(port.is_live());
    assert!(session.detach_surface().is_some());
    assert!(!port.is_live());
}
