//! Preview session: source buffers -> scheduler -> compositor -> render surface.

use crate::bridge::{BridgeHub, BridgeMessage};
use crate::compositor::compose_document;
use crate::scheduler::{DebouncedScheduler, RenderEvent, SchedulerHandle};
use crate::snapshot::{CodeSnapshot, SourceBuffers};
use crate::surface::{RenderSurface, SurfaceSlot};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

/// One live preview bound to a set of buffers. Dropping it tears everything
/// down: the pending debounce timer, both tasks and the guest bridge context.
pub struct PreviewSession {
    scheduler: DebouncedScheduler,
    handle: SchedulerHandle,
    source: watch::Receiver<CodeSnapshot>,
    slot: SurfaceSlot,
    bridge: BridgeHub,
    forward: JoinHandle<()>,
    render: JoinHandle<()>,
}

impl PreviewSession {
    /// Start previewing `buffers`. The current content is scheduled right away.
    pub fn start(
        buffers: &SourceBuffers,
        slot: SurfaceSlot,
        bridge: BridgeHub,
        delay: Duration,
    ) -> Self {
        let (scheduler, events) = DebouncedScheduler::spawn(delay);
        let handle = scheduler.handle();
        let source = buffers.subscribe();

        let mut changes = buffers.subscribe();
        handle.push(changes.borrow_and_update().clone());

        let forward_handle = handle.clone();
        let forward = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let snapshot = changes.borrow_and_update().clone();
                if !forward_handle.push(snapshot) {
                    break;
                }
            }
        });

        let render = tokio::spawn(run_renders(events, slot.clone(), bridge.clone()));

        Self {
            scheduler,
            handle,
            source,
            slot,
            bridge,
            forward,
            render,
        }
    }

    /// True between an edit and the render it leads to.
    pub fn pending(&self) -> watch::Receiver<bool> {
        self.scheduler.pending()
    }

    pub fn is_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    pub fn bridge(&self) -> &BridgeHub {
        &self.bridge
    }

    /// Guest console output (onMessage). Dropping the receiver unsubscribes.
    pub fn console(&self) -> broadcast::Receiver<BridgeMessage> {
        self.bridge.subscribe()
    }

    /// Schedule the current buffers again, e.g. for a manual "run".
    pub fn refresh(&self) -> bool {
        self.handle.push(self.source.borrow().clone())
    }

    /// Install (or recreate) the render surface and schedule the current buffers onto it.
    pub fn attach_surface(&self, surface: impl RenderSurface + 'static) {
        self.bridge.teardown();
        self.slot.attach(surface);
        self.refresh();
    }

    /// Remove the render surface. The guest context it hosted is retired.
    pub fn detach_surface(&self) -> Option<Box<dyn RenderSurface>> {
        self.bridge.teardown();
        self.slot.detach()
    }

    pub fn shutdown(self) {
        // Drop does the work.
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        self.forward.abort();
        self.render.abort();
        self.bridge.teardown();
    }
}

async fn run_renders(
    mut events: mpsc::UnboundedReceiver<RenderEvent>,
    slot: SurfaceSlot,
    bridge: BridgeHub,
) {
    while let Some(event) = events.recv().await {
        render_event(&slot, &bridge, event);
    }
}

fn render_event(slot: &SurfaceSlot, bridge: &BridgeHub, event: RenderEvent) {
    let rendered = slot.with_surface(|surface| {
        let document = compose_document(&event.snapshot);
        let port = bridge.begin_context();
        surface.render(&document, port)
    });
    match rendered {
        None => tracing::debug!(seq = event.seq, "no render surface attached, skipping render"),
        Some(Ok(())) => tracing::debug!(seq = event.seq, "preview rendered"),
        Some(Err(e)) => tracing::warn!(seq = event.seq, error = %e, "preview render failed"),
    }
}
