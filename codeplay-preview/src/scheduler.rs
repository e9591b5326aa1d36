//! Debounced merge scheduler.
//!
//! Every incoming snapshot (re)starts a fixed quiet window. When the window
//! elapses without another snapshot, exactly one render event carrying the
//! latest snapshot is emitted. Earlier snapshots of the same burst are dropped.
//!
//! [`Debouncer`] is the clock-driven state machine; [`DebouncedScheduler`]
//! drives it on a tokio task and owns the only pending timer.

use crate::snapshot::CodeSnapshot;
use std::future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

/// Quiet period before a burst of edits is rendered.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

/// Single-slot debounce window. Holds at most one pending value.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace the pending value and restart the window at `now`.
    /// Returns the value that was superseded, if any.
    pub fn push(&mut self, value: T, now: Instant) -> Option<T> {
        self.pending
            .replace((now + self.delay, value))
            .map(|(_, old)| old)
    }

    /// When the pending value becomes due.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(due, _)| *due)
    }

    /// Take the pending value if its window has elapsed at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.pending {
            Some((due, _)) if now >= due => self.pending.take().map(|(_, v)| v),
            _ => None,
        }
    }

    /// Drop the pending value without emitting it.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, v)| v)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Emitted once per burst, after the quiet window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderEvent {
    /// Sequence number of the snapshot, counting every push since spawn.
    pub seq: u64,
    pub snapshot: CodeSnapshot,
}

struct PendingSignal {
    latest_seq: Mutex<u64>,
    flag: watch::Sender<bool>,
}

impl PendingSignal {
    /// Assign the next sequence number and raise the flag, atomically with respect to `clear`.
    fn raise(&self) -> u64 {
        let mut latest = self.latest_seq.lock().unwrap_or_else(|e| e.into_inner());
        *latest += 1;
        self.flag.send_replace(true);
        *latest
    }

    /// Lower the flag if `seq` is still the newest push.
    fn clear(&self, seq: u64) {
        let latest = self.latest_seq.lock().unwrap_or_else(|e| e.into_inner());
        if *latest == seq {
            self.flag.send_replace(false);
        }
    }
}

/// Cloneable push side of a [`DebouncedScheduler`].
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<(u64, CodeSnapshot)>,
    signal: Arc<PendingSignal>,
}

impl SchedulerHandle {
    /// Feed a new snapshot. The pending flag goes up before this returns.
    /// Returns false once the scheduler has been torn down.
    pub fn push(&self, snapshot: CodeSnapshot) -> bool {
        if self.tx.is_closed() {
            return false;
        }
        let seq = self.signal.raise();
        self.tx.send((seq, snapshot)).is_ok()
    }
}

/// Owns the debounce timer task. Dropping it cancels any pending render.
pub struct DebouncedScheduler {
    handle: SchedulerHandle,
    pending: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl DebouncedScheduler {
    /// Start the timer task on the current tokio runtime.
    pub fn spawn(delay: Duration) -> (Self, mpsc::UnboundedReceiver<RenderEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (render_tx, render_rx) = mpsc::unbounded_channel();
        let (flag, pending) = watch::channel(false);
        let signal = Arc::new(PendingSignal {
            latest_seq: Mutex::new(0),
            flag,
        });
        let task = tokio::spawn(run_timer(
            Debouncer::new(delay),
            rx,
            render_tx,
            Arc::clone(&signal),
        ));
        let scheduler = Self {
            handle: SchedulerHandle { tx, signal },
            pending,
            task,
        };
        (scheduler, render_rx)
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    pub fn push(&self, snapshot: CodeSnapshot) -> bool {
        self.handle.push(snapshot)
    }

    /// True between a push and the render event it leads to.
    pub fn pending(&self) -> watch::Receiver<bool> {
        self.pending.clone()
    }

    pub fn is_pending(&self) -> bool {
        *self.pending.borrow()
    }

    /// Cancel the pending timer. No render event is emitted afterwards.
    pub fn shutdown(self) {
        // Drop does the work.
    }
}

impl Drop for DebouncedScheduler {
    fn drop(&mut self) {
        self.task.abort();
        self.handle.signal.flag.send_replace(false);
    }
}

async fn run_timer(
    mut window: Debouncer<(u64, CodeSnapshot)>,
    mut rx: mpsc::UnboundedReceiver<(u64, CodeSnapshot)>,
    render_tx: mpsc::UnboundedSender<RenderEvent>,
    signal: Arc<PendingSignal>,
) {
    loop {
        let deadline = window.deadline();
        let timer = async {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            incoming = rx.recv() => match incoming {
                Some(next) => {
                    if let Some((dropped, _)) = window.push(next, Instant::now()) {
                        tracing::trace!(seq = dropped, "snapshot superseded within debounce window");
                    }
                }
                // Every handle is gone: nothing can become due that anyone will read.
                None => break,
            },
            _ = timer => {
                if let Some((seq, snapshot)) = window.poll(Instant::now()) {
                    tracing::debug!(seq, "debounce window elapsed");
                    if render_tx.send(RenderEvent { seq, snapshot }).is_err() {
                        break;
                    }
                    signal.clear(seq);
                }
            }
        }
    }
    window.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(script: &str) -> CodeSnapshot {
        CodeSnapshot::new("", "", script)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn burst_emits_only_latest() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(ms(400));
        d.push("s1", t0);
        assert_eq!(d.push("s2", t0 + ms(50)), Some("s1"));
        assert_eq!(d.push("s3", t0 + ms(100)), Some("s2"));
        assert_eq!(d.poll(t0 + ms(499)), None);
        assert_eq!(d.deadline(), Some(t0 + ms(500)));
        assert_eq!(d.poll(t0 + ms(500)), Some("s3"));
        assert_eq!(d.poll(t0 + ms(2000)), None);
        assert!(!d.is_pending());
    }

    #[test]
    fn separated_pushes_emit_twice() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(ms(400));
        d.push("s1", t0);
        assert_eq!(d.poll(t0 + ms(400)), Some("s1"));
        d.push("s2", t0 + ms(500));
        assert_eq!(d.poll(t0 + ms(899)), None);
        assert_eq!(d.poll(t0 + ms(900)), Some("s2"));
    }

    #[test]
    fn cancel_drops_pending() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(ms(400));
        d.push(1, t0);
        assert_eq!(d.cancel(), Some(1));
        assert_eq!(d.poll(t0 + ms(1000)), None);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn coalesces_burst_into_one_render() {
        let start = Instant::now();
        let (scheduler, mut renders) = DebouncedScheduler::spawn(ms(400));
        scheduler.push(snap("s1"));
        tokio::time::sleep(ms(50)).await;
        scheduler.push(snap("s2"));
        tokio::time::sleep(ms(50)).await;
        scheduler.push(snap("s3"));

        let event = renders.recv().await.unwrap();
        let elapsed = start.elapsed();
        assert_eq!(event.snapshot, snap("s3"));
        assert_eq!(event.seq, 3);
        assert!(elapsed >= ms(500) && elapsed < ms(510), "rendered at {:?}", elapsed);

        tokio::time::sleep(ms(2000)).await;
        assert!(renders.try_recv().is_err());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn quiet_gap_renders_each_snapshot() {
        let start = Instant::now();
        let (scheduler, mut renders) = DebouncedScheduler::spawn(ms(400));
        scheduler.push(snap("s1"));
        let first = renders.recv().await.unwrap();
        assert_eq!(first.snapshot, snap("s1"));
        assert!(start.elapsed() >= ms(400) && start.elapsed() < ms(410));

        tokio::time::sleep_until(start + ms(500)).await;
        scheduler.push(snap("s2"));
        let second = renders.recv().await.unwrap();
        assert_eq!(second.snapshot, snap("s2"));
        assert!(start.elapsed() >= ms(900) && start.elapsed() < ms(910));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn pending_flag_tracks_render() {
        let (scheduler, mut renders) = DebouncedScheduler::spawn(ms(400));
        assert!(!scheduler.is_pending());
        scheduler.push(snap("a"));
        assert!(scheduler.is_pending());
        renders.recv().await.unwrap();
        assert!(!scheduler.is_pending());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn teardown_cancels_pending_render() {
        let (scheduler, mut renders) = DebouncedScheduler::spawn(ms(400));
        let handle = scheduler.handle();
        scheduler.push(snap("a"));
        tokio::time::sleep(ms(100)).await;
        scheduler.shutdown();
        tokio::time::sleep(ms(1000)).await;
        assert!(renders.recv().await.is_none());
        assert!(!handle.push(snap("b")));
    }
}
