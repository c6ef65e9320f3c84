//! Hand-off of drawing payloads to the overlay thread.
//!
//! Pushes never block the worker. Payloads arrive in production order; a slow
//! overlay may skip some of them, but never the most recent one.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use tokio::sync::watch;

use crate::models::payload::DrawingPayload;

/// Consumer side of the overlay. `push` must not block.
pub trait RenderSink: Send {
    fn push(&mut self, payload: DrawingPayload);
}

impl<S: RenderSink + ?Sized> RenderSink for Box<S> {
    fn push(&mut self, payload: DrawingPayload) {
        (**self).push(payload)
    }
}

/// Last-payload-wins sink.
pub struct WatchRenderSink {
    tx: watch::Sender<DrawingPayload>,
}

impl RenderSink for WatchRenderSink {
    fn push(&mut self, payload: DrawingPayload) {
        self.tx.send_replace(payload);
    }
}

/// Overlay side of [`overlay_channel`].
#[derive(Clone)]
pub struct OverlayReceiver {
    rx: watch::Receiver<DrawingPayload>,
}

impl OverlayReceiver {
    /// Latest payload, marking it seen.
    pub fn latest(&mut self) -> DrawingPayload {
        self.rx.borrow_and_update().clone()
    }

    /// True when a payload arrived since the last `latest()`.
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Waits for the next payload. Errors once the sink is dropped.
    pub async fn changed(&mut self) -> Result<DrawingPayload, watch::error::RecvError> {
        self.rx.changed().await?;
        Ok(self.latest())
    }
}

pub fn overlay_channel() -> (WatchRenderSink, OverlayReceiver) {
    let (tx, rx) = watch::channel(DrawingPayload::cleared());
    (WatchRenderSink { tx }, OverlayReceiver { rx })
}

struct PayloadQueue {
    items: Mutex<VecDeque<DrawingPayload>>,
    ready: Condvar,
    capacity: usize,
}

/// Bounded FIFO sink. When full, the oldest queued payload is evicted so the
/// newest one (including a final cleared payload) always gets through.
pub struct QueuedRenderSink {
    queue: Arc<PayloadQueue>,
    dropped: u64,
}

impl QueuedRenderSink {
    /// Payloads evicted before the overlay read them.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl RenderSink for QueuedRenderSink {
    fn push(&mut self, payload: DrawingPayload) {
        let Ok(mut items) = self.queue.items.lock() else {
            return;
        };
        if items.len() >= self.queue.capacity {
            items.pop_front();
            self.dropped = self.dropped.saturating_add(1);
            if self.dropped % 100 == 1 {
                log::debug!("overlay queue full: {} payloads dropped", self.dropped);
            }
        }
        items.push_back(payload);
        self.queue.ready.notify_one();
    }
}

/// Overlay side of [`queued_overlay_channel`].
pub struct QueuedOverlayReceiver {
    queue: Arc<PayloadQueue>,
}

impl QueuedOverlayReceiver {
    pub fn try_recv(&self) -> Option<DrawingPayload> {
        self.queue.items.lock().ok()?.pop_front()
    }

    /// Waits up to `timeout` for the next payload.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<DrawingPayload> {
        let items = self.queue.items.lock().ok()?;
        let (mut items, _) = self
            .queue
            .ready
            .wait_timeout_while(items, timeout, |items| items.is_empty())
            .ok()?;
        items.pop_front()
    }

    /// Everything queued so far, oldest first.
    pub fn drain(&self) -> Vec<DrawingPayload> {
        match self.queue.items.lock() {
            Ok(mut items) => items.drain(..).collect(),
            Err(_) => Vec::new(),
        }
    }
}

pub fn queued_overlay_channel(capacity: usize) -> (QueuedRenderSink, QueuedOverlayReceiver) {
    let queue = Arc::new(PayloadQueue {
        items: Mutex::new(VecDeque::new()),
        ready: Condvar::new(),
        capacity: capacity.max(1),
    });
    (
        QueuedRenderSink {
            queue: queue.clone(),
            dropped: 0,
        },
        QueuedOverlayReceiver { queue },
    )
}
