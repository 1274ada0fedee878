//! # SubscriberSet: non-blocking fan-out over multiple subscribers
//!
//! [`SubscriberSet`] distributes each [`Event`] to every interested subscriber
//! **without awaiting** their processing.
//!
//! ## What it guarantees
//! - `emit(&Event)` returns immediately.
//! - Per-subscriber FIFO (queue order).
//! - Panics inside subscribers are caught and reported as `SubscriberPanicked`.
//!
//! ## What it does **not** guarantee
//! - No global ordering across different subscribers.
//! - No retries on per-subscriber queue overflow.
//!
//! ```text
//!    emit(&Event)
//!        ├──(interested?)──► [queue S1] ─► worker S1 ─► on_event()
//!        ├──(interested?)──► [queue S2] ─► worker S2 ─► on_event()
//!        └──(interested?)──► [queue SN] ─► worker SN ─► on_event()
//! ```

use std::any::Any;
use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use super::Subscribe;
use crate::events::{Bus, Event};

struct Lane {
    sub: Arc<dyn Subscribe>,
    tx: mpsc::Sender<Arc<Event>>,
}

/// Composite fan-out with per-subscriber bounded queues and worker tasks.
pub struct SubscriberSet {
    lanes: Vec<Lane>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker per subscriber.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut lanes = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let (tx, rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
            workers.push(tokio::spawn(drive(Arc::clone(&sub), rx, bus.clone())));
            lanes.push(Lane { sub, tx });
        }

        Self {
            lanes,
            workers,
            bus,
        }
    }

    /// Fan-out one event to all interested subscribers (non-blocking).
    pub fn emit(&self, event: &Event) {
        let ev = Arc::new(event.clone());
        for lane in &self.lanes {
            if !lane.sub.interested(ev.kind) {
                continue;
            }
            let dropped = match lane.tx.try_send(Arc::clone(&ev)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            // no overflow-on-overflow loops
            if !ev.is_internal() {
                self.bus
                    .publish(Event::subscriber_overflow(lane.sub.name(), dropped));
            }
        }
    }

    /// Graceful shutdown: close all queues and await worker completion.
    pub async fn shutdown(self) {
        drop(self.lanes);
        for h in self.workers {
            let _ = h.await;
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }
}

async fn drive(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
    while let Some(ev) = rx.recv().await {
        let fut = std::panic::AssertUnwindSafe(sub.on_event(ev.as_ref()));
        if let Err(panic) = fut.catch_unwind().await {
            bus.publish(Event::subscriber_panicked(sub.name(), panic_message(&*panic)));
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.seen.lock().unwrap().push(event.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }

        fn interested(&self, kind: EventKind) -> bool {
            kind != EventKind::ProbeResponse
        }
    }

    struct Panicky;

    #[async_trait]
    impl Subscribe for Panicky {
        async fn on_event(&self, _event: &Event) {
            panic!("subscriber blew up");
        }

        fn name(&self) -> &'static str {
            "panicky"
        }
    }

    #[tokio::test]
    async fn emit_skips_uninterested_kinds() {
        let rec = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        let set = SubscriberSet::new(vec![rec.clone() as Arc<dyn Subscribe>], Bus::new(16));
        set.emit(&Event::new(EventKind::ProbeResponse));
        set.emit(&Event::new(EventKind::TaskCompleted));
        set.shutdown().await;
        assert_eq!(*rec.seen.lock().unwrap(), vec![EventKind::TaskCompleted]);
    }

    #[tokio::test]
    async fn panics_are_reported_on_the_bus() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Panicky) as Arc<dyn Subscribe>], bus);
        set.emit(&Event::new(EventKind::UnitFault));
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.reason.as_deref(), Some("subscriber blew up"));
        set.shutdown().await;
    }
}
