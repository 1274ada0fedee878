//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`]. The scheduler
//! actor and the subscriber workers publish; the subscriber listener and any
//! caller of [`Scheduler::subscribe`](crate::Scheduler::subscribe) receive.
//!
//! ```text
//! Publishers:                          Receivers:
//!   PoolActor ───────┐               ┌──► subscriber listener ──► SubscriberSet
//!   SubscriberSet ───┴──► Bus ───────┤
//!   (overflow/panic)   (broadcast)   └──► Scheduler::subscribe() callers
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks.
//! - **Bounded capacity**: one ring buffer shared by all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no receivers at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers, the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn receivers_see_events_published_after_subscribe() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::TaskSubmitted));
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::UnitFault));
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::UnitFault);
    }
}
