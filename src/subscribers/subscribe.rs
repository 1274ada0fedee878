//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging observers (logging,
//! dashboards, metrics exporters) into the scheduler. Each subscriber is
//! driven by a dedicated worker fed by a bounded queue owned by the
//! [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow; they never block the scheduler actor nor
//!   other subscribers.
//! - Each subscriber declares its queue capacity via [`Subscribe::queue_capacity`].
//!   On overflow, events for that subscriber are dropped and a
//!   `SubscriberOverflow` event is published.
//! - [`Subscribe::interested`] filters events before they are queued.

use async_trait::async_trait;

use crate::events::{Event, EventKind};

/// Contract for event subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }

    /// Whether events of `kind` should be delivered at all.
    fn interested(&self, kind: EventKind) -> bool {
        let _ = kind;
        true
    }
}
