//! # Event subscribers for the scheduler runtime.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`] fan-out
//! that delivers runtime events published on the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! PoolActor ── publish(Event) ──► Bus ──► subscriber listener ──► SubscriberSet::emit
//!                                                                   │
//!                                                      ┌────────────┼───────────┐
//!                                                      ▼            ▼           ▼
//!                                                  LogWriter    Dashboard    Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use taskpool::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct FaultCounter;
//!
//! #[async_trait]
//! impl Subscribe for FaultCounter {
//!     async fn on_event(&self, event: &Event) {
//!         // increment a counter...
//!     }
//!
//!     fn interested(&self, kind: EventKind) -> bool {
//!         kind == EventKind::UnitFault
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub(crate) use set::panic_message;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
