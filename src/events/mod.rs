//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish runtime events emitted by the scheduler actor and the subscriber
//! workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `PoolActor` (task/unit lifecycle), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the subscriber listener spawned by the builder (fans out to
//!   `SubscriberSet`), and anyone holding a receiver from `Scheduler::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
