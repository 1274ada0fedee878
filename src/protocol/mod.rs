//! Scheduler ⇄ unit wire protocol.
//!
//! ## Contents
//! - [`Envelope`], [`MessageKind`], [`PROTOCOL_VERSION`] the message frame
//! - typed payloads for each kind ([`DispatchRequest`], [`TaskErrorReport`], ...)
//!
//! ## Handshake
//! ```text
//! unit created ──► CapabilityAnnouncement ──► VersionCheck ──► (ready; already healthy)
//! ```
//! A version mismatch is logged and published as an event; dispatch is not blocked.

mod envelope;
mod messages;

pub use envelope::{Envelope, MessageKind, PROTOCOL_VERSION};
pub use messages::{CancelRequest, DispatchRequest, HealthReport, TaskErrorReport, VersionReport};
