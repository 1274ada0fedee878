//! Execution units: the scheduler-side record and the worker-side host.
//!
//! - [`UnitId`], [`UnitCapabilities`], [`UnitHealth`], [`UnitHistory`] public data
//! - `ExecutionUnit` what the pool actor keeps per unit
//! - `host` the tokio task that actually runs the handler

mod host;
mod unit;

pub(crate) use host::{HostFactory, UnitEvent, UnitEventKind, UnitFactory};
#[cfg(test)]
pub(crate) use host::UnitLink;
pub(crate) use unit::ExecutionUnit;
pub use unit::{UnitCapabilities, UnitHealth, UnitHistory, UnitId};
