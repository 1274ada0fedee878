//! Pool scheduler core: configuration, the owning actor and its public handle.
//!
//! The public API from this module is [`Scheduler`] (built via
//! [`SchedulerBuilder`]) plus the data it hands out.
//!
//! Internal modules:
//! - `state`: units, queue, pending map; the scheduling pass;
//! - `health`: unit recovery and observational probes;
//! - `actor`: the select loop that owns `state`;
//! - `queue` / `pending`: the two bookkeeping structures.

mod actor;
mod builder;
mod config;
mod health;
mod pending;
mod queue;
mod scheduler;
mod state;
mod stats;

pub use builder::SchedulerBuilder;
pub use config::{MAX_UNITS, PoolConfig};
pub use pending::{Callbacks, ProgressCallback};
pub use scheduler::{Scheduler, TaskHandle};
pub use stats::{PoolStatistics, UnitInfo};
