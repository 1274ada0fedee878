//! Load-balancing strategies.
//!
//! A balancer picks one unit out of a candidate set for a given task. The pool
//! actor has already filtered the candidates (healthy, spare capacity, supports
//! the task's type), so a balancer only decides *which* one.
//!
//! ## Contents
//! - [`LoadBalancer`] the strategy trait
//! - [`RoundRobin`] rotating index over the candidates, ignores load
//! - [`LeastLoaded`] fewest active tasks, first wins ties
//! - [`TaskAffinity`] preferred units first, then least-loaded (default)
//! - [`BalancerKind`] configuration-time selector
//!
//! ## Quick wiring
//! ```text
//! PoolConfig { balancer: BalancerKind }
//!      └─► PoolState::schedule_pass()
//!           └─► balancer.pick(&candidates, &task) → Some(UnitId) | None (empty set)
//! ```

mod affinity;
mod least_loaded;
mod round_robin;
mod strategy;

pub use affinity::TaskAffinity;
pub use least_loaded::LeastLoaded;
pub use round_robin::RoundRobin;
pub use strategy::{BalancerKind, Candidate, LoadBalancer};
