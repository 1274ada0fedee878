//! # Balancer contract and configuration selector.

use crate::tasks::Task;
use crate::units::{UnitCapabilities, UnitId};

use super::{LeastLoaded, RoundRobin, TaskAffinity};

/// A unit eligible for the task being placed.
#[derive(Clone, Copy, Debug)]
pub struct Candidate<'a> {
    pub id: UnitId,
    /// Tasks currently active on the unit (including ones placed earlier in this pass).
    pub load: usize,
    pub capabilities: &'a UnitCapabilities,
}

/// Strategy that picks one unit for a task.
///
/// ## Rules
/// - Returns `None` only when `candidates` is empty.
/// - The returned id is always one of the candidates.
/// - Must not block: it runs inside the pool actor.
pub trait LoadBalancer: Send + 'static {
    fn pick(&mut self, candidates: &[Candidate<'_>], task: &Task) -> Option<UnitId>;

    /// Strategy name (for logs).
    fn name(&self) -> &'static str;
}

/// Selects a built-in strategy at configuration time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BalancerKind {
    RoundRobin,
    LeastLoaded,
    /// Preferred units first, least-loaded among them (default).
    #[default]
    TaskAffinity,
}

impl BalancerKind {
    /// Instantiates the strategy.
    pub fn build(self) -> Box<dyn LoadBalancer> {
        match self {
            BalancerKind::RoundRobin => Box::new(RoundRobin::default()),
            BalancerKind::LeastLoaded => Box::new(LeastLoaded),
            BalancerKind::TaskAffinity => Box::new(TaskAffinity),
        }
    }
}

/// Least-loaded pick over an iterator; first candidate wins ties.
pub(super) fn least_loaded<'c, 'a: 'c>(
    candidates: impl IntoIterator<Item = &'c Candidate<'a>>,
) -> Option<UnitId> {
    let mut best: Option<&Candidate<'a>> = None;
    for c in candidates {
        if best.is_none_or(|b| c.load < b.load) {
            best = Some(c);
        }
    }
    best.map(|c| c.id)
}
