//! # Scheduler-side view of one execution unit.
//!
//! An [`ExecutionUnit`] is the record the pool actor keeps for every unit it
//! spawned: declared capabilities, the tasks it currently holds, health and a
//! small history. The unit itself runs elsewhere (see [`host`](super::host));
//! the actor only reaches it through its [`UnitLink`].
//!
//! ## Rules
//! - `active.len() <= capabilities.max_concurrent_tasks` at all times
//! - `active` keeps assignment order (recovery requeues in that order)
//! - `id` never changes; `generation` increments on every recreation

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::protocol::{Envelope, HealthReport};
use crate::tasks::{TaskId, TaskType};

use super::host::UnitLink;

/// Stable identity of a unit slot (`unit-0` .. `unit-3`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub u32);

impl UnitId {
    /// Position of the unit in the pool.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit-{}", self.0)
    }
}

/// What a unit declares it can run.
///
/// ## Field semantics
/// - `supported_task_types`: the only types the balancer may route to this unit
/// - `max_concurrent_tasks`: slot count (min 1)
/// - `preferred_task_types`: affinity hint for [`TaskAffinity`](crate::TaskAffinity)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCapabilities {
    pub supported_task_types: Vec<TaskType>,
    pub max_concurrent_tasks: usize,
    #[serde(default)]
    pub preferred_task_types: Vec<TaskType>,
}

impl UnitCapabilities {
    /// Supports every task type, no preference.
    pub fn all(max_concurrent_tasks: usize) -> Self {
        Self {
            supported_task_types: TaskType::ALL.to_vec(),
            max_concurrent_tasks,
            preferred_task_types: Vec::new(),
        }
    }

    /// Returns capabilities with the given preferred types.
    pub fn with_preferred(mut self, preferred: impl IntoIterator<Item = TaskType>) -> Self {
        self.preferred_task_types = preferred.into_iter().collect();
        self
    }

    #[inline]
    pub fn supports(&self, task_type: TaskType) -> bool {
        self.supported_task_types.contains(&task_type)
    }

    #[inline]
    pub fn prefers(&self, task_type: TaskType) -> bool {
        self.preferred_task_types.contains(&task_type)
    }

    /// Slot count clamped to a minimum of 1.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.max_concurrent_tasks.max(1)
    }
}

/// Unit health as seen by the scheduler.
///
/// `Starting` means the capability handshake has not arrived yet; such a unit
/// already accepts work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitHealth {
    Starting,
    Healthy,
    Unhealthy,
}

impl UnitHealth {
    /// True when the unit may receive new tasks.
    #[inline]
    pub fn accepts_work(self) -> bool {
        !matches!(self, UnitHealth::Unhealthy)
    }
}

/// Completion counters of one unit slot (kept across recreations).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitHistory {
    pub completed: u64,
    pub failed: u64,
    pub avg_duration_ms: f64,
}

impl UnitHistory {
    /// Records one finished task and updates the running average.
    pub fn record(&mut self, success: bool, duration_ms: u64) {
        if success {
            self.completed += 1;
        } else {
            self.failed += 1;
        }
        let n = (self.completed + self.failed) as f64;
        self.avg_duration_ms += (duration_ms as f64 - self.avg_duration_ms) / n;
    }
}

/// One execution unit as owned by the pool actor.
pub(crate) struct ExecutionUnit {
    pub(crate) id: UnitId,
    pub(crate) capabilities: UnitCapabilities,
    pub(crate) active: Vec<TaskId>,
    pub(crate) health: UnitHealth,
    pub(crate) history: UnitHistory,
    pub(crate) generation: u32,
    pub(crate) protocol_version: Option<u32>,
    pub(crate) last_probe: Option<HealthReport>,
    link: UnitLink,
}

impl ExecutionUnit {
    pub(crate) fn new(id: UnitId, capabilities: UnitCapabilities, link: UnitLink) -> Self {
        Self {
            id,
            capabilities,
            active: Vec::new(),
            health: UnitHealth::Starting,
            history: UnitHistory::default(),
            generation: 0,
            protocol_version: None,
            last_probe: None,
            link,
        }
    }

    /// Free slots left.
    #[inline]
    pub(crate) fn spare(&self) -> usize {
        self.capabilities.capacity().saturating_sub(self.active.len())
    }

    #[inline]
    pub(crate) fn is_candidate(&self) -> bool {
        self.health.accepts_work() && self.spare() > 0
    }

    /// Removes `task_id` from the active set; returns whether it was there.
    pub(crate) fn release(&mut self, task_id: &TaskId) -> bool {
        match self.active.iter().position(|t| t == task_id) {
            Some(pos) => {
                self.active.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Sends an envelope to the unit host; `false` when its inbox is gone.
    pub(crate) fn send(&self, env: Envelope) -> bool {
        self.link.send(env)
    }

    /// Tears down the current host and installs a fresh one under the same id.
    ///
    /// Returns the tasks that were active, in assignment order.
    pub(crate) fn replace(&mut self, link: UnitLink) -> Vec<TaskId> {
        self.link.teardown();
        self.link = link;
        self.generation += 1;
        self.health = UnitHealth::Starting;
        self.protocol_version = None;
        self.last_probe = None;
        std::mem::take(&mut self.active)
    }

    pub(crate) fn teardown(&self) {
        self.link.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_keeps_a_running_average() {
        let mut h = UnitHistory::default();
        h.record(true, 10);
        h.record(false, 30);
        h.record(true, 20);
        assert_eq!(h.completed, 2);
        assert_eq!(h.failed, 1);
        assert!((h.avg_duration_ms - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn capabilities_clamp_capacity() {
        let caps = UnitCapabilities::all(0).with_preferred([TaskType::Aggregation]);
        assert_eq!(caps.capacity(), 1);
        assert!(caps.supports(TaskType::Validation));
        assert!(caps.prefers(TaskType::Aggregation));
        assert!(!caps.prefers(TaskType::Validation));
    }

    #[test]
    fn unit_id_renders_with_prefix() {
        assert_eq!(UnitId(3).to_string(), "unit-3");
        assert_eq!(serde_json::to_string(&UnitId(3)).unwrap(), "3");
    }

    #[test]
    fn replace_bumps_generation_and_returns_active_in_order() {
        let (link, _rx) = UnitLink::detached();
        let mut unit = ExecutionUnit::new(UnitId(0), UnitCapabilities::all(3), link);
        unit.active = vec!["a".into(), "b".into()];
        unit.health = UnitHealth::Unhealthy;

        let (fresh, _rx2) = UnitLink::detached();
        let lost = unit.replace(fresh);

        assert_eq!(lost, vec![TaskId::from("a"), TaskId::from("b")]);
        assert_eq!(unit.generation, 1);
        assert_eq!(unit.health, UnitHealth::Starting);
        assert!(unit.active.is_empty());
    }
}
