//! Point-in-time snapshots published by the pool actor.

use serde::Serialize;

use crate::protocol::HealthReport;
use crate::units::{UnitHealth, UnitHistory, UnitId};

/// Pool-wide counters.
///
/// ## Field semantics
/// - `active_units`: units holding at least one task
/// - `idle_units`: healthy units holding none
/// - `total_tasks`: accepted submissions
/// - `completed` / `failed` / `cancelled`: resolutions delivered to callers
///   (`failed` includes task errors and unit-failure rejections)
/// - `requeued`: tasks put back after a unit fault
/// - `avg_task_time_ms`: mean unit processing time over delivered results
/// - `queue_depth`: tasks waiting for a unit
/// - `in_flight`: tasks currently held by units
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PoolStatistics {
    pub total_units: usize,
    pub active_units: usize,
    pub idle_units: usize,
    pub total_tasks: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub requeued: u64,
    pub avg_task_time_ms: f64,
    pub queue_depth: usize,
    pub in_flight: usize,
}

/// Per-unit snapshot for dashboards.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UnitInfo {
    pub id: UnitId,
    pub generation: u32,
    pub health: UnitHealth,
    pub active_tasks: usize,
    pub max_concurrent_tasks: usize,
    pub history: UnitHistory,
    /// Version reported by the unit's handshake, if it arrived yet.
    pub protocol_version: Option<u32>,
    /// Last answer to a health probe.
    pub last_probe: Option<HealthReport>,
}
