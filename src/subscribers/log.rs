//! # LogWriter: renders runtime events through `tracing`
//!
//! Unit faults, rejections and version mismatches go out at `warn`;
//! task lifecycle at `debug`; probe answers at `trace`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! DEBUG taskpool: task assigned task="t-1" task_type=content_filter unit=unit-2 attempt=1
//! WARN  taskpool: unit fault unit=unit-2 reason="handler panicked: boom"
//! INFO  taskpool: unit recreated unit=unit-2 generation=1
//! DEBUG taskpool: task requeued task="t-1" unit=unit-2 attempt=2
//! ```

use async_trait::async_trait;
use tracing::{debug, info, trace, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("-");
        let task_type = e.task_type.map(|t| t.as_str()).unwrap_or("-");
        let unit = e.unit.map(|u| u.to_string()).unwrap_or_else(|| "-".into());
        let unit = unit.as_str();
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::TaskSubmitted => {
                debug!(target: "taskpool", task, task_type, priority = reason, "task submitted")
            }
            EventKind::TaskAssigned => {
                debug!(target: "taskpool", task, task_type, unit, attempt = ?e.attempt, "task assigned")
            }
            EventKind::TaskCompleted => {
                debug!(target: "taskpool", task, task_type, unit, duration_ms = ?e.duration_ms, "task completed")
            }
            EventKind::TaskFailed => {
                info!(target: "taskpool", task, task_type, unit, reason, "task failed")
            }
            EventKind::TaskCancelled => debug!(target: "taskpool", task, unit, "task cancelled"),
            EventKind::TaskRequeued => {
                debug!(target: "taskpool", task, unit, attempt = ?e.attempt, "task requeued")
            }
            EventKind::TaskRejected => warn!(target: "taskpool", task, reason, "task rejected"),
            EventKind::ResultOrphaned => {
                debug!(target: "taskpool", task, unit, "orphaned result dropped")
            }
            EventKind::UnitStarted => {
                debug!(target: "taskpool", unit, generation = ?e.attempt, "unit started")
            }
            EventKind::UnitFault => warn!(target: "taskpool", unit, reason, "unit fault"),
            EventKind::UnitRecreated => {
                info!(target: "taskpool", unit, generation = ?e.attempt, "unit recreated")
            }
            EventKind::CapabilitiesAnnounced => {
                trace!(target: "taskpool", unit, "capabilities announced")
            }
            EventKind::VersionMismatch => {
                warn!(target: "taskpool", unit, reason, "protocol version mismatch")
            }
            EventKind::ProbeResponse => trace!(target: "taskpool", unit, reason, "probe response"),
            EventKind::ShutdownRequested => info!(target: "taskpool", "shutdown requested"),
            EventKind::SubscriberOverflow => {
                warn!(target: "taskpool", subscriber = task, reason, "subscriber overflow")
            }
            EventKind::SubscriberPanicked => {
                warn!(target: "taskpool", subscriber = task, reason, "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
