//! # Runtime events emitted by the scheduler actor and the subscriber workers.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Task events**: submission, assignment, completion, failure, cancellation, requeue
//! - **Unit events**: start, fault, recreation, handshake, probe answers
//! - **Subscriber events**: overflow and panic of subscriber workers
//! - **Runtime events**: shutdown
//!
//! The [`Event`] struct carries optional metadata (task id, unit, attempt, duration, reason).
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use taskpool::{Event, EventKind, TaskType, UnitId};
//!
//! let ev = Event::new(EventKind::TaskAssigned)
//!     .with_task("t-1", TaskType::ContentFilter)
//!     .with_unit(UnitId(2))
//!     .with_attempt(1);
//!
//! assert_eq!(ev.kind, EventKind::TaskAssigned);
//! assert_eq!(ev.task.as_deref(), Some("t-1"));
//! assert_eq!(ev.unit, Some(UnitId(2)));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::tasks::TaskType;
use crate::units::UnitId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: panic info
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,

    // === Task events ===
    /// Task accepted and queued.
    ///
    /// Sets: `task`, `task_type`, `reason` (priority band)
    TaskSubmitted,

    /// Task placed on a unit.
    ///
    /// Sets: `task`, `task_type`, `unit`, `attempt`
    TaskAssigned,

    /// Unit delivered a result.
    ///
    /// Sets: `task`, `task_type`, `unit`, `attempt`, `duration_ms`
    TaskCompleted,

    /// Unit reported a task error.
    ///
    /// Sets: `task`, `task_type`, `unit`, `duration_ms`, `reason`
    TaskFailed,

    /// Submitter cancelled a task.
    ///
    /// Sets: `task`, `unit` (if it was assigned)
    TaskCancelled,

    /// Task lost to a unit fault and put back at the front of the queue.
    ///
    /// Sets: `task`, `task_type`, `unit` (the failed unit), `attempt` (new attempt count)
    TaskRequeued,

    /// Task rejected for good (retry budget exhausted, duplicate id, shutdown).
    ///
    /// Sets: `task`, `reason`
    TaskRejected,

    /// A result arrived for a task nobody waits for anymore; it was dropped.
    ///
    /// Sets: `task`, `unit`
    ResultOrphaned,

    // === Unit events ===
    /// Unit created (initial start-up or recreation).
    ///
    /// Sets: `unit`, `attempt` (generation)
    UnitStarted,

    /// Unit reported an unrecoverable fault.
    ///
    /// Sets: `unit`, `reason`
    UnitFault,

    /// Unit torn down and recreated under the same id.
    ///
    /// Sets: `unit`, `attempt` (new generation)
    UnitRecreated,

    /// Unit announced its capabilities.
    ///
    /// Sets: `unit`
    CapabilitiesAnnounced,

    /// Unit speaks a different protocol version (advisory).
    ///
    /// Sets: `unit`, `reason` ("expected=X reported=Y")
    VersionMismatch,

    /// Unit answered a health probe.
    ///
    /// Sets: `unit`, `reason` (active task count / uptime)
    ProbeResponse,

    // === Runtime events ===
    /// Scheduler is shutting down.
    ShutdownRequested,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Task id (or subscriber name for subscriber events).
    pub task: Option<Arc<str>>,
    /// Task family, if applicable.
    pub task_type: Option<TaskType>,
    /// Unit involved, if applicable.
    pub unit: Option<UnitId>,
    /// Attempt count (starting from 1) or unit generation.
    pub attempt: Option<u32>,
    /// Processing time in milliseconds (compact).
    pub duration_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            task_type: None,
            unit: None,
            attempt: None,
            duration_ms: None,
            reason: None,
        }
    }

    /// Attaches a task id and family.
    #[inline]
    pub fn with_task(mut self, task: impl AsRef<str>, task_type: TaskType) -> Self {
        self.task = Some(task.as_ref().into());
        self.task_type = Some(task_type);
        self
    }

    /// Attaches a task id when the family is unknown.
    #[inline]
    pub fn with_task_id(mut self, task: impl AsRef<str>) -> Self {
        self.task = Some(task.as_ref().into());
        self
    }

    /// Attaches a unit id.
    #[inline]
    pub fn with_unit(mut self, unit: UnitId) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Attaches an attempt count (or generation).
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a processing duration (stored as milliseconds).
    #[inline]
    pub fn with_duration(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.duration_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task_id(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task_id(subscriber)
            .with_reason(info)
    }

    /// True for events produced by the subscriber machinery itself.
    #[inline]
    pub fn is_internal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
