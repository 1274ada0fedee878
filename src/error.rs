//! Error types used by the scheduler, the execution units and the task families.
//!
//! This module defines three enums:
//!
//! - [`TaskError`]: raised by a task family while computing one task.
//! - [`DispatchError`]: raised on the caller side of the scheduler (submit/await).
//! - [`ProtocolError`]: envelope encode/decode failures between scheduler and units.
//!
//! All of them provide `as_label` for logs/metrics, following one convention:
//! short, stable, snake_case.

use std::time::Duration;

use thiserror::Error;

use crate::tasks::{TaskId, TaskType};
use crate::units::UnitId;

/// # Errors produced by task execution.
///
/// These are reported by a unit (or by the fallback executor) for a single task.
/// The scheduler never retries them on its own.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Payload could not be decoded or is semantically invalid.
    #[error("invalid payload: {reason}")]
    InvalidPayload {
        /// What was wrong with it.
        reason: String,
    },

    /// The computation itself failed.
    #[error("execution failed: {error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },

    /// The task observed a cancellation notice and stopped between batches.
    #[error("task cancelled")]
    Canceled,

    /// The handler has no implementation for this task type.
    #[error("unsupported task type: {task_type}")]
    Unsupported {
        /// Rejected type.
        task_type: TaskType,
    },
}

impl TaskError {
    /// Shorthand for [`TaskError::InvalidPayload`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        TaskError::InvalidPayload {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskpool::TaskError;
    ///
    /// let err = TaskError::Canceled;
    /// assert_eq!(err.as_label(), "task_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::InvalidPayload { .. } => "task_invalid_payload",
            TaskError::Failed { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
            TaskError::Unsupported { .. } => "task_unsupported",
        }
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(err: serde_json::Error) -> Self {
        TaskError::invalid(err.to_string())
    }
}

/// # Errors observed by a caller of the scheduler.
///
/// Façades turn every one of these into a fallback execution; direct users of
/// [`Scheduler`](crate::Scheduler) see them as the rejection of a task handle.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// A unit ran the task and reported a task-level failure.
    #[error("task {task_id} failed on {unit}: {error}")]
    Task {
        /// Failed task.
        task_id: TaskId,
        /// Unit that reported the failure.
        unit: UnitId,
        /// Reported error.
        error: TaskError,
    },

    /// The task was re-queued after unit crashes more often than its `retry_count` allows.
    #[error("task {task_id} lost to unit failure after {attempts} attempts")]
    UnitFailure {
        /// Rejected task.
        task_id: TaskId,
        /// Attempts made (including the ones lost to crashes).
        attempts: u32,
    },

    /// Caller-side timer fired before a result arrived.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// The task was cancelled before a result could be used.
    #[error("task {task_id} cancelled")]
    Cancelled {
        /// Cancelled task.
        task_id: TaskId,
    },

    /// Scheduler is not running (closed, never started, or parallel execution disabled).
    #[error("scheduler unavailable")]
    Unavailable,

    /// No configured unit declares support for this task type.
    #[error("no unit supports task type {task_type}")]
    UnsupportedTaskType {
        /// Rejected type.
        task_type: TaskType,
    },

    /// A task with this id is already in flight.
    #[error("task id {task_id} is already in flight")]
    DuplicateTaskId {
        /// Conflicting id.
        task_id: TaskId,
    },

    /// Scheduler shut down while the task was pending.
    #[error("scheduler shut down")]
    Shutdown,
}

impl DispatchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskpool::DispatchError;
    /// use std::time::Duration;
    ///
    /// let err = DispatchError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "dispatch_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::Task { .. } => "dispatch_task_error",
            DispatchError::UnitFailure { .. } => "dispatch_unit_failure",
            DispatchError::Timeout { .. } => "dispatch_timeout",
            DispatchError::Cancelled { .. } => "dispatch_cancelled",
            DispatchError::Unavailable => "dispatch_unavailable",
            DispatchError::UnsupportedTaskType { .. } => "dispatch_unsupported_type",
            DispatchError::DuplicateTaskId { .. } => "dispatch_duplicate_id",
            DispatchError::Shutdown => "dispatch_shutdown",
        }
    }
}

/// # Errors on the scheduler ⇄ unit message boundary.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Envelope `data` did not match the shape expected for its kind.
    #[error("malformed {kind} message: {source}")]
    Malformed {
        /// Message kind label.
        kind: &'static str,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// Payload could not be serialized into an envelope.
    #[error("cannot encode {kind} message: {source}")]
    Encode {
        /// Message kind label.
        kind: &'static str,
        /// Encoder error.
        #[source]
        source: serde_json::Error,
    },
}

impl ProtocolError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ProtocolError::Malformed { .. } => "protocol_malformed",
            ProtocolError::Encode { .. } => "protocol_encode",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(TaskError::invalid("x").as_label(), "task_invalid_payload");
        assert_eq!(
            TaskError::Unsupported {
                task_type: TaskType::Aggregation
            }
            .as_label(),
            "task_unsupported"
        );
        assert_eq!(DispatchError::Shutdown.as_label(), "dispatch_shutdown");
        assert_eq!(
            DispatchError::UnitFailure {
                task_id: TaskId::from("t"),
                attempts: 4
            }
            .as_label(),
            "dispatch_unit_failure"
        );
    }

    #[test]
    fn serde_errors_become_invalid_payload() {
        let err = serde_json::from_str::<u32>("nope").unwrap_err();
        assert!(matches!(TaskError::from(err), TaskError::InvalidPayload { .. }));
    }

    #[test]
    fn dispatch_error_messages_name_the_task() {
        let err = DispatchError::Task {
            task_id: TaskId::from("t-1"),
            unit: UnitId(2),
            error: TaskError::Canceled,
        };
        assert_eq!(err.to_string(), "task t-1 failed on unit-2: task cancelled");
    }
}
