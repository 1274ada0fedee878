//! Typed `data` payloads for each [`MessageKind`](super::MessageKind).

use serde::{Deserialize, Serialize};

use crate::tasks::{Task, TaskId, TaskType};

/// `TaskDispatch` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub task: Task,
    /// 1-based attempt number.
    pub attempt: u32,
}

/// `TaskCancel` payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRequest {
    pub task_id: TaskId,
}

/// `TaskError` payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskErrorReport {
    pub task_id: TaskId,
    pub task_type: TaskType,
    pub error: WireTaskError,
    pub processing_time_ms: u64,
}

/// Serializable form of [`TaskError`](crate::TaskError).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum WireTaskError {
    InvalidPayload { reason: String },
    Failed { error: String },
    Canceled,
    Unsupported { task_type: TaskType },
}

impl From<&crate::TaskError> for WireTaskError {
    fn from(err: &crate::TaskError) -> Self {
        use crate::TaskError as E;
        match err {
            E::InvalidPayload { reason } => WireTaskError::InvalidPayload {
                reason: reason.clone(),
            },
            E::Failed { error } => WireTaskError::Failed {
                error: error.clone(),
            },
            E::Canceled => WireTaskError::Canceled,
            E::Unsupported { task_type } => WireTaskError::Unsupported {
                task_type: *task_type,
            },
        }
    }
}

impl From<WireTaskError> for crate::TaskError {
    fn from(err: WireTaskError) -> Self {
        match err {
            WireTaskError::InvalidPayload { reason } => crate::TaskError::InvalidPayload { reason },
            WireTaskError::Failed { error } => crate::TaskError::Failed { error },
            WireTaskError::Canceled => crate::TaskError::Canceled,
            WireTaskError::Unsupported { task_type } => crate::TaskError::Unsupported { task_type },
        }
    }
}

/// `HealthResponse` payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub active_tasks: usize,
    pub uptime_ms: u64,
}

/// `VersionCheck` payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionReport {
    pub protocol_version: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TaskError;

    #[test]
    fn task_errors_survive_the_wire() {
        for err in [
            TaskError::invalid("bad date"),
            TaskError::Failed { error: "boom".into() },
            TaskError::Canceled,
            TaskError::Unsupported {
                task_type: TaskType::Aggregation,
            },
        ] {
            let wire = serde_json::to_value(WireTaskError::from(&err)).unwrap();
            let back: WireTaskError = serde_json::from_value(wire).unwrap();
            assert_eq!(TaskError::from(back), err);
        }
    }
}
