//! # Task results and outcomes.
//!
//! [`TaskResult`] has the same shape whether a unit or the fallback executor
//! produced it; only [`ResultMetadata::unit_id`] tells them apart.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::TaskError;
use crate::tasks::{TaskId, TaskType};
use crate::units::UnitId;

/// Where and how long a task ran.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMetadata {
    /// Wall time spent in the task family function.
    pub processing_time_ms: u64,
    /// Producing unit; `None` when the fallback executor produced the result.
    pub unit_id: Option<UnitId>,
    /// Attempt number (1-based) that produced the result.
    pub attempt: u32,
}

/// Result of one task.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub task_type: TaskType,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: ResultMetadata,
}

impl TaskResult {
    /// Successful result.
    pub fn ok(task_id: TaskId, task_type: TaskType, payload: Value, metadata: ResultMetadata) -> Self {
        Self {
            task_id,
            task_type,
            success: true,
            payload: Some(payload),
            error: None,
            metadata,
        }
    }

    /// Failed result carrying the error message.
    pub fn failed(
        task_id: TaskId,
        task_type: TaskType,
        error: &TaskError,
        metadata: ResultMetadata,
    ) -> Self {
        Self {
            task_id,
            task_type,
            success: false,
            payload: None,
            error: Some(error.to_string()),
            metadata,
        }
    }

    /// Decodes the payload into a typed output.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, TaskError> {
        match &self.payload {
            Some(v) => Ok(serde_json::from_value(v.clone())?),
            None => Err(TaskError::Failed {
                error: self
                    .error
                    .clone()
                    .unwrap_or_else(|| "result has no payload".to_string()),
            }),
        }
    }

    /// True when both results carry the same outcome, ignoring metadata.
    pub fn same_outcome(&self, other: &TaskResult) -> bool {
        self.task_type == other.task_type
            && self.success == other.success
            && self.payload == other.payload
            && self.error == other.error
    }

    /// True when a unit (not the fallback executor) produced this result.
    pub fn from_unit(&self) -> bool {
        self.metadata.unit_id.is_some()
    }
}

/// What a task handle resolves to when the scheduler accepted the task.
#[derive(Clone, Debug, PartialEq)]
pub enum TaskOutcome {
    /// A unit produced a result.
    Completed(TaskResult),
    /// The submitter cancelled the task before a result was delivered.
    Cancelled { task_id: TaskId },
}

impl TaskOutcome {
    /// Returns the result if the task completed.
    pub fn into_result(self) -> Option<TaskResult> {
        match self {
            TaskOutcome::Completed(r) => Some(r),
            TaskOutcome::Cancelled { .. } => None,
        }
    }

    /// True for [`TaskOutcome::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskOutcome::Cancelled { .. })
    }
}

/// Progress report forwarded from a unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProgress {
    pub task_id: TaskId,
    pub processed: u64,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(unit: Option<u32>) -> ResultMetadata {
        ResultMetadata {
            processing_time_ms: 3,
            unit_id: unit.map(UnitId),
            attempt: 1,
        }
    }

    #[test]
    fn same_outcome_ignores_metadata() {
        let a = TaskResult::ok("t".into(), TaskType::Validation, json!({"n": 1}), meta(Some(0)));
        let b = TaskResult::ok("t".into(), TaskType::Validation, json!({"n": 1}), meta(None));
        assert!(a.same_outcome(&b));
        assert!(a.from_unit());
        assert!(!b.from_unit());
    }

    #[test]
    fn decode_failed_result_reports_error() {
        let r = TaskResult::failed(
            "t".into(),
            TaskType::Aggregation,
            &TaskError::invalid("no metric"),
            meta(None),
        );
        let err = r.decode::<Value>().unwrap_err();
        assert_eq!(
            err,
            TaskError::Failed {
                error: "invalid payload: no metric".into()
            }
        );
    }
}
