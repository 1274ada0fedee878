//! # Fallback executor: in-process execution of a task.
//!
//! Runs the same [`TaskHandler`] the units run, synchronously on the caller's
//! thread, and always produces a [`TaskResult`]. A family error (or a panic in
//! the handler) becomes a `success = false` result instead of an error.
//!
//! Results carry `unit_id = None` and `attempt = 1`.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::error::TaskError;
use crate::journal::JournalHandler;
use crate::subscribers::panic_message;
use crate::tasks::{ExecutionContext, HandlerRef, ResultMetadata, Task, TaskResult};

/// Synchronous executor used when the parallel path is unavailable or failed.
#[derive(Clone)]
pub struct FallbackExecutor {
    handler: HandlerRef,
}

impl FallbackExecutor {
    /// Executor running `handler`.
    pub fn new(handler: HandlerRef) -> Self {
        Self { handler }
    }

    /// Executor running the journal task families.
    pub fn journal() -> Self {
        Self::new(Arc::new(JournalHandler::new()))
    }

    /// Runs `task` to completion on the current thread.
    pub fn execute(&self, task: &Task) -> TaskResult {
        let started = Instant::now();
        let ctx = ExecutionContext::detached(task);

        let outcome = if self.handler.supports(task.task_type) {
            catch_unwind(AssertUnwindSafe(|| self.handler.execute(task, &ctx))).unwrap_or_else(|panic| {
                Err(TaskError::Failed {
                    error: format!("handler panicked: {}", panic_message(&*panic)),
                })
            })
        } else {
            Err(TaskError::Unsupported {
                task_type: task.task_type,
            })
        };

        let meta = ResultMetadata {
            processing_time_ms: started.elapsed().as_millis() as u64,
            unit_id: None,
            attempt: 1,
        };
        match outcome {
            Ok(payload) => TaskResult::ok(task.task_id.clone(), task.task_type, payload, meta),
            Err(err) => {
                debug!(task = %task.task_id, kind = %task.task_type, error = %err, "fallback execution failed");
                TaskResult::failed(task.task_id.clone(), task.task_type, &err, meta)
            }
        }
    }
}

impl Default for FallbackExecutor {
    fn default() -> Self {
        Self::journal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{HandlerFn, TaskType};
    use serde_json::json;

    #[test]
    fn journal_results_are_marked_as_fallback() {
        let task = Task::new(
            "v".into(),
            TaskType::Validation,
            json!({"entries": [{"id": "a", "content": "ok"}]}),
        );
        let r = FallbackExecutor::journal().execute(&task);
        assert!(r.success);
        assert!(!r.from_unit());
        assert_eq!(r.metadata.attempt, 1);
    }

    #[test]
    fn family_errors_become_failed_results() {
        let task = Task::new("a".into(), TaskType::Aggregation, json!({"entries": []}));
        let r = FallbackExecutor::default().execute(&task);
        assert!(!r.success);
        assert!(r.error.unwrap().starts_with("invalid payload"));
    }

    #[test]
    fn panics_are_contained() {
        let exec = FallbackExecutor::new(HandlerFn::arc(|_: &Task, _: &ExecutionContext| panic!("boom")));
        let r = exec.execute(&Task::new("p".into(), TaskType::Validation, json!(null)));
        assert!(!r.success);
        assert_eq!(r.error.as_deref(), Some("execution failed: handler panicked: boom"));
    }
}
