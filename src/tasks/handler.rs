//! # Task handler: the logic an execution unit runs.
//!
//! A [`TaskHandler`] is an ordinary, synchronous function object. The pool
//! loads one handler per process and every unit (and the fallback executor)
//! shares it, so the parallel path and the fallback path compute with the same
//! code. Units call it from the blocking thread pool; the fallback executor
//! calls it directly on the caller's context.
//!
//! The handler receives an [`ExecutionContext`] carrying the cancellation
//! token and the progress sink for this one task.
//!
//! ## Example
//! ```rust
//! use serde_json::json;
//! use taskpool::{ExecutionContext, HandlerFn, HandlerRef, Task, TaskError};
//!
//! let echo: HandlerRef = HandlerFn::arc(|task: &Task, ctx: &ExecutionContext| {
//!     ctx.checkpoint()?;
//!     Ok::<_, TaskError>(json!({ "echo": task.payload }))
//! });
//! assert!(echo.supports(taskpool::TaskType::Validation));
//! ```

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::{Task, TaskId, TaskType};

/// Progress sink: `(processed, total)`.
pub type ProgressSink = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Per-task execution context handed to a [`TaskHandler`].
pub struct ExecutionContext {
    task_id: TaskId,
    cancel: CancellationToken,
    batch_size: usize,
    progress: Option<ProgressSink>,
}

impl ExecutionContext {
    /// Context for a unit-side execution that can be cancelled.
    pub fn new(task: &Task, cancel: CancellationToken) -> Self {
        Self {
            task_id: task.task_id.clone(),
            cancel,
            batch_size: task.options.batch_size_clamped(),
            progress: None,
        }
    }

    /// Context that is never cancelled and reports no progress (fallback path).
    pub fn detached(task: &Task) -> Self {
        Self::new(task, CancellationToken::new())
    }

    /// Attaches a progress sink.
    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Id of the task being executed.
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Entries processed between checkpoints.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// True once a cancellation notice arrived for this task.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns `Err(TaskError::Canceled)` once cancellation was requested.
    pub fn checkpoint(&self) -> Result<(), TaskError> {
        if self.cancel.is_cancelled() {
            Err(TaskError::Canceled)
        } else {
            Ok(())
        }
    }

    /// Reports progress if a sink is attached.
    pub fn report(&self, processed: u64, total: u64) {
        if let Some(sink) = &self.progress {
            sink(processed, total);
        }
    }

    /// Maps `items` in batches of [`batch_size`](Self::batch_size).
    ///
    /// Before each batch the cancellation token is checked; after each batch
    /// progress is reported. `f` receives the item's absolute index.
    pub fn map_batched<T, R>(
        &self,
        items: &[T],
        mut f: impl FnMut(usize, &T) -> Result<R, TaskError>,
    ) -> Result<Vec<R>, TaskError> {
        let total = items.len() as u64;
        let mut out = Vec::with_capacity(items.len());
        for (batch_no, chunk) in items.chunks(self.batch_size).enumerate() {
            self.checkpoint()?;
            let offset = batch_no * self.batch_size;
            for (i, item) in chunk.iter().enumerate() {
                out.push(f(offset + i, item)?);
            }
            self.report(out.len() as u64, total);
        }
        Ok(out)
    }
}

/// Contract for task-family logic.
///
/// Implementations must be deterministic for a given payload: the pool relies
/// on the parallel path and the fallback path producing equal outcomes.
pub trait TaskHandler: Send + Sync + 'static {
    /// Whether this handler can run `task_type` at all.
    fn supports(&self, task_type: TaskType) -> bool {
        let _ = task_type;
        true
    }

    /// Computes the output payload for `task`.
    fn execute(&self, task: &Task, ctx: &ExecutionContext) -> Result<Value, TaskError>;
}

/// Shared handler reference.
pub type HandlerRef = Arc<dyn TaskHandler>;

/// Function-backed handler.
///
/// Wraps a closure `Fn(&Task, &ExecutionContext) -> Result<Value, TaskError>`.
pub struct HandlerFn<F> {
    f: F,
}

impl<F> HandlerFn<F>
where
    F: Fn(&Task, &ExecutionContext) -> Result<Value, TaskError> + Send + Sync + 'static,
{
    /// Creates a new function-backed handler.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<F> TaskHandler for HandlerFn<F>
where
    F: Fn(&Task, &ExecutionContext) -> Result<Value, TaskError> + Send + Sync + 'static,
{
    fn execute(&self, task: &Task, ctx: &ExecutionContext) -> Result<Value, TaskError> {
        (self.f)(task, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskOptions;
    use serde_json::json;
    use std::sync::Mutex;

    fn task(batch: usize) -> Task {
        Task::new("t".into(), TaskType::Validation, json!(null))
            .with_options(TaskOptions::default().with_batch_size(batch))
    }

    #[test]
    fn map_batched_reports_progress_per_batch() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let ctx = ExecutionContext::detached(&task(2))
            .with_progress(Box::new(move |p, t| sink.lock().unwrap().push((p, t))));

        let out = ctx.map_batched(&[1, 2, 3, 4, 5], |i, v| Ok(i * 10 + v)).unwrap();
        assert_eq!(out, vec![1, 12, 23, 34, 45]);
        assert_eq!(*seen.lock().unwrap(), vec![(2, 5), (4, 5), (5, 5)]);
    }

    #[test]
    fn map_batched_stops_when_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = ExecutionContext::new(&task(10), token);
        let res = ctx.map_batched(&[1, 2, 3], |_, v| Ok(*v));
        assert_eq!(res, Err(TaskError::Canceled));
    }

    #[test]
    fn handler_fn_runs_closure() {
        let h = HandlerFn::arc(|t: &Task, _ctx: &ExecutionContext| Ok(json!(t.task_id.as_str())));
        let t = task(1);
        let out = h.execute(&t, &ExecutionContext::detached(&t)).unwrap();
        assert_eq!(out, json!("t"));
    }
}
