//! # Scheduler: the public handle to the pool.
//!
//! [`Scheduler`] is a cheap `Clone` handle. Every method either sends a
//! command to the pool actor or reads a `watch` snapshot; none of them blocks.
//!
//! ## Example
//! ```rust
//! use serde_json::{Value, json};
//! use taskpool::{
//!     Callbacks, ExecutionContext, HandlerFn, PoolConfig, Scheduler, Task, TaskId,
//!     TaskOutcome, TaskType,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let handler = HandlerFn::arc(|task: &Task, _ctx: &ExecutionContext| {
//!         Ok(json!({ "echo": task.payload.clone() }))
//!     });
//!     let scheduler = Scheduler::builder(PoolConfig::default())
//!         .with_handler(handler)
//!         .build();
//!
//!     let task = Task::new(TaskId::generate(), TaskType::Validation, json!([1, 2]));
//!     let outcome = scheduler.submit(task, Callbacks::none()).unwrap().await.unwrap();
//!     match outcome {
//!         TaskOutcome::Completed(result) => assert!(result.success),
//!         TaskOutcome::Cancelled { .. } => unreachable!(),
//!     }
//!     scheduler.shutdown().await;
//! }
//! ```

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::error::DispatchError;
use crate::events::{Bus, Event};
use crate::tasks::{Task, TaskId, TaskOutcome, TaskType};

use super::actor::Command;
use super::builder::SchedulerBuilder;
use super::config::PoolConfig;
use super::pending::Callbacks;
use super::stats::{PoolStatistics, UnitInfo};

/// Handle to a running pool.
#[derive(Clone)]
pub struct Scheduler {
    pub(crate) commands: mpsc::UnboundedSender<Command>,
    pub(crate) stats: watch::Receiver<PoolStatistics>,
    pub(crate) units: watch::Receiver<Vec<UnitInfo>>,
    pub(crate) supported: Arc<HashSet<TaskType>>,
    pub(crate) bus: Bus,
    pub(crate) runtime_token: CancellationToken,
    pub(crate) stopped: CancellationToken,
}

impl Scheduler {
    /// Starts configuring a pool.
    pub fn builder(cfg: PoolConfig) -> SchedulerBuilder {
        SchedulerBuilder::new(cfg)
    }

    /// Queues `task` and returns a handle resolving to its outcome.
    ///
    /// Rejected synchronously when the pool is closed or no unit supports the
    /// task's type. A duplicate in-flight id resolves the handle with
    /// [`DispatchError::DuplicateTaskId`].
    pub fn submit(&self, task: Task, callbacks: Callbacks) -> Result<TaskHandle, DispatchError> {
        if self.runtime_token.is_cancelled() {
            return Err(DispatchError::Unavailable);
        }
        if !self.supported.contains(&task.task_type) {
            return Err(DispatchError::UnsupportedTaskType {
                task_type: task.task_type,
            });
        }

        let task_id = task.task_id.clone();
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Submit {
                task,
                callbacks,
                reply,
            })
            .map_err(|_| DispatchError::Unavailable)?;
        Ok(TaskHandle { task_id, rx })
    }

    /// Best-effort cancellation.
    ///
    /// Returns `true` when a caller was waiting; that caller resolves with
    /// [`TaskOutcome::Cancelled`]. A unit already past its last checkpoint
    /// finishes anyway and its result is dropped.
    pub async fn cancel(&self, task_id: &TaskId) -> bool {
        let (reply, rx) = oneshot::channel();
        let cmd = Command::Cancel {
            task_id: task_id.clone(),
            reply,
        };
        if self.commands.send(cmd).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Latest pool statistics (point-in-time, non-blocking).
    pub fn statistics(&self) -> PoolStatistics {
        self.stats.borrow().clone()
    }

    /// Latest per-unit snapshot.
    pub fn unit_info(&self) -> Vec<UnitInfo> {
        self.units.borrow().clone()
    }

    /// Raw runtime events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// True until shutdown was requested.
    pub fn is_running(&self) -> bool {
        !self.runtime_token.is_cancelled()
    }

    /// Stops the pool and waits until every waiting caller was resolved
    /// with [`DispatchError::Shutdown`].
    pub async fn shutdown(&self) {
        self.runtime_token.cancel();
        self.stopped.cancelled().await;
    }
}

/// Future of one submitted task.
///
/// Dropping it abandons the task: a later result is discarded as an orphan.
#[must_use = "a dropped handle abandons the task"]
#[derive(Debug)]
pub struct TaskHandle {
    task_id: TaskId,
    rx: oneshot::Receiver<Result<TaskOutcome, DispatchError>>,
}

impl TaskHandle {
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }
}

impl Future for TaskHandle {
    type Output = Result<TaskOutcome, DispatchError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(Err(DispatchError::Shutdown)))
    }
}
