//! # Task model and task-handler abstraction.
//!
//! This module provides the data exchanged between submitters and units:
//! - [`Task`], [`TaskId`], [`TaskType`], [`Priority`], [`TaskOptions`] - what is submitted
//! - [`TaskResult`], [`ResultMetadata`], [`TaskOutcome`], [`TaskProgress`] - what comes back
//! - [`TaskHandler`], [`HandlerFn`], [`HandlerRef`], [`ExecutionContext`] - the logic a unit runs

mod handler;
mod result;
mod task;

pub use handler::{ExecutionContext, HandlerFn, HandlerRef, ProgressSink, TaskHandler};
pub use result::{ResultMetadata, TaskOutcome, TaskProgress, TaskResult};
pub use task::{Priority, Task, TaskId, TaskOptions, TaskType};
