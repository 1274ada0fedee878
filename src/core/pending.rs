//! Pending requests: who is waiting for which task.
//!
//! A [`PendingRequest`] exists for every accepted task until it is resolved
//! exactly once: by a result, a task error, a rejection, a cancellation or
//! shutdown. Removing it from the map is what makes a late result an orphan.

use std::fmt;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::error::DispatchError;
use crate::tasks::{TaskOutcome, TaskProgress};

/// Progress callback; runs on the pool actor, so keep it short.
pub type ProgressCallback = Arc<dyn Fn(&TaskProgress) + Send + Sync>;

/// Optional hooks attached to a submission.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub on_progress: Option<ProgressCallback>,
}

impl Callbacks {
    /// No callbacks.
    pub fn none() -> Self {
        Self::default()
    }

    /// Forwards unit progress for tasks submitted with `progress_reporting`.
    pub fn on_progress(f: impl Fn(&TaskProgress) + Send + Sync + 'static) -> Self {
        Self {
            on_progress: Some(Arc::new(f)),
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

pub(crate) type Reply = oneshot::Sender<Result<TaskOutcome, DispatchError>>;

pub(crate) struct PendingRequest {
    reply: Reply,
    pub(crate) callbacks: Callbacks,
    pub(crate) submitted_at: Instant,
}

impl PendingRequest {
    pub(crate) fn new(reply: Reply, callbacks: Callbacks) -> Self {
        Self {
            reply,
            callbacks,
            submitted_at: Instant::now(),
        }
    }

    /// True when the caller dropped its handle.
    pub(crate) fn abandoned(&self) -> bool {
        self.reply.is_closed()
    }

    pub(crate) fn resolve(self, outcome: Result<TaskOutcome, DispatchError>) {
        let _ = self.reply.send(outcome);
    }
}
