//! # Dispatcher: the algorithm every façade method runs.
//!
//! ```text
//! cache hit? ─yes─► return cached result
//!     │ no
//!     ▼
//! parallel enabled and pool running?
//!     │ yes                                  │ no
//!     ▼                                      │
//! submit + timeout ─ok(success)─► cache ─► return
//!     │ timeout → cancel (best effort)       │
//!     │ any other failure                    │
//!     ▼                                      ▼
//! fallback executor ─► cache if success ─► return
//! ```
//!
//! Only `success = true` results are cached. Parallel-path errors never
//! reach the caller; they are logged and replaced by the fallback result.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{CacheConfig, CacheStats, ResultCache, task_cache_key};
use crate::core::{Callbacks, PoolStatistics, Scheduler, UnitInfo};
use crate::error::{DispatchError, TaskError};
use crate::fallback::FallbackExecutor;
use crate::tasks::{Priority, ResultMetadata, Task, TaskId, TaskOptions, TaskOutcome, TaskResult, TaskType};

/// Façade behaviour.
///
/// ## Field semantics
/// - `parallel_enabled`: route through the pool (`false` = fallback only)
/// - `default_timeout`: caller-side deadline when a task sets none (`0` = wait forever)
/// - `cache`: result cache sizing
/// - `priority`: band used for every submitted task
#[derive(Clone, Debug, PartialEq)]
pub struct FacadeConfig {
    pub parallel_enabled: bool,
    pub default_timeout: Duration,
    pub cache: CacheConfig,
    pub priority: Priority,
}

impl FacadeConfig {
    /// Defaults for [`FilterService`](super::FilterService).
    pub fn filter() -> Self {
        Self::default()
    }

    /// Defaults for [`MetricsService`](super::MetricsService): cache eviction
    /// leaves 20% headroom.
    pub fn metrics() -> Self {
        Self {
            cache: CacheConfig::default().with_headroom(),
            ..Self::default()
        }
    }

    /// Disables the parallel path.
    pub fn fallback_only(mut self) -> Self {
        self.parallel_enabled = false;
        self
    }
}

impl Default for FacadeConfig {
    /// Default configuration:
    ///
    /// - parallel path enabled
    /// - `default_timeout = 30s`
    /// - default [`CacheConfig`]
    /// - normal priority
    fn default() -> Self {
        Self {
            parallel_enabled: true,
            default_timeout: Duration::from_secs(30),
            cache: CacheConfig::default(),
            priority: Priority::Normal,
        }
    }
}

pub(crate) struct Dispatcher {
    scheduler: Option<Scheduler>,
    fallback: FallbackExecutor,
    cache: Mutex<ResultCache>,
    cfg: FacadeConfig,
}

impl Dispatcher {
    pub(crate) fn new(scheduler: Option<Scheduler>, fallback: FallbackExecutor, cfg: FacadeConfig) -> Self {
        Self {
            scheduler,
            fallback,
            cache: Mutex::new(ResultCache::new(cfg.cache.clone())),
            cfg,
        }
    }

    pub(crate) fn with_fallback(mut self, fallback: FallbackExecutor) -> Self {
        self.fallback = fallback;
        self
    }

    /// Encodes `request` as the payload of a `task_type` task and runs it.
    pub(crate) async fn request<R: Serialize>(&self, task_type: TaskType, request: &R, options: TaskOptions) -> TaskResult {
        let task_id = TaskId::generate();
        match serde_json::to_value(request) {
            Ok(payload) => {
                let task = Task::new(task_id, task_type, payload)
                    .with_priority(self.cfg.priority)
                    .with_options(options);
                self.run(task).await
            }
            Err(err) => {
                let meta = ResultMetadata {
                    processing_time_ms: 0,
                    unit_id: None,
                    attempt: 1,
                };
                TaskResult::failed(task_id, task_type, &TaskError::from(err), meta)
            }
        }
    }

    pub(crate) async fn run(&self, task: Task) -> TaskResult {
        let key = task_cache_key(&task);
        if let Some(hit) = self.cache().get(&key) {
            debug!(task = %task.task_id, kind = %task.task_type, "served from cache");
            return hit;
        }

        let result = match self.parallel(&task).await {
            Ok(result) if result.success => result,
            Ok(result) => {
                warn!(
                    task = %task.task_id,
                    kind = %task.task_type,
                    error = result.error.as_deref().unwrap_or_default(),
                    "unit returned a failed result, running in-process"
                );
                self.fallback.execute(&task)
            }
            Err(err) => {
                if !matches!(err, DispatchError::Unavailable) {
                    warn!(
                        task = %task.task_id,
                        kind = %task.task_type,
                        reason = err.as_label(),
                        error = %err,
                        "parallel path failed, running in-process"
                    );
                }
                self.fallback.execute(&task)
            }
        };

        if result.success {
            self.cache().put_default(key, result.clone());
        }
        result
    }

    async fn parallel(&self, task: &Task) -> Result<TaskResult, DispatchError> {
        let scheduler = match &self.scheduler {
            Some(s) if self.cfg.parallel_enabled && s.is_running() => s,
            _ => return Err(DispatchError::Unavailable),
        };

        let handle = scheduler.submit(task.clone(), Callbacks::none())?;
        let timeout = task
            .options
            .timeout()
            .or_else(|| Some(self.cfg.default_timeout).filter(|d| !d.is_zero()));

        let outcome = match timeout {
            None => handle.await?,
            Some(limit) => match tokio::time::timeout(limit, handle).await {
                Ok(res) => res?,
                Err(_) => {
                    scheduler.cancel(&task.task_id).await;
                    return Err(DispatchError::Timeout { timeout: limit });
                }
            },
        };

        match outcome {
            TaskOutcome::Completed(result) => Ok(result),
            TaskOutcome::Cancelled { task_id } => Err(DispatchError::Cancelled { task_id }),
        }
    }

    fn cache(&self) -> MutexGuard<'_, ResultCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn cache_stats(&self) -> CacheStats {
        self.cache().stats()
    }

    pub(crate) fn clear_cache(&self) {
        self.cache().clear();
    }

    pub(crate) fn statistics(&self) -> Option<PoolStatistics> {
        self.scheduler.as_ref().map(Scheduler::statistics)
    }

    pub(crate) fn unit_info(&self) -> Vec<UnitInfo> {
        self.scheduler.as_ref().map(Scheduler::unit_info).unwrap_or_default()
    }
}
