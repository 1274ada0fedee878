//! # Task model: the unit of work submitted to the scheduler.
//!
//! A [`Task`] is plain data: a [`TaskType`] naming the computation family, a
//! caller-chosen [`TaskId`], a [`Priority`] band, an opaque JSON payload and
//! per-task [`TaskOptions`]. Tasks cross the unit isolation boundary as JSON,
//! so everything here is `Serialize + Deserialize`.
//!
//! ## Example
//! ```rust
//! use serde_json::json;
//! use taskpool::{Priority, Task, TaskId, TaskType};
//!
//! let task = Task::new(TaskId::from("filter-1"), TaskType::ContentFilter, json!({"term": "rust"}))
//!     .with_priority(Priority::High);
//!
//! assert_eq!(task.task_type, TaskType::ContentFilter);
//! assert!(Priority::High > Priority::Normal);
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Caller-generated identifier correlating a task with its result.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Arc<str>);

impl TaskId {
    /// Generates a random (UUID v4) id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string().into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s.into())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computation family of a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Visibility by entry date within an inclusive range.
    DateRangeFilter,
    /// Visibility by full-text match on entry content.
    ContentFilter,
    /// Visibility by tags and properties.
    MetadataFilter,
    /// Date/content/metadata criteria combined with and/or.
    ComplexFilter,
    /// Structural checks over entries.
    Validation,
    /// Numeric metric extraction and summaries.
    MetricsExtraction,
    /// Lexicon-based sentiment scoring.
    SentimentScoring,
    /// Metric aggregation by calendar period.
    Aggregation,
}

impl TaskType {
    /// Every task type, in declaration order.
    pub const ALL: [TaskType; 8] = [
        TaskType::DateRangeFilter,
        TaskType::ContentFilter,
        TaskType::MetadataFilter,
        TaskType::ComplexFilter,
        TaskType::Validation,
        TaskType::MetricsExtraction,
        TaskType::SentimentScoring,
        TaskType::Aggregation,
    ];

    /// Stable snake_case name (same as the serialized form).
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::DateRangeFilter => "date_range_filter",
            TaskType::ContentFilter => "content_filter",
            TaskType::MetadataFilter => "metadata_filter",
            TaskType::ComplexFilter => "complex_filter",
            TaskType::Validation => "validation",
            TaskType::MetricsExtraction => "metrics_extraction",
            TaskType::SentimentScoring => "sentiment_scoring",
            TaskType::Aggregation => "aggregation",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduling band. Ordered so that `High > Normal > Low`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// Per-task knobs.
///
/// ## Field semantics
/// - `timeout_ms`: caller-side deadline (`None` = façade default)
/// - `batch_size`: entries processed between cancellation checks / progress reports (min 1)
/// - `progress_reporting`: forward unit progress to the submitter's callback
/// - `cache_key`: explicit cache key (`None` = derived from type + payload hash)
/// - `retry_count`: how many times a task lost to a unit crash is re-queued
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskOptions {
    pub timeout_ms: Option<u64>,
    pub batch_size: usize,
    pub progress_reporting: bool,
    pub cache_key: Option<String>,
    pub retry_count: u32,
}

impl Default for TaskOptions {
    /// Default options:
    ///
    /// - no explicit timeout
    /// - `batch_size = 100`
    /// - no progress reporting
    /// - derived cache key
    /// - `retry_count = 3`
    fn default() -> Self {
        Self {
            timeout_ms: None,
            batch_size: 100,
            progress_reporting: false,
            cache_key: None,
            retry_count: 3,
        }
    }
}

impl TaskOptions {
    /// Returns the timeout as a `Duration`; `0` is treated as "not set".
    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Returns a batch size clamped to a minimum of 1.
    #[inline]
    pub fn batch_size_clamped(&self) -> usize {
        self.batch_size.max(1)
    }

    /// Sets the caller-side timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis().min(u128::from(u64::MAX)) as u64);
        self
    }

    /// Sets the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Enables progress forwarding.
    pub fn with_progress(mut self) -> Self {
        self.progress_reporting = true;
        self
    }

    /// Sets an explicit cache key.
    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    /// Sets the crash retry budget.
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }
}

/// A submitted unit of work.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub task_type: TaskType,
    #[serde(default)]
    pub priority: Priority,
    pub payload: Value,
    #[serde(default)]
    pub options: TaskOptions,
}

impl Task {
    /// Creates a normal-priority task with default options.
    pub fn new(task_id: TaskId, task_type: TaskType, payload: Value) -> Self {
        Self {
            task_id,
            task_type,
            priority: Priority::Normal,
            payload,
            options: TaskOptions::default(),
        }
    }

    /// Returns a task with the given priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Returns a task with the given options.
    pub fn with_options(mut self, options: TaskOptions) -> Self {
        self.options = options;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn priority_orders_high_over_low() {
        let mut bands = vec![Priority::Low, Priority::High, Priority::Normal];
        bands.sort_by(|a, b| b.cmp(a));
        assert_eq!(bands, vec![Priority::High, Priority::Normal, Priority::Low]);
    }

    #[test]
    fn zero_timeout_means_unset() {
        let opts = TaskOptions {
            timeout_ms: Some(0),
            ..Default::default()
        };
        assert_eq!(opts.timeout(), None);
        let opts = opts.with_timeout(Duration::from_millis(250));
        assert_eq!(opts.timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn task_decodes_with_missing_optional_fields() {
        let task: Task = serde_json::from_value(json!({
            "task_id": "a",
            "task_type": "metadata_filter",
            "payload": {"entries": []}
        }))
        .unwrap();
        assert_eq!(task.priority, Priority::Normal);
        assert_eq!(task.options, TaskOptions::default());
        assert_eq!(task.task_type.to_string(), "metadata_filter");
    }

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(TaskId::generate(), TaskId::generate());
    }
}
