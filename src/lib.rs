//! # taskpool
//!
//! **Taskpool** dispatches journal computations across a small pool of
//! isolated execution units, balances load between them, recovers from unit
//! failure and falls back to in-process execution when the parallel path is
//! unavailable or fails.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   FilterService / MetricsService (façades)
//!        │ cache hit? ──────────────────────────► TaskResult
//!        ▼
//!   ┌───────────────┐   submit / cancel    ┌──────────────────────────────┐
//!   │   Scheduler   │ ───────────────────► │ PoolActor (single owner)     │
//!   │ (Clone handle)│ ◄─── watch stats ─── │ - PendingQueue (priority)    │
//!   └───────────────┘                      │ - pending callers            │
//!        │ timeout / failure               │ - LoadBalancer               │
//!        ▼                                 │ - health: recover / probe    │
//!   FallbackExecutor                       └──────┬───────────────▲───────┘
//!   (same TaskHandler,                            │ Envelope      │ Envelope
//!    caller's thread)                             ▼               │
//!                                          ┌──────────┐   ┌──────────┐
//!                                          │ unit-0   │ … │ unit-N   │
//!                                          │ (host +  │   │          │
//!                                          │ blocking │   │          │
//!                                          │  pool)   │   │          │
//!                                          └──────────┘   └──────────┘
//!   PoolActor ──► Bus (broadcast) ──► SubscriberSet ──► LogWriter / custom
//! ```
//!
//! ### Task lifecycle
//! ```text
//! submit ──► queued ──► assigned(unit, attempt) ──► result ──► caller
//!               ▲              │ unit fault
//!               └── requeue ◄──┘ (front of queue, attempts + 1,
//!                                 UnitFailure once retry_count is spent)
//! cancel: queued → removed; assigned → TaskCancel to the unit; caller gets Cancelled
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                          |
//! |-------------------|----------------------------------------------------------|---------------------------------------------|
//! | **Scheduling**    | Priority queue, capacity-bounded units, recovery.        | [`Scheduler`], [`PoolConfig`]               |
//! | **Balancing**     | Pluggable unit selection.                                | [`LoadBalancer`], [`BalancerKind`]          |
//! | **Façades**       | Cache → pool → fallback, always returns a result.        | [`FilterService`], [`MetricsService`]       |
//! | **Task families** | Journal filters, validation, metrics, sentiment.         | [`JournalHandler`], [`Entry`]               |
//! | **Caching**       | TTL + size bounded result cache.                         | [`ResultCache`], [`CacheConfig`]            |
//! | **Events**        | Runtime events and subscriber fan-out.                   | [`Event`], [`Subscribe`]                    |
//! | **Errors**        | Typed errors with stable labels.                         | [`TaskError`], [`DispatchError`]            |
//!
//! ## Optional features
//! - `logging`: exports a [`LogWriter`] subscriber that renders events through `tracing`.
//!
//! ## Example
//! ```rust
//! use chrono::NaiveDate;
//! use taskpool::{Entry, FacadeConfig, FilterOutput, FilterService, PoolConfig, Scheduler, TaskOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let scheduler = Scheduler::builder(PoolConfig::default()).build();
//!     let filters = FilterService::new(Some(scheduler.clone()), FacadeConfig::filter());
//!
//!     let entries = vec![
//!         Entry::new("a", Some("2024-01-15"), "winter walk"),
//!         Entry::new("b", Some("2024-02-01"), "spring plans"),
//!     ];
//!     let result = filters
//!         .filter_by_date_range(
//!             entries,
//!             NaiveDate::from_ymd_opt(2024, 1, 1),
//!             NaiveDate::from_ymd_opt(2024, 1, 31),
//!             TaskOptions::default(),
//!         )
//!         .await;
//!
//!     let out: FilterOutput = result.decode().unwrap();
//!     assert_eq!(out.visibility(), [true, false]);
//!     scheduler.shutdown().await;
//! }
//! ```
mod balancer;
mod cache;
mod core;
mod error;
mod events;
mod facade;
mod fallback;
mod journal;
mod protocol;
mod subscribers;
mod tasks;
mod units;

// ---- Public re-exports ----

pub use crate::core::{
    Callbacks, MAX_UNITS, PoolConfig, PoolStatistics, ProgressCallback, Scheduler, SchedulerBuilder,
    TaskHandle, UnitInfo,
};
pub use balancer::{BalancerKind, Candidate, LeastLoaded, LoadBalancer, RoundRobin, TaskAffinity};
pub use cache::{CacheConfig, CacheStats, ResultCache, cache_key, task_cache_key};
pub use error::{DispatchError, ProtocolError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use facade::{FacadeConfig, FilterService, MetricsService};
pub use fallback::FallbackExecutor;
pub use journal::{
    AggregateFn, AggregationReport, AggregationRequest, Bucket, Combinator, ComplexCriteria,
    ComplexRequest, ContentQuery, ContentRequest, DateRange, DateRangeRequest, Entry, EntryDate,
    EntrySentiment, FilterOutput, HiddenReason, IssueKind, JournalHandler, Lexicon, MetadataQuery,
    MetadataRequest, MetricSample, MetricSummary, MetricsReport, MetricsRequest, Period, SearchMode,
    SentimentLabel, SentimentReport, SentimentRequest, TagMode, ValidationIssue, ValidationReport,
    ValidationRequest, Verdict, normalize_tag,
};
pub use protocol::{Envelope, HealthReport, MessageKind, PROTOCOL_VERSION};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{
    ExecutionContext, HandlerFn, HandlerRef, Priority, ProgressSink, ResultMetadata, Task,
    TaskHandler, TaskId, TaskOptions, TaskOutcome, TaskProgress, TaskResult, TaskType,
};
pub use units::{UnitCapabilities, UnitHealth, UnitHistory, UnitId};

// Optional: built-in tracing subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
