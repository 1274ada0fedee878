//! # Façades: the calling surface for journal computations.
//!
//! [`FilterService`] and [`MetricsService`] wrap a shared [`Scheduler`](crate::Scheduler)
//! (or none) with their own [`ResultCache`](crate::ResultCache) and a
//! [`FallbackExecutor`](crate::FallbackExecutor). Callers always get a
//! [`TaskResult`](crate::TaskResult); whether a unit or the fallback produced
//! it shows only in `metadata.unit_id`.

mod dispatcher;
mod filter;
mod metrics;

pub use dispatcher::FacadeConfig;
pub use filter::FilterService;
pub use metrics::MetricsService;
