use crate::cache::CacheStats;
use crate::core::{PoolStatistics, Scheduler, UnitInfo};
use crate::fallback::FallbackExecutor;
use crate::journal::{
    AggregateFn, AggregationRequest, Entry, MetricsRequest, Period, SentimentRequest, ValidationRequest,
};
use crate::tasks::{TaskOptions, TaskResult, TaskType};

use super::dispatcher::{Dispatcher, FacadeConfig};

/// Metrics, sentiment, aggregation and validation over entries.
///
/// Payloads decode as [`MetricsReport`](crate::MetricsReport),
/// [`SentimentReport`](crate::SentimentReport),
/// [`AggregationReport`](crate::AggregationReport) and
/// [`ValidationReport`](crate::ValidationReport) respectively.
pub struct MetricsService {
    inner: Dispatcher,
}

impl MetricsService {
    /// Service dispatching through `scheduler` (`None` = fallback only).
    pub fn new(scheduler: Option<Scheduler>, cfg: FacadeConfig) -> Self {
        Self {
            inner: Dispatcher::new(scheduler, FallbackExecutor::journal(), cfg),
        }
    }

    pub fn with_fallback(mut self, fallback: FallbackExecutor) -> Self {
        self.inner = self.inner.with_fallback(fallback);
        self
    }

    pub async fn compute_metrics(&self, entries: Vec<Entry>, options: TaskOptions) -> TaskResult {
        let req = MetricsRequest {
            entries,
            metrics: Vec::new(),
        };
        self.inner.request(TaskType::MetricsExtraction, &req, options).await
    }

    pub async fn score_sentiment(&self, entries: Vec<Entry>, options: TaskOptions) -> TaskResult {
        let req = SentimentRequest { entries, lexicon: None };
        self.inner.request(TaskType::SentimentScoring, &req, options).await
    }

    /// Groups `metric` samples by `period` and reduces each bucket with `function`.
    pub async fn aggregate(
        &self,
        entries: Vec<Entry>,
        metric: impl Into<String>,
        period: Period,
        function: AggregateFn,
        options: TaskOptions,
    ) -> TaskResult {
        let req = AggregationRequest {
            entries,
            metric: metric.into(),
            period,
            function,
        };
        self.inner.request(TaskType::Aggregation, &req, options).await
    }

    pub async fn validate(&self, entries: Vec<Entry>, options: TaskOptions) -> TaskResult {
        let req = ValidationRequest { entries };
        self.inner.request(TaskType::Validation, &req, options).await
    }

    pub fn statistics(&self) -> Option<PoolStatistics> {
        self.inner.statistics()
    }

    pub fn unit_info(&self) -> Vec<UnitInfo> {
        self.inner.unit_info()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache_stats()
    }

    pub fn clear_cache(&self) {
        self.inner.clear_cache()
    }
}
