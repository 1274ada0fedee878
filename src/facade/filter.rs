use chrono::NaiveDate;

use crate::cache::CacheStats;
use crate::core::{PoolStatistics, Scheduler, UnitInfo};
use crate::fallback::FallbackExecutor;
use crate::journal::{
    ComplexCriteria, ComplexRequest, ContentQuery, ContentRequest, DateRange, DateRangeRequest, Entry,
    MetadataQuery, MetadataRequest,
};
use crate::tasks::{TaskOptions, TaskResult, TaskType};

use super::dispatcher::{Dispatcher, FacadeConfig};

/// Entry visibility filters.
///
/// Every method returns a [`TaskResult`] whose payload decodes as
/// [`FilterOutput`](crate::FilterOutput). The result is the same whether the
/// pool or the in-process fallback produced it.
pub struct FilterService {
    inner: Dispatcher,
}

impl FilterService {
    /// Service dispatching through `scheduler` (`None` = fallback only).
    pub fn new(scheduler: Option<Scheduler>, cfg: FacadeConfig) -> Self {
        Self {
            inner: Dispatcher::new(scheduler, FallbackExecutor::journal(), cfg),
        }
    }

    /// Replaces the in-process executor.
    pub fn with_fallback(mut self, fallback: FallbackExecutor) -> Self {
        self.inner = self.inner.with_fallback(fallback);
        self
    }

    /// Entries dated within `[start, end]`; either bound may be open.
    pub async fn filter_by_date_range(
        &self,
        entries: Vec<Entry>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        options: TaskOptions,
    ) -> TaskResult {
        let req = DateRangeRequest {
            entries,
            range: DateRange::new(start, end),
        };
        self.inner.request(TaskType::DateRangeFilter, &req, options).await
    }

    /// Entries whose content matches `query`.
    pub async fn filter_by_content(&self, entries: Vec<Entry>, query: ContentQuery, options: TaskOptions) -> TaskResult {
        let req = ContentRequest { entries, query };
        self.inner.request(TaskType::ContentFilter, &req, options).await
    }

    /// Entries carrying the wanted tags and property values.
    pub async fn filter_by_metadata(&self, entries: Vec<Entry>, query: MetadataQuery, options: TaskOptions) -> TaskResult {
        let req = MetadataRequest { entries, query };
        self.inner.request(TaskType::MetadataFilter, &req, options).await
    }

    /// Date, content and metadata criteria combined with and/or.
    pub async fn filter_complex(
        &self,
        entries: Vec<Entry>,
        criteria: ComplexCriteria,
        options: TaskOptions,
    ) -> TaskResult {
        let req = ComplexRequest { entries, criteria };
        self.inner.request(TaskType::ComplexFilter, &req, options).await
    }

    /// Pool statistics; `None` without a pool.
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
