//! # Journal task families.
//!
//! Pure functions over already-parsed [`Entry`] records, one per
//! [`TaskType`](crate::TaskType). Each family decodes its JSON payload, walks
//! the entries in batches through the [`ExecutionContext`](crate::ExecutionContext)
//! (cancellation checks and progress reports), and encodes its output.
//!
//! [`JournalHandler`] routes a task to its family. Units and the fallback
//! executor both run it, so the two paths produce the same outcome.

mod aggregation;
mod complex;
mod content;
mod date_range;
mod entry;
mod handler;
mod metadata;
mod metrics;
mod sentiment;
mod validation;

pub use aggregation::{AggregateFn, AggregationReport, AggregationRequest, Bucket, Period};
pub use complex::{Combinator, ComplexCriteria, ComplexRequest};
pub use content::{ContentQuery, ContentRequest, SearchMode};
pub use date_range::{DateRange, DateRangeRequest};
pub use entry::{Entry, EntryDate, FilterOutput, HiddenReason, Verdict, normalize_tag};
pub use handler::JournalHandler;
pub use metadata::{MetadataQuery, MetadataRequest, TagMode};
pub use metrics::{MetricSample, MetricSummary, MetricsReport, MetricsRequest};
pub use sentiment::{
    EntrySentiment, Lexicon, SentimentLabel, SentimentReport, SentimentRequest,
};
pub use validation::{IssueKind, ValidationIssue, ValidationReport, ValidationRequest};
