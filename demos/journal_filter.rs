//! # Example: journal_filter
//!
//! Runs every façade operation over a small journal, once through the pool
//! and once more to show the cache answering.
//!
//! ## Flow
//! ```text
//! FilterService / MetricsService
//!     ├─► cache miss ─► Scheduler::submit ─► unit-N ─► TaskResult (unit_id = Some)
//!     └─► cache hit  ─► TaskResult (no dispatch)
//! LogWriter renders runtime events through `tracing`.
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=taskpool=debug cargo run --example journal_filter --features logging
//! ```

use std::sync::Arc;

use chrono::NaiveDate;
use tracing_subscriber::EnvFilter;

use taskpool::{
    AggregateFn, AggregationReport, Combinator, ComplexCriteria, ContentQuery, DateRange, Entry,
    FacadeConfig, FilterOutput, FilterService, LogWriter, MetadataQuery, MetricsReport,
    MetricsService, Period, PoolConfig, Scheduler, SearchMode, SentimentReport, Subscribe,
    TagMode, TaskOptions, ValidationReport,
};

fn journal() -> Vec<Entry> {
    vec![
        Entry::new("2024-01-03", Some("2024-01-03"), "Great start, felt calm.\nmood:: 8")
            .with_tags(["#work"]),
        Entry::new("2024-01-09", Some("2024-01-09"), "Tired and stressed about the release.\nmood:: 3")
            .with_tags(["work", "release"]),
        Entry::new("2024-01-20", Some("2024-01-20"), "Garden day, happy.\nmood:: 9")
            .with_tags(["home"])
            .with_property("energy", 7.into()),
        Entry::new("2024-02-02", Some("2024-02-02"), "Shipped the release!\nmood:: 7")
            .with_tags(["work"]),
        Entry::new("draft", None, "  "),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let scheduler = Scheduler::builder(PoolConfig::default())
        .with_subscribers(subs)
        .build();

    let filters = FilterService::new(Some(scheduler.clone()), FacadeConfig::filter());
    let metrics = MetricsService::new(Some(scheduler.clone()), FacadeConfig::metrics());
    let opts = TaskOptions::default;

    let jan = (NaiveDate::from_ymd_opt(2024, 1, 1), NaiveDate::from_ymd_opt(2024, 1, 31));
    let by_date: FilterOutput = filters
        .filter_by_date_range(journal(), jan.0, jan.1, opts())
        .await
        .decode()?;
    println!("january: {:?}", by_date.visibility());

    let by_content: FilterOutput = filters
        .filter_by_content(journal(), ContentQuery::new("release", SearchMode::Exact), opts())
        .await
        .decode()?;
    println!("mentions release: {:?}", by_content.visibility());

    let by_tags: FilterOutput = filters
        .filter_by_metadata(journal(), MetadataQuery::tags(["#WORK"], TagMode::Any), opts())
        .await
        .decode()?;
    println!("tagged work: {:?}", by_tags.visibility());

    let criteria = ComplexCriteria::new(Combinator::And)
        .with_date(DateRange::new(jan.0, jan.1))
        .with_metadata(MetadataQuery::tags(["work"], TagMode::Any));
    let complex: FilterOutput = filters.filter_complex(journal(), criteria, opts()).await.decode()?;
    println!("january work: {:?}", complex.visibility());

    let report: MetricsReport = metrics.compute_metrics(journal(), opts()).await.decode()?;
    for (name, s) in &report.metrics {
        println!("{name}: n={} avg={:.2} min={} max={}", s.count, s.avg, s.min, s.max);
    }

    let mood: AggregationReport = metrics
        .aggregate(journal(), "mood", Period::Month, AggregateFn::Avg, opts())
        .await
        .decode()?;
    for b in &mood.buckets {
        println!("mood {} = {:.2} ({} samples)", b.period, b.value, b.count);
    }

    let sentiment: SentimentReport = metrics.score_sentiment(journal(), opts()).await.decode()?;
    println!("average sentiment: {:.2}", sentiment.average);

    let validation: ValidationReport = metrics.validate(journal(), opts()).await.decode()?;
    for issue in &validation.issues {
        println!("entry #{} ({}): {:?} {}", issue.index, issue.id, issue.kind, issue.detail);
    }

    // same request again: answered by the cache
    let again = filters
        .filter_by_date_range(journal(), jan.0, jan.1, opts())
        .await;
    println!(
        "cached: unit={:?} cache={:?}",
        again.metadata.unit_id,
        filters.cache_stats()
    );
    println!("pool: {:?}", scheduler.statistics());

    scheduler.shutdown().await;
    Ok(())
}
