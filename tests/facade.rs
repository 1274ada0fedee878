mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use common::{Gate, config, gated, january_entries};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use taskpool::{
    Callbacks, ContentQuery, DispatchError, Entry, FacadeConfig, FallbackExecutor, FilterOutput,
    FilterService, HiddenReason, MetricsService, Scheduler, SearchMode, Task, TaskId, TaskOptions,
    TaskType,
};

fn january() -> (Option<NaiveDate>, Option<NaiveDate>) {
    (NaiveDate::from_ymd_opt(2024, 1, 1), NaiveDate::from_ymd_opt(2024, 1, 31))
}

#[tokio::test]
async fn date_range_scenario_matches_on_both_paths() {
    let scheduler = Scheduler::builder(config(2, 2)).build();
    let parallel = FilterService::new(Some(scheduler.clone()), FacadeConfig::filter());
    let inline = FilterService::new(None, FacadeConfig::filter());
    let (start, end) = january();

    let a = parallel
        .filter_by_date_range(january_entries(), start, end, TaskOptions::default())
        .await;
    let b = inline
        .filter_by_date_range(january_entries(), start, end, TaskOptions::default())
        .await;

    assert!(a.from_unit());
    assert!(!b.from_unit());
    assert!(a.same_outcome(&b));
    let out: FilterOutput = a.decode().unwrap();
    assert_eq!(out.visibility(), [true, false, false]);
    assert_eq!(out.verdicts[1].reason, Some(HiddenReason::AfterRange));
    assert_eq!(out.verdicts[2].reason, Some(HiddenReason::NoDate));
    scheduler.shutdown().await;
}

fn random_entries(rng: &mut StdRng) -> Vec<Entry> {
    const WORDS: [&str; 8] = ["happy", "tired", "rust", "garden", "mood:: 5", "work", "calm", "sad"];
    (0..rng.random_range(0..40))
        .map(|i| {
            let date = rng
                .random_bool(0.8)
                .then(|| format!("2024-{:02}-{:02}", rng.random_range(1..=12), rng.random_range(1..=28)));
            let content: Vec<&str> = (0..rng.random_range(1..6))
                .map(|_| WORDS[rng.random_range(0..WORDS.len())])
                .collect();
            let mut e = Entry::new(format!("e{i}"), date.as_deref(), content.join("\n"));
            if rng.random_bool(0.5) {
                e = e.with_tags(["work", "#Home"].into_iter().take(rng.random_range(0..=2)));
            }
            if rng.random_bool(0.3) {
                e = e.with_property("energy", json!(rng.random_range(0..10)));
            }
            e
        })
        .collect()
}

fn payloads(entries: &[Entry]) -> Vec<(TaskType, serde_json::Value)> {
    vec![
        (
            TaskType::DateRangeFilter,
            json!({"entries": entries, "start": "2024-03-01", "end": "2024-09-30"}),
        ),
        (TaskType::ContentFilter, json!({"entries": entries, "term": "rust calm", "mode": "any_words"})),
        (TaskType::MetadataFilter, json!({"entries": entries, "tags": ["home"], "tag_mode": "any"})),
        (
            TaskType::ComplexFilter,
            json!({"entries": entries, "criteria": {"combinator": "or", "content": {"term": "sad"}, "metadata": {"tags": ["work"]}}}),
        ),
        (TaskType::Validation, json!({"entries": entries})),
        (TaskType::MetricsExtraction, json!({"entries": entries})),
        (TaskType::SentimentScoring, json!({"entries": entries})),
        (
            TaskType::Aggregation,
            json!({"entries": entries, "metric": "mood", "period": "week", "function": "sum"}),
        ),
    ]
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn parallel_and_fallback_outcomes_agree() {
    let scheduler = Scheduler::builder(config(3, 2)).build();
    let fallback = FallbackExecutor::journal();
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for round in 0..5 {
        let entries = random_entries(&mut rng);
        for (task_type, payload) in payloads(&entries) {
            let task = Task::new(TaskId::from(format!("{task_type}-{round}")), task_type, payload);
            let inline = fallback.execute(&task);
            let parallel = scheduler
                .submit(task, Callbacks::none())
                .unwrap()
                .await
                .unwrap()
                .into_result()
                .unwrap();
            assert!(parallel.same_outcome(&inline), "{task_type} diverged in round {round}");
        }
    }

    // failures agree too: the unit's task error carries the fallback's message
    let bad = Task::new("bad".into(), TaskType::Aggregation, json!({"entries": [], "metric": ""}));
    let inline = fallback.execute(&bad);
    match scheduler.submit(bad, Callbacks::none()).unwrap().await {
        Err(DispatchError::Task { error, .. }) => assert_eq!(inline.error, Some(error.to_string())),
        other => panic!("unexpected outcome: {other:?}"),
    }
    scheduler.shutdown().await;
}

#[tokio::test]
async fn timeout_falls_back_in_process() {
    let gate = Gate::default();
    let scheduler = Scheduler::builder(config(1, 1))
        .with_handler(gated(gate.clone(), Arc::new(Mutex::new(Vec::new()))))
        .build();
    let svc = FilterService::new(Some(scheduler.clone()), FacadeConfig::filter());

    let options = TaskOptions::default().with_timeout(Duration::from_millis(50));
    let result = svc
        .filter_by_content(
            january_entries(),
            ContentQuery::new("january", SearchMode::Contains),
            options,
        )
        .await;

    assert!(result.success);
    assert!(!result.from_unit());
    assert_eq!(result.decode::<FilterOutput>().unwrap().visible_count, 1);
    common::wait_for_stats(&scheduler, |s| s.cancelled == 1).await;

    gate.open();
    common::wait_for_stats(&scheduler, |s| s.in_flight == 0).await;
    scheduler.shutdown().await;
}

#[tokio::test]
async fn repeated_requests_hit_the_cache() {
    let scheduler = Scheduler::builder(config(2, 2)).build();
    let svc = MetricsService::new(Some(scheduler.clone()), FacadeConfig::metrics());
    let entries = vec![
        Entry::new("a", Some("2024-01-01"), "mood:: 3"),
        Entry::new("b", Some("2024-01-02"), "mood:: 5"),
    ];

    let first = svc.compute_metrics(entries.clone(), TaskOptions::default()).await;
    let second = svc.compute_metrics(entries, TaskOptions::default()).await;

    assert!(first.from_unit());
    assert_eq!(first, second);
    let cache = svc.cache_stats();
    assert_eq!((cache.hits, cache.misses, cache.entries), (1, 1, 1));
    assert_eq!(svc.statistics().map(|s| s.total_tasks), Some(1));
    scheduler.shutdown().await;
}

#[tokio::test]
async fn stopped_pool_means_fallback() {
    let scheduler = Scheduler::builder(config(1, 1)).build();
    scheduler.shutdown().await;
    let svc = MetricsService::new(Some(scheduler), FacadeConfig::metrics());

    let result = svc
        .validate(vec![Entry::new("", None, "")], TaskOptions::default())
        .await;
    assert!(result.success);
    assert!(!result.from_unit());
}
