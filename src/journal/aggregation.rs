//! Metric aggregation by calendar period.
//!
//! Samples of one metric are grouped into buckets keyed by
//! `YYYY-MM-DD` (day), `YYYY-Www` (ISO week), `YYYY-MM` (month) or `YYYY`
//! (year). Buckets come out sorted by key. Samples whose entry has no
//! usable date are counted in `skipped`.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::TaskError;
use crate::tasks::ExecutionContext;

use super::entry::Entry;
use super::metrics::{self, MetricSummary};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    #[default]
    Day,
    Week,
    Month,
    Year,
}

impl Period {
    pub fn bucket(&self, day: NaiveDate) -> String {
        match self {
            Period::Day => day.format("%Y-%m-%d").to_string(),
            Period::Week => {
                let w = day.iso_week();
                format!("{}-W{:02}", w.year(), w.week())
            }
            Period::Month => format!("{}-{:02}", day.year(), day.month()),
            Period::Year => day.year().to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFn {
    Sum,
    #[default]
    Avg,
    Min,
    Max,
    Count,
}

impl AggregateFn {
    fn apply(&self, s: &MetricSummary) -> f64 {
        match self {
            AggregateFn::Sum => s.sum,
            AggregateFn::Avg => s.avg,
            AggregateFn::Min => s.min,
            AggregateFn::Max => s.max,
            AggregateFn::Count => s.count as f64,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub period: String,
    pub value: f64,
    pub count: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationReport {
    pub metric: String,
    pub buckets: Vec<Bucket>,
    pub skipped: usize,
}

/// `aggregation` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregationRequest {
    pub entries: Vec<Entry>,
    pub metric: String,
    #[serde(default)]
    pub period: Period,
    #[serde(default)]
    pub function: AggregateFn,
}

pub(crate) fn run(req: &AggregationRequest, ctx: &ExecutionContext) -> Result<AggregationReport, TaskError> {
    if req.metric.trim().is_empty() {
        return Err(TaskError::invalid("aggregation needs a metric name"));
    }
    let wanted = std::slice::from_ref(&req.metric);
    let samples = ctx.map_batched(&req.entries, |_, e| Ok(metrics::samples(e, wanted)))?;

    let mut skipped = 0;
    let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for s in samples.into_iter().flatten() {
        match s.date {
            Some(day) => grouped.entry(req.period.bucket(day)).or_default().push(s.value),
            None => skipped += 1,
        }
    }

    let buckets = grouped
        .into_iter()
        .filter_map(|(period, values)| {
            let summary = MetricSummary::of(values)?;
            Some(Bucket {
                period,
                value: req.function.apply(&summary),
                count: summary.count,
            })
        })
        .collect();

    Ok(AggregationReport {
        metric: req.metric.trim().to_lowercase(),
        buckets,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{Task, TaskType};
    use serde_json::Value;

    fn ctx() -> ExecutionContext {
        ExecutionContext::detached(&Task::new("t".into(), TaskType::Aggregation, Value::Null))
    }

    fn entries() -> Vec<Entry> {
        vec![
            Entry::new("a", Some("2024-01-01"), "mood:: 4"),
            Entry::new("b", Some("2024-01-03"), "mood:: 8"),
            Entry::new("c", Some("2024-02-10"), "mood:: 5"),
            Entry::new("d", None, "mood:: 9"),
            Entry::new("e", Some("2024-02-11"), "energy:: 1"),
        ]
    }

    fn aggregate(period: Period, function: AggregateFn) -> AggregationReport {
        let req = AggregationRequest {
            entries: entries(),
            metric: "mood".into(),
            period,
            function,
        };
        run(&req, &ctx()).unwrap()
    }

    #[test]
    fn monthly_average() {
        let r = aggregate(Period::Month, AggregateFn::Avg);
        let got: Vec<_> = r.buckets.iter().map(|b| (b.period.as_str(), b.value, b.count)).collect();
        assert_eq!(got, [("2024-01", 6.0, 2), ("2024-02", 5.0, 1)]);
        assert_eq!(r.skipped, 1);
    }

    #[test]
    fn iso_weeks_and_counts() {
        let r = aggregate(Period::Week, AggregateFn::Count);
        let got: Vec<_> = r.buckets.iter().map(|b| (b.period.as_str(), b.value)).collect();
        assert_eq!(got, [("2024-W01", 2.0), ("2024-W06", 1.0)]);
    }

    #[test]
    fn week_keys_use_iso_year() {
        let d = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        assert_eq!(Period::Week.bucket(d), "2025-W01");
        assert_eq!(Period::Year.bucket(d), "2024");
    }

    #[test]
    fn missing_metric_name_is_invalid() {
        let req = AggregationRequest {
            entries: vec![],
            metric: " ".into(),
            period: Period::Day,
            function: AggregateFn::Sum,
        };
        assert!(matches!(run(&req, &ctx()), Err(TaskError::InvalidPayload { .. })));
    }
}
