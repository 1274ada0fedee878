//! # Metric extraction.
//!
//! A metric is a named number attached to an entry, from two sources:
//! - a numeric property (`{"mood": 7}` or `{"mood": "7"}`);
//! - an inline field line in the content (`mood:: 7`).
//!
//! Inline fields override a property with the same name. Names are trimmed
//! and lowercased; non-numeric values are ignored.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TaskError;
use crate::tasks::ExecutionContext;

use super::entry::{Entry, EntryDate};

/// One extracted value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub entry_id: String,
    pub date: Option<NaiveDate>,
    pub metric: String,
    pub value: f64,
}

/// count / sum / avg / min / max of one metric.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub count: usize,
    pub sum: f64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

impl MetricSummary {
    /// `None` for an empty input.
    pub fn of(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut it = values.into_iter();
        let first = it.next()?;
        let mut s = Self {
            count: 1,
            sum: first,
            avg: 0.0,
            min: first,
            max: first,
        };
        for v in it {
            s.count += 1;
            s.sum += v;
            s.min = s.min.min(v);
            s.max = s.max.max(v);
        }
        s.avg = s.sum / s.count as f64;
        Some(s)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub metrics: BTreeMap<String, MetricSummary>,
    pub samples: Vec<MetricSample>,
}

/// `metrics_extraction` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricsRequest {
    pub entries: Vec<Entry>,
    /// Restricts extraction to these names (empty = every metric).
    #[serde(default)]
    pub metrics: Vec<String>,
}

fn metric_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|f| f.is_finite())
}

fn inline_fields(content: &str) -> impl Iterator<Item = (String, f64)> + '_ {
    content.lines().filter_map(|line| {
        let (key, value) = line.split_once("::")?;
        let key = metric_name(key);
        let valid_key = !key.is_empty() && key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-');
        let value = value.trim().parse::<f64>().ok().filter(|f| f.is_finite())?;
        valid_key.then_some((key, value))
    })
}

/// Every metric of `entry`, by name.
pub(crate) fn extract(entry: &Entry) -> BTreeMap<String, f64> {
    let mut found: BTreeMap<String, f64> = entry
        .properties
        .iter()
        .filter_map(|(k, v)| Some((metric_name(k), number(v)?)))
        .collect();
    found.extend(inline_fields(&entry.content));
    found
}

/// Samples of `entry` restricted to `wanted` (empty = all).
pub(crate) fn samples(entry: &Entry, wanted: &[String]) -> Vec<MetricSample> {
    let date = match entry.day() {
        EntryDate::Day(d) => Some(d),
        _ => None,
    };
    extract(entry)
        .into_iter()
        .filter(|(name, _)| wanted.is_empty() || wanted.iter().any(|w| metric_name(w) == *name))
        .map(|(metric, value)| MetricSample {
            entry_id: entry.id.clone(),
            date,
            metric,
            value,
        })
        .collect()
}

pub(crate) fn run(req: &MetricsRequest, ctx: &ExecutionContext) -> Result<MetricsReport, TaskError> {
    let found: Vec<MetricSample> = ctx
        .map_batched(&req.entries, |_, e| Ok(samples(e, &req.metrics)))?
        .into_iter()
        .flatten()
        .collect();

    let mut grouped: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for s in &found {
        grouped.entry(s.metric.as_str()).or_default().push(s.value);
    }
    let metrics = grouped
        .into_iter()
        .filter_map(|(name, values)| Some((name.to_string(), MetricSummary::of(values)?)))
        .collect();

    Ok(MetricsReport {
        metrics,
        samples: found,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{Task, TaskType};
    use serde_json::json;

    fn ctx() -> ExecutionContext {
        ExecutionContext::detached(&Task::new("t".into(), TaskType::MetricsExtraction, Value::Null))
    }

    #[test]
    fn inline_fields_override_properties() {
        let e = Entry::new("a", None, "notes\nMood:: 8\nsleep:: 7.5\nbad:: high\nnot a field")
            .with_property("mood", json!(3))
            .with_property("steps", json!("1200"))
            .with_property("title", json!("x"));
        let m = extract(&e);
        assert_eq!(m.get("mood"), Some(&8.0));
        assert_eq!(m.get("sleep"), Some(&7.5));
        assert_eq!(m.get("steps"), Some(&1200.0));
        assert_eq!(m.len(), 3);
    }

    #[test]
    fn summaries_per_metric() {
        let entries = vec![
            Entry::new("a", Some("2024-01-01"), "mood:: 4"),
            Entry::new("b", Some("2024-01-02"), "mood:: 8\nenergy:: 5"),
            Entry::new("c", None, "nothing"),
        ];
        let report = run(&MetricsRequest { entries, metrics: vec![] }, &ctx()).unwrap();
        let mood = &report.metrics["mood"];
        assert_eq!((mood.count, mood.sum, mood.avg, mood.min, mood.max), (2, 12.0, 6.0, 4.0, 8.0));
        assert_eq!(report.samples.len(), 3);
        assert_eq!(report.samples[0].date, NaiveDate::from_ymd_opt(2024, 1, 1));
    }

    #[test]
    fn metric_filter_restricts_names() {
        let entries = vec![Entry::new("a", None, "mood:: 4\nenergy:: 2")];
        let report = run(
            &MetricsRequest {
                entries,
                metrics: vec!["Energy".into()],
            },
            &ctx(),
        )
        .unwrap();
        assert_eq!(report.metrics.keys().collect::<Vec<_>>(), ["energy"]);
    }
}
