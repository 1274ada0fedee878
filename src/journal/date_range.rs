//! Date-range filter: inclusive `[start, end]`, either bound optional.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::TaskError;
use crate::tasks::ExecutionContext;

use super::entry::{Entry, EntryDate, FilterOutput, HiddenReason, Verdict};

/// Bounds of a date-range check.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub(crate) fn validate(&self) -> Result<(), TaskError> {
        match (self.start, self.end) {
            (Some(s), Some(e)) if s > e => Err(TaskError::invalid(format!(
                "range start {s} is after end {e}"
            ))),
            _ => Ok(()),
        }
    }

    /// `None` when `entry` is inside the range.
    pub(crate) fn check(&self, entry: &Entry) -> Option<HiddenReason> {
        let day = match entry.day() {
            EntryDate::Missing => return Some(HiddenReason::NoDate),
            EntryDate::Invalid => return Some(HiddenReason::InvalidDate),
            EntryDate::Day(d) => d,
        };
        if self.start.is_some_and(|s| day < s) {
            Some(HiddenReason::BeforeRange)
        } else if self.end.is_some_and(|e| day > e) {
            Some(HiddenReason::AfterRange)
        } else {
            None
        }
    }
}

/// `date_range_filter` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DateRangeRequest {
    pub entries: Vec<Entry>,
    #[serde(flatten)]
    pub range: DateRange,
}

pub(crate) fn run(req: &DateRangeRequest, ctx: &ExecutionContext) -> Result<FilterOutput, TaskError> {
    req.range.validate()?;
    let verdicts = ctx.map_batched(&req.entries, |i, e| Ok(Verdict::decide(i, e, req.range.check(e))))?;
    Ok(FilterOutput::from_verdicts(verdicts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{Task, TaskType};
    use serde_json::{Value, json};

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::detached(&Task::new("t".into(), TaskType::DateRangeFilter, Value::Null))
    }

    #[test]
    fn january_scenario() {
        let req: DateRangeRequest = serde_json::from_value(json!({
            "entries": [
                {"id": "a", "date": "2024-01-05"},
                {"id": "b", "date": "2024-02-01"},
                {"id": "c", "date": null}
            ],
            "start": "2024-01-01",
            "end": "2024-01-31"
        }))
        .unwrap();
        let out = run(&req, &ctx()).unwrap();
        assert_eq!(out.visibility(), vec![true, false, false]);
        assert_eq!(out.verdicts[1].reason, Some(HiddenReason::AfterRange));
        assert_eq!(out.verdicts[2].reason, Some(HiddenReason::NoDate));
        assert_eq!(out.visible_count, 1);
    }

    #[test]
    fn bounds_are_inclusive_and_optional() {
        let only_start = DateRange::new(Some(day("2024-01-05")), None);
        assert_eq!(only_start.check(&Entry::new("x", Some("2024-01-05"), "")), None);
        assert_eq!(
            only_start.check(&Entry::new("x", Some("2024-01-04"), "")),
            Some(HiddenReason::BeforeRange)
        );
        let open = DateRange::default();
        assert_eq!(open.check(&Entry::new("x", Some("1999-12-31"), "")), None);
        assert_eq!(open.check(&Entry::new("x", Some("bad"), "")), Some(HiddenReason::InvalidDate));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let req = DateRangeRequest {
            entries: vec![],
            range: DateRange::new(Some(day("2024-02-01")), Some(day("2024-01-01"))),
        };
        assert!(matches!(run(&req, &ctx()), Err(TaskError::InvalidPayload { .. })));
    }
}
