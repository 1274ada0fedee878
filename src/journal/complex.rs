//! Complex filter: date, content and metadata criteria joined with and/or.
//!
//! - `and`: visible when every present criterion passes; the reason is the
//!   first failing criterion's (date, content, metadata order).
//! - `or`: visible when any present criterion passes; otherwise the first
//!   criterion's reason.
//! - no criteria: everything visible.

use serde::{Deserialize, Serialize};

use crate::error::TaskError;
use crate::tasks::ExecutionContext;

use super::content::{ContentQuery, Matcher};
use super::date_range::DateRange;
use super::entry::{Entry, FilterOutput, HiddenReason, Verdict};
use super::metadata::MetadataQuery;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combinator {
    #[default]
    And,
    Or,
}

/// Criteria of a complex filter; absent parts are ignored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplexCriteria {
    pub combinator: Combinator,
    pub date: Option<DateRange>,
    pub content: Option<ContentQuery>,
    pub metadata: Option<MetadataQuery>,
}

impl ComplexCriteria {
    pub fn new(combinator: Combinator) -> Self {
        Self {
            combinator,
            ..Self::default()
        }
    }

    pub fn with_date(mut self, range: DateRange) -> Self {
        self.date = Some(range);
        self
    }

    pub fn with_content(mut self, query: ContentQuery) -> Self {
        self.content = Some(query);
        self
    }

    pub fn with_metadata(mut self, query: MetadataQuery) -> Self {
        self.metadata = Some(query);
        self
    }
}

/// `complex_filter` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComplexRequest {
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub criteria: ComplexCriteria,
}

struct Compiled<'a> {
    combinator: Combinator,
    date: Option<&'a DateRange>,
    content: Option<Matcher>,
    metadata: Option<&'a MetadataQuery>,
}

impl Compiled<'_> {
    fn check(&self, entry: &Entry) -> Option<HiddenReason> {
        let results = [
            self.date.map(|d| d.check(entry)),
            self.content.as_ref().map(|m| m.check(entry)),
            self.metadata.map(|m| m.check(entry)),
        ];
        let mut present = results.into_iter().flatten().peekable();
        let first = *present.peek()?;

        match self.combinator {
            Combinator::And => present.flatten().next(),
            Combinator::Or => {
                if present.any(|r| r.is_none()) {
                    None
                } else {
                    first
                }
            }
        }
    }
}

pub(crate) fn run(req: &ComplexRequest, ctx: &ExecutionContext) -> Result<FilterOutput, TaskError> {
    let c = &req.criteria;
    if let Some(range) = &c.date {
        range.validate()?;
    }
    let compiled = Compiled {
        combinator: c.combinator,
        date: c.date.as_ref(),
        content: c.content.as_ref().map(ContentQuery::compile).transpose()?,
        metadata: c.metadata.as_ref(),
    };
    let verdicts = ctx.map_batched(&req.entries, |i, e| Ok(Verdict::decide(i, e, compiled.check(e))))?;
    Ok(FilterOutput::from_verdicts(verdicts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{SearchMode, TagMode};
    use crate::tasks::{Task, TaskType};
    use chrono::NaiveDate;
    use serde_json::Value;

    fn ctx() -> ExecutionContext {
        ExecutionContext::detached(&Task::new("t".into(), TaskType::ComplexFilter, Value::Null))
    }

    fn entries() -> Vec<Entry> {
        vec![
            Entry::new("a", Some("2024-01-10"), "shipped the release").with_tags(["work"]),
            Entry::new("b", Some("2024-03-01"), "release retro").with_tags(["work"]),
            Entry::new("c", None, "garden").with_tags(["home"]),
        ]
    }

    fn january() -> DateRange {
        DateRange::new(NaiveDate::from_ymd_opt(2024, 1, 1), NaiveDate::from_ymd_opt(2024, 1, 31))
    }

    fn run_with(criteria: ComplexCriteria) -> FilterOutput {
        run(
            &ComplexRequest {
                entries: entries(),
                criteria,
            },
            &ctx(),
        )
        .unwrap()
    }

    #[test]
    fn and_reports_first_failing_reason() {
        let out = run_with(
            ComplexCriteria::new(Combinator::And)
                .with_date(january())
                .with_content(ContentQuery::new("release", SearchMode::Contains)),
        );
        assert_eq!(out.visibility(), [true, false, false]);
        assert_eq!(out.verdicts[1].reason, Some(HiddenReason::AfterRange));
        assert_eq!(out.verdicts[2].reason, Some(HiddenReason::NoDate));
    }

    #[test]
    fn or_needs_one_passing_criterion() {
        let out = run_with(
            ComplexCriteria::new(Combinator::Or)
                .with_date(january())
                .with_metadata(MetadataQuery::tags(["work"], TagMode::Any)),
        );
        assert_eq!(out.visibility(), [true, true, false]);
        assert_eq!(out.verdicts[2].reason, Some(HiddenReason::NoDate));
        assert_eq!(out.visible_count, 2);
    }

    #[test]
    fn no_criteria_shows_everything() {
        assert_eq!(run_with(ComplexCriteria::default()).visible_count, 3);
    }
}
