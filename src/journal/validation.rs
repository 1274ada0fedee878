//! Structural checks over entries.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::TaskError;
use crate::tasks::ExecutionContext;

use super::entry::{Entry, EntryDate};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    MissingId,
    DuplicateId,
    InvalidDate,
    EmptyContent,
    InvalidTag,
}

/// One problem found in one entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub index: usize,
    pub id: String,
    pub kind: IssueKind,
    pub detail: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid_count: usize,
    pub invalid_count: usize,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// `validation` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub entries: Vec<Entry>,
}

fn inspect(index: usize, entry: &Entry, seen: &mut HashSet<String>) -> Vec<ValidationIssue> {
    let mut out = Vec::new();
    let mut issue = |kind, detail: String| {
        out.push(ValidationIssue {
            index,
            id: entry.id.clone(),
            kind,
            detail,
        })
    };

    let id = entry.id.trim();
    if id.is_empty() {
        issue(IssueKind::MissingId, "entry has no id".into());
    } else if !seen.insert(id.to_string()) {
        issue(IssueKind::DuplicateId, format!("id {id} appears more than once"));
    }
    if entry.day() == EntryDate::Invalid {
        issue(
            IssueKind::InvalidDate,
            format!("unparseable date {:?}", entry.date.as_deref().unwrap_or_default()),
        );
    }
    if entry.content.trim().is_empty() {
        issue(IssueKind::EmptyContent, "content is empty".into());
    }
    for tag in &entry.tags {
        let bare = tag.trim().trim_start_matches('#');
        if bare.is_empty() || bare.chars().any(char::is_whitespace) {
            issue(IssueKind::InvalidTag, format!("bad tag {tag:?}"));
        }
    }
    out
}

pub(crate) fn run(req: &ValidationRequest, ctx: &ExecutionContext) -> Result<ValidationReport, TaskError> {
    let mut seen = HashSet::new();
    let per_entry = ctx.map_batched(&req.entries, |i, e| Ok(inspect(i, e, &mut seen)))?;

    let invalid_count = per_entry.iter().filter(|v| !v.is_empty()).count();
    Ok(ValidationReport {
        valid_count: per_entry.len() - invalid_count,
        invalid_count,
        issues: per_entry.into_iter().flatten().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{Task, TaskType};
    use serde_json::Value;

    #[test]
    fn finds_every_issue_kind() {
        let entries = vec![
            Entry::new("a", Some("2024-01-01"), "fine").with_tags(["#ok"]),
            Entry::new("a", Some("2024-02-30"), "dup with bad date"),
            Entry::new("", None, "  "),
            Entry::new("d", None, "tags").with_tags(["#", "two words"]),
        ];
        let ctx = ExecutionContext::detached(&Task::new("t".into(), TaskType::Validation, Value::Null));
        let report = run(&ValidationRequest { entries }, &ctx).unwrap();

        assert_eq!((report.valid_count, report.invalid_count), (1, 3));
        let kinds: Vec<_> = report.issues.iter().map(|i| (i.index, i.kind)).collect();
        assert_eq!(
            kinds,
            [
                (1, IssueKind::DuplicateId),
                (1, IssueKind::InvalidDate),
                (2, IssueKind::MissingId),
                (2, IssueKind::EmptyContent),
                (3, IssueKind::InvalidTag),
                (3, IssueKind::InvalidTag),
            ]
        );
        assert!(!report.is_clean());
    }
}
