//! Metadata filter: tags and property equality.
//!
//! Tags compare case-insensitively and a leading `#` is optional on both
//! sides. Properties compare by JSON equality, except that a string on one
//! side matches a number or bool with the same textual form.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TaskError;
use crate::tasks::ExecutionContext;

use super::entry::{Entry, FilterOutput, HiddenReason, Verdict, normalize_tag};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagMode {
    #[default]
    Any,
    All,
}

/// Tag and property requirements.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataQuery {
    pub tags: Vec<String>,
    pub tag_mode: TagMode,
    pub properties: Map<String, Value>,
}

impl MetadataQuery {
    pub fn tags<I, S>(tags: I, mode: TagMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            tag_mode: mode,
            properties: Map::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// `None` when `entry` satisfies every requirement.
    pub(crate) fn check(&self, entry: &Entry) -> Option<HiddenReason> {
        let wanted: Vec<String> = self
            .tags
            .iter()
            .map(|t| normalize_tag(t))
            .filter(|t| !t.is_empty())
            .collect();
        if !wanted.is_empty() {
            let have: Vec<String> = entry.normalized_tags().collect();
            let hit = |t: &String| have.contains(t);
            let ok = match self.tag_mode {
                TagMode::Any => wanted.iter().any(hit),
                TagMode::All => wanted.iter().all(hit),
            };
            if !ok {
                return Some(HiddenReason::MissingTags);
            }
        }

        let props_ok = self
            .properties
            .iter()
            .all(|(k, want)| entry.properties.get(k).is_some_and(|got| loosely_equal(got, want)));
        (!props_ok).then_some(HiddenReason::PropertyMismatch)
    }
}

fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(s), other @ (Value::Number(_) | Value::Bool(_)))
        | (other @ (Value::Number(_) | Value::Bool(_)), Value::String(s)) => s.trim() == other.to_string(),
        (Value::String(x), Value::String(y)) => x.trim().eq_ignore_ascii_case(y.trim()),
        _ => a == b,
    }
}

/// `metadata_filter` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetadataRequest {
    pub entries: Vec<Entry>,
    #[serde(flatten)]
    pub query: MetadataQuery,
}

pub(crate) fn run(req: &MetadataRequest, ctx: &ExecutionContext) -> Result<FilterOutput, TaskError> {
    let verdicts = ctx.map_batched(&req.entries, |i, e| Ok(Verdict::decide(i, e, req.query.check(e))))?;
    Ok(FilterOutput::from_verdicts(verdicts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries() -> Vec<Entry> {
        vec![
            Entry::new("a", None, "").with_tags(["#Work", "urgent"]).with_property("status", json!("done")),
            Entry::new("b", None, "").with_tags(["work"]).with_property("rating", json!(4)),
            Entry::new("c", None, "").with_tags(["home"]),
        ]
    }

    fn reasons(q: &MetadataQuery) -> Vec<Option<HiddenReason>> {
        entries().iter().map(|e| q.check(e)).collect()
    }

    #[test]
    fn tag_modes() {
        let any = MetadataQuery::tags(["WORK", "#home"], TagMode::Any);
        assert_eq!(reasons(&any), [None, None, None]);

        let all = MetadataQuery::tags(["work", "#Urgent"], TagMode::All);
        assert_eq!(reasons(&all), [None, Some(HiddenReason::MissingTags), Some(HiddenReason::MissingTags)]);
    }

    #[test]
    fn properties_compare_loosely() {
        let q = MetadataQuery::default().with_property("rating", json!("4"));
        assert_eq!(
            reasons(&q),
            [Some(HiddenReason::PropertyMismatch), None, Some(HiddenReason::PropertyMismatch)]
        );
        let q = MetadataQuery::default().with_property("status", json!("Done"));
        assert_eq!(reasons(&q)[0], None);
    }

    #[test]
    fn empty_query_shows_everything() {
        assert_eq!(reasons(&MetadataQuery::default()), [None, None, None]);
    }
}
