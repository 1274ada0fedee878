//! # Journal entry model shared by every task family.
//!
//! Entries arrive already parsed; the families only read them. Everything is
//! `#[serde(default)]` so sparse records decode.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One parsed journal entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entry {
    pub id: String,
    /// `YYYY-MM-DD`, optionally followed by a time part.
    pub date: Option<String>,
    pub content: String,
    pub tags: Vec<String>,
    pub properties: Map<String, Value>,
}

/// Outcome of reading [`Entry::date`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryDate {
    Missing,
    Invalid,
    Day(NaiveDate),
}

impl Entry {
    /// Entry with an id, a date and content.
    pub fn new(id: impl Into<String>, date: Option<&str>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            date: date.map(str::to_string),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Calendar day of the entry (first 10 characters of `date`).
    pub fn day(&self) -> EntryDate {
        match self.date.as_deref().map(str::trim) {
            None | Some("") => EntryDate::Missing,
            Some(raw) => raw
                .get(..10)
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
                .map_or(EntryDate::Invalid, EntryDate::Day),
        }
    }

    /// Tags lowercased without a leading `#`.
    pub fn normalized_tags(&self) -> impl Iterator<Item = String> + '_ {
        self.tags.iter().map(|t| normalize_tag(t))
    }
}

/// Lowercases a tag and strips a leading `#`.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().trim_start_matches('#').to_lowercase()
}

/// Why an entry was hidden by a filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HiddenReason {
    NoDate,
    InvalidDate,
    BeforeRange,
    AfterRange,
    NoMatch,
    MissingTags,
    PropertyMismatch,
}

/// Per-entry filter decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub index: usize,
    pub id: String,
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<HiddenReason>,
}

impl Verdict {
    pub(crate) fn decide(index: usize, entry: &Entry, hidden: Option<HiddenReason>) -> Self {
        Self {
            index,
            id: entry.id.clone(),
            visible: hidden.is_none(),
            reason: hidden,
        }
    }
}

/// Output of every filter family.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOutput {
    pub verdicts: Vec<Verdict>,
    pub visible_count: usize,
    pub total: usize,
}

impl FilterOutput {
    pub(crate) fn from_verdicts(verdicts: Vec<Verdict>) -> Self {
        Self {
            visible_count: verdicts.iter().filter(|v| v.visible).count(),
            total: verdicts.len(),
            verdicts,
        }
    }

    /// Visibility flags in entry order.
    pub fn visibility(&self) -> Vec<bool> {
        self.verdicts.iter().map(|v| v.visible).collect()
    }
}
