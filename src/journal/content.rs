//! Content search filter.
//!
//! ## Modes
//! - `contains`: the term occurs as a substring
//! - `all_words`: every whitespace-separated word of the term occurs
//! - `any_words`: at least one word occurs
//! - `exact`: the term occurs as a whole word or phrase
//! - `regex`: the term is a regular expression
//!
//! An empty (or whitespace-only) term shows every entry.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::TaskError;
use crate::tasks::ExecutionContext;

use super::entry::{Entry, FilterOutput, HiddenReason, Verdict};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    #[default]
    Contains,
    AllWords,
    AnyWords,
    Exact,
    Regex,
}

/// A content query.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentQuery {
    pub term: String,
    #[serde(default)]
    pub mode: SearchMode,
    #[serde(default)]
    pub case_sensitive: bool,
}

impl ContentQuery {
    pub fn new(term: impl Into<String>, mode: SearchMode) -> Self {
        Self {
            term: term.into(),
            mode,
            case_sensitive: false,
        }
    }

    /// Compiles the query once per task.
    pub(crate) fn compile(&self) -> Result<Matcher, TaskError> {
        let term = self.term.trim();
        if term.is_empty() {
            return Ok(Matcher::Everything);
        }
        let fold = |s: &str| {
            if self.case_sensitive {
                s.to_string()
            } else {
                s.to_lowercase()
            }
        };
        let words = || term.split_whitespace().map(fold).collect::<Vec<_>>();

        Ok(match self.mode {
            SearchMode::Contains => Matcher::Substring {
                needle: fold(term),
                fold: !self.case_sensitive,
            },
            SearchMode::AllWords => Matcher::Words {
                words: words(),
                all: true,
                fold: !self.case_sensitive,
            },
            SearchMode::AnyWords => Matcher::Words {
                words: words(),
                all: false,
                fold: !self.case_sensitive,
            },
            SearchMode::Exact => Matcher::Pattern(self.build(&format!(r"\b{}\b", regex::escape(term)))?),
            SearchMode::Regex => Matcher::Pattern(self.build(term)?),
        })
    }

    fn build(&self, pattern: &str) -> Result<Regex, TaskError> {
        RegexBuilder::new(pattern)
            .case_insensitive(!self.case_sensitive)
            .size_limit(1 << 20)
            .build()
            .map_err(|e| TaskError::invalid(format!("bad search pattern: {e}")))
    }
}

/// Compiled form of a [`ContentQuery`].
#[derive(Debug)]
pub(crate) enum Matcher {
    Everything,
    Substring { needle: String, fold: bool },
    Words { words: Vec<String>, all: bool, fold: bool },
    Pattern(Regex),
}

impl Matcher {
    pub(crate) fn check(&self, entry: &Entry) -> Option<HiddenReason> {
        let matched = match self {
            Matcher::Everything => true,
            Matcher::Substring { needle, fold } => folded(&entry.content, *fold).contains(needle.as_str()),
            Matcher::Words { words, all, fold } => {
                let text = folded(&entry.content, *fold);
                if *all {
                    words.iter().all(|w| text.contains(w.as_str()))
                } else {
                    words.iter().any(|w| text.contains(w.as_str()))
                }
            }
            Matcher::Pattern(re) => re.is_match(&entry.content),
        };
        (!matched).then_some(HiddenReason::NoMatch)
    }
}

fn folded(text: &str, fold: bool) -> std::borrow::Cow<'_, str> {
    if fold {
        text.to_lowercase().into()
    } else {
        text.into()
    }
}

/// `content_filter` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContentRequest {
    pub entries: Vec<Entry>,
    #[serde(flatten)]
    pub query: ContentQuery,
}

pub(crate) fn run(req: &ContentRequest, ctx: &ExecutionContext) -> Result<FilterOutput, TaskError> {
    let matcher = req.query.compile()?;
    let verdicts = ctx.map_batched(&req.entries, |i, e| Ok(Verdict::decide(i, e, matcher.check(e))))?;
    Ok(FilterOutput::from_verdicts(verdicts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visible(query: ContentQuery, texts: &[&str]) -> Vec<bool> {
        let m = query.compile().unwrap();
        texts
            .iter()
            .map(|t| m.check(&Entry::new("e", None, *t)).is_none())
            .collect()
    }

    const TEXTS: [&str; 3] = ["Rust is fast", "rusty nails", "Go is fine"];

    #[test]
    fn modes() {
        assert_eq!(visible(ContentQuery::new("rust", SearchMode::Contains), &TEXTS), [true, true, false]);
        assert_eq!(visible(ContentQuery::new("rust", SearchMode::Exact), &TEXTS), [true, false, false]);
        assert_eq!(visible(ContentQuery::new("is fast", SearchMode::AllWords), &TEXTS), [true, false, false]);
        assert_eq!(visible(ContentQuery::new("nails fine", SearchMode::AnyWords), &TEXTS), [false, true, true]);
        assert_eq!(visible(ContentQuery::new(r"^(go|rusty)\b", SearchMode::Regex), &TEXTS), [false, true, true]);
    }

    #[test]
    fn case_sensitivity() {
        let mut q = ContentQuery::new("Rust", SearchMode::Contains);
        q.case_sensitive = true;
        assert_eq!(visible(q, &TEXTS), [true, false, false]);
    }

    #[test]
    fn empty_term_shows_everything() {
        assert_eq!(visible(ContentQuery::new("  ", SearchMode::Regex), &TEXTS), [true, true, true]);
    }

    #[test]
    fn bad_regex_is_invalid_payload() {
        let err = ContentQuery::new("(", SearchMode::Regex).compile().unwrap_err();
        assert!(matches!(err, TaskError::InvalidPayload { .. }));
    }
}
