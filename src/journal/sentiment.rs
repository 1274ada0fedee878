//! Lexicon-based sentiment scoring.
//!
//! Words are `[a-zA-Z]+` runs, lowercased. An entry's score is
//! `(positive - negative) / (positive + negative)` (`0.0` without hits);
//! above `0.2` it is labelled positive, below `-0.2` negative.

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::TaskError;
use crate::tasks::ExecutionContext;

use super::entry::Entry;

const LABEL_THRESHOLD: f64 = 0.2;

const POSITIVE: &[&str] = &[
    "good", "great", "happy", "joy", "love", "calm", "grateful", "excited", "proud", "productive",
    "relaxed", "win", "fun", "energized", "hopeful", "glad", "wonderful", "peaceful",
];

const NEGATIVE: &[&str] = &[
    "bad", "sad", "angry", "tired", "stressed", "anxious", "hate", "awful", "sick", "lonely",
    "frustrated", "worried", "lost", "fail", "failed", "exhausted", "upset", "terrible",
];

/// Positive and negative word lists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lexicon {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

impl Default for Lexicon {
    fn default() -> Self {
        let owned = |words: &[&str]| words.iter().map(|w| w.to_string()).collect();
        Self {
            positive: owned(POSITIVE),
            negative: owned(NEGATIVE),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn of(score: f64) -> Self {
        if score > LABEL_THRESHOLD {
            SentimentLabel::Positive
        } else if score < -LABEL_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntrySentiment {
    pub index: usize,
    pub id: String,
    pub positive: usize,
    pub negative: usize,
    pub score: f64,
    pub label: SentimentLabel,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentReport {
    pub entries: Vec<EntrySentiment>,
    /// Mean score over all entries (`0.0` for none).
    pub average: f64,
    pub positive_count: usize,
    pub neutral_count: usize,
    pub negative_count: usize,
}

/// `sentiment_scoring` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SentimentRequest {
    pub entries: Vec<Entry>,
    /// Replaces the built-in lexicon.
    #[serde(default)]
    pub lexicon: Option<Lexicon>,
}

struct Scorer {
    words: Regex,
    positive: HashSet<String>,
    negative: HashSet<String>,
}

impl Scorer {
    fn new(lexicon: &Lexicon) -> Result<Self, TaskError> {
        let set = |words: &[String]| words.iter().map(|w| w.trim().to_lowercase()).collect();
        Ok(Self {
            words: Regex::new(r"\b[a-zA-Z]+\b").map_err(|e| TaskError::Failed { error: e.to_string() })?,
            positive: set(&lexicon.positive),
            negative: set(&lexicon.negative),
        })
    }

    fn score(&self, index: usize, entry: &Entry) -> EntrySentiment {
        let text = entry.content.to_lowercase();
        let (mut positive, mut negative) = (0, 0);
        for word in self.words.find_iter(&text).map(|m| m.as_str()) {
            if self.positive.contains(word) {
                positive += 1;
            } else if self.negative.contains(word) {
                negative += 1;
            }
        }
        let hits = positive + negative;
        let score = if hits == 0 {
            0.0
        } else {
            (positive as f64 - negative as f64) / hits as f64
        };
        EntrySentiment {
            index,
            id: entry.id.clone(),
            positive,
            negative,
            score,
            label: SentimentLabel::of(score),
        }
    }
}

pub(crate) fn run(req: &SentimentRequest, ctx: &ExecutionContext) -> Result<SentimentReport, TaskError> {
    let lexicon = req.lexicon.clone().unwrap_or_default();
    let scorer = Scorer::new(&lexicon)?;
    let entries = ctx.map_batched(&req.entries, |i, e| Ok(scorer.score(i, e)))?;

    let count = |label| entries.iter().filter(|s| s.label == label).count();
    let average = if entries.is_empty() {
        0.0
    } else {
        entries.iter().map(|s| s.score).sum::<f64>() / entries.len() as f64
    };
    Ok(SentimentReport {
        average,
        positive_count: count(SentimentLabel::Positive),
        neutral_count: count(SentimentLabel::Neutral),
        negative_count: count(SentimentLabel::Negative),
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{Task, TaskType};
    use serde_json::Value;

    fn ctx() -> ExecutionContext {
        ExecutionContext::detached(&Task::new("t".into(), TaskType::SentimentScoring, Value::Null))
    }

    #[test]
    fn scores_and_labels() {
        let entries = vec![
            Entry::new("a", None, "Great day, felt happy and calm."),
            Entry::new("b", None, "Tired. Stressed but one good moment."),
            Entry::new("c", None, "Went to the store."),
        ];
        let report = run(&SentimentRequest { entries, lexicon: None }, &ctx()).unwrap();

        let s: Vec<_> = report.entries.iter().map(|e| (e.positive, e.negative, e.label)).collect();
        assert_eq!(
            s,
            [
                (3, 0, SentimentLabel::Positive),
                (1, 2, SentimentLabel::Negative),
                (0, 0, SentimentLabel::Neutral),
            ]
        );
        assert!((report.entries[1].score + 1.0 / 3.0).abs() < 1e-9);
        assert!((report.average - (1.0 - 1.0 / 3.0) / 3.0).abs() < 1e-9);
        assert_eq!((report.positive_count, report.neutral_count, report.negative_count), (1, 1, 1));
    }

    #[test]
    fn custom_lexicon_replaces_default() {
        let lexicon = Lexicon {
            positive: vec!["Store".into()],
            negative: vec![],
        };
        let entries = vec![Entry::new("c", None, "Went to the store.")];
        let report = run(
            &SentimentRequest {
                entries,
                lexicon: Some(lexicon),
            },
            &ctx(),
        )
        .unwrap();
        assert_eq!(report.entries[0].label, SentimentLabel::Positive);
    }
}
