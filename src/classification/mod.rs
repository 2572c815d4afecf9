//! 記事テキストの信頼性判定のための高水準API。
//!
//! 判定は辞書ベースの決定的なヒューリスティックで、乱数や外部 I/O を一切使わない。

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod keywords;
mod rulebook;

pub use keywords::{DEFAULT_RULES, KeywordMatcher, KeywordRule};
pub use rulebook::{Rulebook, RulebookError, ScoringPolicy};

/// 判定ラベル。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Reliable,
    NeedsReview,
    Fake,
}

impl Label {
    pub const ALL: [Label; 3] = [Label::Reliable, Label::NeedsReview, Label::Fake];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Label::Reliable => "reliable",
            Label::NeedsReview => "needs_review",
            Label::Fake => "fake",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown label: {0}")]
pub struct UnknownLabel(pub String);

impl FromStr for Label {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reliable" => Ok(Label::Reliable),
            "needs_review" => Ok(Label::NeedsReview),
            "fake" => Ok(Label::Fake),
            other => Err(UnknownLabel(other.to_string())),
        }
    }
}

/// 分類結果。`text` は入力をそのまま保持する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub text: String,
    pub label: Label,
    pub score: u32,
    pub confidence: f64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("text must not be empty")]
    EmptyText,
}

/// Keyword heuristic classifier. Holds no mutable state; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Classifier {
    rulebook: Rulebook,
    matcher: KeywordMatcher,
}

impl Classifier {
    /// # Errors
    /// Returns [`RulebookError::Matcher`] if the phrase automaton cannot be built.
    pub fn new(rulebook: Rulebook) -> Result<Self, RulebookError> {
        let matcher = KeywordMatcher::new(rulebook.rules())?;
        Ok(Self { rulebook, matcher })
    }

    #[must_use]
    pub fn rulebook(&self) -> &Rulebook {
        &self.rulebook
    }

    /// Scores `text` against the rulebook.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyText`] for empty or whitespace-only input; no scoring happens in that case.
    pub fn classify(&self, text: &str) -> Result<ClassificationResult, ValidationError> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyText);
        }

        let policy = self.rulebook.policy();
        let lowered = text.to_lowercase();
        let rules = self.rulebook.rules();

        let mut score: u32 = self
            .matcher
            .matched_rules(&lowered)
            .into_iter()
            .map(|idx| rules[idx].weight)
            .fold(0, u32::saturating_add);

        let exclamations = text.chars().filter(|c| *c == '!').count();
        if exclamations > policy.exclamation_limit {
            score = score.saturating_add(policy.exclamation_bonus);
        }

        Ok(ClassificationResult {
            text: text.to_string(),
            label: label_for(score, policy),
            score,
            confidence: confidence_for(score, policy),
        })
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(Rulebook::default()).expect("default rulebook builds a matcher")
    }
}

fn label_for(score: u32, policy: &ScoringPolicy) -> Label {
    if score >= policy.fake_score {
        Label::Fake
    } else if score >= policy.review_score {
        Label::NeedsReview
    } else {
        Label::Reliable
    }
}

fn confidence_for(score: u32, policy: &ScoringPolicy) -> f64 {
    (f64::from(score) / policy.confidence_divisor)
        .clamp(policy.confidence_floor, policy.confidence_ceiling)
}
