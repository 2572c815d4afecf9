use std::{collections::HashSet, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::keywords::{DEFAULT_RULES, KeywordRule};

/// Thresholds that turn matched rules into a score, label and confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    /// Exclamation marks tolerated before the bonus applies.
    pub exclamation_limit: usize,
    pub exclamation_bonus: u32,
    /// Minimum score labelled `needs_review`.
    pub review_score: u32,
    /// Minimum score labelled `fake`.
    pub fake_score: u32,
    pub confidence_divisor: f64,
    pub confidence_floor: f64,
    pub confidence_ceiling: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            exclamation_limit: 2,
            exclamation_bonus: 1,
            review_score: 2,
            fake_score: 4,
            confidence_divisor: 6.0,
            confidence_floor: 0.1,
            confidence_ceiling: 0.99,
        }
    }
}

#[derive(Debug, Error)]
pub enum RulebookError {
    #[error("rule {index} has an empty phrase")]
    EmptyPhrase { index: usize },
    #[error("phrase {0:?} appears more than once")]
    DuplicatePhrase(String),
    #[error("review score {review} exceeds fake score {fake}")]
    InvalidThresholds { review: u32, fake: u32 },
    #[error("invalid confidence settings: {0}")]
    InvalidConfidence(&'static str),
    #[error("failed to read rulebook {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse rulebook: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to build keyword matcher: {0}")]
    Matcher(#[from] aho_corasick::BuildError),
}

#[derive(Debug, Deserialize)]
struct RulebookFile {
    rules: Vec<KeywordRule>,
    #[serde(default)]
    policy: ScoringPolicy,
}

/// Ordered `(phrase, weight)` rules plus the scoring policy, validated on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Rulebook {
    rules: Vec<KeywordRule>,
    policy: ScoringPolicy,
}

impl Rulebook {
    /// # Errors
    /// Rejects empty or duplicate phrases (case-insensitive) and inconsistent thresholds.
    pub fn new(rules: Vec<KeywordRule>, policy: ScoringPolicy) -> Result<Self, RulebookError> {
        let mut seen = HashSet::with_capacity(rules.len());
        for (index, rule) in rules.iter().enumerate() {
            if rule.phrase.trim().is_empty() {
                return Err(RulebookError::EmptyPhrase { index });
            }
            if !seen.insert(rule.phrase.to_lowercase()) {
                return Err(RulebookError::DuplicatePhrase(rule.phrase.clone()));
            }
        }

        if policy.review_score > policy.fake_score {
            return Err(RulebookError::InvalidThresholds {
                review: policy.review_score,
                fake: policy.fake_score,
            });
        }
        if !(policy.confidence_divisor.is_finite() && policy.confidence_divisor > 0.0) {
            return Err(RulebookError::InvalidConfidence(
                "divisor must be a positive number",
            ));
        }
        if !(0.0..=1.0).contains(&policy.confidence_floor)
            || !(0.0..=1.0).contains(&policy.confidence_ceiling)
            || policy.confidence_floor > policy.confidence_ceiling
        {
            return Err(RulebookError::InvalidConfidence(
                "floor and ceiling must satisfy 0 <= floor <= ceiling <= 1",
            ));
        }

        Ok(Self { rules, policy })
    }

    /// # Errors
    /// Returns [`RulebookError::Parse`] for malformed YAML and the validation errors of [`Rulebook::new`].
    pub fn from_yaml_str(raw: &str) -> Result<Self, RulebookError> {
        let file: RulebookFile = serde_yaml::from_str(raw)?;
        Self::new(file.rules, file.policy)
    }

    /// # Errors
    /// Fails when the file cannot be read or does not describe a valid rulebook.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, RulebookError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| RulebookError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    #[must_use]
    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    #[must_use]
    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }
}

impl Default for Rulebook {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES.clone(),
            policy: ScoringPolicy::default(),
        }
    }
}
