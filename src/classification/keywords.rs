//! 疑わしいフレーズの辞書と Aho-Corasick による照合。
use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// フレーズと加点の組。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub phrase: String,
    pub weight: u32,
}

impl KeywordRule {
    pub fn new(phrase: impl Into<String>, weight: u32) -> Self {
        Self {
            phrase: phrase.into(),
            weight,
        }
    }
}

/// 組み込みの既定辞書。順序は採点結果に影響しないが、辞書の表示順として保持する。
pub static DEFAULT_RULES: Lazy<Vec<KeywordRule>> = Lazy::new(|| {
    [
        "click here",
        "shocking",
        "you won",
        "unbelievable",
        "miracle",
        "buy now",
        "don't miss",
    ]
    .into_iter()
    .map(|phrase| KeywordRule::new(phrase, 2))
    .collect()
});

/// Matches every rule phrase against lower-cased text in a single pass.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    ac: AhoCorasick,
    rule_count: usize,
}

impl KeywordMatcher {
    /// Builds the automaton over the lower-cased phrases. Pattern ids equal rule indices.
    ///
    /// # Errors
    /// Returns the automaton build error when the pattern set exceeds internal limits.
    pub fn new(rules: &[KeywordRule]) -> Result<Self, aho_corasick::BuildError> {
        let patterns: Vec<String> = rules.iter().map(|rule| rule.phrase.to_lowercase()).collect();
        let ac = AhoCorasickBuilder::new()
            .match_kind(MatchKind::Standard)
            .build(&patterns)?;

        Ok(Self {
            ac,
            rule_count: rules.len(),
        })
    }

    /// Returns the indices of the rules whose phrase occurs in `lowered`, ascending.
    /// A phrase that occurs several times is reported once.
    #[must_use]
    pub fn matched_rules(&self, lowered: &str) -> Vec<usize> {
        let mut seen = vec![false; self.rule_count];
        for mat in self.ac.find_overlapping_iter(lowered) {
            seen[mat.pattern().as_usize()] = true;
        }
        seen.iter()
            .enumerate()
            .filter_map(|(idx, hit)| hit.then_some(idx))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_carry_uniform_weight() {
        assert_eq!(DEFAULT_RULES.len(), 7);
        assert!(DEFAULT_RULES.iter().all(|rule| rule.weight == 2));
        assert_eq!(DEFAULT_RULES[0].phrase, "click here");
        assert_eq!(DEFAULT_RULES[6].phrase, "don't miss");
    }

    #[test]
    fn overlapping_phrases_are_all_reported() {
        let rules = vec![
            KeywordRule::new("you won", 2),
            KeywordRule::new("won", 1),
            KeywordRule::new("absent", 5),
        ];
        let matcher = KeywordMatcher::new(&rules).expect("matcher builds");

        assert_eq!(matcher.matched_rules("you won a prize"), vec![0, 1]);
    }

    #[test]
    fn repeated_occurrence_is_reported_once() {
        let matcher = KeywordMatcher::new(&DEFAULT_RULES).expect("matcher builds");

        assert_eq!(matcher.matched_rules("miracle after miracle"), vec![4]);
    }

    #[test]
    fn mixed_case_phrases_match_lowered_text() {
        let rules = vec![KeywordRule::new("Buy Now", 2)];
        let matcher = KeywordMatcher::new(&rules).expect("matcher builds");

        assert_eq!(matcher.matched_rules("buy now!"), vec![0]);
    }

    #[test]
    fn empty_rule_set_matches_nothing() {
        let matcher = KeywordMatcher::new(&[]).expect("matcher builds");

        assert!(matcher.matched_rules("shocking").is_empty());
    }
}
