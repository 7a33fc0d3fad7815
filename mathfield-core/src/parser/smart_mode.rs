//! Smart mode: reclassify letter runs between math and text.
//!
//! The classification is a pluggable policy. The default recognizes a short
//! list of English words; anything it does not know stays as typed.

use std::collections::HashSet;
use std::fmt;

use crate::atom::ParseMode;

pub trait SmartModePolicy: fmt::Debug + Send + Sync {
    /// Mode a run of letters should be in, or `None` when unsure.
    fn classify(&self, run: &str) -> Option<ParseMode>;
}

const DEFAULT_WORDS: &[&str] = &[
    "if", "then", "else", "when", "where", "and", "or", "for", "all", "let", "given", "such",
    "that", "with", "is", "are", "the", "of", "otherwise", "unless", "not", "some", "each",
    "every", "any", "thus", "hence", "since", "because",
];

#[derive(Debug, Clone)]
pub struct WordListPolicy {
    words: HashSet<String>,
}

impl WordListPolicy {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        WordListPolicy {
            words: words.into_iter().map(|w| w.into().to_lowercase()).collect(),
        }
    }
}

impl Default for WordListPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_WORDS.iter().copied())
    }
}

impl SmartModePolicy for WordListPolicy {
    fn classify(&self, run: &str) -> Option<ParseMode> {
        if run.chars().count() < 2 || !run.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        if self.words.contains(&run.to_lowercase()) {
            Some(ParseMode::Text)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_words_become_text() {
        let policy = WordListPolicy::default();
        assert_eq!(policy.classify("if"), Some(ParseMode::Text));
        assert_eq!(policy.classify("Then"), Some(ParseMode::Text));
    }

    #[test]
    fn test_unknown_runs_are_left_alone() {
        let policy = WordListPolicy::default();
        assert_eq!(policy.classify("xy"), None);
        assert_eq!(policy.classify("a"), None);
        assert_eq!(policy.classify("x1"), None);
    }

    #[test]
    fn test_custom_word_list() {
        let policy = WordListPolicy::new(["sinc"]);
        assert_eq!(policy.classify("sinc"), Some(ParseMode::Text));
        assert_eq!(policy.classify("if"), None);
    }
}
