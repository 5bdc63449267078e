use std::sync::Arc;

use crate::config::MatchMode;

/// Compares lines of text against a single keyword.
///
/// Cloning shares the keyword, so one matcher can be handed to every worker.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    keyword: Arc<str>,
    mode: MatchMode,
}

impl KeywordMatcher {
    pub fn new(keyword: impl AsRef<str>, mode: MatchMode) -> Self {
        Self {
            keyword: Arc::from(keyword.as_ref()),
            mode,
        }
    }

    /// Counts occurrences of the keyword in one line.
    ///
    /// Token mode counts whitespace-delimited tokens equal to the keyword.
    /// Substring mode counts non-overlapping occurrences.
    pub fn count_in_line(&self, line: &str) -> usize {
        if self.keyword.is_empty() {
            return 0;
        }
        match self.mode {
            MatchMode::Token => line
                .split_whitespace()
                .filter(|token| *token == &*self.keyword)
                .count(),
            MatchMode::Substring => line.matches(&*self.keyword).count(),
        }
    }

    /// Whether the line contains at least one occurrence
    pub fn is_match(&self, line: &str) -> bool {
        if self.keyword.is_empty() {
            return false;
        }
        match self.mode {
            MatchMode::Token => line.split_whitespace().any(|token| token == &*self.keyword),
            MatchMode::Substring => line.contains(&*self.keyword),
        }
    }
}
