//! Result types produced by the three search modes.
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// A line that contains the keyword
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineMatch {
    /// The file the line was read from
    pub path: PathBuf,
    /// 1-based line number
    pub line_number: usize,
    /// The line without its terminator
    pub line_content: String,
}

impl fmt::Display for LineMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line_content)
    }
}

/// Outcome of a streaming run through the bounded channel
#[derive(Debug, Clone, Default, Serialize)]
pub struct StreamSummary {
    /// Files the enumerator put into the channel
    pub files_enumerated: usize,
    /// Files a searcher read successfully
    pub files_scanned: u64,
    /// Files that could not be read
    pub files_failed: u64,
    /// Lines reported to the sink
    pub matching_lines: u64,
    /// Number of searcher threads that ran
    pub searcher_count: usize,
    /// Most items the channel ever held at once
    pub channel_high_water: usize,
    /// Set when the walk stopped early; files already enumerated were still searched
    pub enumeration_error: Option<String>,
    pub elapsed: Duration,
}

/// Outcome of the counting mode
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CountSummary {
    /// Sum of per-file occurrence counts
    pub total: u64,
    /// Files submitted as tasks
    pub files: usize,
    /// Files whose task failed and counted as zero
    pub files_failed: usize,
    pub elapsed: Duration,
}

/// Outcome of the first-match mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "path", rename_all = "snake_case")]
pub enum FirstMatch {
    /// The first file observed to contain the keyword
    Found(PathBuf),
    /// Every task finished without a match
    NoMatch,
}
