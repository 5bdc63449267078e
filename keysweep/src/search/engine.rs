use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::matcher::KeywordMatcher;
use super::processor::FileProcessor;
use crate::config::SearchConfig;
use crate::enumerator::Enumerator;
use crate::errors::SearchResult;
use crate::metrics::RunMetrics;
use crate::pipeline::{MatchSink, SearcherPool};
use crate::results::{CountSummary, FirstMatch, StreamSummary};
use crate::tasks::{CancellationToken, CountTask, JobOutcome, SearchTask, TaskPool};

/// Runs keyword searches over one configuration.
///
/// The task pool is built once and reused by every counting and first-match
/// run; the streaming pipeline creates its channel and searcher threads per run.
pub struct SearchEngine {
    config: SearchConfig,
    /// Scans for counting and first match
    processor: FileProcessor,
    /// Scans for the streaming pipeline, which may match differently
    stream_processor: FileProcessor,
    pool: TaskPool,
    metrics: RunMetrics,
}

impl SearchEngine {
    /// Validates the configuration and starts the task pool
    pub fn new(config: SearchConfig) -> SearchResult<Self> {
        config.validate()?;
        let metrics = RunMetrics::new();
        let processor = FileProcessor::with_metrics(
            KeywordMatcher::new(&config.keyword, config.batch_match_mode()),
            config.encoding_mode,
            metrics.clone(),
        );
        let stream_processor = FileProcessor::with_metrics(
            KeywordMatcher::new(&config.keyword, config.stream_match_mode()),
            config.encoding_mode,
            metrics.clone(),
        );
        let pool = TaskPool::with_metrics(config.pool.clone(), metrics.clone())?;
        Ok(Self {
            config,
            processor,
            stream_processor,
            pool,
            metrics,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    pub fn enumerator(&self) -> Enumerator {
        Enumerator::new(&self.config)
    }

    /// Streams files through the bounded channel and reports every matching
    /// line to `sink`.
    pub fn stream(&self, sink: &dyn MatchSink) -> SearchResult<StreamSummary> {
        info!("Starting streaming search for '{}'", self.config.keyword);
        let enumerator = self.enumerator();
        // An unreadable root aborts before any thread starts
        enumerator.validate_root()?;

        let summary = SearcherPool::from_config(&self.config).run(
            |channel| enumerator.feed(channel),
            &self.stream_processor,
            sink,
        )?;
        self.metrics.log_stats();
        Ok(summary)
    }

    /// Counts every occurrence of the keyword under the root
    pub fn count_occurrences(&self) -> SearchResult<CountSummary> {
        let files = self.enumerator().collect_files()?;
        Ok(self.count_files(files))
    }

    /// Counts occurrences across an already enumerated file set.
    ///
    /// Files that cannot be read count as zero.
    pub fn count_files(&self, files: Vec<PathBuf>) -> CountSummary {
        info!(
            "Counting '{}' in {} files",
            self.config.keyword,
            files.len()
        );
        let start = Instant::now();
        let file_count = files.len();
        let jobs: Vec<_> = files
            .into_iter()
            .map(|path| {
                let task = CountTask::new(self.processor.clone(), path);
                move |token: &CancellationToken| task.run(token)
            })
            .collect();

        let mut summary = CountSummary {
            files: file_count,
            ..CountSummary::default()
        };
        for outcome in self.pool.invoke_all(&CancellationToken::new(), jobs) {
            match outcome {
                JobOutcome::Completed(count) => summary.total += count,
                JobOutcome::Failed(e) => {
                    warn!("Counting as zero: {}", e);
                    summary.files_failed += 1;
                }
                JobOutcome::Cancelled => {}
            }
        }
        summary.elapsed = start.elapsed();

        info!(
            "Count complete. {} occurrences in {} files",
            summary.total, summary.files
        );
        self.metrics.log_stats();
        summary
    }

    /// Finds a file containing the keyword, stopping the other searches once
    /// one is found
    pub fn find_first(&self) -> SearchResult<FirstMatch> {
        let files = self.enumerator().collect_files()?;
        Ok(self.find_first_in(files))
    }

    /// First-match search over an already enumerated file set
    pub fn find_first_in(&self, files: Vec<PathBuf>) -> FirstMatch {
        info!(
            "Searching {} files for the first '{}'",
            files.len(),
            self.config.keyword
        );
        let jobs: Vec<_> = files
            .into_iter()
            .map(|path| {
                let task = SearchTask::new(self.processor.clone(), path);
                move |token: &CancellationToken| task.run(token)
            })
            .collect();

        let token = CancellationToken::new();
        let result = match self.pool.invoke_any(&token, jobs) {
            Some(path) => FirstMatch::Found(path),
            None => FirstMatch::NoMatch,
        };
        debug!("First-match search finished: {:?}", result);
        result
    }

    /// Counts, then runs a first-match search over the same file set
    pub fn count_then_find(&self) -> SearchResult<(CountSummary, FirstMatch)> {
        let files = self.enumerator().collect_files()?;
        let summary = self.count_files(files.clone());
        let first = self.find_first_in(files);
        Ok((summary, first))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchMode;
    use crate::errors::SearchError;
    use crate::pipeline::CollectingSink;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_engine_modes_agree() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "foo bar foo").unwrap();
        fs::write(dir.path().join("b.txt"), "baz").unwrap();

        let engine = SearchEngine::new(SearchConfig::new("foo", dir.path())).unwrap();

        assert_eq!(engine.count_occurrences().unwrap().total, 2);
        assert_eq!(
            engine.find_first().unwrap(),
            FirstMatch::Found(dir.path().join("a.txt"))
        );

        let sink = CollectingSink::new();
        let summary = engine.stream(&sink).unwrap();
        assert_eq!(summary.matching_lines, 1);
        assert_eq!(sink.take_lines()[0].path, dir.path().join("a.txt"));
    }

    #[test]
    fn test_default_modes_differ_between_stream_and_count() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "volatile;\nint volatile x\n").unwrap();

        let engine = SearchEngine::new(SearchConfig::new("volatile", dir.path())).unwrap();
        assert_eq!(engine.count_occurrences().unwrap().total, 1);

        let sink = CollectingSink::new();
        assert_eq!(engine.stream(&sink).unwrap().matching_lines, 2);
    }

    #[test]
    fn test_bad_root_fails_every_mode() {
        let dir = tempdir().unwrap();
        let engine =
            SearchEngine::new(SearchConfig::new("foo", dir.path().join("missing"))).unwrap();

        assert!(matches!(
            engine.count_occurrences(),
            Err(SearchError::EnumerationFailure { .. })
        ));
        assert!(matches!(
            engine.find_first(),
            Err(SearchError::EnumerationFailure { .. })
        ));
        assert!(matches!(
            engine.stream(&CollectingSink::new()),
            Err(SearchError::EnumerationFailure { .. })
        ));
    }

    #[test]
    fn test_empty_keyword_rejected() {
        assert!(matches!(
            SearchEngine::new(SearchConfig::new("", ".")),
            Err(SearchError::InvalidKeyword(_))
        ));
    }

    #[test]
    fn test_substring_mode_counts_inside_words() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "foobar foo\nxfoo").unwrap();

        let mut config = SearchConfig::new("foo", dir.path());
        config.match_mode = Some(MatchMode::Substring);
        let engine = SearchEngine::new(config).unwrap();
        assert_eq!(engine.count_occurrences().unwrap().total, 3);
    }
}
