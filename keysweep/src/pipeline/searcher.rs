use parking_lot::Mutex;
use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use super::channel::BoundedChannel;
use super::WorkItem;
use crate::config::SearchConfig;
use crate::errors::{SearchError, SearchResult};
use crate::results::{LineMatch, StreamSummary};
use crate::search::FileProcessor;

/// Destination for matching lines. Called concurrently from every searcher.
pub trait MatchSink: Send + Sync {
    fn report(&self, m: &LineMatch);
}

/// Prints `path:line` to stdout, one whole line per lock
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl MatchSink for StdoutSink {
    fn report(&self, m: &LineMatch) {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        // A closed stdout only loses output, the search itself is unaffected
        let _ = writeln!(out, "{}", m);
    }
}

/// Keeps every reported line in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    lines: Mutex<Vec<LineMatch>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes the collected lines, leaving the sink empty
    pub fn take_lines(&self) -> Vec<LineMatch> {
        std::mem::take(&mut *self.lines.lock())
    }
}

impl MatchSink for CollectingSink {
    fn report(&self, m: &LineMatch) {
        self.lines.lock().push(m.clone());
    }
}

/// Fixed set of searcher threads fed through a bounded channel.
#[derive(Debug, Clone, Copy)]
pub struct SearcherPool {
    searcher_count: NonZeroUsize,
    channel_capacity: NonZeroUsize,
}

#[derive(Debug, Default)]
struct SearcherReport {
    files_scanned: u64,
    files_failed: u64,
    matching_lines: u64,
}

impl SearcherPool {
    pub fn new(searcher_count: NonZeroUsize, channel_capacity: NonZeroUsize) -> Self {
        Self {
            searcher_count,
            channel_capacity,
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.searcher_count, config.channel_capacity)
    }

    /// Runs one streaming search and waits for every thread to finish.
    ///
    /// `produce` runs on its own thread and is the only writer of file items;
    /// it returns how many files it put. The end-of-stream marker is put after
    /// it returns, whether it succeeded or not.
    pub fn run<P>(
        &self,
        produce: P,
        processor: &FileProcessor,
        sink: &dyn MatchSink,
    ) -> SearchResult<StreamSummary>
    where
        P: FnOnce(&BoundedChannel<WorkItem>) -> SearchResult<usize> + Send,
    {
        let start = Instant::now();
        let channel = BoundedChannel::new(self.channel_capacity);
        let channel = &channel;

        info!(
            "Starting {} searchers over a channel of capacity {}",
            self.searcher_count,
            channel.capacity()
        );

        let (produced, reports) = thread::scope(|scope| -> SearchResult<_> {
            let mut searchers = Vec::with_capacity(self.searcher_count.get());
            for id in 0..self.searcher_count.get() {
                let spawned = thread::Builder::new()
                    .name(format!("searcher-{}", id))
                    .spawn_scoped(scope, move || run_searcher(id, channel, processor, sink));
                match spawned {
                    Ok(handle) => searchers.push(handle),
                    Err(e) => {
                        // Nothing was produced yet; release whoever did start
                        channel.put(WorkItem::EndOfStream);
                        return Err(SearchError::IoError(e));
                    }
                }
            }

            let producer = thread::Builder::new()
                .name("enumerator".to_string())
                .spawn_scoped(scope, move || {
                    // The marker must go out even if the producer panics
                    let produced = panic::catch_unwind(AssertUnwindSafe(|| produce(channel)))
                        .unwrap_or_else(|_| Err(panicked("enumerator")));
                    debug!("Enumerator finished, sending end-of-stream");
                    channel.put(WorkItem::EndOfStream);
                    produced
                });
            let producer = match producer {
                Ok(handle) => handle,
                Err(e) => {
                    channel.put(WorkItem::EndOfStream);
                    return Err(SearchError::IoError(e));
                }
            };

            let produced = producer.join().map_err(|_| panicked("enumerator"))?;
            let reports = searchers
                .into_iter()
                .map(|handle| handle.join().map_err(|_| panicked("searcher")))
                .collect::<SearchResult<Vec<_>>>()?;
            Ok((produced, reports))
        })?;

        // Only the marker may remain, and it must still be there
        let leftover = channel.try_take();
        debug_assert_eq!(leftover, Some(WorkItem::EndOfStream));
        debug_assert!(channel.is_empty());

        let mut summary = StreamSummary {
            searcher_count: reports.len(),
            channel_high_water: channel.high_water_mark(),
            ..StreamSummary::default()
        };
        match produced {
            Ok(count) => summary.files_enumerated = count,
            Err(e) => {
                warn!("Enumeration stopped early: {}", e);
                summary.enumeration_error = Some(e.to_string());
            }
        }
        for report in reports {
            summary.files_scanned += report.files_scanned;
            summary.files_failed += report.files_failed;
            summary.matching_lines += report.matching_lines;
        }
        summary.elapsed = start.elapsed();

        info!(
            "Streaming search complete. {} matching lines in {} files ({} failed)",
            summary.matching_lines, summary.files_scanned, summary.files_failed
        );
        Ok(summary)
    }
}

fn run_searcher(
    id: usize,
    channel: &BoundedChannel<WorkItem>,
    processor: &FileProcessor,
    sink: &dyn MatchSink,
) -> SearcherReport {
    let mut report = SearcherReport::default();
    loop {
        match channel.take() {
            WorkItem::EndOfStream => {
                channel.put(WorkItem::EndOfStream);
                trace!("Searcher {} observed end-of-stream", id);
                return report;
            }
            WorkItem::File(path) => {
                let scanned = panic::catch_unwind(AssertUnwindSafe(|| {
                    processor.for_each_matching_line(&path, |m| sink.report(&m))
                }))
                .unwrap_or_else(|_| Err(panicked("searcher")));
                match scanned {
                    Ok(lines) => {
                        report.files_scanned += 1;
                        report.matching_lines += lines;
                    }
                    Err(e) => {
                        warn!("Skipping {}: {}", path.display(), e);
                        report.files_failed += 1;
                    }
                }
            }
        }
    }
}

fn panicked(role: &str) -> SearchError {
    SearchError::IoError(io::Error::other(format!("{} thread panicked", role)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EncodingMode, MatchMode};
    use crate::search::KeywordMatcher;
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::tempdir;

    fn processor(keyword: &str) -> FileProcessor {
        FileProcessor::new(
            KeywordMatcher::new(keyword, MatchMode::Substring),
            EncodingMode::Lossy,
        )
    }

    fn pool(searchers: usize, capacity: usize) -> SearcherPool {
        SearcherPool::new(
            NonZeroUsize::new(searchers).unwrap(),
            NonZeroUsize::new(capacity).unwrap(),
        )
    }

    fn feed(paths: Vec<PathBuf>) -> impl FnOnce(&BoundedChannel<WorkItem>) -> SearchResult<usize> + Send {
        move |channel| {
            let count = paths.len();
            for path in paths {
                channel.put(WorkItem::File(path));
            }
            Ok(count)
        }
    }

    #[test]
    fn test_reports_every_matching_line() {
        let dir = tempdir().unwrap();
        let mut paths = Vec::new();
        for i in 0..20 {
            let path = dir.path().join(format!("file_{}.txt", i));
            fs::write(&path, format!("line one\nkeyword {}\nline three\nkeyword again\n", i)).unwrap();
            paths.push(path);
        }

        let sink = CollectingSink::new();
        let summary = pool(4, 3).run(feed(paths), &processor("keyword"), &sink).unwrap();

        assert_eq!(summary.files_enumerated, 20);
        assert_eq!(summary.files_scanned, 20);
        assert_eq!(summary.files_failed, 0);
        assert_eq!(summary.matching_lines, 40);
        assert_eq!(summary.searcher_count, 4);
        assert!(summary.channel_high_water <= 3);
        assert!(summary.enumeration_error.is_none());

        let lines = sink.take_lines();
        assert_eq!(lines.len(), 40);
        assert!(lines.iter().all(|m| m.line_content.starts_with("keyword")));
    }

    #[test]
    fn test_missing_file_does_not_stop_pipeline() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.txt");
        fs::write(&good, "keyword\n").unwrap();
        let paths = vec![dir.path().join("missing.txt"), good];

        let sink = CollectingSink::new();
        let summary = pool(1, 1).run(feed(paths), &processor("keyword"), &sink).unwrap();

        assert_eq!(summary.files_failed, 1);
        assert_eq!(summary.files_scanned, 1);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_producer_error_still_terminates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "keyword\n").unwrap();

        let sink = CollectingSink::new();
        let summary = pool(3, 2)
            .run(
                move |channel: &BoundedChannel<WorkItem>| {
                    channel.put(WorkItem::File(path));
                    Err(SearchError::IoError(io::Error::other("walk interrupted")))
                },
                &processor("keyword"),
                &sink,
            )
            .unwrap();

        assert!(summary.enumeration_error.is_some());
        assert_eq!(summary.files_scanned, 1);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_terminates_for_all_sizes() {
        let dir = tempdir().unwrap();
        let mut paths = Vec::new();
        for i in 0..7 {
            let path = dir.path().join(format!("{}.txt", i));
            fs::write(&path, "x\n").unwrap();
            paths.push(path);
        }

        for searchers in [1, 2, 5, 16] {
            for capacity in [1, 2, 10] {
                let paths = paths.clone();
                let (done_tx, done_rx) = crossbeam_channel::bounded(1);
                thread::spawn(move || {
                    let sink = CollectingSink::new();
                    let summary = pool(searchers, capacity)
                        .run(feed(paths), &processor("x"), &sink)
                        .unwrap();
                    let _ = done_tx.send(summary);
                });

                let summary = done_rx
                    .recv_timeout(Duration::from_secs(10))
                    .unwrap_or_else(|_| {
                        panic!("deadlock with {} searchers, capacity {}", searchers, capacity)
                    });
                assert_eq!(summary.searcher_count, searchers);
                assert_eq!(summary.files_scanned, 7);
                assert_eq!(summary.matching_lines, 7);
            }
        }
    }

    /// Panics on lines mentioning "boom" and keeps the rest
    struct PanickingSink(CollectingSink);

    impl MatchSink for PanickingSink {
        fn report(&self, m: &LineMatch) {
            if m.line_content.contains("boom") {
                panic!("sink rejected {}", m);
            }
            self.0.report(m);
        }
    }

    #[test]
    fn test_panic_while_scanning_is_a_file_failure() {
        let dir = tempdir().unwrap();
        let mut paths = Vec::new();
        for i in 0..6 {
            let path = dir.path().join(format!("{}.txt", i));
            let content = if i % 2 == 0 { "keyword boom\n" } else { "keyword fine\n" };
            fs::write(&path, content).unwrap();
            paths.push(path);
        }

        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        thread::spawn(move || {
            let sink = PanickingSink(CollectingSink::new());
            let summary = pool(2, 1)
                .run(feed(paths), &processor("keyword"), &sink)
                .unwrap();
            let _ = done_tx.send((summary, sink.0.len()));
        });

        let (summary, reported) = done_rx
            .recv_timeout(Duration::from_secs(10))
            .unwrap_or_else(|_| panic!("searchers stopped after a panicking file"));
        assert_eq!(summary.files_enumerated, 6);
        assert_eq!(summary.files_failed, 3);
        assert_eq!(summary.files_scanned, 3);
        assert_eq!(summary.matching_lines, 3);
        assert_eq!(reported, 3);
    }

    #[test]
    fn test_empty_input() {
        let sink = CollectingSink::new();
        let summary = pool(8, 1)
            .run(feed(Vec::new()), &processor("x"), &sink)
            .unwrap();
        assert_eq!(summary.files_enumerated, 0);
        assert_eq!(summary.searcher_count, 8);
        assert!(sink.is_empty());
    }
}
