use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::ControlFlow;
use std::path::Path;
use tracing::{trace, warn};

use super::matcher::KeywordMatcher;
use crate::config::EncodingMode;
use crate::errors::{SearchError, SearchResult};
use crate::metrics::RunMetrics;
use crate::results::LineMatch;
use crate::tasks::CancellationToken;

const BUFFER_CAPACITY: usize = 65536;

/// How a cancellable scan ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome<T> {
    Finished(T),
    /// The run was cancelled before the file was fully read
    Cancelled,
}

/// Reads files line by line and applies a [`KeywordMatcher`].
///
/// Holds no per-file state, so a single processor can be shared by every
/// worker thread.
#[derive(Debug, Clone)]
pub struct FileProcessor {
    matcher: KeywordMatcher,
    metrics: RunMetrics,
    encoding_mode: EncodingMode,
}

impl FileProcessor {
    pub fn new(matcher: KeywordMatcher, encoding_mode: EncodingMode) -> Self {
        Self::with_metrics(matcher, encoding_mode, RunMetrics::new())
    }

    pub fn with_metrics(
        matcher: KeywordMatcher,
        encoding_mode: EncodingMode,
        metrics: RunMetrics,
    ) -> Self {
        Self {
            matcher,
            metrics,
            encoding_mode,
        }
    }

    /// Gets the metrics updated by this processor
    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    /// Counts every occurrence of the keyword in the file.
    pub fn count_occurrences(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> SearchResult<ScanOutcome<u64>> {
        let mut count = 0u64;
        let stop = self.scan_lines(path, cancel, |_, line| {
            count += self.matcher.count_in_line(line) as u64;
            ControlFlow::Continue(())
        })?;
        Ok(match stop {
            ScanStop::Cancelled => ScanOutcome::Cancelled,
            _ => ScanOutcome::Finished(count),
        })
    }

    /// Finds the first line containing the keyword, reading no further than that line.
    pub fn first_matching_line(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> SearchResult<ScanOutcome<Option<usize>>> {
        let mut found = None;
        let stop = self.scan_lines(path, cancel, |line_number, line| {
            if self.matcher.is_match(line) {
                found = Some(line_number);
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })?;
        Ok(match stop {
            ScanStop::Cancelled => ScanOutcome::Cancelled,
            _ => ScanOutcome::Finished(found),
        })
    }

    /// Calls `report` for every matching line as soon as it is read.
    ///
    /// Returns the number of lines reported. Lines reported before an I/O error
    /// stay reported.
    pub fn for_each_matching_line<F>(&self, path: &Path, mut report: F) -> SearchResult<u64>
    where
        F: FnMut(LineMatch),
    {
        let never = CancellationToken::new();
        let mut reported = 0u64;
        self.scan_lines(path, &never, |line_number, line| {
            if self.matcher.is_match(line) {
                reported += 1;
                report(LineMatch {
                    path: path.to_path_buf(),
                    line_number,
                    line_content: line.to_string(),
                });
            }
            ControlFlow::Continue(())
        })?;
        Ok(reported)
    }


    fn scan_lines<F>(
        &self,
        path: &Path,
        cancel: &CancellationToken,
        mut visit: F,
    ) -> SearchResult<ScanStop>
    where
        F: FnMut(usize, &str) -> ControlFlow<()>,
    {
        trace!("Scanning file: {}", path.display());
        let result = self.read_lines(path, cancel, &mut visit);
        if result.is_err() {
            self.metrics.record_file_failed();
        }
        result
    }

    fn read_lines(
        &self,
        path: &Path,
        cancel: &CancellationToken,
        visit: &mut dyn FnMut(usize, &str) -> ControlFlow<()>,
    ) -> SearchResult<ScanStop> {
        let file = File::open(path).map_err(|e| SearchError::from_io(path, e))?;
        let mut reader = BufReader::with_capacity(BUFFER_CAPACITY, file);
        let mut buffer = Vec::with_capacity(256);
        let mut line_number = 0usize;
        let mut bytes_read = 0u64;
        let mut replaced_invalid = false;

        let stop = loop {
            if cancel.is_cancelled() {
                break ScanStop::Cancelled;
            }

            buffer.clear();
            let read = reader
                .read_until(b'\n', &mut buffer)
                .map_err(|e| SearchError::from_io(path, e))?;
            if read == 0 {
                break ScanStop::Exhausted;
            }
            bytes_read += read as u64;
            line_number += 1;

            let line = match self.encoding_mode {
                EncodingMode::FailFast => Cow::Borrowed(
                    std::str::from_utf8(&buffer)
                        .map_err(|_| SearchError::encoding_error(path, line_number))?,
                ),
                EncodingMode::Lossy => {
                    let decoded = String::from_utf8_lossy(&buffer);
                    if matches!(decoded, Cow::Owned(_)) {
                        replaced_invalid = true;
                    }
                    decoded
                }
            };

            if visit(line_number, trim_line_ending(&line)).is_break() {
                break ScanStop::Stopped;
            }
        };

        if replaced_invalid {
            warn!("Invalid UTF-8 replaced in file: {}", path.display());
        }
        self.metrics
            .record_file_scanned(line_number as u64, bytes_read);
        trace!(
            "Finished {} after {} lines ({:?})",
            path.display(),
            line_number,
            stop
        );
        Ok(stop)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanStop {
    Exhausted,
    Stopped,
    Cancelled,
}

fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
