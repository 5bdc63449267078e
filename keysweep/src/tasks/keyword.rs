use std::path::PathBuf;

use super::cancel::CancellationToken;
use crate::errors::SearchResult;
use crate::search::{FileProcessor, ScanOutcome};

/// Counts the keyword in one file
#[derive(Debug, Clone)]
pub struct CountTask {
    processor: FileProcessor,
    path: PathBuf,
}

impl CountTask {
    pub fn new(processor: FileProcessor, path: PathBuf) -> Self {
        Self { processor, path }
    }

    pub fn run(self, cancel: &CancellationToken) -> SearchResult<ScanOutcome<u64>> {
        self.processor.count_occurrences(&self.path, cancel)
    }
}

/// Reports the file's path if it contains the keyword
#[derive(Debug, Clone)]
pub struct SearchTask {
    processor: FileProcessor,
    path: PathBuf,
}

impl SearchTask {
    pub fn new(processor: FileProcessor, path: PathBuf) -> Self {
        Self { processor, path }
    }

    pub fn run(self, cancel: &CancellationToken) -> SearchResult<ScanOutcome<Option<PathBuf>>> {
        let outcome = self.processor.first_matching_line(&self.path, cancel)?;
        Ok(match outcome {
            ScanOutcome::Finished(Some(_)) => ScanOutcome::Finished(Some(self.path)),
            ScanOutcome::Finished(None) => ScanOutcome::Finished(None),
            ScanOutcome::Cancelled => {
                tracing::debug!("Search in {} cancelled", self.path.display());
                ScanOutcome::Cancelled
            }
        })
    }
}
