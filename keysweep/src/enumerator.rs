use ignore::{DirEntry, WalkBuilder};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, trace, warn};

use crate::config::SearchConfig;
use crate::errors::{SearchError, SearchResult};
use crate::filters::FileFilter;
use crate::pipeline::{BoundedChannel, WorkItem};

/// Walks a directory tree depth-first and yields every regular file.
///
/// No ignore files, hidden-file rules or other walker defaults apply; only the
/// filters from [`SearchConfig`] narrow the set.
#[derive(Debug, Clone)]
pub struct Enumerator {
    root: PathBuf,
    filter: FileFilter,
}

impl Enumerator {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            root: config.root_path.clone(),
            filter: FileFilter::from_config(config),
        }
    }

    /// An enumerator without any filters
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            filter: FileFilter::accept_all(),
        }
    }

    /// Fails with [`SearchError::EnumerationFailure`] unless the root is a
    /// readable directory.
    pub fn validate_root(&self) -> SearchResult<()> {
        fs::read_dir(&self.root)
            .map(|_| ())
            .map_err(|e| SearchError::enumeration_failure(&self.root, e))
    }

    /// Lazily walks the tree.
    ///
    /// Only an unreadable root is an error. Entries that cannot be read further
    /// down are logged and skipped.
    pub fn walk(&self) -> SearchResult<impl Iterator<Item = PathBuf> + '_> {
        self.validate_root()?;
        debug!("Walking directory: {}", self.root.display());

        let walker = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .follow_links(true)
            .build();

        Ok(walker
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(is_regular_file)
            .map(DirEntry::into_path)
            .filter(move |path| self.filter.should_include(path))
            .inspect(|path| trace!("Enumerated {}", path.display())))
    }

    /// Materializes the whole file set
    pub fn collect_files(&self) -> SearchResult<Vec<PathBuf>> {
        let files: Vec<PathBuf> = self.walk()?.collect();
        debug!("Found {} files under {}", files.len(), self.root.display());
        Ok(files)
    }

    /// Puts every file into `channel`, blocking whenever it is full, and
    /// returns how many were put. Does not send the end-of-stream marker.
    pub fn feed(&self, channel: &BoundedChannel<WorkItem>) -> SearchResult<usize> {
        let mut count = 0;
        let mut stalls = 0;
        for path in self.walk()? {
            if let Err(item) = channel.try_put(WorkItem::File(path)) {
                trace!("Channel full after {} files, waiting for a searcher", count);
                stalls += 1;
                channel.put(item);
            }
            count += 1;
        }
        debug!(
            "Enumerated {} files into the channel ({} waits on a full channel)",
            count, stalls
        );
        Ok(count)
    }
}

fn is_regular_file(entry: &DirEntry) -> bool {
    entry.file_type().is_some_and(|ft| ft.is_file())
}
