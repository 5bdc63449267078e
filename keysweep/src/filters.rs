//! Path filters applied by the enumerator.
//!
//! Nothing is filtered unless the configuration asks for it: by default every
//! regular file under the root is searched.
use glob::Pattern;
use std::path::Path;

use crate::config::SearchConfig;

// Common binary file extensions
const BINARY_EXTENSIONS: &[&str] = &[
    "exe", "dll", "so", "dylib", "bin", "obj", "o", "class", "jar", "war", "ear", "png", "jpg",
    "jpeg", "gif", "bmp", "ico", "pdf", "doc", "docx", "xls", "xlsx", "zip", "tar", "gz", "7z",
    "rar",
];

/// Compiled form of the filter settings in [`SearchConfig`].
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    extensions: Option<Vec<String>>,
    ignore: Vec<Pattern>,
    skip_binary: bool,
}

impl FileFilter {
    /// Builds a filter from the configuration. Invalid glob patterns are dropped;
    /// [`SearchConfig::validate`] reports them before a run starts.
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            extensions: config.file_extensions.clone(),
            ignore: config
                .ignore_patterns
                .iter()
                .filter_map(|p| Pattern::new(p).ok())
                .collect(),
            skip_binary: config.skip_binary,
        }
    }

    /// A filter that accepts every file
    pub fn accept_all() -> Self {
        Self::default()
    }

    /// Determines if a file should be searched
    pub fn should_include(&self, path: &Path) -> bool {
        !(self.skip_binary && is_likely_binary(path))
            && has_valid_extension(path, &self.extensions)
            && !self.should_ignore(path)
    }

    fn should_ignore(&self, path: &Path) -> bool {
        if self.ignore.is_empty() {
            return false;
        }
        let normalized = path.to_string_lossy().replace('\\', "/");
        self.ignore.iter().any(|p| p.matches(&normalized))
    }
}

/// Checks if a file should be included in the search based on its extension
pub fn has_valid_extension(path: &Path, extensions: &Option<Vec<String>>) -> bool {
    match extensions {
        None => true,
        Some(exts) => path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| exts.iter().any(|e| e.eq_ignore_ascii_case(ext))),
    }
}

/// Checks if a file is likely to be binary
pub fn is_likely_binary(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            BINARY_EXTENSIONS
                .iter()
                .any(|bin_ext| bin_ext.eq_ignore_ascii_case(ext))
        })
}
