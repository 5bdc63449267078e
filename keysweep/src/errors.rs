//! Error types for keysweep.
//!
//! Errors fall into two groups that are handled very differently:
//!
//! 1. **Per-file failures** (`FileNotFound`, `PermissionDenied`, `IoError`,
//!    `EncodingError`). These are recoverable. Workers catch them at the task or
//!    searcher boundary, log them, and treat the file as contributing nothing:
//!    a count of zero or no match.
//! 2. **Run-level failures** (`EnumerationFailure`, `ConfigError`,
//!    `InvalidKeyword`). These abort the run before any worker is started and
//!    propagate to the caller.
//!
//! ```rust,ignore
//! match engine.count_occurrences(&config) {
//!     Ok(summary) => println!("{}", summary.total),
//!     Err(SearchError::EnumerationFailure { path, .. }) => // bad root,
//!     Err(e) => // config or keyword problem,
//! }
//! ```
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Cannot enumerate {path}: {source}")]
    EnumerationFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid keyword: {0}")]
    InvalidKeyword(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Invalid UTF-8 in file {path} at line {line}")]
    EncodingError { path: PathBuf, line: usize },
}

impl SearchError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn enumeration_failure(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::EnumerationFailure {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_keyword(msg: impl Into<String>) -> Self {
        Self::InvalidKeyword(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn encoding_error(path: impl Into<PathBuf>, line: usize) -> Self {
        Self::EncodingError {
            path: path.into(),
            line,
        }
    }

    /// Classifies an I/O error raised while opening or reading `path`.
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::file_not_found(path),
            io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::IoError(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let path = Path::new("test.txt");
        let err = SearchError::file_not_found(path);
        assert!(matches!(err, SearchError::FileNotFound(_)));

        let err = SearchError::permission_denied(path);
        assert!(matches!(err, SearchError::PermissionDenied(_)));

        let err = SearchError::invalid_keyword("empty");
        assert!(matches!(err, SearchError::InvalidKeyword(_)));

        let err = SearchError::enumeration_failure(
            path,
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, SearchError::EnumerationFailure { .. }));
    }

    #[test]
    fn test_from_io_classification() {
        let path = Path::new("a.txt");
        let err = SearchError::from_io(path, io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, SearchError::FileNotFound(_)));

        let err = SearchError::from_io(path, io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, SearchError::PermissionDenied(_)));

        let err = SearchError::from_io(path, io::Error::from(io::ErrorKind::InvalidData));
        assert!(matches!(err, SearchError::IoError(_)));
    }

    #[test]
    fn test_error_messages() {
        let err = SearchError::config_error("Missing required field");
        assert_eq!(err.to_string(), "Configuration error: Missing required field");

        let err = SearchError::file_not_found("test.txt");
        assert_eq!(err.to_string(), "File not found: test.txt");

        let err = SearchError::encoding_error("bin.dat", 7);
        assert_eq!(err.to_string(), "Invalid UTF-8 in file bin.dat at line 7");
    }
}
