//! Keyword matching, per-file scanning, and the [`SearchEngine`] that ties the
//! enumerator, the streaming pipeline and the task pool together.
//!
//! Matching is literal: a keyword is compared either as a whole
//! whitespace-delimited token or as a plain substring. Files are read line by
//! line so that a scan can stop at the first hit or at a cancellation request
//! without reading the rest of the file.
pub mod engine;
pub mod matcher;
pub mod processor;

pub use engine::SearchEngine;
pub use matcher::KeywordMatcher;
pub use processor::{FileProcessor, ScanOutcome};
