//! Streaming search: one enumerator thread feeds a [`BoundedChannel`] that a
//! fixed set of searcher threads drain.
//!
//! ```text
//! ┌────────────┐  put   ┌────────────────┐  take   ┌──────────────┐
//! │ Enumerator │───────▶│ BoundedChannel │────────▶│ Searcher × N │──▶ MatchSink
//! └────────────┘        │  (capacity C)  │◀────────└──────────────┘
//!                       └────────────────┘ re-put EndOfStream
//! ```
//!
//! # Shutdown
//!
//! When the enumerator is done, successfully or not, exactly one
//! [`WorkItem::EndOfStream`] is put into the channel. A searcher that takes it
//! puts it straight back and exits, so every other searcher eventually takes
//! it too. The marker is a separate variant rather than a magic path, so it can
//! never be mistaken for a file.
pub mod channel;
pub mod searcher;

pub use channel::BoundedChannel;
pub use searcher::{CollectingSink, MatchSink, SearcherPool, StdoutSink};

use std::path::PathBuf;

/// An item travelling through the streaming channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    File(PathBuf),
    /// Termination marker, re-inserted by every searcher that sees it
    EndOfStream,
}
