pub mod config;
pub mod enumerator;
pub mod errors;
pub mod filters;
pub mod metrics;
pub mod pipeline;
pub mod results;
pub mod search;
pub mod tasks;

pub use config::{CliOverrides, EncodingMode, MatchMode, SearchConfig, TaskPoolConfig};
pub use enumerator::Enumerator;
pub use errors::{SearchError, SearchResult};
pub use metrics::{RunMetrics, RunStats};
pub use pipeline::{BoundedChannel, CollectingSink, MatchSink, SearcherPool, StdoutSink, WorkItem};
pub use results::{CountSummary, FirstMatch, LineMatch, StreamSummary};
pub use search::SearchEngine;
pub use tasks::{CancellationToken, TaskPool};
