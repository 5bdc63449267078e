//! Batch search: one task per file, executed on a reusable [`TaskPool`].
//!
//! Two aggregation strategies sit on top of the pool:
//!
//! 1. **Wait for all** ([`TaskPool::invoke_all`]): every job runs to
//!    completion and the caller folds the outcomes, e.g. summing counts.
//! 2. **First success wins** ([`TaskPool::invoke_any`]): the first job that
//!    finds something is returned, the shared [`CancellationToken`] is
//!    cancelled, and everything else is discarded.
//!
//! Cancellation is cooperative. Queued jobs are skipped; running jobs stop at
//! their next line boundary.
pub mod cancel;
pub mod job;
pub mod keyword;
pub mod pool;

pub use cancel::CancellationToken;
pub use job::{JobHandle, JobOutcome, JobState};
pub use keyword::{CountTask, SearchTask};
pub use pool::TaskPool;
