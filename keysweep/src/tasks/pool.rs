use crossbeam_channel::{unbounded, Sender};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, trace};

use super::cancel::CancellationToken;
use super::job::{JobHandle, JobOutcome, JobSlot};
use crate::config::TaskPoolConfig;
use crate::errors::{SearchError, SearchResult};
use crate::metrics::RunMetrics;
use crate::search::ScanOutcome;

/// Worker threads that execute independent jobs.
///
/// The threads are created once, in [`TaskPool::new`], and reused by every
/// batch submitted afterwards. Each job receives the run's
/// [`CancellationToken`]; a job still queued when the token is cancelled never
/// runs, and a running job is expected to check the token itself.
pub struct TaskPool {
    pool: rayon::ThreadPool,
    metrics: RunMetrics,
}

impl TaskPool {
    pub fn new(config: TaskPoolConfig) -> SearchResult<Self> {
        Self::with_metrics(config, RunMetrics::new())
    }

    pub fn with_metrics(config: TaskPoolConfig, metrics: RunMetrics) -> SearchResult<Self> {
        let prefix = config.thread_name_prefix.clone();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.max_threads.get())
            .thread_name(move |i| format!("{}-{}", prefix, i))
            .build()
            .map_err(|e| SearchError::config_error(format!("cannot build task pool: {}", e)))?;
        debug!("Task pool ready with {} threads", pool.current_num_threads());
        Ok(Self { pool, metrics })
    }

    /// Number of worker threads
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    /// Submits one job and returns immediately.
    pub fn submit<T, F>(&self, token: &CancellationToken, job: F) -> JobHandle<T>
    where
        F: FnOnce(&CancellationToken) -> SearchResult<ScanOutcome<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.spawn_job(token, job, None)
    }

    /// Runs every job and waits for all of them. Outcomes are returned in
    /// submission order.
    pub fn invoke_all<T, F>(&self, token: &CancellationToken, jobs: Vec<F>) -> Vec<JobOutcome<T>>
    where
        F: FnOnce(&CancellationToken) -> SearchResult<ScanOutcome<T>> + Send + 'static,
        T: Send + 'static,
    {
        debug!("Invoking {} jobs and waiting for all", jobs.len());
        let handles: Vec<_> = jobs
            .into_iter()
            .map(|job| self.submit(token, job))
            .collect();
        handles.into_iter().map(JobHandle::join).collect()
    }

    /// Runs every job and returns the first successful value.
    ///
    /// A job succeeds when it completes with `Some`. As soon as one does, `token`
    /// is cancelled and the outcomes of all other jobs are discarded without
    /// waiting for them. Returns `None` only after every job has finished.
    pub fn invoke_any<T, F>(&self, token: &CancellationToken, jobs: Vec<F>) -> Option<T>
    where
        F: FnOnce(&CancellationToken) -> SearchResult<ScanOutcome<Option<T>>> + Send + 'static,
        T: Send + 'static,
    {
        let total = jobs.len();
        debug!("Invoking {} jobs and waiting for the first success", total);
        let (done_tx, done_rx) = unbounded();
        let mut handles: Vec<Option<JobHandle<Option<T>>>> = jobs
            .into_iter()
            .enumerate()
            .map(|(index, job)| Some(self.spawn_job(token, job, Some((index, done_tx.clone())))))
            .collect();
        drop(done_tx);

        for finished in 1..=total {
            let Ok(index) = done_rx.recv() else {
                break;
            };
            let Some(handle) = handles.get_mut(index).and_then(Option::take) else {
                continue;
            };
            if let JobOutcome::Completed(Some(value)) = handle.join() {
                trace!("Job {} won after {} of {} finished", index, finished, total);
                token.cancel();
                return Some(value);
            }
        }
        None
    }

    fn spawn_job<T, F>(
        &self,
        token: &CancellationToken,
        job: F,
        notify: Option<(usize, Sender<usize>)>,
    ) -> JobHandle<T>
    where
        F: FnOnce(&CancellationToken) -> SearchResult<ScanOutcome<T>> + Send + 'static,
        T: Send + 'static,
    {
        let slot = JobSlot::new();
        let handle = JobHandle::new(slot.clone(), token.clone());
        let token = token.clone();
        let metrics = self.metrics.clone();

        self.pool.spawn(move || {
            if !slot.start(&token) {
                metrics.record_task_cancelled();
                slot.finish(JobOutcome::Cancelled);
            } else {
                metrics.task_started();
                let outcome = match panic::catch_unwind(AssertUnwindSafe(|| job(&token))) {
                    Ok(Ok(ScanOutcome::Finished(value))) => JobOutcome::Completed(value),
                    Ok(Ok(ScanOutcome::Cancelled)) => JobOutcome::Cancelled,
                    Ok(Err(e)) => JobOutcome::Failed(e),
                    Err(_) => JobOutcome::Failed(SearchError::IoError(io::Error::other(
                        "task panicked",
                    ))),
                };
                if matches!(outcome, JobOutcome::Cancelled) {
                    metrics.record_task_cancelled();
                }
                metrics.task_finished();
                slot.finish(outcome);
            }
            if let Some((index, done)) = notify {
                // The receiver is gone once a winner was chosen
                let _ = done.send(index);
            }
        });
        handle
    }
}
