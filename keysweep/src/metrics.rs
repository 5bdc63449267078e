use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Counters shared by every worker of a run.
///
/// Cloning is cheap and every clone updates the same counters.
#[derive(Debug, Clone)]
pub struct RunMetrics {
    files_scanned: Arc<AtomicU64>,
    files_failed: Arc<AtomicU64>,
    lines_scanned: Arc<AtomicU64>,
    bytes_read: Arc<AtomicU64>,

    tasks_cancelled: Arc<AtomicU64>,
    active_tasks: Arc<AtomicU64>,
    peak_active_tasks: Arc<AtomicU64>,
}

impl RunMetrics {
    /// Creates a new RunMetrics instance
    pub fn new() -> Self {
        Self {
            files_scanned: Arc::new(AtomicU64::new(0)),
            files_failed: Arc::new(AtomicU64::new(0)),
            lines_scanned: Arc::new(AtomicU64::new(0)),
            bytes_read: Arc::new(AtomicU64::new(0)),
            tasks_cancelled: Arc::new(AtomicU64::new(0)),
            active_tasks: Arc::new(AtomicU64::new(0)),
            peak_active_tasks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records a file that was read to the end or until the scan stopped early
    pub fn record_file_scanned(&self, lines: u64, bytes: u64) {
        self.files_scanned.fetch_add(1, Ordering::Relaxed);
        self.lines_scanned.fetch_add(lines, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Records a file that could not be read
    pub fn record_file_failed(&self) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a task that stopped because its run was cancelled
    pub fn record_task_cancelled(&self) {
        self.tasks_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Marks a task as running and updates the peak
    pub fn task_started(&self) {
        let active = self.active_tasks.fetch_add(1, Ordering::Relaxed) + 1;
        let mut peak = self.peak_active_tasks.load(Ordering::Relaxed);
        while active > peak {
            match self.peak_active_tasks.compare_exchange_weak(
                peak,
                active,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => peak = current,
            }
        }
    }

    /// Marks a running task as finished
    pub fn task_finished(&self) {
        self.active_tasks.fetch_sub(1, Ordering::Relaxed);
    }

    /// Gets a snapshot of the counters
    pub fn get_stats(&self) -> RunStats {
        RunStats {
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            lines_scanned: self.lines_scanned.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            tasks_cancelled: self.tasks_cancelled.load(Ordering::Relaxed),
            largest_pool_size: self.peak_active_tasks.load(Ordering::Relaxed),
        }
    }

    /// Logs the current counters
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Run stats:\n\
             Files scanned/failed: {}/{}\n\
             Lines scanned: {}\n\
             Bytes read: {}\n\
             Tasks cancelled: {}\n\
             Largest pool size: {}",
            stats.files_scanned,
            stats.files_failed,
            stats.lines_scanned,
            stats.bytes_read,
            stats.tasks_cancelled,
            stats.largest_pool_size
        );
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of [`RunMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct RunStats {
    pub files_scanned: u64,
    pub files_failed: u64,
    pub lines_scanned: u64,
    pub bytes_read: u64,
    pub tasks_cancelled: u64,
    /// Largest number of tasks observed running at the same time
    pub largest_pool_size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_tracking() {
        let metrics = RunMetrics::new();

        metrics.record_file_scanned(10, 200);
        metrics.record_file_scanned(5, 50);
        metrics.record_file_failed();

        let stats = metrics.get_stats();
        assert_eq!(stats.files_scanned, 2);
        assert_eq!(stats.files_failed, 1);
        assert_eq!(stats.lines_scanned, 15);
        assert_eq!(stats.bytes_read, 250);
    }

    #[test]
    fn test_peak_active_tasks() {
        let metrics = RunMetrics::new();

        metrics.task_started();
        metrics.task_started();
        metrics.task_started();
        metrics.task_finished();
        metrics.task_started();
        metrics.task_finished();
        metrics.task_finished();
        metrics.task_finished();

        let stats = metrics.get_stats();
        assert_eq!(stats.largest_pool_size, 3); // Peak should remain unchanged
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = RunMetrics::new();
        let clone = metrics.clone();

        clone.record_task_cancelled();
        clone.record_file_failed();

        let stats = metrics.get_stats();
        assert_eq!(stats.tasks_cancelled, 1);
        assert_eq!(stats.files_failed, 1);
    }
}
