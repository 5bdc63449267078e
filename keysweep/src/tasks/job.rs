use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

use super::cancel::CancellationToken;
use crate::errors::SearchError;

/// Observable lifecycle of a submitted job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Final result of a job
#[derive(Debug)]
pub enum JobOutcome<T> {
    Completed(T),
    /// The job could not read its file; aggregators treat this as a neutral result
    Failed(SearchError),
    /// The job was cancelled before it started, or stopped early after seeing the flag
    Cancelled,
}

impl<T> JobOutcome<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            _ => None,
        }
    }

    fn state(&self) -> JobState {
        match self {
            Self::Completed(_) => JobState::Completed,
            Self::Failed(_) => JobState::Failed,
            Self::Cancelled => JobState::Cancelled,
        }
    }
}

#[derive(Debug)]
enum SlotState<T> {
    Pending,
    Running,
    Done(JobState, Option<JobOutcome<T>>),
}

/// Shared cell between a running job and its handle
#[derive(Debug)]
pub(crate) struct JobSlot<T> {
    state: Mutex<SlotState<T>>,
    done: Condvar,
}

impl<T> JobSlot<T> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SlotState::Pending),
            done: Condvar::new(),
        })
    }

    /// Moves the job to `Running`. Returns false, leaving the job pending, if
    /// the token was cancelled while it was queued; the caller then settles it
    /// with [`JobOutcome::Cancelled`].
    pub(crate) fn start(&self, token: &CancellationToken) -> bool {
        if token.is_cancelled() {
            return false;
        }
        *self.state.lock() = SlotState::Running;
        true
    }

    pub(crate) fn finish(&self, outcome: JobOutcome<T>) {
        let mut state = self.state.lock();
        *state = SlotState::Done(outcome.state(), Some(outcome));
        drop(state);
        self.done.notify_all();
    }
}

/// Handle to a job submitted to a [`TaskPool`](super::TaskPool).
///
/// Dropping the handle does not stop the job; its result is discarded.
#[derive(Debug)]
pub struct JobHandle<T> {
    slot: Arc<JobSlot<T>>,
    token: CancellationToken,
}

impl<T> JobHandle<T> {
    pub(crate) fn new(slot: Arc<JobSlot<T>>, token: CancellationToken) -> Self {
        Self { slot, token }
    }

    pub fn state(&self) -> JobState {
        match &*self.slot.state.lock() {
            SlotState::Pending => JobState::Pending,
            SlotState::Running => JobState::Running,
            SlotState::Done(state, _) => *state,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(*self.slot.state.lock(), SlotState::Done(..))
    }

    /// Requests cancellation through the job's token, which every job of the
    /// same run shares.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Blocks until the job has finished and returns its outcome.
    pub fn join(self) -> JobOutcome<T> {
        let mut state = self.slot.state.lock();
        loop {
            if let SlotState::Done(_, outcome) = &mut *state {
                if let Some(outcome) = outcome.take() {
                    return outcome;
                }
            }
            self.slot.done.wait(&mut state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_state_transitions() {
        let token = CancellationToken::new();
        let slot = JobSlot::<u32>::new();
        let handle = JobHandle::new(Arc::clone(&slot), token.clone());
        assert_eq!(handle.state(), JobState::Pending);

        assert!(slot.start(&token));
        assert_eq!(handle.state(), JobState::Running);
        assert!(!handle.is_done());

        slot.finish(JobOutcome::Completed(5));
        assert_eq!(handle.state(), JobState::Completed);
        assert!(matches!(handle.join(), JobOutcome::Completed(5)));
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        let slot = JobSlot::<u32>::new();
        let handle = JobHandle::new(Arc::clone(&slot), token.clone());

        handle.cancel();
        assert!(!slot.start(&token));
        assert_eq!(handle.state(), JobState::Pending);
        slot.finish(JobOutcome::Cancelled);
        assert_eq!(handle.state(), JobState::Cancelled);
        assert!(matches!(handle.join(), JobOutcome::Cancelled));
    }

    #[test]
    fn test_join_waits_for_finish() {
        let token = CancellationToken::new();
        let slot = JobSlot::<&str>::new();
        let handle = JobHandle::new(Arc::clone(&slot), token.clone());

        let worker = thread::spawn(move || {
            assert!(slot.start(&token));
            thread::sleep(Duration::from_millis(30));
            slot.finish(JobOutcome::Failed(SearchError::file_not_found("x")));
        });

        assert!(matches!(
            handle.join(),
            JobOutcome::Failed(SearchError::FileNotFound(_))
        ));
        worker.join().unwrap();
    }
}
