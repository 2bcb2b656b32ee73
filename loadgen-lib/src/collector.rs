use std::sync::Arc;

use parking_lot::Mutex;

use crate::outcome::RequestOutcome;

/// Append-only log of every completed [`RequestOutcome`] of a run.
///
/// Insertion order is completion order. Cloning the log is cheap
/// and all clones share the same underlying storage: the scheduler
/// appends while the reporter and analyzer only ever read.
#[derive(Debug, Clone, Default)]
pub struct ResultLog(Arc<Mutex<Vec<RequestOutcome>>>);

/// Counts folded over the log under a single lock acquisition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogCounts {
    pub total: usize,
    pub successful: usize,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, outcome: RequestOutcome) {
        self.0.lock().push(outcome);
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    pub fn counts(&self) -> LogCounts {
        let log = self.0.lock();
        LogCounts {
            total: log.len(),
            successful: log.iter().filter(|outcome| outcome.success).count(),
        }
    }

    /// Copy of all outcomes recorded so far.
    pub fn snapshot(&self) -> Vec<RequestOutcome> {
        self.0.lock().clone()
    }
}
