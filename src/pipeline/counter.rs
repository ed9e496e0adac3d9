//! Pending-work counter for a pipeline whose total work grows while it runs.
//!
//! Every queued directory or file carries a [`WorkUnit`]. Taking a unit increments the
//! counter; dropping it decrements. A scanner takes units for the children it discovers before
//! dropping its own, so the count only reaches zero once nothing is queued or in flight.
//! The terminator blocks in [`WorkCounter::wait_until_idle`], which also closes the counter so
//! late registrations are refused instead of racing a finished pipeline.

use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct CounterState {
    pending: usize,
    closed: bool,
}

#[derive(Debug, Default)]
pub struct WorkCounter {
    state: Mutex<CounterState>,
    idle: Condvar,
}

impl WorkCounter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, CounterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register one unit of work. `None` once the counter has closed.
    pub fn try_begin(self: &Arc<Self>) -> Option<WorkUnit> {
        let mut state = self.lock();
        if state.closed {
            return None;
        }
        state.pending += 1;
        Some(WorkUnit {
            counter: Arc::clone(self),
        })
    }

    fn finish(&self) {
        let mut state = self.lock();
        state.pending -= 1;
        if state.pending == 0 {
            self.idle.notify_all();
        }
    }

    pub fn pending(&self) -> usize {
        self.lock().pending
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Block until no work is pending, then close the counter.
    pub fn wait_until_idle(&self) {
        let guard = self.lock();
        let mut state = self
            .idle
            .wait_while(guard, |s| s.pending > 0)
            .unwrap_or_else(PoisonError::into_inner);
        state.closed = true;
    }
}

/// One outstanding obligation. Completes when dropped, on every exit path.
#[derive(Debug)]
pub struct WorkUnit {
    counter: Arc<WorkCounter>,
}

impl Drop for WorkUnit {
    fn drop(&mut self) {
        self.counter.finish();
    }
}

/// A queued directory or file together with the unit of work it represents.
#[derive(Debug)]
pub struct PendingPath {
    pub path: PathBuf,
    pub unit: WorkUnit,
}
