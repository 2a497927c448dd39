//! Process bookkeeping for the executor.

use std::error::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::Waker;

use futures_task::ArcWake;

use crate::time::SimTime;

/// A type-erased process body.
pub(crate) type ProcessFuture = Pin<Box<dyn Future<Output = Result<(), Box<dyn Error>>>>>;

/// Identifies one process incarnation.
///
/// Slab slots are recycled, so the slot index is complemented by a unique
/// process ID to discard stale wake-ups targeting a completed process.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct WakeToken {
    pub(crate) slot: usize,
    pub(crate) id: u64,
}

/// List of processes woken since the last time it was drained.
pub(crate) type ReadyList = Arc<Mutex<Vec<WakeToken>>>;

/// Appends a token to the ready list.
pub(crate) fn push_ready(ready: &ReadyList, token: WakeToken) {
    ready
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(token);
}

/// Drains the ready list.
pub(crate) fn take_ready(ready: &ReadyList) -> Vec<WakeToken> {
    std::mem::take(&mut *ready.lock().unwrap_or_else(PoisonError::into_inner))
}

/// The waker shared by all suspension points of a single process.
struct ProcessWaker {
    token: WakeToken,
    ready: ReadyList,
}

impl ArcWake for ProcessWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        push_ready(&arc_self.ready, arc_self.token);
    }
}

/// Creates the waker of a process.
pub(crate) fn process_waker(token: WakeToken, ready: ReadyList) -> Waker {
    futures_task::waker(Arc::new(ProcessWaker { token, ready }))
}

/// A process spawned from within another process, waiting for admission.
pub(crate) struct PendingProcess {
    pub(crate) name: String,
    pub(crate) future: ProcessFuture,
}

/// A process admitted by the executor.
pub(crate) struct Process {
    pub(crate) id: u64,
    pub(crate) name: String,
    pub(crate) future: ProcessFuture,
    pub(crate) waker: Waker,
}

/// Record of a process that terminated with an error.
///
/// A failure only terminates the offending process: the simulation keeps
/// running the others.
#[derive(Debug)]
pub struct ProcessFailure {
    name: String,
    time: SimTime,
    error: Box<dyn Error>,
}

impl ProcessFailure {
    pub(crate) fn new(name: String, time: SimTime, error: Box<dyn Error>) -> Self {
        Self { name, time, error }
    }

    /// Returns the name of the failed process.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the simulation time at which the process failed.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Returns the error returned by the process.
    pub fn error(&self) -> &(dyn Error + 'static) {
        self.error.as_ref()
    }
}

impl fmt::Display for ProcessFailure {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            fmt,
            "process '{}' failed at t={}: {}",
            self.name, self.time, self.error
        )
    }
}

impl Error for ProcessFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.error.as_ref())
    }
}
