//! Scheduling handle and timeout future.

use std::cell::{Cell, RefCell};
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::time::SimTime;
use crate::util::priority_queue::PriorityQueue;

use super::process::{PendingProcess, ProcessFuture};

/// Shorthand for the scheduler queue type.
///
/// Each entry is a one-shot wake-up: once pulled, the waker of the process
/// that registered it is invoked and the entry is gone.
pub(crate) type SchedulerQueue = PriorityQueue<SimTime, Waker>;

/// State shared between a `Simulation` and all its `Scheduler` handles.
pub(crate) struct SchedulerInner {
    /// Current simulation time.
    pub(crate) time: Cell<SimTime>,
    /// Pending wake-ups ordered by (time, sequence id).
    pub(crate) queue: RefCell<SchedulerQueue>,
    /// Processes spawned from within other processes, not yet admitted by the
    /// executor.
    pub(crate) spawned: RefCell<Vec<PendingProcess>>,
}

impl SchedulerInner {
    pub(crate) fn new() -> Self {
        Self {
            time: Cell::new(SimTime::ZERO),
            queue: RefCell::new(PriorityQueue::new()),
            spawned: RefCell::new(Vec::new()),
        }
    }
}

/// A handle to the event scheduler of a simulation.
///
/// A `Scheduler` is cheap to clone and is typically moved into each process
/// body so that it can read the simulation time, suspend itself for some time
/// with [`timeout()`](Scheduler::timeout) or spawn other processes.
///
/// # Examples
///
/// A process that ticks three times, once per second.
///
/// ```
/// use queuesim::simulation::{Scheduler, SchedulingError, Simulation};
///
/// async fn ticker(scheduler: Scheduler) -> Result<(), SchedulingError> {
///     for tick in 0..3 {
///         scheduler.timeout(1.0)?.await;
///         println!("tick {} at t={}", tick, scheduler.time());
///     }
///
///     Ok(())
/// }
///
/// let mut simu = Simulation::new();
/// simu.spawn("ticker", ticker(simu.scheduler()));
/// simu.run();
///
/// assert_eq!(simu.time().as_secs(), 3.0);
/// ```
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

impl Scheduler {
    pub(crate) fn new(inner: Rc<SchedulerInner>) -> Self {
        Self { inner }
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> SimTime {
        self.inner.time.get()
    }

    /// Returns a future that completes once the simulation time has advanced
    /// by `delay` seconds.
    ///
    /// The awaiting process always yields, even for a null delay: it is then
    /// resumed after all other processes already scheduled for the current
    /// time.
    ///
    /// An error is returned and nothing is scheduled if the delay is negative
    /// or not finite.
    pub fn timeout(&self, delay: f64) -> Result<Timeout, SchedulingError> {
        let deadline = self
            .time()
            .checked_add(delay)
            .ok_or(SchedulingError::InvalidDelay(delay))?;

        Ok(Timeout {
            inner: self.inner.clone(),
            deadline,
            is_registered: false,
        })
    }

    /// Spawns a new process.
    ///
    /// The process is first polled by an event scheduled at the current time,
    /// after the spawning process has yielded.
    ///
    /// The `name` argument needs not be unique and is used for logging
    /// purposes only.
    pub fn spawn<F, E>(&self, name: impl Into<String>, process: F)
    where
        F: Future<Output = Result<(), E>> + 'static,
        E: Into<Box<dyn Error>> + 'static,
    {
        self.inner.spawned.borrow_mut().push(PendingProcess {
            name: name.into(),
            future: into_process_future(process),
        });
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("time", &self.time())
            .finish_non_exhaustive()
    }
}

/// Boxes a process body, erasing its error type.
pub(crate) fn into_process_future<F, E>(process: F) -> ProcessFuture
where
    F: Future<Output = Result<(), E>> + 'static,
    E: Into<Box<dyn Error>> + 'static,
{
    Box::pin(async move { process.await.map_err(Into::into) })
}

/// Future returned by [`Scheduler::timeout()`].
///
/// The wake-up is registered with the scheduler the first time the future is
/// polled, using the waker of the polling process.
pub struct Timeout {
    inner: Rc<SchedulerInner>,
    deadline: SimTime,
    is_registered: bool,
}

impl Timeout {
    /// Returns the simulation time at which the timeout expires.
    pub fn deadline(&self) -> SimTime {
        self.deadline
    }
}

impl Future for Timeout {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();

        if !this.is_registered {
            this.inner
                .queue
                .borrow_mut()
                .insert(this.deadline, cx.waker().clone());
            this.is_registered = true;

            return Poll::Pending;
        }

        // Spurious polls are possible when the process was woken for another
        // reason, so the deadline must be checked.
        if this.inner.time.get() >= this.deadline {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

impl fmt::Debug for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeout")
            .field("deadline", &self.deadline)
            .field("is_registered", &self.is_registered)
            .finish_non_exhaustive()
    }
}

/// Error returned when a scheduling request is invalid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SchedulingError {
    /// The requested delay is negative or not finite.
    InvalidDelay(f64),
    /// The requested time lies in the past of the current simulation time or
    /// is not a valid timestamp.
    InvalidScheduledTime(f64),
}

impl fmt::Display for SchedulingError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDelay(delay) => {
                write!(fmt, "invalid delay: {} (delays must be finite and non-negative)", delay)
            }
            Self::InvalidScheduledTime(time) => write!(
                fmt,
                "invalid scheduled time: {} (it must be finite and not lie in the past)",
                time
            ),
        }
    }
}

impl Error for SchedulingError {}
