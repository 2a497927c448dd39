//! Discrete-event simulation management.
//!
//! This module contains most notably the [`Simulation`] executor and the
//! [`Scheduler`] handle given to processes.
//!
//! # Processes
//!
//! A process is an `async` body returning `Result<(), E>`. It runs
//! cooperatively: once polled, it executes without interruption until it
//! reaches a suspension point, which can be
//!
//! * a [`Timeout`] obtained from [`Scheduler::timeout()`],
//! * a [`Resource::acquire()`](crate::resource::Resource::acquire) request
//!   that cannot be granted immediately,
//! * a [`Channel::get()`](crate::channel::Channel::get) on an empty channel.
//!
//! Suspended processes are resumed through their `Waker`: a timeout registers
//! the waker with the scheduler for a future time, while resources and
//! channels store it and wake it when the process can make progress. Wake-ups
//! that occur while a process runs are converted to events scheduled at the
//! current time.
//!
//! # Event ordering
//!
//! Events are ordered by scheduled time and, for equal times, by scheduling
//! order. Each call to [`Simulation::step()`] dispatches exactly one event and
//! resumes exactly one process, so that a simulation is fully deterministic.
//!
//! # Process failures
//!
//! A process that returns an error is dropped and its failure is recorded as
//! a [`ProcessFailure`]. Other processes are not affected.
//!
//! # Examples
//!
//! A producer and a consumer exchanging a message.
//!
//! ```
//! use queuesim::channel::Channel;
//! use queuesim::simulation::{SchedulingError, Simulation};
//!
//! let mut simu = Simulation::new();
//! let scheduler = simu.scheduler();
//! let channel = Channel::new();
//!
//! let tx = channel.clone();
//! let producer = async move {
//!     scheduler.timeout(2.0)?.await;
//!     tx.put("hello");
//!
//!     Ok::<(), SchedulingError>(())
//! };
//!
//! let consumer = async move {
//!     assert_eq!(channel.get().await, "hello");
//!
//!     Ok::<(), SchedulingError>(())
//! };
//!
//! simu.spawn("producer", producer);
//! simu.spawn("consumer", consumer);
//! simu.run();
//!
//! assert_eq!(simu.time().as_secs(), 2.0);
//! assert_eq!(simu.active_processes(), 0);
//! ```
mod process;
mod scheduler;

pub use process::ProcessFailure;
pub use scheduler::{Scheduler, SchedulingError, Timeout};

use std::cell::Cell;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::mem;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use slab::Slab;
use tracing::{debug, info_span, warn};

use crate::time::SimTime;

use process::{process_waker, take_ready, Process, ProcessFuture, ReadyList, WakeToken};
use scheduler::{into_process_future, SchedulerInner};

thread_local! {
    /// Simulation time of the event being processed on this thread, if any.
    static SIMULATION_TIME: Cell<Option<SimTime>> = const { Cell::new(None) };
}

/// Returns the time of the event being processed on this thread, if any.
#[cfg_attr(not(feature = "tracing-timer"), allow(dead_code))]
pub(crate) fn current_time() -> Option<SimTime> {
    SIMULATION_TIME.with(|time| time.get())
}

/// Sets the thread-local simulation time until dropped.
struct TimeContext {
    previous: Option<SimTime>,
}

impl TimeContext {
    fn enter(time: SimTime) -> Self {
        let previous = SIMULATION_TIME.with(|t| t.replace(Some(time)));

        Self { previous }
    }
}

impl Drop for TimeContext {
    fn drop(&mut self) {
        SIMULATION_TIME.with(|t| t.set(self.previous));
    }
}

/// Simulation environment.
///
/// A `Simulation` owns the virtual clock, the set of pending events and all
/// processes. It advances virtual time by jumping from one event to the next:
/// see [`step()`](Simulation::step), [`run()`](Simulation::run),
/// [`run_until()`](Simulation::run_until) and
/// [`run_while()`](Simulation::run_while).
///
/// A simulation has no global state, so any number of independent
/// simulations can be created in sequence, e.g. one per point of a parameter
/// sweep.
pub struct Simulation {
    inner: Rc<SchedulerInner>,
    processes: Slab<Process>,
    ready: ReadyList,
    failures: Vec<ProcessFailure>,
    next_process_id: u64,
}

impl Simulation {
    /// Creates a new simulation at time zero.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SchedulerInner::new()),
            processes: Slab::new(),
            ready: Arc::new(Mutex::new(Vec::new())),
            failures: Vec::new(),
            next_process_id: 0,
        }
    }

    /// Returns a handle to the scheduler of this simulation.
    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(self.inner.clone())
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> SimTime {
        self.inner.time.get()
    }

    /// Spawns a new process.
    ///
    /// The process is first polled by an event scheduled at the current time.
    /// The `name` argument needs not be unique and is used for logging
    /// purposes only.
    pub fn spawn<F, E>(&mut self, name: impl Into<String>, process: F)
    where
        F: Future<Output = Result<(), E>> + 'static,
        E: Into<Box<dyn Error>> + 'static,
    {
        self.admit(name.into(), into_process_future(process));
    }

    /// Dispatches the next event, if any.
    ///
    /// Simulation time is advanced to the time of the event and the process
    /// attached to it is resumed until it suspends or completes. The new
    /// simulation time is returned, or `None` if no event was pending.
    pub fn step(&mut self) -> Option<SimTime> {
        self.flush();

        let (time, waker) = self.inner.queue.borrow_mut().pull()?;
        self.inner.time.set(time);
        let _time_context = TimeContext::enter(time);

        waker.wake();
        for token in take_ready(&self.ready) {
            self.poll_process(token);
        }
        self.flush();

        Some(time)
    }

    /// Dispatches events until none remains.
    ///
    /// Processes that never terminate, such as infinite generators, will make
    /// this method loop forever: use [`run_until()`](Simulation::run_until)
    /// instead.
    pub fn run(&mut self) {
        while self.step().is_some() {}
    }

    /// Dispatches all events scheduled strictly before `deadline` and sets the
    /// simulation time to `deadline`.
    ///
    /// Events scheduled at or after the deadline are left pending; they are
    /// discarded if the simulation is dropped.
    ///
    /// An error is returned if the deadline is not finite or lies in the past.
    pub fn run_until(&mut self, deadline: f64) -> Result<(), SchedulingError> {
        let target = SimTime::new(deadline)
            .filter(|&target| target >= self.time())
            .ok_or(SchedulingError::InvalidScheduledTime(deadline))?;

        loop {
            self.flush();
            match self.next_event_time() {
                Some(time) if time < target => {
                    self.step();
                }
                _ => break,
            }
        }
        self.inner.time.set(target);

        debug!(
            time = target.as_secs(),
            pending_events = self.pending_events(),
            "simulation stopped at deadline"
        );

        Ok(())
    }

    /// Dispatches events as long as the predicate holds and events remain.
    ///
    /// The predicate is evaluated before each event, which makes it possible
    /// to stop on a count-based condition.
    pub fn run_while(&mut self, mut predicate: impl FnMut(&Self) -> bool) {
        while predicate(self) {
            if self.step().is_none() {
                break;
            }
        }
    }

    /// Returns the time of the next pending event, if any.
    pub fn next_event_time(&self) -> Option<SimTime> {
        self.inner.queue.borrow().peek_key().copied()
    }

    /// Returns the number of pending events.
    pub fn pending_events(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Returns the number of processes that have not completed yet.
    pub fn active_processes(&self) -> usize {
        self.processes.len() + self.inner.spawned.borrow().len()
    }

    /// Returns the failures recorded so far.
    pub fn failures(&self) -> &[ProcessFailure] {
        &self.failures
    }

    /// Removes and returns the failures recorded so far.
    pub fn take_failures(&mut self) -> Vec<ProcessFailure> {
        mem::take(&mut self.failures)
    }

    /// Admits a new process and schedules its first poll at the current time.
    fn admit(&mut self, name: String, future: ProcessFuture) {
        let id = self.next_process_id;
        self.next_process_id += 1;

        let entry = self.processes.vacant_entry();
        let waker = process_waker(
            WakeToken {
                slot: entry.key(),
                id,
            },
            self.ready.clone(),
        );
        self.inner
            .queue
            .borrow_mut()
            .insert(self.inner.time.get(), waker.clone());

        debug!(process = %name, id, "process spawned");

        entry.insert(Process {
            id,
            name,
            future,
            waker,
        });
    }

    /// Schedules at the current time all processes woken outside of an event
    /// dispatch, and admits all processes spawned by other processes.
    fn flush(&mut self) {
        let now = self.inner.time.get();
        let mut tokens = take_ready(&self.ready);
        // A process woken several times needs to be resumed only once.
        let mut idx = 0;
        while idx < tokens.len() {
            if tokens[..idx].contains(&tokens[idx]) {
                tokens.remove(idx);
            } else {
                idx += 1;
            }
        }
        for token in tokens {
            if let Some(process) = self.processes.get(token.slot) {
                if process.id == token.id {
                    self.inner
                        .queue
                        .borrow_mut()
                        .insert(now, process.waker.clone());
                }
            }
        }

        let spawned = mem::take(&mut *self.inner.spawned.borrow_mut());
        for pending in spawned {
            self.admit(pending.name, pending.future);
        }
    }

    /// Polls a process, discarding stale tokens.
    fn poll_process(&mut self, token: WakeToken) {
        let now = self.inner.time.get();
        let process = match self.processes.get_mut(token.slot) {
            Some(process) if process.id == token.id => process,
            _ => return,
        };

        let span = info_span!("process", name = %process.name);
        let _enter = span.enter();

        let waker = process.waker.clone();
        let mut cx = Context::from_waker(&waker);
        if let Poll::Ready(result) = process.future.as_mut().poll(&mut cx) {
            let process = self.processes.remove(token.slot);
            match result {
                Ok(()) => debug!(time = now.as_secs(), "process completed"),
                Err(error) => {
                    warn!(time = now.as_secs(), %error, "process failed");
                    self.failures
                        .push(ProcessFailure::new(process.name, now, error));
                }
            }
        }
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        // Drop processes first: releasing their resources may wake other
        // processes, which only pushes tokens to the ready list.
        self.processes.clear();
        let spawned = mem::take(&mut *self.inner.spawned.borrow_mut());
        drop(spawned);
        self.inner.queue.borrow_mut().clear();
    }
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("time", &self.time())
            .field("pending_events", &self.pending_events())
            .field("active_processes", &self.active_processes())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    /// Increments a counter, then waits for one period, forever.
    async fn count_forever(
        scheduler: Scheduler,
        counter: Rc<Cell<u32>>,
        period: f64,
    ) -> Result<(), SchedulingError> {
        loop {
            counter.set(counter.get() + 1);
            scheduler.timeout(period)?.await;
        }
    }

    #[test]
    fn step_dispatches_one_event_at_a_time() {
        let mut simu = Simulation::new();
        let scheduler = simu.scheduler();

        simu.spawn("sleeper", async move {
            scheduler.timeout(1.5)?.await;
            scheduler.timeout(0.5)?.await;

            Ok::<(), SchedulingError>(())
        });

        assert_eq!(simu.pending_events(), 1);
        assert_eq!(simu.step(), Some(SimTime::ZERO));
        assert_eq!(simu.next_event_time(), SimTime::new(1.5));
        assert_eq!(simu.step(), SimTime::new(1.5));
        assert_eq!(simu.step(), SimTime::new(2.0));
        assert_eq!(simu.active_processes(), 0);
        assert_eq!(simu.step(), None);
    }

    #[test]
    fn equal_time_events_follow_scheduling_order() {
        let mut simu = Simulation::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for id in 0..5 {
            let scheduler = simu.scheduler();
            let log = log.clone();
            simu.spawn(format!("p{}", id), async move {
                scheduler.timeout(1.0)?.await;
                log.borrow_mut().push(id);

                Ok::<(), SchedulingError>(())
            });
        }
        simu.run();

        assert_eq!(*log.borrow(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn zero_timeout_yields_to_other_processes() {
        let mut simu = Simulation::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let (scheduler, log_a) = (simu.scheduler(), log.clone());
        simu.spawn("a", async move {
            log_a.borrow_mut().push("a0");
            scheduler.timeout(0.0)?.await;
            log_a.borrow_mut().push("a1");

            Ok::<(), SchedulingError>(())
        });
        let log_b = log.clone();
        simu.spawn("b", async move {
            log_b.borrow_mut().push("b0");

            Ok::<(), SchedulingError>(())
        });
        simu.run();

        assert_eq!(*log.borrow(), vec!["a0", "b0", "a1"]);
        assert_eq!(simu.time(), SimTime::ZERO);
    }

    #[test]
    fn negative_delay_fails_only_the_offending_process() {
        let mut simu = Simulation::new();

        let scheduler = simu.scheduler();
        simu.spawn("faulty", async move {
            scheduler.timeout(-1.0)?.await;

            Ok::<(), SchedulingError>(())
        });
        let scheduler = simu.scheduler();
        simu.spawn("healthy", async move {
            scheduler.timeout(3.0)?.await;

            Ok::<(), SchedulingError>(())
        });
        simu.run();

        assert_eq!(simu.time(), SimTime::new(3.0).unwrap());
        let failures = simu.take_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].name(), "faulty");
        assert_eq!(failures[0].time(), SimTime::ZERO);
        assert!(failures[0].to_string().contains("invalid delay"));
        assert!(simu.failures().is_empty());
    }

    #[test]
    fn run_until_leaves_later_events_pending() {
        let mut simu = Simulation::new();
        let count = Rc::new(Cell::new(0));
        simu.spawn("periodic", count_forever(simu.scheduler(), count.clone(), 1.0));

        simu.run_until(3.0).unwrap();

        // Polled at t=0, 1 and 2; the event at t=3 is not dispatched.
        assert_eq!(count.get(), 3);
        assert_eq!(simu.time(), SimTime::new(3.0).unwrap());
        assert_eq!(simu.pending_events(), 1);
        assert_eq!(
            simu.run_until(1.0),
            Err(SchedulingError::InvalidScheduledTime(1.0))
        );
        assert!(simu.run_until(f64::NAN).is_err());
    }

    #[test]
    fn run_while_stops_on_predicate() {
        let mut simu = Simulation::new();
        let count = Rc::new(Cell::new(0));
        simu.spawn("counter", count_forever(simu.scheduler(), count.clone(), 0.25));

        simu.run_while(|_| count.get() < 8);

        // The counter is incremented at t=0, 0.25, ..., 1.75.
        assert_eq!(count.get(), 8);
        assert_eq!(simu.time(), SimTime::new(1.75).unwrap());
    }

    #[test]
    fn processes_spawned_by_processes_start_at_current_time() {
        let mut simu = Simulation::new();
        let starts = Rc::new(RefCell::new(Vec::new()));

        let (scheduler, starts_clone) = (simu.scheduler(), starts.clone());
        simu.spawn("source", async move {
            for _ in 0..3 {
                let (child_scheduler, starts) = (scheduler.clone(), starts_clone.clone());
                scheduler.spawn("child", async move {
                    starts.borrow_mut().push(child_scheduler.time().as_secs());

                    Ok::<(), SchedulingError>(())
                });
                scheduler.timeout(2.0)?.await;
            }

            Ok::<(), SchedulingError>(())
        });
        simu.run();

        assert_eq!(*starts.borrow(), vec![0.0, 2.0, 4.0]);
        assert_eq!(simu.time(), SimTime::new(6.0).unwrap());
    }
}
