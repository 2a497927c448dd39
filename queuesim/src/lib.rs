//! Discrete-event simulation of queueing networks.
//!
//! Queuesim simulates an M/M/1 single-server queue and an on-off packet
//! generator feeding a FIFO stage and a sink, in order to measure time-averaged
//! performance statistics such as the mean waiting time, the mean queue length
//! or the throughput under varying load.
//!
//! Under the hood is a small, single-threaded discrete-event engine in which
//! simulated activities are plain `async` bodies called *processes*. Virtual
//! time advances by jumping from one scheduled event to the next, and a
//! process only gives control back to the engine at well-defined suspension
//! points.
//!
//! # A practical overview
//!
//! ## The engine
//!
//! A [`Simulation`](simulation::Simulation) owns the virtual clock, the
//! pending events and the processes. Processes receive a
//! [`Scheduler`](simulation::Scheduler) handle to read the time, to suspend
//! themselves with [`timeout()`](simulation::Scheduler::timeout) and to spawn
//! other processes.
//!
//! Two primitives let processes interact:
//!
//! * a [`Resource`](resource::Resource) grants at most a fixed number of
//!   concurrent holders and queues other requesters in FIFO order,
//! * a [`Channel`](channel::Channel) is an unbounded FIFO mailbox whose
//!   receivers suspend until a message is available.
//!
//! ```
//! use queuesim::resource::Resource;
//! use queuesim::simulation::{Scheduler, SchedulingError, Simulation};
//! use queuesim::stats::OccupancyAccumulator;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! // A customer arriving at `arrival`, served for `service` seconds.
//! async fn customer(
//!     scheduler: Scheduler,
//!     desk: Resource,
//!     occupancy: Rc<RefCell<OccupancyAccumulator>>,
//!     arrival: f64,
//!     service: f64,
//! ) -> Result<(), SchedulingError> {
//!     scheduler.timeout(arrival)?.await;
//!     occupancy.borrow_mut().arrival(scheduler.time());
//!
//!     let _desk = desk.acquire().await;
//!     scheduler.timeout(service)?.await;
//!     occupancy.borrow_mut().departure(scheduler.time());
//!
//!     Ok(())
//! }
//!
//! let mut simu = Simulation::new();
//! let desk = Resource::new();
//! let occupancy = Rc::new(RefCell::new(OccupancyAccumulator::new(simu.time())));
//!
//! for (arrival, service) in [(0.0, 3.0), (1.0, 1.0), (2.0, 1.0)] {
//!     let process = customer(simu.scheduler(), desk.clone(), occupancy.clone(), arrival, service);
//!     simu.spawn("customer", process);
//! }
//! simu.run();
//!
//! // The desk is busy from t=0 to t=5; one customer waits over [1, 2), two
//! // over [2, 3) and one over [3, 4).
//! assert_eq!(simu.time().as_secs(), 5.0);
//! assert_eq!(occupancy.borrow().weighted_sum(), 4.0);
//! ```
//!
//! ## The models
//!
//! The [`models`] module composes these primitives into the two simulated
//! systems, each driven by a configuration struct with defaults and
//! validation:
//!
//! ```
//! use queuesim::models::mm1::Mm1Config;
//!
//! let report = Mm1Config::default()
//!     .with_mean_interarrival_time(2.0)
//!     .with_packet_count(2000)
//!     .with_trace(false)
//!     .run()
//!     .unwrap();
//!
//! println!(
//!     "mean waiting time: {:.4} s (direct), {:.4} s (Little's law)",
//!     report.mean_waiting_time().unwrap(),
//!     report.littles_law_waiting_time().unwrap(),
//! );
//! ```
//!
//! The [`sweep`] module repeats M/M/1 runs over a range of arrival rates and
//! [`theory`] provides closed-form results to compare against.
//!
//! # Determinism
//!
//! Events scheduled for the same time are dispatched in scheduling order, and
//! all random variates are drawn from a seeded generator (see [`random`]). A
//! simulation run is thus fully reproducible for a given configuration.
//!
//! # Logging
//!
//! The engine and the models log with the [`tracing`](::tracing) crate. The
//! models can emit human-readable trace lines for packet generations, arrivals
//! and on-off toggles. When the `tracing-timer` feature is enabled, a timer stamping
//! log lines with the simulation time is provided in the `tracing` module.
//!
//! # Feature flags
//!
//! * `tracing-timer`: provides the `tracing` module and its simulation-time
//!   timer,
//! * `serde`: derives `Serialize` and `Deserialize` for configuration types.
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod channel;
pub mod models;
pub mod random;
pub mod resource;
pub mod simulation;
pub mod stats;
pub mod sweep;
pub mod theory;
pub mod time;
#[cfg(feature = "tracing-timer")]
pub mod tracing;
pub(crate) mod util;
