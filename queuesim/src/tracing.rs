//! Support for structured logging.
//!
//! # Overview
//!
//! The simulation engine emits its diagnostics with the [`tracing`] crate.
//! Each poll of a process is wrapped in a span with the following metadata:
//!
//! - name: `process`,
//! - target: `queuesim::simulation`,
//! - verbosity level: [`Level::INFO`](::tracing::Level::INFO),
//! - a unique field called `name`, associated to the process name provided
//!   when the process was spawned.
//!
//! Within these spans, the engine emits `DEBUG` events when processes are
//! spawned or complete, and `WARN` events when a process fails. When tracing
//! is enabled in their configuration, the queueing models additionally emit
//! `INFO` events on the `queuesim::trace` target, one per packet generation,
//! packet arrival or generator toggle.
//!
//! By default, the [`tracing_subscriber::fmt`][mod@tracing_subscriber::fmt]
//! subscriber stamps events with the wall clock time. This module provides
//! the [`SimulationTime`] timer, which stamps events with the simulation time
//! instead.
//!
//! # Configuration
//!
//! ```
//! use queuesim::tracing::SimulationTime;
//!
//! tracing_subscriber::fmt()
//!     .with_timer(SimulationTime::with_system_timer())
//!     .init();
//! ```
//!
//! The timer reverts to system time stamping for events generated outside of
//! an event dispatch:
//!
//! ```text
//! [4.000000000]  INFO process{name="sink"}: queuesim::trace: t=4.0000E0 [s]: packet arrived with size=1.0000E3 [B]
//! 2024-09-10T14:39:24.670921Z  INFO my_simulation: simulation completed
//! ```
//!
//! # Event filtering examples
//!
//! Model trace lines alone can be selected with the following `RUST_LOG`
//! directive (this requires the `env-filter` feature of
//! [`tracing-subscriber`][tracing_subscriber]):
//!
//! ```text
//! $ RUST_LOG="queuesim::trace=info" cargo run --example onoff_pipeline
//! ```
//!
//! while the lifecycle of a single process can be followed with:
//!
//! ```text
//! $ RUST_LOG="[process{name=packet-42}]=debug" cargo run --example mm1_sweep
//! ```

use std::fmt;

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};

use crate::simulation::current_time;

/// A timer that can be used in conjunction with the
/// [`tracing-subscriber`][tracing_subscriber] crate to log events using the
/// simulation time instead of (or on top of) the wall clock time.
///
/// See the [module-level documentation][crate::tracing] for more details.
#[derive(Default, Debug)]
pub struct SimulationTime<const VERBOSE: bool, T> {
    sys_timer: T,
}

impl SimulationTime<false, SystemTime> {
    /// Constructs a new simulation timer which falls back to the [`SystemTime`]
    /// timer for events generated outside of an event dispatch.
    pub fn with_system_timer() -> Self {
        Self::default()
    }
}

impl SimulationTime<true, SystemTime> {
    /// Constructs a new simulation timer which prepends a [`SystemTime`]
    /// timestamp to all tracing events, as well as a simulation timestamp for
    /// events generated during an event dispatch.
    pub fn with_system_timer_always() -> Self {
        Self::default()
    }
}

impl<T: FormatTime> SimulationTime<false, T> {
    /// Constructs a new simulation timer which falls back to the provided
    /// timer for tracing events generated outside of an event dispatch.
    pub fn with_custom_timer(sys_timer: T) -> Self {
        Self { sys_timer }
    }
}

impl<T: FormatTime> SimulationTime<true, T> {
    /// Constructs a new simulation timer which prepends a timestamp generated
    /// with the provided timer to all tracing events, as well as a simulation
    /// timestamp for events generated during an event dispatch.
    pub fn with_custom_timer_always(sys_timer: T) -> Self {
        Self { sys_timer }
    }
}

impl<const VERBOSE: bool, T: FormatTime> FormatTime for SimulationTime<VERBOSE, T> {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        match current_time() {
            Some(time) => {
                if VERBOSE {
                    self.sys_timer.format_time(w)?;
                    w.write_char(' ')?;
                }
                write!(w, "[{:.9}]", time.as_secs())
            }
            None => self.sys_timer.format_time(w),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::simulation::{SchedulingError, Simulation};

    fn stamp<T: FormatTime>(timer: &T) -> String {
        let mut buffer = String::new();
        timer.format_time(&mut Writer::new(&mut buffer)).unwrap();

        buffer
    }

    #[test]
    fn simulation_time_during_dispatch() {
        let timer = Rc::new(SimulationTime::with_custom_timer(()));
        let stamps = Rc::new(RefCell::new(Vec::new()));

        let mut simu = Simulation::new();
        let (scheduler, process_timer, process_stamps) =
            (simu.scheduler(), timer.clone(), stamps.clone());
        simu.spawn("stamper", async move {
            scheduler.timeout(1.5)?.await;
            process_stamps.borrow_mut().push(stamp(&*process_timer));

            Ok::<(), SchedulingError>(())
        });
        simu.run();

        assert_eq!(*stamps.borrow(), vec!["[1.500000000]".to_string()]);
        assert_eq!(stamp(&*timer), "");
    }
}
