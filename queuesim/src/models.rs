//! Queueing network models.
//!
//! Two systems are provided:
//!
//! * [`mm1`]: a single-server queue with Poisson arrivals and exponential
//!   service times, run for a fixed number of packets,
//! * [`onoff`]: an on-off packet generator feeding a FIFO forwarding stage
//!   and a packet sink, run for a fixed duration.
//!
//! Each run builds its own [`Simulation`](crate::simulation::Simulation), so
//! runs are independent and can be repeated, for instance over a parameter
//! sweep.
//!
//! When enabled in the configuration, model trace lines are emitted as `INFO`
//! events on the [`TRACE_TARGET`] target, with messages of the form
//! `t=<time> [s]: <description>`.

pub mod mm1;
pub mod onoff;

use std::error::Error;
use std::fmt;

use crate::simulation::{ProcessFailure, SchedulingError, Simulation};
use crate::stats::StatsError;
use crate::time::SimTime;

/// Target of the trace events emitted by the models.
pub const TRACE_TARGET: &str = "queuesim::trace";

/// A packet travelling through a queueing network.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Packet {
    creation_time: SimTime,
    size: f64,
}

impl Packet {
    /// Creates a packet.
    pub fn new(creation_time: SimTime, size: f64) -> Self {
        Self {
            creation_time,
            size,
        }
    }

    /// Returns the time at which the packet was generated.
    pub fn creation_time(&self) -> SimTime {
        self.creation_time
    }

    /// Returns the size of the packet in bytes.
    pub fn size(&self) -> f64 {
        self.size
    }
}

/// Checks that a parameter is strictly positive and finite.
pub(crate) fn check_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter { name, value })
    }
}

/// Checks that a parameter is non-negative and finite.
pub(crate) fn check_non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter { name, value })
    }
}

/// Error returned when a model configuration is rejected.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConfigError {
    /// A parameter lies outside of its domain of validity.
    InvalidParameter {
        /// Name of the parameter.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// The processing delay policy yields non-positive delays for the
    /// configured packet size.
    NonPositiveProcessingDelay {
        /// Configured packet size.
        packet_size: f64,
        /// Offset subtracted from the packet size.
        offset: f64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter { name, value } => {
                write!(fmt, "invalid value for parameter '{}': {}", name, value)
            }
            Self::NonPositiveProcessingDelay {
                packet_size,
                offset,
            } => write!(
                fmt,
                "the packet size ({} B) must exceed the processing delay offset ({})",
                packet_size, offset
            ),
        }
    }
}

impl Error for ConfigError {}

/// Error returned by model runners.
#[derive(Debug)]
pub enum SimulationError {
    /// The configuration was rejected before the simulation started.
    Config(ConfigError),
    /// The simulation could not be run to its stop condition.
    Scheduling(SchedulingError),
    /// A process of the model failed.
    ProcessFailed(ProcessFailure),
    /// A statistic of the run is undefined.
    Stats(StatsError),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(fmt, "invalid configuration: {}", e),
            Self::Scheduling(e) => write!(fmt, "simulation could not be run: {}", e),
            Self::ProcessFailed(e) => fmt::Display::fmt(e, fmt),
            Self::Stats(e) => write!(fmt, "undefined statistic: {}", e),
        }
    }
}

impl Error for SimulationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Scheduling(e) => Some(e),
            Self::ProcessFailed(e) => Some(e),
            Self::Stats(e) => Some(e),
        }
    }
}

impl From<ConfigError> for SimulationError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<SchedulingError> for SimulationError {
    fn from(e: SchedulingError) -> Self {
        Self::Scheduling(e)
    }
}

impl From<ProcessFailure> for SimulationError {
    fn from(e: ProcessFailure) -> Self {
        Self::ProcessFailed(e)
    }
}

impl From<StatsError> for SimulationError {
    fn from(e: StatsError) -> Self {
        Self::Stats(e)
    }
}

/// Returns an error if any process of the simulation has failed.
pub(crate) fn check_failures(simu: &mut Simulation) -> Result<(), SimulationError> {
    match simu.take_failures().into_iter().next() {
        Some(failure) => Err(failure.into()),
        None => Ok(()),
    }
}
