//! On-off generator feeding a FIFO stage and a sink.
//!
//! The pipeline is made of three stages connected by unbounded channels:
//!
//! ```text
//! ┌────────────────┐        ┌────────────┐        ┌────────────┐
//! │ OnOffGenerator ├───────►│ FifoQueue  ├───────►│ PacketSink │
//! └────────────────┘ Packet └────────────┘ Packet └────────────┘
//! ```
//!
//! While ON, the generator emits fixed-size packets spaced by a fixed
//! inter-arrival time. While OFF, a toggling process holds the generation
//! permission gate so that no packet can be emitted. The FIFO stage holds
//! each packet for a processing delay given by a [`ProcessingDelay`] policy
//! and the sink records the end-to-end delay of each packet.
//!
//! # Examples
//!
//! ```
//! use queuesim::models::onoff::{OnOffConfig, ProcessingDelay};
//!
//! let report = OnOffConfig::default()
//!     .with_processing_delay(ProcessingDelay::Constant(0.05))
//!     .with_trace(false)
//!     .run()
//!     .unwrap();
//!
//! assert!(report.packets_received() > 0);
//! assert!((report.mean_waiting_time().unwrap() - 0.05).abs() < 1e-9);
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::info;

use crate::channel::Channel;
use crate::random::{ExpSampler, Exponential};
use crate::resource::Resource;
use crate::simulation::{Scheduler, SchedulingError, Simulation};
use crate::stats::{self, StatsError};

use super::{
    check_failures, check_non_negative, check_positive, ConfigError, Packet, SimulationError,
    TRACE_TARGET,
};

/// Policy determining how long the FIFO stage holds each packet.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProcessingDelay {
    /// Packets are forwarded without delay.
    #[default]
    None,
    /// Every packet is held for the same delay [s].
    Constant(f64),
    /// A packet of size `s` is held for `s − offset` seconds.
    ///
    /// The packet size must exceed the offset.
    SizeOffset {
        /// Offset subtracted from the packet size.
        offset: f64,
    },
    /// A packet is held for its transmission time over a link.
    LinkRate {
        /// Link rate [B/s].
        bytes_per_second: f64,
    },
    /// Delays are exponentially distributed, drawn from the seeded random
    /// number generator of the run.
    Exponential {
        /// Mean delay [s].
        mean: f64,
    },
}

impl ProcessingDelay {
    /// Checks that the policy yields valid delays for packets of the
    /// specified size.
    pub fn validate(&self, packet_size: f64) -> Result<(), ConfigError> {
        match *self {
            Self::None => Ok(()),
            Self::Constant(delay) => check_non_negative("processing_delay", delay),
            Self::SizeOffset { offset } => {
                check_non_negative("offset", offset)?;
                if packet_size > offset {
                    Ok(())
                } else {
                    Err(ConfigError::NonPositiveProcessingDelay {
                        packet_size,
                        offset,
                    })
                }
            }
            Self::LinkRate { bytes_per_second } => {
                check_positive("bytes_per_second", bytes_per_second)
            }
            Self::Exponential { mean } => check_positive("mean_processing_delay", mean),
        }
    }
}

/// Configuration of an on-off pipeline run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OnOffConfig {
    /// Packet size [B].
    pub packet_size: f64,
    /// Packet inter-arrival time while ON [s].
    pub packet_interarrival_time: f64,
    /// Duration of ON periods [s].
    pub on_period: f64,
    /// Duration of OFF periods [s].
    pub off_period: f64,
    /// Simulated duration [s].
    pub simulation_duration: f64,
    /// Seed of the random number generator.
    pub seed: u64,
    /// Emit trace lines for generations, arrivals and toggles.
    pub trace: bool,
    /// Processing delay policy of the FIFO stage.
    pub processing_delay: ProcessingDelay,
}

impl OnOffConfig {
    /// Sets the packet size.
    pub fn with_packet_size(mut self, packet_size: f64) -> Self {
        self.packet_size = packet_size;
        self
    }

    /// Sets the packet inter-arrival time.
    pub fn with_packet_interarrival_time(mut self, packet_interarrival_time: f64) -> Self {
        self.packet_interarrival_time = packet_interarrival_time;
        self
    }

    /// Sets the duration of ON periods.
    pub fn with_on_period(mut self, on_period: f64) -> Self {
        self.on_period = on_period;
        self
    }

    /// Sets the duration of OFF periods.
    pub fn with_off_period(mut self, off_period: f64) -> Self {
        self.off_period = off_period;
        self
    }

    /// Sets the simulated duration.
    pub fn with_simulation_duration(mut self, simulation_duration: f64) -> Self {
        self.simulation_duration = simulation_duration;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enables or disables trace lines.
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Sets the processing delay policy.
    pub fn with_processing_delay(mut self, processing_delay: ProcessingDelay) -> Self {
        self.processing_delay = processing_delay;
        self
    }

    /// Checks the configuration.
    ///
    /// The inter-arrival time and the ON period must be strictly positive so
    /// that the generator makes progress; the OFF period may be zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("packet_size", self.packet_size)?;
        check_positive("packet_interarrival_time", self.packet_interarrival_time)?;
        check_positive("on_period", self.on_period)?;
        check_non_negative("off_period", self.off_period)?;
        check_non_negative("simulation_duration", self.simulation_duration)?;
        self.processing_delay.validate(self.packet_size)
    }

    /// Runs a simulation with this configuration.
    pub fn run(&self) -> Result<OnOffReport, SimulationError> {
        run_simulation(self)
    }
}

impl Default for OnOffConfig {
    fn default() -> Self {
        Self {
            packet_size: 1000.0,
            packet_interarrival_time: 0.1,
            on_period: 1.0,
            off_period: 1.0,
            simulation_duration: 10.0,
            seed: 1234,
            trace: true,
            processing_delay: ProcessingDelay::None,
        }
    }
}

/// Results of an on-off pipeline run.
#[derive(Clone, Debug)]
pub struct OnOffReport {
    waiting_times: Vec<f64>,
    packets_generated: u64,
    bytes_received: f64,
    duration: f64,
}

impl OnOffReport {
    /// Returns the sample mean of the end-to-end packet delays.
    ///
    /// This is an error if no packet reached the sink.
    pub fn mean_waiting_time(&self) -> Result<f64, StatsError> {
        stats::mean(&self.waiting_times)
    }

    /// Returns the end-to-end delay of each packet, in arrival order.
    pub fn waiting_times(&self) -> &[f64] {
        &self.waiting_times
    }

    /// Returns the number of packets emitted by the generator.
    pub fn packets_generated(&self) -> u64 {
        self.packets_generated
    }

    /// Returns the number of packets that reached the sink.
    pub fn packets_received(&self) -> usize {
        self.waiting_times.len()
    }

    /// Returns the number of bytes that reached the sink.
    pub fn bytes_received(&self) -> f64 {
        self.bytes_received
    }

    /// Returns the throughput at the sink over the simulated duration [B/s].
    pub fn throughput(&self) -> Result<f64, StatsError> {
        if self.duration > 0.0 {
            Ok(self.bytes_received / self.duration)
        } else {
            Err(StatsError::NoElapsedTime)
        }
    }
}

/// Runs an on-off pipeline simulation for the configured duration.
///
/// Packets still in flight at the end of the run are not accounted for.
pub fn run_simulation(config: &OnOffConfig) -> Result<OnOffReport, SimulationError> {
    config.validate()?;

    let mut simu = Simulation::new();
    let to_queue = Channel::new();
    let to_sink = Channel::new();

    let generator = Rc::new(OnOffGenerator::new(config, to_queue.clone()));
    let queue = FifoQueue::new(
        to_queue,
        to_sink.clone(),
        DelayModel::new(config.processing_delay, config.seed)?,
    );
    let sink = Rc::new(PacketSink::new(to_sink, config.trace));

    simu.spawn("generator", generator.clone().generate(simu.scheduler()));
    simu.spawn("toggle", generator.clone().toggle(simu.scheduler()));
    simu.spawn("queue", queue.run(simu.scheduler()));
    simu.spawn("sink", sink.clone().run(simu.scheduler()));

    simu.run_until(config.simulation_duration)?;
    check_failures(&mut simu)?;
    drop(simu);

    Ok(OnOffReport {
        waiting_times: sink.waiting_times.take(),
        packets_generated: generator.packets_generated.get(),
        bytes_received: sink.bytes_received.get(),
        duration: config.simulation_duration,
    })
}

/// Packet generator alternating between ON and OFF periods.
struct OnOffGenerator {
    packet_size: f64,
    packet_interarrival_time: f64,
    on_period: f64,
    off_period: f64,
    trace: bool,
    permission: Resource,
    out: Channel<Packet>,
    packets_generated: Cell<u64>,
}

impl OnOffGenerator {
    fn new(config: &OnOffConfig, out: Channel<Packet>) -> Self {
        Self {
            packet_size: config.packet_size,
            packet_interarrival_time: config.packet_interarrival_time,
            on_period: config.on_period,
            off_period: config.off_period,
            trace: config.trace,
            permission: Resource::new(),
            out,
            packets_generated: Cell::new(0),
        }
    }

    /// Emits packets whenever the permission gate is free.
    async fn generate(self: Rc<Self>, scheduler: Scheduler) -> Result<(), SchedulingError> {
        loop {
            {
                let _permission = self.permission.acquire().await;
                let now = scheduler.time();
                self.out.put(Packet::new(now, self.packet_size));
                self.packets_generated.set(self.packets_generated.get() + 1);
                if self.trace {
                    info!(
                        target: TRACE_TARGET,
                        "t={:.4E} [s]: packet generated with size={:.4E} [B]",
                        now.as_secs(),
                        self.packet_size
                    );
                }
            }
            scheduler.timeout(self.packet_interarrival_time)?.await;
        }
    }

    /// Toggles between ON and OFF, starting ON.
    async fn toggle(self: Rc<Self>, scheduler: Scheduler) -> Result<(), SchedulingError> {
        loop {
            if self.trace {
                info!(target: TRACE_TARGET, "t={:.4E} [s]: OFF->ON", scheduler.time().as_secs());
            }
            scheduler.timeout(self.on_period)?.await;

            if self.trace {
                info!(target: TRACE_TARGET, "t={:.4E} [s]: ON->OFF", scheduler.time().as_secs());
            }
            let _permission = self.permission.acquire().await;
            scheduler.timeout(self.off_period)?.await;
        }
    }
}

/// Source of processing delays.
enum DelayModel {
    Fixed(f64),
    SizeOffset(f64),
    LinkRate(f64),
    Random {
        sampler: ExpSampler,
        distribution: Exponential,
    },
}

impl DelayModel {
    fn new(policy: ProcessingDelay, seed: u64) -> Result<Self, ConfigError> {
        Ok(match policy {
            ProcessingDelay::None => Self::Fixed(0.0),
            ProcessingDelay::Constant(delay) => Self::Fixed(delay),
            ProcessingDelay::SizeOffset { offset } => Self::SizeOffset(offset),
            ProcessingDelay::LinkRate { bytes_per_second } => Self::LinkRate(bytes_per_second),
            ProcessingDelay::Exponential { mean } => Self::Random {
                sampler: ExpSampler::new(seed),
                distribution: Exponential::with_mean(mean).ok_or(
                    ConfigError::InvalidParameter {
                        name: "mean_processing_delay",
                        value: mean,
                    },
                )?,
            },
        })
    }

    fn delay(&mut self, packet: &Packet) -> f64 {
        match self {
            Self::Fixed(delay) => *delay,
            Self::SizeOffset(offset) => packet.size() - *offset,
            Self::LinkRate(bytes_per_second) => packet.size() / *bytes_per_second,
            Self::Random {
                sampler,
                distribution,
            } => sampler.draw(distribution),
        }
    }
}

/// Pass-through stage holding each packet for a processing delay.
struct FifoQueue {
    input: Channel<Packet>,
    output: Channel<Packet>,
    delay: DelayModel,
}

impl FifoQueue {
    fn new(input: Channel<Packet>, output: Channel<Packet>, delay: DelayModel) -> Self {
        Self {
            input,
            output,
            delay,
        }
    }

    async fn run(mut self, scheduler: Scheduler) -> Result<(), SchedulingError> {
        loop {
            let packet = self.input.get().await;
            let delay = self.delay.delay(&packet);
            scheduler.timeout(delay)?.await;
            self.output.put(packet);
        }
    }
}

/// Terminal stage recording end-to-end delays.
struct PacketSink {
    input: Channel<Packet>,
    trace: bool,
    waiting_times: RefCell<Vec<f64>>,
    bytes_received: Cell<f64>,
}

impl PacketSink {
    fn new(input: Channel<Packet>, trace: bool) -> Self {
        Self {
            input,
            trace,
            waiting_times: RefCell::new(Vec::new()),
            bytes_received: Cell::new(0.0),
        }
    }

    async fn run(self: Rc<Self>, scheduler: Scheduler) -> Result<(), SchedulingError> {
        loop {
            let packet = self.input.get().await;
            let now = scheduler.time();
            self.waiting_times
                .borrow_mut()
                .push(now - packet.creation_time());
            self.bytes_received
                .set(self.bytes_received.get() + packet.size());
            if self.trace {
                info!(
                    target: TRACE_TARGET,
                    "t={:.4E} [s]: packet arrived with size={:.4E} [B]",
                    now.as_secs(),
                    packet.size()
                );
            }
        }
    }
}
