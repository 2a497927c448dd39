//! M/M/1 queue.
//!
//! A source process generates a fixed number of packets with exponentially
//! distributed inter-arrival times. Each packet is a process which queues for
//! a single server, holds it for an exponentially distributed service time
//! and leaves.
//!
//! Two independent estimates of the mean waiting time are produced: the
//! sample mean of per-packet waits, and the time-averaged number of waiting
//! packets divided by the arrival rate (Little's law).
//!
//! # Examples
//!
//! ```
//! use queuesim::models::mm1::Mm1Config;
//!
//! let report = Mm1Config::default()
//!     .with_mean_interarrival_time(2.0)
//!     .with_packet_count(500)
//!     .with_trace(false)
//!     .run()
//!     .unwrap();
//!
//! assert_eq!(report.packets_served(), 500);
//! assert!(report.mean_waiting_time().unwrap() >= 0.0);
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use tracing::info;

use crate::random::{ExpSampler, Exponential};
use crate::resource::Resource;
use crate::simulation::{Scheduler, SchedulingError, Simulation};
use crate::stats::{self, OccupancyAccumulator, StatsError};
use crate::theory;
use crate::time::SimTime;

use super::{check_failures, check_positive, ConfigError, SimulationError, TRACE_TARGET};

/// Configuration of an M/M/1 run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mm1Config {
    /// Mean packet inter-arrival time [s].
    pub mean_interarrival_time: f64,
    /// Mean packet service time [s].
    pub mean_service_time: f64,
    /// Number of packets to generate.
    pub packet_count: usize,
    /// Seed of the random number generator.
    pub seed: u64,
    /// Emit trace lines for packet arrivals and departures.
    pub trace: bool,
}

impl Mm1Config {
    /// Sets the mean packet inter-arrival time.
    pub fn with_mean_interarrival_time(mut self, mean_interarrival_time: f64) -> Self {
        self.mean_interarrival_time = mean_interarrival_time;
        self
    }

    /// Sets the mean packet service time.
    pub fn with_mean_service_time(mut self, mean_service_time: f64) -> Self {
        self.mean_service_time = mean_service_time;
        self
    }

    /// Sets the number of packets.
    pub fn with_packet_count(mut self, packet_count: usize) -> Self {
        self.packet_count = packet_count;
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

    /// Checks that both means are strictly positive and finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("mean_interarrival_time", self.mean_interarrival_time)?;
        check_positive("mean_service_time", self.mean_service_time)
    }

    /// Returns the packet arrival rate.
    pub fn arrival_rate(&self) -> f64 {
        1.0 / self.mean_interarrival_time
    }

    /// Returns the service rate.
    pub fn service_rate(&self) -> f64 {
        1.0 / self.mean_service_time
    }

    /// Returns the mean waiting time predicted by queueing theory, or `None`
    /// if the system is unstable.
    pub fn theoretical_waiting_time(&self) -> Option<f64> {
        theory::mm1_mean_waiting_time(self.arrival_rate(), self.service_rate())
    }

    /// Runs a simulation with this configuration.
    pub fn run(&self) -> Result<Mm1Report, SimulationError> {
        run_simulation(self)
    }
}

impl Default for Mm1Config {
    fn default() -> Self {
        Self {
            mean_interarrival_time: 1.0,
            mean_service_time: 1.0,
            packet_count: 1000,
            seed: 1234,
            trace: true,
        }
    }
}

/// Observations shared by all packet processes.
#[derive(Default)]
struct Observations {
    waiting_times: Vec<f64>,
    service_times: Vec<f64>,
    occupancy: OccupancyAccumulator,
}

/// Results of an M/M/1 run.
#[derive(Clone, Debug)]
pub struct Mm1Report {
    arrival_rate: f64,
    waiting_times: Vec<f64>,
    service_times: Vec<f64>,
    occupancy: OccupancyAccumulator,
    end_time: SimTime,
}

impl Mm1Report {
    /// Returns the sample mean of the packet waiting times.
    ///
    /// This is an error if no packet was generated.
    pub fn mean_waiting_time(&self) -> Result<f64, StatsError> {
        stats::mean(&self.waiting_times)
    }

    /// Returns the mean waiting time derived from the average queue length
    /// with Little's law.
    pub fn littles_law_waiting_time(&self) -> Result<f64, StatsError> {
        stats::littles_law_wait(self.average_queue_length()?, self.arrival_rate)
    }

    /// Returns the time-averaged number of waiting packets.
    pub fn average_queue_length(&self) -> Result<f64, StatsError> {
        self.occupancy.average()
    }

    /// Returns the sample mean of the service times.
    pub fn mean_service_time(&self) -> Result<f64, StatsError> {
        stats::mean(&self.service_times)
    }

    /// Returns the number of packets served per second of observed time.
    pub fn throughput(&self) -> Result<f64, StatsError> {
        let elapsed = self.occupancy.elapsed();
        if elapsed > 0.0 {
            Ok(self.service_times.len() as f64 / elapsed)
        } else {
            Err(StatsError::NoElapsedTime)
        }
    }

    /// Returns the fraction of observed time during which the server was busy.
    pub fn utilization(&self) -> Result<f64, StatsError> {
        self.occupancy.utilization()
    }

    /// Returns the number of packets that completed service.
    pub fn packets_served(&self) -> usize {
        self.service_times.len()
    }

    /// Returns the waiting time of each packet, in service order.
    pub fn waiting_times(&self) -> &[f64] {
        &self.waiting_times
    }

    /// Returns the service time of each packet, in service order.
    pub fn service_times(&self) -> &[f64] {
        &self.service_times
    }

    /// Returns the occupancy accumulator of the queue.
    pub fn occupancy(&self) -> &OccupancyAccumulator {
        &self.occupancy
    }

    /// Returns the simulation time at which the run ended.
    pub fn end_time(&self) -> SimTime {
        self.end_time
    }
}

/// Runs an M/M/1 simulation until all packets have been served.
pub fn run_simulation(config: &Mm1Config) -> Result<Mm1Report, SimulationError> {
    config.validate()?;
    let interarrival = Exponential::with_mean(config.mean_interarrival_time).ok_or(
        ConfigError::InvalidParameter {
            name: "mean_interarrival_time",
            value: config.mean_interarrival_time,
        },
    )?;
    let service = Exponential::with_mean(config.mean_service_time).ok_or(
        ConfigError::InvalidParameter {
            name: "mean_service_time",
            value: config.mean_service_time,
        },
    )?;

    let mut simu = Simulation::new();
    let observations = Rc::new(RefCell::new(Observations {
        waiting_times: Vec::with_capacity(config.packet_count),
        service_times: Vec::with_capacity(config.packet_count),
        occupancy: OccupancyAccumulator::new(simu.time()),
    }));
    let source = Source {
        scheduler: simu.scheduler(),
        server: Resource::new(),
        observations: observations.clone(),
        sampler: ExpSampler::new(config.seed),
        interarrival,
        service,
        packet_count: config.packet_count,
        trace: config.trace,
    };

    simu.spawn("source", source.run());
    simu.run();
    check_failures(&mut simu)?;

    let end_time = simu.time();
    drop(simu);
    let observations = observations.take();

    Ok(Mm1Report {
        arrival_rate: config.arrival_rate(),
        waiting_times: observations.waiting_times,
        service_times: observations.service_times,
        occupancy: observations.occupancy,
        end_time,
    })
}

/// Packet generator.
struct Source {
    scheduler: Scheduler,
    server: Resource,
    observations: Rc<RefCell<Observations>>,
    sampler: ExpSampler,
    interarrival: Exponential,
    service: Exponential,
    packet_count: usize,
    trace: bool,
}

impl Source {
    async fn run(mut self) -> Result<(), SchedulingError> {
        for id in 0..self.packet_count {
            let interarrival_time = self.sampler.draw(&self.interarrival);
            let service_time = self.sampler.draw(&self.service);

            self.scheduler.spawn(
                format!("packet-{}", id),
                packet(
                    self.scheduler.clone(),
                    self.server.clone(),
                    self.observations.clone(),
                    service_time,
                    self.trace,
                ),
            );
            self.scheduler.timeout(interarrival_time)?.await;
        }

        Ok(())
    }
}

/// Lifecycle of a single packet: queue, get served, leave.
async fn packet(
    scheduler: Scheduler,
    server: Resource,
    observations: Rc<RefCell<Observations>>,
    service_time: f64,
    trace: bool,
) -> Result<(), SchedulingError> {
    let arrival_time = scheduler.time();
    observations.borrow_mut().occupancy.arrival(arrival_time);
    if trace {
        info!(
            target: TRACE_TARGET,
            "t={:.4E} [s]: packet arrived with service time={:.4E} [s]",
            arrival_time.as_secs(),
            service_time
        );
    }

    let _server = server.acquire().await;
    let waiting_time = scheduler.time() - arrival_time;
    observations.borrow_mut().waiting_times.push(waiting_time);

    scheduler.timeout(service_time)?.await;

    let now = scheduler.time();
    let mut observations = observations.borrow_mut();
    observations.occupancy.departure(now);
    observations.service_times.push(service_time);
    if trace {
        info!(
            target: TRACE_TARGET,
            "t={:.4E} [s]: packet departed after waiting {:.4E} [s]",
            now.as_secs(),
            waiting_time
        );
    }

    Ok(())
}
