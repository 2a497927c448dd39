//! Arrival-rate sweeps of the M/M/1 model.
//!
//! A sweep runs one independent M/M/1 simulation per arrival rate, keeping
//! all other parameters of a base configuration, and collects both estimates
//! of the mean waiting time for each rate.
//!
//! # Examples
//!
//! ```
//! use queuesim::models::mm1::Mm1Config;
//! use queuesim::sweep::{sweep_mm1, ArrivalRateSweep};
//!
//! let base = Mm1Config::default().with_packet_count(200).with_trace(false);
//! let sweep = ArrivalRateSweep::new(0.1, 0.2, 0.8);
//!
//! let points = sweep_mm1(&base, &sweep).unwrap();
//! assert_eq!(points.len(), 4);
//! assert_eq!(points[0].arrival_rate, 0.1);
//! ```

use tracing::debug;

use crate::models::mm1::Mm1Config;
use crate::models::SimulationError;

/// A range of arrival rates `start + i·step`, strictly below `end`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArrivalRateSweep {
    /// First arrival rate [1/s].
    pub start: f64,
    /// Increment between consecutive rates [1/s].
    pub step: f64,
    /// Exclusive upper bound [1/s].
    pub end: f64,
}

impl ArrivalRateSweep {
    /// Creates a sweep.
    pub fn new(start: f64, step: f64, end: f64) -> Self {
        Self { start, step, end }
    }

    /// Returns the arrival rates of the sweep.
    ///
    /// Rates are computed as `start + i·step` rather than by repeated
    /// addition so that rounding errors do not accumulate. The sweep is empty
    /// unless `start` and `step` are strictly positive and all bounds are
    /// finite.
    pub fn rates(&self) -> Vec<f64> {
        let is_finite = self.start.is_finite() && self.step.is_finite() && self.end.is_finite();
        if !(is_finite && self.step > 0.0 && self.start > 0.0) {
            return Vec::new();
        }

        (0..)
            .map(|i| self.start + i as f64 * self.step)
            .take_while(|&rate| rate < self.end)
            .collect()
    }
}

impl Default for ArrivalRateSweep {
    fn default() -> Self {
        Self::new(0.05, 0.05, 1.0)
    }
}

/// Statistics of one point of a sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SweepPoint {
    /// Arrival rate [1/s].
    pub arrival_rate: f64,
    /// Sample mean of the packet waiting times [s].
    pub mean_waiting_time: f64,
    /// Mean waiting time derived from Little's law [s].
    pub littles_law_waiting_time: f64,
    /// Sample mean of the service times [s].
    pub mean_service_time: f64,
}

/// Runs the M/M/1 model once per arrival rate of the sweep.
///
/// The mean inter-arrival time of the base configuration is replaced by the
/// inverse of each arrival rate. The first failing run aborts the sweep.
pub fn sweep_mm1(
    base: &Mm1Config,
    sweep: &ArrivalRateSweep,
) -> Result<Vec<SweepPoint>, SimulationError> {
    sweep
        .rates()
        .into_iter()
        .map(|arrival_rate| {
            let report = base
                .clone()
                .with_mean_interarrival_time(1.0 / arrival_rate)
                .run()?;

            let point = SweepPoint {
                arrival_rate,
                mean_waiting_time: report.mean_waiting_time()?,
                littles_law_waiting_time: report.littles_law_waiting_time()?,
                mean_service_time: report.mean_service_time()?,
            };
            debug!(
                arrival_rate,
                mean_waiting_time = point.mean_waiting_time,
                littles_law_waiting_time = point.littles_law_waiting_time,
                "sweep point completed"
            );

            Ok(point)
        })
        .collect()
}
