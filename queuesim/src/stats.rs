//! Time-weighted and sample statistics.
//!
//! The [`OccupancyAccumulator`] integrates the number of waiting occupants of
//! a queueing stage over virtual time. Together with [`littles_law_wait()`],
//! it provides an estimate of the mean waiting time that is independent of
//! per-packet measurements.

use std::error::Error;
use std::fmt;

use crate::time::SimTime;

/// Integrator of the number of waiting occupants of a single-server stage.
///
/// The count includes the occupant in service, but only waiting occupants are
/// integrated: at each transition the area `max(count − 1, 0) × dt` is added
/// to the weighted sum, where `count` is the count before the transition and
/// `dt` the time elapsed since the previous transition.
///
/// The time during which the count is non-zero is accumulated as well, which
/// gives the busy time of the server.
///
/// # Examples
///
/// ```
/// use queuesim::stats::OccupancyAccumulator;
/// use queuesim::time::SimTime;
///
/// let t = |secs| SimTime::new(secs).unwrap();
/// let mut occupancy = OccupancyAccumulator::new(SimTime::ZERO);
///
/// occupancy.arrival(t(0.0)); // served immediately
/// occupancy.arrival(t(1.0)); // waits
/// occupancy.departure(t(2.0));
/// occupancy.departure(t(4.0));
///
/// // One occupant waited from t=1 to t=2 over 4 seconds.
/// assert_eq!(occupancy.average(), Ok(0.25));
/// assert_eq!(occupancy.busy_time(), 4.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct OccupancyAccumulator {
    weighted_sum: f64,
    busy_time: f64,
    start_time: SimTime,
    last_change_time: SimTime,
    count: usize,
}

impl OccupancyAccumulator {
    /// Creates an empty accumulator observing from `start_time` onwards.
    pub fn new(start_time: SimTime) -> Self {
        Self {
            weighted_sum: 0.0,
            busy_time: 0.0,
            start_time,
            last_change_time: start_time,
            count: 0,
        }
    }

    /// Records an occupant entering the stage.
    pub fn arrival(&mut self, now: SimTime) {
        self.integrate(now);
        self.count += 1;
    }

    /// Records an occupant leaving the stage.
    ///
    /// A departure from an empty stage is ignored.
    pub fn departure(&mut self, now: SimTime) {
        debug_assert!(self.count > 0, "departure from an empty stage");
        self.integrate(now);
        self.count = self.count.saturating_sub(1);
    }

    /// Returns the current number of occupants, including the one in service.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns the integral of the number of waiting occupants.
    pub fn weighted_sum(&self) -> f64 {
        self.weighted_sum
    }

    /// Returns the time during which at least one occupant was present.
    pub fn busy_time(&self) -> f64 {
        self.busy_time
    }

    /// Returns the time of the last transition.
    pub fn last_change_time(&self) -> SimTime {
        self.last_change_time
    }

    /// Returns the observed time, from the start of the observation to the
    /// last transition.
    pub fn elapsed(&self) -> f64 {
        self.last_change_time - self.start_time
    }

    /// Returns the time-averaged number of waiting occupants.
    ///
    /// An error is returned if no time has elapsed between the start of the
    /// observation and the last transition.
    pub fn average(&self) -> Result<f64, StatsError> {
        let elapsed = self.elapsed();
        if elapsed > 0.0 {
            Ok(self.weighted_sum / elapsed)
        } else {
            Err(StatsError::NoElapsedTime)
        }
    }

    /// Returns the fraction of the observed time during which the stage was
    /// occupied.
    pub fn utilization(&self) -> Result<f64, StatsError> {
        let elapsed = self.elapsed();
        if elapsed > 0.0 {
            Ok(self.busy_time / elapsed)
        } else {
            Err(StatsError::NoElapsedTime)
        }
    }

    fn integrate(&mut self, now: SimTime) {
        debug_assert!(now >= self.last_change_time);
        let dt = now - self.last_change_time;

        self.weighted_sum += self.count.saturating_sub(1) as f64 * dt;
        if self.count > 0 {
            self.busy_time += dt;
        }
        self.last_change_time = now;
    }
}

impl Default for OccupancyAccumulator {
    fn default() -> Self {
        Self::new(SimTime::ZERO)
    }
}

/// Returns the arithmetic mean of a set of samples.
///
/// An empty set has no mean and yields an error.
pub fn mean(samples: &[f64]) -> Result<f64, StatsError> {
    if samples.is_empty() {
        return Err(StatsError::NoSamples);
    }

    Ok(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Derives the mean waiting time from the average number of waiting occupants
/// using Little's law.
///
/// An error is returned if the arrival rate is not strictly positive and
/// finite.
pub fn littles_law_wait(average_occupancy: f64, arrival_rate: f64) -> Result<f64, StatsError> {
    if !(arrival_rate.is_finite() && arrival_rate > 0.0) {
        return Err(StatsError::InvalidRate(arrival_rate));
    }

    Ok(average_occupancy / arrival_rate)
}

/// Error returned when a statistic is undefined.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StatsError {
    /// No time has elapsed during the observation.
    NoElapsedTime,
    /// The sample set is empty.
    NoSamples,
    /// The rate is not strictly positive and finite.
    InvalidRate(f64),
}

impl fmt::Display for StatsError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoElapsedTime => fmt.write_str("no time elapsed during the observation"),
            Self::NoSamples => fmt.write_str("the sample set is empty"),
            Self::InvalidRate(rate) => write!(fmt, "invalid rate: {}", rate),
        }
    }
}

impl Error for StatsError {}
