//! Simulation time.
//!
//! Virtual time is a finite, non-negative number of seconds elapsed since the
//! beginning of a simulation. It is only ever advanced by the dispatching of
//! scheduled events and bears no relation to the wall clock.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Sub;

/// A timestamp in virtual time, expressed in seconds.
///
/// `SimTime` is totally ordered, which makes it usable as a scheduling key.
/// Subtracting two timestamps yields the elapsed time in seconds as an `f64`.
///
/// # Examples
///
/// ```
/// use queuesim::time::SimTime;
///
/// let t0 = SimTime::ZERO;
/// let t1 = SimTime::new(2.5).unwrap();
///
/// assert!(t0 < t1);
/// assert_eq!(t1 - t0, 2.5);
/// assert!(SimTime::new(-1.0).is_none());
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimTime(f64);

impl SimTime {
    /// The origin of virtual time.
    pub const ZERO: Self = Self(0.0);

    /// Creates a timestamp from a number of seconds.
    ///
    /// Returns `None` if `secs` is negative, infinite or NaN.
    pub fn new(secs: f64) -> Option<Self> {
        if secs.is_finite() && secs >= 0.0 {
            // Normalize -0.0 so that equality and ordering agree.
            Some(Self(secs + 0.0))
        } else {
            None
        }
    }

    /// Returns the timestamp as a number of seconds.
    pub fn as_secs(self) -> f64 {
        self.0
    }

    /// Returns the timestamp shifted by a non-negative delay, or `None` if the
    /// delay is invalid or the result overflows.
    pub(crate) fn checked_add(self, delay: f64) -> Option<Self> {
        if delay.is_finite() && delay >= 0.0 {
            Self::new(self.0 + delay)
        } else {
            None
        }
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Sub for SimTime {
    type Output = f64;

    fn sub(self, rhs: Self) -> f64 {
        self.0 - rhs.0
    }
}

impl From<SimTime> for f64 {
    fn from(time: SimTime) -> Self {
        time.0
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::LowerExp for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerExp::fmt(&self.0, f)
    }
}

impl fmt::UpperExp for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperExp::fmt(&self.0, f)
    }
}
