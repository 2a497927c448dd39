//! Closed-form results of queueing theory, used to validate simulations.

/// Returns the mean waiting time in the queue of an M/M/1 system, excluding
/// service time.
///
/// With `ρ = λ/μ`, this is `ρ / (μ − λ)`. `None` is returned unless both rates
/// are strictly positive and finite and the system is stable (`λ < μ`).
///
/// # Examples
///
/// ```
/// use queuesim::theory::mm1_mean_waiting_time;
///
/// // ρ = 0.5 with a mean service time of 1 s.
/// assert_eq!(mm1_mean_waiting_time(0.5, 1.0), Some(1.0));
/// assert_eq!(mm1_mean_waiting_time(1.0, 1.0), None);
/// ```
pub fn mm1_mean_waiting_time(arrival_rate: f64, service_rate: f64) -> Option<f64> {
    let is_valid = |rate: f64| rate.is_finite() && rate > 0.0;
    if !(is_valid(arrival_rate) && is_valid(service_rate)) || arrival_rate >= service_rate {
        return None;
    }

    Some(arrival_rate / (service_rate * (service_rate - arrival_rate)))
}

/// Returns the mean number of packets waiting in the queue of an M/M/1
/// system, excluding the packet in service.
///
/// This is `ρ² / (1 − ρ)`, or `None` under the same conditions as
/// [`mm1_mean_waiting_time()`].
pub fn mm1_mean_queue_length(arrival_rate: f64, service_rate: f64) -> Option<f64> {
    mm1_mean_waiting_time(arrival_rate, service_rate).map(|wait| arrival_rate * wait)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mm1_closed_forms() {
        assert_eq!(mm1_mean_waiting_time(0.25, 1.0), Some(0.25 / 0.75));
        assert_eq!(mm1_mean_queue_length(0.5, 1.0), Some(0.5));
        assert_eq!(mm1_mean_waiting_time(2.0, 1.0), None);
        assert_eq!(mm1_mean_waiting_time(0.0, 1.0), None);
        assert_eq!(mm1_mean_waiting_time(0.5, f64::NAN), None);
    }
}
