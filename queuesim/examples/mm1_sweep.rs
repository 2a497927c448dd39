//! Example: arrival-rate sweep of an M/M/1 queue.
//!
//! This example demonstrates in particular:
//!
//! * repeated, independent simulation runs,
//! * the comparison of the direct mean waiting time with its Little's law
//!   estimate and with the closed-form result.
//!
//! ```text
//!                 ┌─────────────────────┐
//!   Poisson       │  ┌─┬─┬─┐   ┌─────┐  │
//!   arrivals ●────┼─►│ │ │ ├──►│  μ  ├──┼───► departures
//!   (rate λ)      │  └─┴─┴─┘   └─────┘  │
//!                 │   FIFO     server   │
//!                 └─────────────────────┘
//! ```
//!
//! Run with `RUST_LOG=debug` to follow the progress of the sweep.

use queuesim::models::mm1::Mm1Config;
use queuesim::models::SimulationError;
use queuesim::sweep::{sweep_mm1, ArrivalRateSweep};
use queuesim::theory;

fn main() -> Result<(), SimulationError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Mean service time of 1 s, 1000 packets per point.
    let base = Mm1Config::default().with_trace(false);
    let sweep = ArrivalRateSweep::default();

    let points = sweep_mm1(&base, &sweep)?;

    println!(
        "{:>8} {:>14} {:>14} {:>14} {:>14}",
        "λ [1/s]", "direct [s]", "Little [s]", "theory [s]", "service [s]"
    );
    for point in points {
        let theory = theory::mm1_mean_waiting_time(point.arrival_rate, base.service_rate())
            .map(|wait| format!("{:>14.4E}", wait))
            .unwrap_or_else(|| format!("{:>14}", "-"));

        println!(
            "{:>8.2} {:>14.4E} {:>14.4E} {} {:>14.4E}",
            point.arrival_rate,
            point.mean_waiting_time,
            point.littles_law_waiting_time,
            theory,
            point.mean_service_time
        );
    }

    Ok(())
}
