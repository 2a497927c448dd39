//! Example: on-off packet generator feeding a FIFO stage and a sink.
//!
//! This example demonstrates in particular:
//!
//! * processes exchanging packets through channels,
//! * generation suppressed by holding a resource,
//! * model trace lines.
//!
//! ```text
//! ┌────────────────┐        ┌────────────┐        ┌────────────┐
//! │ OnOffGenerator ├───────►│ FifoQueue  ├───────►│ PacketSink │
//! └────────────────┘ Packet └────────────┘ Packet └────────────┘
//! ```
//!
//! Trace lines are printed to standard output. Use e.g.
//! `RUST_LOG=queuesim::trace=off` to silence them.

use queuesim::models::onoff::{OnOffConfig, ProcessingDelay};
use queuesim::models::SimulationError;

fn main() -> Result<(), SimulationError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .without_time()
        .with_target(false)
        .init();

    // 1000 B packets every 0.1 s, ON and OFF periods of 1 s, forwarded over
    // a 1 MB/s link.
    let config = OnOffConfig::default().with_processing_delay(ProcessingDelay::LinkRate {
        bytes_per_second: 1e6,
    });
    let report = config.run()?;

    println!(
        "Packets generated = {}, received = {}",
        report.packets_generated(),
        report.packets_received()
    );
    println!("Throughput = {:.4E} [B/s]", report.throughput()?);
    println!("Average waiting time = {:.4E} [s]", report.mean_waiting_time()?);

    Ok(())
}
