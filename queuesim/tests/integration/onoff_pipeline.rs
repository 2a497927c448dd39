//! End-to-end runs of the on-off pipeline.

use queuesim::models::onoff::{run_simulation, OnOffConfig, ProcessingDelay};
use queuesim::models::{ConfigError, SimulationError};

fn quiet() -> OnOffConfig {
    OnOffConfig::default().with_trace(false)
}

#[test]
fn onoff_default_scenario() {
    // Five ON windows of 1 s with one packet every 0.1 s.
    let report = run_simulation(&quiet()).unwrap();

    let received = report.packets_received();
    assert!((45..=56).contains(&received), "received = {}", received);
    assert_eq!(report.packets_generated(), received as u64);
    assert!(report.waiting_times().iter().all(|&wait| wait >= 0.0));
    assert_eq!(report.bytes_received(), 1000.0 * received as f64);
    assert_eq!(report.mean_waiting_time(), Ok(0.0));
}

#[test]
fn onoff_packets_in_flight_are_not_received() {
    // Packets are generated every 0.5 s from t=0 to t=9.5 and held for 0.4 s,
    // so the packet generated at t=9.5 is still in flight at t=9.8.
    let report = quiet()
        .with_packet_interarrival_time(0.5)
        .with_on_period(20.0)
        .with_simulation_duration(9.8)
        .with_processing_delay(ProcessingDelay::Constant(0.4))
        .run()
        .unwrap();

    assert_eq!(report.packets_generated(), 20);
    assert_eq!(report.packets_received(), 19);
    let mean_waiting_time = report.mean_waiting_time().unwrap();
    assert!((mean_waiting_time - 0.4).abs() < 1e-9);
}

#[test]
fn onoff_longer_off_periods_reduce_throughput() {
    let balanced = quiet().with_simulation_duration(40.0).run().unwrap();
    let mostly_off = quiet()
        .with_off_period(3.0)
        .with_simulation_duration(40.0)
        .run()
        .unwrap();

    assert!(mostly_off.throughput().unwrap() < balanced.throughput().unwrap());
}

#[test]
fn onoff_rejects_size_smaller_than_offset() {
    let result = quiet()
        .with_processing_delay(ProcessingDelay::SizeOffset {
            offset: 10_000_000.0,
        })
        .run();

    assert!(matches!(
        result,
        Err(SimulationError::Config(
            ConfigError::NonPositiveProcessingDelay { .. }
        ))
    ));
}

#[test]
fn onoff_zero_duration() {
    let report = quiet().with_simulation_duration(0.0).run().unwrap();

    assert_eq!(report.packets_generated(), 0);
    assert!(report.mean_waiting_time().is_err());
    assert!(report.throughput().is_err());
}
