//! Statistics of the M/M/1 model.

use queuesim::models::mm1::{run_simulation, Mm1Config};
use queuesim::models::SimulationError;
use queuesim::stats::StatsError;
use queuesim::sweep::{sweep_mm1, ArrivalRateSweep};

fn quiet() -> Mm1Config {
    Mm1Config::default().with_trace(false)
}

#[test]
fn mm1_is_deterministic() {
    let config = quiet().with_mean_interarrival_time(1.5).with_packet_count(3000);

    let a = run_simulation(&config).unwrap();
    let b = run_simulation(&config).unwrap();

    assert_eq!(a.waiting_times(), b.waiting_times());
    assert_eq!(a.service_times(), b.service_times());
    assert_eq!(a.end_time(), b.end_time());

    let c = run_simulation(&config.clone().with_seed(42)).unwrap();
    assert_ne!(a.waiting_times(), c.waiting_times());
}

#[test]
fn mm1_without_packets() {
    let report = quiet().with_packet_count(0).run().unwrap();

    assert_eq!(report.mean_waiting_time(), Err(StatsError::NoSamples));
}

#[test]
fn mm1_rejects_invalid_configuration() {
    let result = quiet().with_mean_interarrival_time(0.0).run();

    assert!(matches!(result, Err(SimulationError::Config(_))));
}

#[test]
fn mm1_half_load_waiting_time() {
    // ρ = 0.5 with a mean service time of 1 s: the expected mean waiting
    // time is ρ/(μ − λ) = 1 s.
    let config = quiet()
        .with_mean_interarrival_time(2.0)
        .with_mean_service_time(1.0)
        .with_packet_count(50_000);
    let report = config.run().unwrap();

    let expected = config.theoretical_waiting_time().unwrap();
    let mean_waiting_time = report.mean_waiting_time().unwrap();
    assert!(
        (mean_waiting_time - expected).abs() < 0.25,
        "mean waiting time = {}",
        mean_waiting_time
    );

    let mean_service_time = report.mean_service_time().unwrap();
    assert!((mean_service_time - 1.0).abs() < 0.05);

    let utilization = report.utilization().unwrap();
    assert!((utilization - 0.5).abs() < 0.05, "utilization = {}", utilization);

    let throughput = report.throughput().unwrap();
    assert!((throughput - 0.5).abs() < 0.05, "throughput = {}", throughput);
}

#[test]
fn mm1_littles_law_matches_direct_estimate() {
    for mean_interarrival_time in [4.0, 2.0, 1.25] {
        let report = quiet()
            .with_mean_interarrival_time(mean_interarrival_time)
            .with_packet_count(50_000)
            .run()
            .unwrap();

        let direct = report.mean_waiting_time().unwrap();
        let littles_law = report.littles_law_waiting_time().unwrap();
        assert!(
            (direct - littles_law).abs() < 0.1 * direct.max(0.1),
            "mean_ia = {}: direct = {}, Little's law = {}",
            mean_interarrival_time,
            direct,
            littles_law
        );
    }
}

#[test]
fn mm1_sweep_waiting_time_grows_with_load() {
    let base = quiet().with_packet_count(5000);
    let sweep = ArrivalRateSweep::new(0.1, 0.3, 0.8);

    let points = sweep_mm1(&base, &sweep).unwrap();

    assert_eq!(points.len(), 3);
    assert!(points[0].mean_waiting_time < points[1].mean_waiting_time);
    assert!(points[1].mean_waiting_time < points[2].mean_waiting_time);
    for point in &points {
        assert!((point.mean_service_time - 1.0).abs() < 0.1);
    }
}
