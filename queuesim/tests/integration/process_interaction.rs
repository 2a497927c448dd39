//! Interaction of processes through resources and channels.

use std::cell::RefCell;
use std::rc::Rc;

use queuesim::channel::Channel;
use queuesim::resource::Resource;
use queuesim::simulation::{Scheduler, SchedulingError, Simulation};
use queuesim::time::SimTime;

#[derive(Debug)]
struct ModelError(&'static str);

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for ModelError {}

async fn count_messages(rx: Channel<()>, count: Rc<RefCell<u32>>) -> Result<(), ModelError> {
    loop {
        rx.get().await;
        *count.borrow_mut() += 1;
    }
}

async fn client(
    scheduler: Scheduler,
    server: Resource,
    arrival: f64,
    service: f64,
    served: Rc<RefCell<Vec<usize>>>,
    id: usize,
) -> Result<(), SchedulingError> {
    scheduler.timeout(arrival)?.await;
    let _server = server.acquire().await;
    served.borrow_mut().push(id);
    scheduler.timeout(service)?.await;

    Ok(())
}

#[test]
fn single_server_is_never_shared() {
    let mut simu = Simulation::new();
    let server = Resource::new();
    let served = Rc::new(RefCell::new(Vec::new()));

    for id in 0..20 {
        let arrival = 0.1 * id as f64;
        let service = 0.05 + 0.3 * ((id * 7) % 5) as f64;
        simu.spawn(
            format!("client-{}", id),
            client(simu.scheduler(), server.clone(), arrival, service, served.clone(), id),
        );
    }

    let mut steps = 0;
    while simu.step().is_some() {
        steps += 1;
        assert!(server.in_use() <= 1);
        if server.queue_len() > 0 {
            assert_eq!(server.in_use(), 1);
        }
    }

    assert!(steps > 40);
    assert_eq!(*served.borrow(), (0..20).collect::<Vec<_>>());
    assert_eq!(server.in_use(), 0);
}

#[test]
fn channel_order_is_preserved_across_suspensions() {
    let mut simu = Simulation::new();
    let channel = Channel::new();
    let received = Rc::new(RefCell::new(Vec::new()));

    let (scheduler, tx) = (simu.scheduler(), channel.clone());
    simu.spawn("producer", async move {
        for message in ["A", "B", "C"] {
            tx.put(message);
            scheduler.timeout(0.3)?.await;
        }

        Ok::<(), SchedulingError>(())
    });

    let (scheduler, rx, log) = (simu.scheduler(), channel.clone(), received.clone());
    simu.spawn("consumer", async move {
        // The consumer is slower than the producer at first, then faster.
        for delay in [0.5, 0.0, 0.0] {
            scheduler.timeout(delay)?.await;
            let message = rx.get().await;
            log.borrow_mut().push((message, scheduler.time().as_secs()));
        }

        Ok::<(), SchedulingError>(())
    });

    simu.run();

    assert_eq!(
        *received.borrow(),
        vec![("A", 0.5), ("B", 0.5), ("C", 0.6)]
    );
}

#[test]
fn failing_process_does_not_stop_the_pipeline() {
    let mut simu = Simulation::new();
    let channel = Channel::new();
    let count = Rc::new(RefCell::new(0));

    let (scheduler, tx) = (simu.scheduler(), channel.clone());
    simu.spawn("producer", async move {
        for _ in 0..5 {
            tx.put(());
            scheduler.timeout(1.0)?.await;
        }

        Ok::<(), SchedulingError>(())
    });

    let rx = channel.clone();
    simu.spawn("picky-consumer", async move {
        rx.get().await;
        Err::<(), _>(ModelError("unexpected message"))
    });

    simu.spawn("consumer", count_messages(channel.clone(), count.clone()));

    simu.run_until(10.0).unwrap();

    assert_eq!(*count.borrow(), 4);
    let failures = simu.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].name(), "picky-consumer");
    assert_eq!(failures[0].time(), SimTime::ZERO);
    assert_eq!(failures[0].error().to_string(), "unexpected message");
}
