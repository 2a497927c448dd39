//! Trace lines emitted by the models.

use std::io;
use std::sync::{Arc, Mutex};

use queuesim::models::mm1::Mm1Config;
use queuesim::models::onoff::OnOffConfig;

/// An in-memory log sink.
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with a subscriber writing `INFO` events to a buffer and returns
/// the buffer contents.
fn capture(f: impl FnOnce()) -> String {
    let buffer = SharedBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .without_time()
        .with_max_level(tracing::Level::INFO)
        .finish();

    tracing::subscriber::with_default(subscriber, f);

    buffer.contents()
}

#[test]
fn onoff_trace_lines() {
    let output = capture(|| {
        OnOffConfig::default()
            .with_simulation_duration(2.5)
            .run()
            .unwrap();
    });

    assert!(output.contains("t=0.0000E0 [s]: OFF->ON"));
    assert!(output.contains("t=1.0000E0 [s]: ON->OFF"));
    assert!(output.contains("t=2.0000E0 [s]: OFF->ON"));
    assert!(output.contains("t=0.0000E0 [s]: packet generated with size=1.0000E3 [B]"));
    assert!(output.contains("t=2.0000E0 [s]: packet arrived with size=1.0000E3 [B]"));
    assert!(output.contains("queuesim::trace"));
}

#[test]
fn disabled_trace_is_silent() {
    let output = capture(|| {
        OnOffConfig::default()
            .with_simulation_duration(2.5)
            .with_trace(false)
            .run()
            .unwrap();
        Mm1Config::default()
            .with_packet_count(10)
            .with_trace(false)
            .run()
            .unwrap();
    });

    assert!(!output.contains("queuesim::trace"));
}

#[test]
fn mm1_trace_lines() {
    let output = capture(|| {
        Mm1Config::default().with_packet_count(3).run().unwrap();
    });

    assert_eq!(output.matches("packet arrived with service time=").count(), 3);
    assert_eq!(output.matches("packet departed after waiting").count(), 3);
    assert!(output.contains("t=0.0000E0 [s]: packet arrived"));
}
