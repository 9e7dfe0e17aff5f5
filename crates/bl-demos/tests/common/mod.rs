//! Shared helpers for demo integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use bl_demos::Demo;
use bl_link::{LinkResult, Transport};
use bl_registry::Factory;

pub const WAIT: Duration = Duration::from_secs(5);

/// Long enough for a worker to wake on a sensor change and read it.
pub const SETTLE: Duration = Duration::from_millis(200);

/// In-memory transport that records every message sent.
#[derive(Clone, Default)]
pub struct Recorder {
    sent: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Poll until some message satisfies `matches`.
    pub fn wait_until(&self, matches: impl Fn(&str) -> bool) -> bool {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            if self.sent.lock().unwrap().iter().any(|m| matches(m)) {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    pub fn wait_for(&self, expected: &str) -> bool {
        self.wait_until(|m| m == expected)
    }
}

impl Transport for Recorder {
    fn send(&self, message: &str) -> LinkResult<()> {
        self.sent.lock().unwrap().push(message.to_string());
        Ok(())
    }

    fn is_open(&self) -> bool {
        true
    }
}

pub fn attached_factory() -> (Arc<Factory>, Recorder) {
    let recorder = Recorder::default();
    let factory = Factory::new();
    factory.attach(recorder.clone()).unwrap();
    (factory, recorder)
}

/// Start `demo` on a helper thread, answer its snapshot request with
/// `initial`, and hand the running demo back.
pub fn start_with_snapshot<D>(factory: &Arc<Factory>, recorder: &Recorder, mut demo: D, initial: &str) -> D
where
    D: Demo + 'static,
{
    let starter = thread::spawn(move || {
        let result = demo.start();
        (demo, result)
    });
    assert!(recorder.wait_for(r#"{"Send Sensor Data":true}"#));
    factory.handle_inbound(initial).unwrap();
    let (demo, result) = starter.join().unwrap();
    result.unwrap();
    demo
}

/// Deliver `message` and give the workers time to see it.
pub fn deliver(factory: &Factory, message: &str) {
    factory.handle_inbound(message).unwrap();
    thread::sleep(SETTLE);
}
