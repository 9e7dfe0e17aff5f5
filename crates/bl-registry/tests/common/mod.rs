//! Shared helpers for registry integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bl_link::{LinkError, LinkResult, Transport};

pub const WAIT: Duration = Duration::from_secs(5);

/// In-memory transport that records every message sent.
#[derive(Clone, Default)]
pub struct Recorder {
    sent: Arc<Mutex<Vec<String>>>,
    fail: Arc<AtomicBool>,
}

impl Recorder {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.sent.lock().unwrap().last().cloned()
    }

    pub fn fail_next_sends(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Poll until a message equal to `expected` has been sent.
    pub fn wait_for(&self, expected: &str) -> bool {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            if self.sent.lock().unwrap().iter().any(|m| m == expected) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }
}

impl Transport for Recorder {
    fn send(&self, message: &str) -> LinkResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(LinkError::SendFailed {
                source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "peer gone"),
            });
        }
        self.sent.lock().unwrap().push(message.to_string());
        Ok(())
    }

    fn is_open(&self) -> bool {
        !self.fail.load(Ordering::SeqCst)
    }
}
