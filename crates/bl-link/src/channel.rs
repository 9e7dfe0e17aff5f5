//! Snapshot channel: the registry's view of the link.

use bl_core::Snapshot;
use tracing::{debug, trace};

use crate::error::LinkResult;
use crate::transport::Transport;

/// Converts snapshots to and from wire messages over a [`Transport`].
pub struct Channel {
    transport: Box<dyn Transport>,
}

impl Channel {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
        }
    }

    /// Serialize `snapshot` and send it, even when it is empty.
    pub fn send_snapshot(&self, snapshot: &Snapshot) -> LinkResult<()> {
        let message = snapshot.to_json();
        trace!(%message, "Sending snapshot");
        self.transport.send(&message)
    }

    /// Ask the peer for a full sensor snapshot.
    pub fn request_sensor_data(&self) -> LinkResult<()> {
        debug!("Requesting sensor data");
        self.send_snapshot(&Snapshot::sensor_data_request())
    }

    /// Parse an inbound message body.
    pub fn decode(message: &str) -> LinkResult<Snapshot> {
        Ok(Snapshot::parse(message)?)
    }
}
