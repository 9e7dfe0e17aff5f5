//! Connection settings.

use serde::{Deserialize, Serialize};

/// Where the peer lives and how its stream is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSettings {
    /// Peer host name or IP address.
    pub host: String,
    /// Peer TCP port.
    pub port: u16,
    /// Bytes requested per read on the receiver thread.
    pub read_buffer_size: usize,
    /// Largest frame body accepted. A partial frame that grows past this is
    /// discarded.
    pub max_frame_len: usize,
    /// Disable Nagle's algorithm so small snapshots go out at once.
    pub nodelay: bool,
}

impl LinkSettings {
    /// `host:port` as handed to the resolver.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            host: "10.0.0.100".to_string(),
            port: 910,
            read_buffer_size: 8 * 1024,
            max_frame_len: 1024 * 1024,
            nodelay: true,
        }
    }
}
