//! Message link between a boxline process and its peer.
//!
//! The peer is reached over one long-lived TCP connection. Each message is a
//! JSON object wrapped in a start marker and an end marker; a dedicated
//! receiver thread reassembles frames across partial reads and hands each
//! complete message to a [`LinkEvents`] handler.
//!
//! [`Channel`] sits between a registry and a [`Transport`] and converts
//! snapshots to and from the wire.

pub mod channel;
pub mod error;
pub mod frame;
pub mod settings;
pub mod tcp;
pub mod transport;

pub use channel::Channel;
pub use error::{LinkError, LinkResult};
pub use frame::{END_OF_TEXT, FrameDecoder, START_OF_TEXT, encode_frame};
pub use settings::LinkSettings;
pub use tcp::TcpLink;
pub use transport::{LinkEvents, Transport};
