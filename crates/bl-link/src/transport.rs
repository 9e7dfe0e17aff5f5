//! Seams between the link and the code that uses it.

use crate::error::LinkResult;

/// Outgoing half of a link.
pub trait Transport: Send + Sync {
    /// Send one message body. Framing is the transport's job.
    ///
    /// # Errors
    ///
    /// A failed send closes the link; later sends return
    /// [`LinkError::Closed`](crate::LinkError::Closed).
    fn send(&self, message: &str) -> LinkResult<()>;

    /// False once the link has failed or the peer has gone away.
    fn is_open(&self) -> bool;
}

/// Callbacks fired by a link, from the receiver thread or a failing sender.
pub trait LinkEvents: Send + Sync {
    fn connection_established(&self) {}

    /// Fired at most once per link, whichever side notices first.
    fn connection_lost(&self);

    /// One complete message body, markers removed.
    fn message_received(&self, message: &str);
}
