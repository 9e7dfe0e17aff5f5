use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, trace, warn};

use crate::error::{LinkError, LinkResult};
use crate::frame::{FrameDecoder, encode_frame};
use crate::settings::LinkSettings;
use crate::transport::{LinkEvents, Transport};

/// TCP connection to the peer with its own receiver thread.
///
/// There is exactly one connect attempt and no reconnect. When the stream
/// fails in either direction the link closes for good and
/// [`LinkEvents::connection_lost`] fires once.
pub struct TcpLink {
    writer: Mutex<TcpStream>,
    peer: SocketAddr,
    open: Arc<AtomicBool>,
    events: Arc<dyn LinkEvents>,
    receiver: Option<JoinHandle<()>>,
}

impl TcpLink {
    /// Connect to the peer and start the receiver thread.
    pub fn connect(settings: &LinkSettings, events: Arc<dyn LinkEvents>) -> LinkResult<Self> {
        let addr = settings.address();
        info!(%addr, "Connecting to peer");
        let stream = TcpStream::connect(addr.as_str()).map_err(|source| LinkError::Connect {
            addr: addr.clone(),
            source,
        })?;
        Self::from_stream(stream, &addr, settings, events)
    }

    fn from_stream(
        stream: TcpStream,
        addr: &str,
        settings: &LinkSettings,
        events: Arc<dyn LinkEvents>,
    ) -> LinkResult<Self> {
        let connect_error = |source: std::io::Error| LinkError::Connect {
            addr: addr.to_string(),
            source,
        };
        stream.set_nodelay(settings.nodelay).map_err(connect_error)?;
        let peer = stream.peer_addr().map_err(connect_error)?;
        let reader = stream.try_clone().map_err(connect_error)?;
        let open = Arc::new(AtomicBool::new(true));

        info!(%peer, "Connection established");
        events.connection_established();

        let receiver = {
            let open = open.clone();
            let events = events.clone();
            let buffer_size = settings.read_buffer_size.max(1);
            let max_frame_len = settings.max_frame_len;
            thread::Builder::new()
                .name("bl-link-rx".to_string())
                .spawn(move || {
                    receive_loop(reader, buffer_size, max_frame_len, &*events);
                    if open.swap(false, Ordering::SeqCst) {
                        events.connection_lost();
                    }
                })
                .map_err(|source| LinkError::Spawn { source })?
        };

        Ok(Self {
            writer: Mutex::new(stream),
            peer,
            open,
            events,
            receiver: Some(receiver),
        })
    }

    /// Close the connection. The receiver thread exits and
    /// [`LinkEvents::connection_lost`] fires if it has not already.
    pub fn close(&self) {
        let writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = writer.shutdown(Shutdown::Both) {
            debug!(%err, "Shutdown on an already closed stream");
        }
    }
}

impl Transport for TcpLink {
    fn send(&self, message: &str) -> LinkResult<()> {
        if !self.is_open() {
            return Err(LinkError::Closed);
        }

        let frame = encode_frame(message);
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        trace!(bytes = frame.len(), "Sending frame");

        if let Err(source) = writer.write_all(&frame).and_then(|()| writer.flush()) {
            error!(peer = %self.peer, %source, "Send failed, closing link");
            let _ = writer.shutdown(Shutdown::Both);
            drop(writer);
            if self.open.swap(false, Ordering::SeqCst) {
                self.events.connection_lost();
            }
            return Err(LinkError::SendFailed { source });
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

impl Drop for TcpLink {
    fn drop(&mut self) {
        self.close();
        let Some(receiver) = self.receiver.take() else {
            return;
        };
        // The last owner may be released from inside a receiver callback.
        if receiver.thread().id() == thread::current().id() {
            return;
        }
        if receiver.join().is_err() {
            warn!("Receiver thread panicked");
        }
    }
}

fn receive_loop(
    mut stream: TcpStream,
    buffer_size: usize,
    max_frame_len: usize,
    events: &dyn LinkEvents,
) {
    debug!("Receiver thread started");
    let mut buffer = vec![0; buffer_size];
    let mut decoder = FrameDecoder::new(max_frame_len);

    loop {
        let count = match stream.read(&mut buffer) {
            Ok(0) => {
                info!("Peer closed the connection");
                break;
            }
            Ok(count) => count,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                error!(%err, "Receive failed");
                break;
            }
        };

        for frame in decoder.push(&buffer[..count]) {
            match frame {
                Ok(message) => {
                    debug!(%message, "Received");
                    events.message_received(&message);
                }
                Err(err) => warn!(%err, "Dropping bad frame"),
            }
        }
    }
}
