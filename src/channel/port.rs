/*!
 * Message Channel
 * One connection to one named kernel channel
 */

use super::transport::{PortConnector, PortTransport};
use super::types::{ChannelResult, PortHandle};
use crate::core::types::CorrelationId;
use bytes::Bytes;
use tracing::{debug, trace};

/// A connected channel carrying raw framed bytes.
///
/// Owns its `PortHandle` exclusively. At most one message is in flight at a
/// time; the channel holds no queue across calls. The thread that received a
/// message must be the one that replies to it, since correlation is
/// per-connection.
pub struct MessageChannel {
    name: String,
    handle: PortHandle,
    transport: Box<dyn PortTransport>,
}

impl std::fmt::Debug for MessageChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageChannel")
            .field("name", &self.name)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl MessageChannel {
    /// Connect to the named port
    pub fn open(connector: &dyn PortConnector, name: &str) -> ChannelResult<Self> {
        let (handle, transport) = connector.connect(name)?;
        debug!(port = name, %handle, "channel connected");
        Ok(Self {
            name: name.to_string(),
            handle,
            transport,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn handle(&self) -> PortHandle {
        self.handle
    }

    /// Block until the next frame arrives.
    ///
    /// Returns `ChannelError::Closed` when the driver tears the channel down
    /// or `close` is called from another thread.
    pub fn receive(&self) -> ChannelResult<Bytes> {
        self.transport.receive()
    }

    /// Send a reply frame for the message most recently received
    pub fn reply(&self, correlation_id: CorrelationId, frame: Bytes) -> ChannelResult<()> {
        trace!(
            port = %self.name,
            correlation_id,
            frame_len = frame.len(),
            "sending reply"
        );
        self.transport.reply(frame)
    }

    /// Tear the channel down and release the port handle.
    ///
    /// Idempotent. The sole mechanism to unblock a thread parked in
    /// `receive`.
    pub fn close(&self) {
        if !self.transport.is_closed() {
            debug!(port = %self.name, handle = %self.handle, "closing channel");
        }
        self.transport.close();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.transport.is_closed()
    }
}

impl Drop for MessageChannel {
    fn drop(&mut self) {
        self.close();
    }
}
