/*!
 * Transport Traits
 * The seam between the protocol layer and the OS port primitive
 */

use super::types::{ChannelResult, PortHandle};
use bytes::Bytes;

/// One connected, bidirectional port.
///
/// Carries whole frames only; a frame is received atomically, so there is no
/// partial-message state to clean up on cancellation.
pub trait PortTransport: Send + Sync {
    /// Block until a frame arrives or the channel is torn down.
    ///
    /// There is no timeout at this layer; `close` on another thread is the
    /// sole mechanism to unblock a parked receive.
    fn receive(&self) -> ChannelResult<Bytes>;

    /// Send a reply frame for the message most recently received
    fn reply(&self, frame: Bytes) -> ChannelResult<()>;

    /// Tear the connection down. Idempotent; unblocks a parked `receive`.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// Connects to named ports.
///
/// The production implementation wraps the OS filter-port API; tests and the
/// demo binary use the in-process loopback hub.
pub trait PortConnector: Send + Sync {
    fn connect(&self, name: &str) -> ChannelResult<(PortHandle, Box<dyn PortTransport>)>;
}
