/*!
 * Channel Module
 * Named bidirectional channels to the kernel driver
 */

pub mod loopback;
pub mod port;
pub mod transport;
pub mod types;

// Re-export for convenience
pub use loopback::{DriverPort, LoopbackHub};
pub use port::MessageChannel;
pub use transport::{PortConnector, PortTransport};
pub use types::{ChannelError, ChannelResult, PortHandle};
