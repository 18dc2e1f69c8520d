/*!
 * Channel Types
 * Port handles and channel errors
 */

use miette::Diagnostic;
use thiserror::Error;

/// Channel operation result
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Opaque handle to a connected port.
///
/// Exclusively owned by the `MessageChannel` that created it; released when
/// the channel closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortHandle(u64);

impl PortHandle {
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn as_raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PortHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Channel errors.
///
/// Only `ConnectionFailed` (at open) and `Closed` end a subscription; every
/// other failure is scoped to a single message.
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum ChannelError {
    /// Channel open failed; fatal to the subscription's start, not retried
    #[error("failed to connect to port {name}: {reason}")]
    #[diagnostic(
        code(channel::connection_failed),
        help("The named port does not exist or refused the connection. Verify the driver is loaded and the port name matches.")
    )]
    ConnectionFailed { name: String, reason: String },

    /// The driver tore the channel down, or it was closed locally
    #[error("channel closed: {0}")]
    #[diagnostic(
        code(channel::closed),
        help("The channel is gone. The listener loop terminates gracefully; no retry happens at this layer.")
    )]
    Closed(String),

    /// The reply could not be delivered
    #[error("reply failed: {0}")]
    #[diagnostic(
        code(channel::reply_failed),
        help("The reply frame could not be sent. The peer may have disconnected mid-operation.")
    )]
    ReplyFailed(String),

    /// A second reply was attempted for the same request
    #[error("request already replied to")]
    #[diagnostic(
        code(channel::already_replied),
        help("Exactly one reply per received request is allowed. The first reply already unblocked the driver side.")
    )]
    AlreadyReplied,
}
