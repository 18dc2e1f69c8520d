/*!
 * Event Handlers
 * The single-method handler seam and the reply discipline around it
 */

use super::types::HandlerError;
use crate::channel::{ChannelError, ChannelResult, MessageChannel};
use crate::core::types::CorrelationId;
use crate::wire::{EventPayload, MessageEnvelope, NtStatus, ReplyHeader, REPLY_HEADER_SIZE};
use bytes::BytesMut;

/// Reply capability for exactly one request.
///
/// Wraps the channel the request arrived on and its correlation id, so a
/// reply always goes out on the receiving thread over the receiving
/// connection. A second `reply` fails with `AlreadyReplied`; a missing one
/// is detected by the listener loop, which forces a failure reply rather
/// than leave the kernel side blocked.
pub struct ReplyContext<'a> {
    channel: &'a MessageChannel,
    correlation_id: CorrelationId,
    replied: bool,
}

impl<'a> ReplyContext<'a> {
    pub(crate) fn new(channel: &'a MessageChannel, correlation_id: CorrelationId) -> Self {
        Self {
            channel,
            correlation_id,
            replied: false,
        }
    }

    #[must_use]
    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    #[must_use]
    pub fn has_replied(&self) -> bool {
        self.replied
    }

    /// Send the reply envelope for this request.
    ///
    /// Consumes the one reply this request gets, whether or not delivery
    /// succeeds.
    pub fn reply<T: EventPayload>(&mut self, status: NtStatus, payload: &T) -> ChannelResult<()> {
        if self.replied {
            return Err(ChannelError::AlreadyReplied);
        }
        self.replied = true;

        let mut buf = BytesMut::with_capacity(REPLY_HEADER_SIZE + T::WIRE_SIZE);
        ReplyHeader {
            correlation_id: self.correlation_id,
            status,
            payload_size: T::WIRE_SIZE as u32,
        }
        .encode(&mut buf);
        payload.encode(&mut buf);
        self.channel.reply(self.correlation_id, buf.freeze())
    }
}

/// Synchronous handler for one event category.
///
/// Invoked on the listener thread; must send exactly one reply through the
/// context before returning. State beyond what is passed in explicitly
/// belongs to the handler itself.
pub trait EventHandler<T: EventPayload>: Send + 'static {
    fn handle(
        &self,
        ctx: &mut ReplyContext<'_>,
        envelope: &MessageEnvelope<T>,
    ) -> Result<(), HandlerError>;
}

impl<T, F> EventHandler<T> for F
where
    T: EventPayload,
    F: Fn(&mut ReplyContext<'_>, &MessageEnvelope<T>) -> Result<(), HandlerError> + Send + 'static,
{
    fn handle(
        &self,
        ctx: &mut ReplyContext<'_>,
        envelope: &MessageEnvelope<T>,
    ) -> Result<(), HandlerError> {
        self(ctx, envelope)
    }
}
