/*!
 * Message Envelopes
 * Typed request/reply wrappers over the raw frame transport
 */

use super::framing::{MessageHeader, ReplyHeader};
use super::payload::EventPayload;
use super::types::{DecodeError, EventCategoryId, NtStatus};
use crate::core::types::CorrelationId;
use bytes::{Bytes, BytesMut};

/// A decoded driver-to-client request.
///
/// Exactly one reply carrying the same correlation id must be sent before
/// the driver side is unblocked.
#[derive(Debug, Clone)]
pub struct MessageEnvelope<T> {
    pub correlation_id: CorrelationId,
    pub category: EventCategoryId,
    pub payload: T,
}

impl<T: EventPayload> MessageEnvelope<T> {
    /// Decode a raw frame received on a channel bound to `expected`.
    ///
    /// Rejects frames for other categories and frames whose declared payload
    /// size disagrees with the category's fixed layout. Every failure is a
    /// single-message `DecodeError`, never fatal to the channel.
    pub fn decode(expected: EventCategoryId, frame: &[u8]) -> Result<Self, DecodeError> {
        let mut buf = Bytes::copy_from_slice(frame);
        let header = MessageHeader::decode(&mut buf)?;
        if header.category != expected {
            return Err(DecodeError::CategoryMismatch {
                expected,
                got: header.category,
            });
        }
        if header.payload_size as usize != T::WIRE_SIZE {
            return Err(DecodeError::SizeMismatch {
                declared: header.payload_size as usize,
                expected: T::WIRE_SIZE,
            });
        }
        let payload = T::decode(&mut buf)?;
        Ok(Self {
            correlation_id: header.correlation_id,
            category: header.category,
            payload,
        })
    }

    /// Encode into a raw frame. This is the producer side of the protocol,
    /// used by the simulated driver and by tests.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(super::framing::MESSAGE_HEADER_SIZE + T::WIRE_SIZE);
        MessageHeader {
            category: self.category,
            correlation_id: self.correlation_id,
            payload_size: T::WIRE_SIZE as u32,
        }
        .encode(&mut buf);
        self.payload.encode(&mut buf);
        buf.freeze()
    }
}

/// A client-to-driver reply, correlated with its originating request
#[derive(Debug, Clone)]
pub struct ReplyEnvelope<T> {
    pub correlation_id: CorrelationId,
    pub status: NtStatus,
    pub payload: T,
}

impl<T: EventPayload> ReplyEnvelope<T> {
    #[must_use]
    pub fn new(request: &MessageEnvelope<T>, status: NtStatus, payload: T) -> Self {
        Self {
            correlation_id: request.correlation_id,
            status,
            payload,
        }
    }

    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(super::framing::REPLY_HEADER_SIZE + T::WIRE_SIZE);
        ReplyHeader {
            correlation_id: self.correlation_id,
            status: self.status,
            payload_size: T::WIRE_SIZE as u32,
        }
        .encode(&mut buf);
        self.payload.encode(&mut buf);
        buf.freeze()
    }

    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        let mut buf = Bytes::copy_from_slice(frame);
        let header = ReplyHeader::decode(&mut buf)?;
        if header.payload_size as usize != T::WIRE_SIZE {
            return Err(DecodeError::SizeMismatch {
                declared: header.payload_size as usize,
                expected: T::WIRE_SIZE,
            });
        }
        let payload = T::decode(&mut buf)?;
        Ok(Self {
            correlation_id: header.correlation_id,
            status: header.status,
            payload,
        })
    }
}
