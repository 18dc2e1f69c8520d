/*!
 * Wire Framing
 * Fixed little-endian request/reply headers
 */

use super::types::{DecodeError, EventCategoryId, NtStatus};
use crate::core::types::CorrelationId;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Request header: `{category: u32, correlation_id: u64, payload_size: u32}`
pub const MESSAGE_HEADER_SIZE: usize = 16;

/// Reply header: `{correlation_id: u64, status: u32, payload_size: u32}`
pub const REPLY_HEADER_SIZE: usize = 16;

/// Header of a driver-to-client request frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub category: EventCategoryId,
    pub correlation_id: CorrelationId,
    pub payload_size: u32,
}

impl MessageHeader {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.category.to_wire());
        buf.put_u64_le(self.correlation_id);
        buf.put_u32_le(self.payload_size);
    }

    pub fn decode(buf: &mut Bytes) -> Result<Self, DecodeError> {
        if buf.remaining() < MESSAGE_HEADER_SIZE {
            return Err(DecodeError::TruncatedFrame {
                needed: MESSAGE_HEADER_SIZE,
                available: buf.remaining(),
            });
        }
        let category = EventCategoryId::from_wire(buf.get_u32_le())?;
        let correlation_id = buf.get_u64_le();
        let payload_size = buf.get_u32_le();
        Ok(Self {
            category,
            correlation_id,
            payload_size,
        })
    }
}

/// Header of a client-to-driver reply frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyHeader {
    pub correlation_id: CorrelationId,
    pub status: NtStatus,
    pub payload_size: u32,
}

impl ReplyHeader {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u64_le(self.correlation_id);
        buf.put_u32_le(self.status.0);
        buf.put_u32_le(self.payload_size);
    }

    pub fn decode(buf: &mut Bytes) -> Result<Self, DecodeError> {
        if buf.remaining() < REPLY_HEADER_SIZE {
            return Err(DecodeError::TruncatedFrame {
                needed: REPLY_HEADER_SIZE,
                available: buf.remaining(),
            });
        }
        let correlation_id = buf.get_u64_le();
        let status = NtStatus(buf.get_u32_le());
        let payload_size = buf.get_u32_le();
        Ok(Self {
            correlation_id,
            status,
            payload_size,
        })
    }
}
