/*!
 * Wire Module
 * Typed envelope framing over the raw byte transport
 */

pub mod envelope;
pub mod framing;
pub mod payload;
pub mod types;

// Re-export for convenience
pub use envelope::{MessageEnvelope, ReplyEnvelope};
pub use framing::{MessageHeader, ReplyHeader, MESSAGE_HEADER_SIZE, REPLY_HEADER_SIZE};
pub use payload::{EventPayload, FileIoInfo, MAX_PATH_UNITS};
pub use types::{DecodeError, EventCategoryId, NtStatus};
