/*!
 * Wire Types
 * Event categories, reply status codes, and decode errors
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable identifier of a kernel callback source.
///
/// Each category maps to one fixed, well-known channel name agreed upon by
/// both the driver and the listener, and determines the payload layout of
/// every message on that channel.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategoryId {
    PreRead = 1,
    PostRead = 2,
    PreWrite = 3,
    PostWrite = 4,
}

impl EventCategoryId {
    /// Well-known channel name for this category
    #[must_use]
    pub const fn channel_name(&self) -> &'static str {
        match self {
            EventCategoryId::PreRead => r"\FltBridgePort-PreRead",
            EventCategoryId::PostRead => r"\FltBridgePort-PostRead",
            EventCategoryId::PreWrite => r"\FltBridgePort-PreWrite",
            EventCategoryId::PostWrite => r"\FltBridgePort-PostWrite",
        }
    }

    #[inline]
    #[must_use]
    pub const fn to_wire(self) -> u32 {
        self as u32
    }

    pub fn from_wire(raw: u32) -> Result<Self, DecodeError> {
        match raw {
            1 => Ok(EventCategoryId::PreRead),
            2 => Ok(EventCategoryId::PostRead),
            3 => Ok(EventCategoryId::PreWrite),
            4 => Ok(EventCategoryId::PostWrite),
            other => Err(DecodeError::UnknownCategory(other)),
        }
    }
}

impl std::fmt::Display for EventCategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            EventCategoryId::PreRead => write!(f, "pre-read"),
            EventCategoryId::PostRead => write!(f, "post-read"),
            EventCategoryId::PreWrite => write!(f, "pre-write"),
            EventCategoryId::PostWrite => write!(f, "post-write"),
        }
    }
}

/// Status code carried in reply envelopes.
///
/// NT-style encoding: the two top bits are the severity class, so any value
/// with severity 0 counts as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NtStatus(pub u32);

impl NtStatus {
    pub const SUCCESS: NtStatus = NtStatus(0);
    pub const UNSUCCESSFUL: NtStatus = NtStatus(0xC000_0001);

    #[inline]
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.0 >> 30 == 0
    }
}

impl std::fmt::Display for NtStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// Frame decode errors.
///
/// Always scoped to a single message: the listener logs the error, drops the
/// frame, and keeps the subscription alive.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum DecodeError {
    #[error("truncated frame: need {needed} bytes, have {available}")]
    #[diagnostic(
        code(wire::truncated_frame),
        help("The frame is shorter than its header claims. The message is dropped; the channel stays usable.")
    )]
    TruncatedFrame { needed: usize, available: usize },

    #[error("payload size mismatch: header says {declared}, category layout is {expected}")]
    #[diagnostic(
        code(wire::size_mismatch),
        help("The payload does not match the fixed record layout for this category. Driver and client builds may disagree.")
    )]
    SizeMismatch { declared: usize, expected: usize },

    #[error("category mismatch: channel is bound to {expected}, frame carries {got}")]
    #[diagnostic(
        code(wire::category_mismatch),
        help("A frame for a different callback source arrived on this channel. Check the channel-name/category pairing.")
    )]
    CategoryMismatch {
        expected: EventCategoryId,
        got: EventCategoryId,
    },

    #[error("unknown event category: {0}")]
    #[diagnostic(
        code(wire::unknown_category),
        help("The category field does not name any known callback source.")
    )]
    UnknownCategory(u32),
}
