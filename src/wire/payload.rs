/*!
 * Event Payloads
 * Fixed-layout records mirroring the kernel producer bit-for-bit
 */

use super::types::DecodeError;
use crate::bridge::BufferHandle;
use crate::core::types::{Pid, Tid};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Fixed-width path capacity, in UTF-16 code units
pub const MAX_PATH_UNITS: usize = 260;

/// A fixed-size record carried inside a message envelope.
///
/// The wire layout must match the kernel producer exactly; the runtime
/// `WIRE_SIZE` check in the decode path stands in for what the producer
/// enforces at compile time. Records carry no live pointers, only opaque
/// numeric handles.
pub trait EventPayload: Sized + Send + std::fmt::Debug + 'static {
    /// Exact encoded size in bytes
    const WIRE_SIZE: usize;

    fn encode(&self, buf: &mut BytesMut);

    fn decode(buf: &mut Bytes) -> Result<Self, DecodeError>;
}

/// Intercepted file-I/O operation record.
///
/// Shared by all four file-I/O categories; layout (little-endian):
/// `{process_id: u32, thread_id: u32, size: u32, status: u32,
///   buffer_handle: u64, path: [u16; 260]}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileIoInfo {
    pub process_id: Pid,
    pub thread_id: Tid,
    /// Length of the intercepted transfer, in bytes
    pub size: u32,
    /// Operation status reported by the driver (post-callbacks only)
    pub status: u32,
    /// Opaque kernel buffer descriptor; null when the operation carries
    /// no mappable buffer
    pub buffer_handle: BufferHandle,
    /// NUL-padded UTF-16 path, fixed width
    pub path: [u16; MAX_PATH_UNITS],
}

impl FileIoInfo {
    #[must_use]
    pub fn new(process_id: Pid, path: &str, size: u32, buffer_handle: BufferHandle) -> Self {
        let mut info = Self {
            process_id,
            thread_id: 0,
            size,
            status: 0,
            buffer_handle,
            path: [0; MAX_PATH_UNITS],
        };
        info.set_path(path);
        info
    }

    /// Decode the fixed-width path up to the first NUL
    #[must_use]
    pub fn path(&self) -> String {
        let len = self
            .path
            .iter()
            .position(|&unit| unit == 0)
            .unwrap_or(MAX_PATH_UNITS);
        String::from_utf16_lossy(&self.path[..len])
    }

    /// Store `path` NUL-padded; silently truncated to the fixed width
    pub fn set_path(&mut self, path: &str) {
        self.path = [0; MAX_PATH_UNITS];
        for (slot, unit) in self.path.iter_mut().zip(path.encode_utf16()) {
            *slot = unit;
        }
    }
}

impl EventPayload for FileIoInfo {
    // 4 x u32 + u64 + 260 x u16
    const WIRE_SIZE: usize = 16 + 8 + MAX_PATH_UNITS * 2;

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.process_id);
        buf.put_u32_le(self.thread_id);
        buf.put_u32_le(self.size);
        buf.put_u32_le(self.status);
        buf.put_u64_le(self.buffer_handle.as_raw());
        for unit in &self.path {
            buf.put_u16_le(*unit);
        }
    }

    fn decode(buf: &mut Bytes) -> Result<Self, DecodeError> {
        if buf.remaining() < Self::WIRE_SIZE {
            return Err(DecodeError::TruncatedFrame {
                needed: Self::WIRE_SIZE,
                available: buf.remaining(),
            });
        }
        let process_id = buf.get_u32_le();
        let thread_id = buf.get_u32_le();
        let size = buf.get_u32_le();
        let status = buf.get_u32_le();
        let buffer_handle = BufferHandle::from_raw(buf.get_u64_le());
        let mut path = [0u16; MAX_PATH_UNITS];
        for unit in &mut path {
            *unit = buf.get_u16_le();
        }
        Ok(Self {
            process_id,
            thread_id,
            size,
            status,
            buffer_handle,
            path,
        })
    }
}
