/*!
 * Bridge Types
 * Kernel buffer handles, mapping descriptors, and mapping errors
 */

use crate::core::types::{Address, Pid};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

/// Mapping operation result
pub type MapResult<T> = Result<T, MapError>;

/// Opaque name of a kernel memory descriptor.
///
/// Kernel-owned; valid only for the duration of the originating operation
/// and never interchangeable with other handle types. User mode only ever
/// borrows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferHandle(u64);

impl BufferHandle {
    pub const NULL: BufferHandle = BufferHandle(0);

    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn as_raw(&self) -> u64 {
        self.0
    }

    /// True when the operation carries no mappable buffer
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Mapping-lifecycle errors.
///
/// Surfaced to the handler, which must still issue a reply; never fatal to
/// the listener loop.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum MapError {
    #[error("invalid buffer handle: {0}")]
    #[diagnostic(
        code(bridge::invalid_handle),
        help("The handle names no active mapping (double unmap, never mapped, or a stale descriptor). Lifecycle violations are detected, never silent.")
    )]
    InvalidHandle(BufferHandle),

    #[error("buffer {0} is already mapped")]
    #[diagnostic(
        code(bridge::already_mapped),
        help("Map/Unmap for the same handle must never overlap. Unmap the existing mapping first.")
    )]
    AlreadyMapped(BufferHandle),

    #[error("owning process {0} no longer exists")]
    #[diagnostic(
        code(bridge::process_not_found),
        help("The process that issued the intercepted operation is gone; the buffer cannot be mapped.")
    )]
    ProcessNotFound(Pid),

    #[error("offset {offset} out of range for a {size}-byte buffer")]
    #[diagnostic(
        code(bridge::offset_out_of_range),
        help("The requested view starts beyond the end of the kernel-described buffer.")
    )]
    OffsetOutOfRange { offset: usize, size: usize },

    #[error("address space exhausted: cannot map {requested} bytes")]
    #[diagnostic(
        code(bridge::address_space_exhausted),
        help("No address range of the requested size is available in the calling process.")
    )]
    AddressSpaceExhausted { requested: usize },
}

/// A kernel buffer mapped into the calling process.
///
/// Exclusively owned between `map` and `unmap`; `unmap` consumes it, so the
/// mapped bytes cannot be touched afterwards. `!Send` by construction: a
/// mapping never leaves the listener thread that created it, and handlers
/// must unmap before sending their reply.
#[derive(Debug, Clone)]
pub struct Mapping {
    pub(crate) handle: BufferHandle,
    pub(crate) base: Address,
    pub(crate) owner: Pid,
    pub(crate) bytes: Arc<[u8]>,
    pub(crate) _not_send: PhantomData<*const u8>,
}

impl Mapping {
    /// Reconstruct a descriptor from raw parts, e.g. one round-tripped
    /// through a foreign record. The bridge rejects it unless the handle
    /// names an active mapping.
    #[must_use]
    pub fn from_raw_parts(handle: BufferHandle, base: Address, owner: Pid) -> Self {
        Self {
            handle,
            base,
            owner,
            bytes: Vec::new().into(),
            _not_send: PhantomData,
        }
    }

    #[must_use]
    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    #[must_use]
    pub fn base(&self) -> Address {
        self.base
    }

    #[must_use]
    pub fn owner(&self) -> Pid {
        self.owner
    }

    /// The mapped view of the kernel buffer
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
