/*!
 * Mapping Backends
 * The ioctl seam below the memory bridge, plus the in-process simulation
 */

use super::types::{BufferHandle, MapError, MapResult};
use crate::core::types::{Address, Pid};
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A region returned by a backend `map` call
pub struct MappedRegion {
    pub base: Address,
    pub bytes: Arc<[u8]>,
}

/// Maps and unmaps kernel-described buffers.
///
/// The production implementation issues driver ioctls; tests and the demo
/// binary use `InMemoryBackend`. Implementations must support concurrent
/// calls for distinct handles; per-handle exclusivity is enforced above, by
/// the bridge.
pub trait MdlBackend: Send + Sync {
    fn map(&self, handle: BufferHandle, owner: Pid, offset: usize) -> MapResult<MappedRegion>;

    fn unmap(&self, handle: BufferHandle, base: Address) -> MapResult<()>;
}

struct BufferFixture {
    owner: Pid,
    bytes: Arc<[u8]>,
}

/// In-process backend over fixture buffers.
///
/// Stands in for the driver side: the simulated driver registers a buffer
/// under a handle before injecting the operation that references it.
pub struct InMemoryBackend {
    buffers: DashMap<BufferHandle, BufferFixture, RandomState>,
    next_base: AtomicUsize,
}

// Simulated user-mode base for mapped views
const MAP_BASE: usize = 0x7f00_0000_0000;

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffers: DashMap::with_hasher(RandomState::new()),
            next_base: AtomicUsize::new(MAP_BASE),
        }
    }

    /// Register a fixture buffer under `handle`, owned by `owner`
    pub fn insert_buffer(&self, handle: BufferHandle, owner: Pid, bytes: Vec<u8>) {
        self.buffers.insert(
            handle,
            BufferFixture {
                owner,
                bytes: bytes.into(),
            },
        );
    }

    /// Drop the fixture, as the kernel does when the operation completes
    pub fn remove_buffer(&self, handle: BufferHandle) {
        self.buffers.remove(&handle);
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MdlBackend for InMemoryBackend {
    fn map(&self, handle: BufferHandle, owner: Pid, offset: usize) -> MapResult<MappedRegion> {
        let fixture = self
            .buffers
            .get(&handle)
            .ok_or(MapError::InvalidHandle(handle))?;
        if fixture.owner != owner {
            return Err(MapError::ProcessNotFound(owner));
        }
        if offset > fixture.bytes.len() {
            return Err(MapError::OffsetOutOfRange {
                offset,
                size: fixture.bytes.len(),
            });
        }
        let view: Arc<[u8]> = if offset == 0 {
            fixture.bytes.clone()
        } else {
            fixture.bytes[offset..].into()
        };
        let base = self.next_base.fetch_add(view.len().max(1), Ordering::Relaxed);
        Ok(MappedRegion { base, bytes: view })
    }

    fn unmap(&self, handle: BufferHandle, _base: Address) -> MapResult<()> {
        // The fixture stays registered; only the view goes away
        if self.buffers.contains_key(&handle) {
            Ok(())
        } else {
            Err(MapError::InvalidHandle(handle))
        }
    }
}
