/*!
 * Memory Bridge
 * Mapping-lifecycle enforcement above any backend
 */

use super::backend::MdlBackend;
use super::types::{BufferHandle, MapError, MapResult, Mapping};
use crate::core::types::{Address, Pid};
use ahash::RandomState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

struct ActiveMapping {
    base: Address,
    owner: Pid,
}

/// Maps kernel-described buffers into the calling process.
///
/// Shared by all listener threads: concurrent `map`/`unmap` calls for
/// distinct handles are safe, while the active-mapping registry rejects an
/// overlapping map of the same handle. Double-unmap and unmap-without-map
/// fail with `MapError::InvalidHandle`, never silently.
#[derive(Clone)]
pub struct MemoryBridge {
    backend: Arc<dyn MdlBackend>,
    active: Arc<DashMap<BufferHandle, ActiveMapping, RandomState>>,
}

impl MemoryBridge {
    #[must_use]
    pub fn new(backend: Arc<dyn MdlBackend>) -> Self {
        Self {
            backend,
            active: Arc::new(DashMap::with_hasher(RandomState::new())),
        }
    }

    /// Map the buffer named by `handle` into the caller's address space.
    ///
    /// The mapping is valid only while the originating kernel operation is
    /// pending: map, inspect, and unmap strictly inside the handler body,
    /// before the reply goes out.
    pub fn map(&self, handle: BufferHandle, owner: Pid, offset: usize) -> MapResult<Mapping> {
        if handle.is_null() {
            return Err(MapError::InvalidHandle(handle));
        }
        match self.active.entry(handle) {
            Entry::Occupied(_) => {
                warn!(%handle, owner, "rejected overlapping map");
                Err(MapError::AlreadyMapped(handle))
            }
            Entry::Vacant(slot) => {
                let region = self.backend.map(handle, owner, offset)?;
                slot.insert(ActiveMapping {
                    base: region.base,
                    owner,
                });
                debug!(%handle, owner, base = region.base, len = region.bytes.len(), "buffer mapped");
                Ok(Mapping {
                    handle,
                    base: region.base,
                    owner,
                    bytes: region.bytes,
                    _not_send: PhantomData,
                })
            }
        }
    }

    /// Release a mapping, exactly once.
    ///
    /// Consumes the descriptor; a handle with no active mapping (double
    /// unmap, never mapped) or a descriptor that does not match the active
    /// mapping is a detected `InvalidHandle` error.
    pub fn unmap(&self, mapping: Mapping) -> MapResult<()> {
        let handle = mapping.handle;
        let Some((_, active)) = self.active.remove(&handle) else {
            warn!(%handle, "unmap of a handle with no active mapping");
            return Err(MapError::InvalidHandle(handle));
        };
        if active.base != mapping.base {
            // Stale descriptor for an older view of the same handle
            self.active.insert(handle, active);
            warn!(%handle, "unmap with a stale mapping descriptor");
            return Err(MapError::InvalidHandle(handle));
        }
        debug!(%handle, base = mapping.base, "buffer unmapped");
        self.backend.unmap(handle, mapping.base)
    }

    /// Number of currently active mappings
    #[must_use]
    pub fn active_mappings(&self) -> usize {
        self.active.len()
    }
}
