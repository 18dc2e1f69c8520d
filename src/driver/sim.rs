/*!
 * Simulated Driver
 * In-process stand-in for the kernel-mode event producer
 *
 * Registers one port per event category on a loopback hub, owns the fixture
 * buffer backend, and injects intercepted operations the way the driver
 * pushes them: one framed message, then a stall until the reply arrives.
 */

use crate::bridge::{BufferHandle, InMemoryBackend};
use crate::channel::{ChannelError, ChannelResult, DriverPort, LoopbackHub};
use crate::core::types::{CorrelationId, Pid};
use crate::wire::{EventCategoryId, FileIoInfo, MessageEnvelope, ReplyEnvelope};
use ahash::RandomState;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

const ALL_CATEGORIES: [EventCategoryId; 4] = [
    EventCategoryId::PreRead,
    EventCategoryId::PostRead,
    EventCategoryId::PreWrite,
    EventCategoryId::PostWrite,
];

pub struct SimulatedDriver {
    ports: DashMap<EventCategoryId, DriverPort, RandomState>,
    backend: Arc<InMemoryBackend>,
    next_correlation: AtomicU64,
    next_buffer: AtomicU64,
}

impl SimulatedDriver {
    /// Register all category ports on `hub`
    pub fn install(hub: &LoopbackHub, backend: Arc<InMemoryBackend>) -> Self {
        let ports = DashMap::with_hasher(RandomState::new());
        for category in ALL_CATEGORIES {
            ports.insert(category, hub.register(category.channel_name()));
        }
        debug!("simulated driver installed");
        Self {
            ports,
            backend,
            next_correlation: AtomicU64::new(1),
            next_buffer: AtomicU64::new(1),
        }
    }

    /// The backend listeners should hand to their `MemoryBridge`
    #[must_use]
    pub fn backend(&self) -> &Arc<InMemoryBackend> {
        &self.backend
    }

    /// Describe a kernel buffer so a later injected operation can carry its
    /// handle
    pub fn register_buffer(&self, owner: Pid, bytes: Vec<u8>) -> BufferHandle {
        let handle = BufferHandle::from_raw(self.next_buffer.fetch_add(1, Ordering::Relaxed));
        self.backend.insert_buffer(handle, owner, bytes);
        handle
    }

    /// Push one intercepted operation and stall until the listener replies,
    /// exactly like the kernel-side caller
    pub fn inject(
        &self,
        category: EventCategoryId,
        process_id: Pid,
        path: &str,
        size: u32,
        buffer_handle: BufferHandle,
    ) -> ChannelResult<ReplyEnvelope<FileIoInfo>> {
        let correlation_id = self.next_correlation();
        let envelope = MessageEnvelope {
            correlation_id,
            category,
            payload: FileIoInfo::new(process_id, path, size, buffer_handle),
        };
        let reply_frame = self.port(category)?.send(envelope.encode())?;
        ReplyEnvelope::decode(&reply_frame)
            .map_err(|e| ChannelError::ReplyFailed(format!("undecodable reply: {e}")))
    }

    /// Push a raw frame without waiting for a reply. Used to exercise the
    /// listener's handling of malformed frames, which are dropped unreplied.
    pub fn inject_raw(&self, category: EventCategoryId, frame: Bytes) -> ChannelResult<()> {
        self.port(category)?.push(frame)
    }

    /// Tear all category ports down; every listener sees `Closed`
    pub fn teardown(&self) {
        self.ports.clear();
        debug!("simulated driver torn down");
    }

    fn next_correlation(&self) -> CorrelationId {
        self.next_correlation.fetch_add(1, Ordering::Relaxed)
    }

    fn port(
        &self,
        category: EventCategoryId,
    ) -> ChannelResult<dashmap::mapref::one::Ref<'_, EventCategoryId, DriverPort, RandomState>>
    {
        self.ports
            .get(&category)
            .ok_or_else(|| ChannelError::Closed(format!("{category} port torn down")))
    }
}
