/*!
 * fltbridge Library
 * User-mode client for the kernel event-interception framework
 */

pub mod bridge;
pub mod channel;
pub mod config;
pub mod core;
pub mod driver;
pub mod monitoring;
pub mod policy;
pub mod subscription;
pub mod wire;

// Re-exports
pub use bridge::{BufferHandle, InMemoryBackend, MapError, Mapping, MdlBackend, MemoryBridge};
pub use channel::{ChannelError, LoopbackHub, MessageChannel, PortConnector, PortHandle};
pub use config::ClientConfig;
pub use driver::{DriverLoader, SimulatedDriver};
pub use monitoring::init_tracing;
pub use policy::FilterPolicy;
pub use subscription::{
    EventHandler, EventSubscription, HandlerError, ReplyContext, SubscriptionState,
};
pub use wire::{
    DecodeError, EventCategoryId, EventPayload, FileIoInfo, MessageEnvelope, NtStatus,
    ReplyEnvelope,
};
