/*!
 * Bridge Module
 * Cross-process memory-mapping of kernel-described buffers
 */

pub mod backend;
pub mod manager;
pub mod types;

// Re-export for convenience
pub use backend::{InMemoryBackend, MappedRegion, MdlBackend};
pub use manager::MemoryBridge;
pub use types::{BufferHandle, MapError, MapResult, Mapping};
