/*!
 * Core Types
 * Common scalar types used across the client
 */

/// Process ID of the process that issued the intercepted operation
pub type Pid = u32;

/// Thread ID type
pub type Tid = u32;

/// Correlation identifier linking a reply to its originating request.
/// Assigned by the driver side; scoped to one connection, never global.
pub type CorrelationId = u64;

/// Address type for mapped memory
pub type Address = usize;

/// Size type for buffer and payload lengths
pub type Size = usize;
