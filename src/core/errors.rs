/*!
 * Error Types
 * Centralized re-exports of the per-subsystem error enums
 */

// Re-export ChannelError from the channel module
pub use crate::channel::ChannelError;

// Re-export DecodeError from the wire module
pub use crate::wire::DecodeError;

// Re-export SubscriptionError and HandlerError from the subscription module
pub use crate::subscription::{HandlerError, SubscriptionError};

// Re-export MapError from the bridge module
pub use crate::bridge::MapError;
