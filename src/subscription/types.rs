/*!
 * Subscription Types
 * Lifecycle states, errors, and per-subscription counters
 */

use crate::bridge::MapError;
use crate::channel::ChannelError;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Listener lifecycle. Terminal at `Closed`, no reentry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    /// Channel open succeeded, listener thread not yet running
    Created,
    /// Listener thread parked in receive or dispatching a handler
    Listening,
    /// Unsubscribe requested; current iteration finishing
    Draining,
    /// Listener thread gone, channel closed
    Closed,
}

impl std::fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SubscriptionState::Created => write!(f, "created"),
            SubscriptionState::Listening => write!(f, "listening"),
            SubscriptionState::Draining => write!(f, "draining"),
            SubscriptionState::Closed => write!(f, "closed"),
        }
    }
}

/// Errors that prevent a subscription from starting
#[derive(Error, Debug, Diagnostic)]
pub enum SubscriptionError {
    #[error("subscription could not open its channel")]
    #[diagnostic(
        code(subscription::connection_failed),
        help("Fatal to this subscription's start; reported, not retried. Check that the driver is loaded and exposes the category's port.")
    )]
    ConnectionFailed(#[source] ChannelError),

    #[error("failed to spawn listener thread: {0}")]
    #[diagnostic(
        code(subscription::spawn_failed),
        help("The OS refused a new thread. The channel has been closed again.")
    )]
    SpawnFailed(String),
}

/// Failure inside user handler logic.
///
/// Caught at the loop boundary and converted into a failure-status reply so
/// the kernel side is never left blocked.
#[derive(Error, Debug, Diagnostic)]
pub enum HandlerError {
    #[error("handler failed: {0}")]
    #[diagnostic(code(subscription::handler_failed))]
    Failed(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Map(#[from] MapError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Channel(#[from] ChannelError),
}

/// Per-subscription counters, updated by the listener thread
#[derive(Debug, Default)]
pub(crate) struct SubscriptionCounters {
    pub messages_handled: AtomicU64,
    pub decode_errors: AtomicU64,
    pub forced_replies: AtomicU64,
}

/// Snapshot of a subscription's counters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SubscriptionStats {
    pub messages_handled: u64,
    pub decode_errors: u64,
    pub forced_replies: u64,
}

impl SubscriptionCounters {
    pub(crate) fn snapshot(&self) -> SubscriptionStats {
        SubscriptionStats {
            messages_handled: self.messages_handled.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            forced_replies: self.forced_replies.load(Ordering::Relaxed),
        }
    }
}
