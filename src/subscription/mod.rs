/*!
 * Subscription Module
 * Event categories bound to channels, served by dedicated listener threads
 */

pub mod handler;
pub mod listener;
pub mod types;

// Re-export for convenience
pub use handler::{EventHandler, ReplyContext};
pub use listener::EventSubscription;
pub use types::{HandlerError, SubscriptionError, SubscriptionState, SubscriptionStats};
