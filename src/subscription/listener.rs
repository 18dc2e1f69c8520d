/*!
 * Event Subscription
 * One event category bound to one channel, served by a dedicated thread
 */

use super::handler::{EventHandler, ReplyContext};
use super::types::{SubscriptionCounters, SubscriptionError, SubscriptionState, SubscriptionStats};
use crate::channel::{ChannelError, MessageChannel, PortConnector};
use crate::wire::{EventCategoryId, EventPayload, MessageEnvelope, NtStatus, ReplyHeader, REPLY_HEADER_SIZE};
use bytes::BytesMut;
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn};

/// A running listener for one event category.
///
/// Owns its channel exclusively (through the listener thread); the only
/// shared state across subscriptions is the memory bridge handlers may use.
pub struct EventSubscription<T: EventPayload> {
    category: EventCategoryId,
    channel: Arc<MessageChannel>,
    state: Arc<Mutex<SubscriptionState>>,
    counters: Arc<SubscriptionCounters>,
    thread: Option<JoinHandle<()>>,
    _payload: PhantomData<fn() -> T>,
}

impl<T: EventPayload> std::fmt::Debug for EventSubscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSubscription")
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

impl<T: EventPayload> EventSubscription<T> {
    /// Open a dedicated channel for `category` and start the listener.
    ///
    /// Fails only on channel open or thread spawn; everything after is
    /// scoped to individual messages.
    pub fn subscribe<H>(
        category: EventCategoryId,
        connector: &dyn PortConnector,
        handler: H,
    ) -> Result<Self, SubscriptionError>
    where
        H: EventHandler<T>,
    {
        let channel = Arc::new(
            MessageChannel::open(connector, category.channel_name())
                .map_err(SubscriptionError::ConnectionFailed)?,
        );
        let state = Arc::new(Mutex::new(SubscriptionState::Created));
        let counters = Arc::new(SubscriptionCounters::default());

        let spawned = {
            let channel = Arc::clone(&channel);
            let state = Arc::clone(&state);
            let counters = Arc::clone(&counters);
            thread::Builder::new()
                .name(format!("flt-{}", category))
                .spawn(move || listen_loop::<T, H>(category, &channel, &handler, &state, &counters))
        };
        let thread = match spawned {
            Ok(thread) => thread,
            Err(e) => {
                channel.close();
                return Err(SubscriptionError::SpawnFailed(e.to_string()));
            }
        };

        info!(%category, port = category.channel_name(), "subscribed");
        Ok(Self {
            category,
            channel,
            state,
            counters,
            thread: Some(thread),
            _payload: PhantomData,
        })
    }

    #[must_use]
    pub fn category(&self) -> EventCategoryId {
        self.category
    }

    #[must_use]
    pub fn state(&self) -> SubscriptionState {
        *self.state.lock()
    }

    #[must_use]
    pub fn stats(&self) -> SubscriptionStats {
        self.counters.snapshot()
    }

    /// Stop listening: close the channel to unblock a parked receive, then
    /// join the listener thread. Returns once the thread is gone.
    pub fn unsubscribe(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        {
            let mut state = self.state.lock();
            if *state == SubscriptionState::Closed {
                return;
            }
            *state = SubscriptionState::Draining;
        }
        self.channel.close();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!(category = %self.category, "listener thread panicked");
            }
        }
        *self.state.lock() = SubscriptionState::Closed;
        info!(category = %self.category, "unsubscribed");
    }
}

impl<T: EventPayload> Drop for EventSubscription<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn listen_loop<T, H>(
    category: EventCategoryId,
    channel: &MessageChannel,
    handler: &H,
    state: &Mutex<SubscriptionState>,
    counters: &SubscriptionCounters,
) where
    T: EventPayload,
    H: EventHandler<T>,
{
    {
        let mut st = state.lock();
        // Unsubscribe may have won the race before the thread got here
        if *st == SubscriptionState::Created {
            *st = SubscriptionState::Listening;
        }
    }
    info!(%category, "listener running");

    loop {
        let frame = match channel.receive() {
            Ok(frame) => frame,
            Err(ChannelError::Closed(reason)) => {
                info!(%category, %reason, "channel closed, listener draining");
                break;
            }
            Err(e) => {
                error!(%category, error = %e, "receive failed, listener stopping");
                break;
            }
        };

        let envelope = match MessageEnvelope::<T>::decode(category, &frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                counters.decode_errors.fetch_add(1, Ordering::Relaxed);
                warn!(%category, error = %e, frame_len = frame.len(), "dropping undecodable frame");
                continue;
            }
        };

        counters.messages_handled.fetch_add(1, Ordering::Relaxed);
        let correlation_id = envelope.correlation_id;
        let mut ctx = ReplyContext::new(channel, correlation_id);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(&mut ctx, &envelope)));
        match &outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(%category, correlation_id, error = %e, "handler failed");
            }
            Err(_) => {
                error!(%category, correlation_id, "handler panicked");
            }
        }

        // An un-replied message permanently stalls the kernel-side
        // operation; force a failure reply echoing the request payload.
        if !ctx.has_replied() {
            counters.forced_replies.fetch_add(1, Ordering::Relaxed);
            let mut buf = BytesMut::with_capacity(REPLY_HEADER_SIZE + T::WIRE_SIZE);
            ReplyHeader {
                correlation_id,
                status: NtStatus::UNSUCCESSFUL,
                payload_size: T::WIRE_SIZE as u32,
            }
            .encode(&mut buf);
            envelope.payload.encode(&mut buf);
            if let Err(e) = channel.reply(correlation_id, buf.freeze()) {
                warn!(%category, correlation_id, error = %e, "forced failure reply not delivered");
            }
        }
    }

    *state.lock() = SubscriptionState::Closed;
}
