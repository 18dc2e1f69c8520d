/*!
 * Loopback Transport
 * In-process port hub standing in for the OS filter-port primitive
 *
 * The hub pairs a driver-side endpoint with a listener-side transport over
 * rendezvous channels, so the driver side blocks until the listener has
 * received the frame and again until the reply arrives. This reproduces the
 * kernel-side stall semantics the protocol is built around.
 */

use super::transport::{PortConnector, PortTransport};
use super::types::{ChannelError, ChannelResult, PortHandle};
use ahash::RandomState;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;

/// Named in-process ports, shared by the simulated driver and the client
pub struct LoopbackHub {
    ports: DashMap<String, PortSlot, RandomState>,
    next_handle: AtomicU64,
}

/// Listener endpoints parked between `register` and `connect`
struct PortSlot {
    pending: Mutex<Option<ListenerEnd>>,
}

struct ListenerEnd {
    request_rx: flume::Receiver<Bytes>,
    reply_tx: flume::Sender<Bytes>,
    close_tx: flume::Sender<()>,
    close_rx: flume::Receiver<()>,
}

impl LoopbackHub {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ports: DashMap::with_hasher(RandomState::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Register a named port and return its driver-side endpoint.
    ///
    /// Re-registering a name replaces any previous, unconnected endpoint
    /// (driver reload).
    pub fn register(&self, name: &str) -> DriverPort {
        // Rendezvous request channel: at most one message in flight
        let (request_tx, request_rx) = flume::bounded::<Bytes>(0);
        let (reply_tx, reply_rx) = flume::bounded::<Bytes>(1);
        let (close_tx, close_rx) = flume::bounded::<()>(0);

        self.ports.insert(
            name.to_string(),
            PortSlot {
                pending: Mutex::new(Some(ListenerEnd {
                    request_rx,
                    reply_tx,
                    close_tx,
                    close_rx: close_rx.clone(),
                })),
            },
        );
        debug!(port = name, "loopback port registered");

        DriverPort {
            name: name.to_string(),
            request_tx,
            reply_rx,
            close_rx,
        }
    }
}

impl Default for LoopbackHub {
    fn default() -> Self {
        Self::new()
    }
}

impl PortConnector for LoopbackHub {
    fn connect(&self, name: &str) -> ChannelResult<(PortHandle, Box<dyn PortTransport>)> {
        let slot = self
            .ports
            .get(name)
            .ok_or_else(|| ChannelError::ConnectionFailed {
                name: name.to_string(),
                reason: "no such port".to_string(),
            })?;
        let end = slot
            .pending
            .lock()
            .take()
            .ok_or_else(|| ChannelError::ConnectionFailed {
                name: name.to_string(),
                reason: "port already connected".to_string(),
            })?;

        let handle = PortHandle::from_raw(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let transport = LoopbackTransport {
            name: name.to_string(),
            request_rx: end.request_rx,
            reply_tx: end.reply_tx,
            close_tx: Mutex::new(Some(end.close_tx)),
            close_rx: end.close_rx,
            closed: AtomicBool::new(false),
        };
        Ok((handle, Box::new(transport)))
    }
}

/// Driver-side endpoint of one loopback port.
///
/// `send` stalls until the listener replies, exactly like the kernel-side
/// caller of the real framework.
pub struct DriverPort {
    name: String,
    request_tx: flume::Sender<Bytes>,
    reply_rx: flume::Receiver<Bytes>,
    close_rx: flume::Receiver<()>,
}

impl DriverPort {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Push one frame without waiting for a reply.
    ///
    /// Returns once the listener has taken the frame. The real driver uses
    /// this shape for notifications that carry no reply buffer.
    pub fn push(&self, frame: Bytes) -> ChannelResult<()> {
        enum Push {
            Sent(Result<(), flume::SendError<Bytes>>),
            Closed,
        }
        let pushed = flume::Selector::new()
            .send(&self.request_tx, frame, Push::Sent)
            .recv(&self.close_rx, |_| Push::Closed)
            .wait();
        match pushed {
            Push::Sent(Ok(())) => Ok(()),
            Push::Sent(Err(_)) | Push::Closed => Err(ChannelError::Closed(format!(
                "port {} has no listener",
                self.name
            ))),
        }
    }

    /// Push one frame and block until the listener's reply frame arrives
    pub fn send(&self, frame: Bytes) -> ChannelResult<Bytes> {
        self.push(frame)?;

        enum Pull {
            Reply(Result<Bytes, flume::RecvError>),
            Closed,
        }
        let pulled = flume::Selector::new()
            .recv(&self.reply_rx, Pull::Reply)
            .recv(&self.close_rx, |_| Pull::Closed)
            .wait();
        match pulled {
            Pull::Reply(Ok(reply)) => Ok(reply),
            Pull::Reply(Err(_)) | Pull::Closed => Err(ChannelError::Closed(format!(
                "listener on {} went away before replying",
                self.name
            ))),
        }
    }
}

/// Listener-side transport of one loopback port
struct LoopbackTransport {
    name: String,
    request_rx: flume::Receiver<Bytes>,
    reply_tx: flume::Sender<Bytes>,
    // Dropping the sender is what unblocks both sides on close
    close_tx: Mutex<Option<flume::Sender<()>>>,
    close_rx: flume::Receiver<()>,
    closed: AtomicBool,
}

impl PortTransport for LoopbackTransport {
    fn receive(&self) -> ChannelResult<Bytes> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ChannelError::Closed(format!("{} closed locally", self.name)));
        }

        enum Recv {
            Frame(Result<Bytes, flume::RecvError>),
            Shutdown,
        }
        let received = flume::Selector::new()
            .recv(&self.request_rx, Recv::Frame)
            .recv(&self.close_rx, |_| Recv::Shutdown)
            .wait();
        match received {
            Recv::Frame(Ok(frame)) => Ok(frame),
            Recv::Frame(Err(_)) => Err(ChannelError::Closed(format!(
                "{} torn down by the driver",
                self.name
            ))),
            Recv::Shutdown => Err(ChannelError::Closed(format!("{} closed locally", self.name))),
        }
    }

    fn reply(&self, frame: Bytes) -> ChannelResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ChannelError::Closed(format!("{} closed locally", self.name)));
        }
        self.reply_tx
            .send(frame)
            .map_err(|_| ChannelError::ReplyFailed(format!("{} peer disconnected", self.name)))
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(port = %self.name, "loopback transport closing");
        }
        self.close_tx.lock().take();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
