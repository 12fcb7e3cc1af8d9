//! Server events
//!
//! Notifications published to external subscribers (persistence, auditing,
//! tests). Delivery uses a broadcast channel: every subscriber sees every
//! event emitted after it subscribed, and a subscriber that falls more than
//! [`EVENT_CAPACITY`] events behind skips the oldest ones.

use std::net::SocketAddr;
use tokio::sync::broadcast;

/// Events buffered per subscriber before the oldest are dropped.
pub const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A control connection was accepted.
    Connection { peer: SocketAddr },
    /// An inbound data transfer completed.
    ///
    /// `path` is the STOR target the payload was written to, if any.
    Data {
        peer: SocketAddr,
        path: Option<String>,
        payload: Vec<u8>,
    },
}

pub type EventSender = broadcast::Sender<ServerEvent>;
pub type EventReceiver = broadcast::Receiver<ServerEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    broadcast::channel(EVENT_CAPACITY)
}
