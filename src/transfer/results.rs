//! Transfer result types
//!
//! Defines the notifications a data channel sends back to its owning session.

use std::net::SocketAddr;

/// How a data connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The peer closed its side normally.
    Completed,
    /// The connection failed mid-transfer; the payload may be truncated.
    Aborted(String),
}

/// Lifecycle notifications emitted by a [`DataChannel`](super::DataChannel).
#[derive(Debug)]
pub enum ChannelEvent {
    /// The single inbound data connection was accepted.
    Connected { port: u16, peer: SocketAddr },
    /// The data connection is gone and the listening port has been released.
    Closed {
        port: u16,
        payload: Vec<u8>,
        outcome: TransferOutcome,
    },
}

impl ChannelEvent {
    pub fn port(&self) -> u16 {
        match self {
            ChannelEvent::Connected { port, .. } | ChannelEvent::Closed { port, .. } => *port,
        }
    }
}
