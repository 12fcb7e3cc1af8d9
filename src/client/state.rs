//! Module `state`
//!
//! Defines [`SessionState`], the per-connection state of one control
//! session. It is owned by the session task and only mutated by command
//! handlers running on that task.

use std::net::SocketAddr;

use crate::transfer::{ChannelEventSender, ChannelState, DataChannel, TransferType};

/// State of a single control connection.
#[derive(Debug)]
pub struct SessionState {
    peer: SocketAddr,
    username: Option<String>,
    current_path: String,
    transfer_type: TransferType,
    data_channel: Option<DataChannel>,
    pending_upload: Option<String>,
    channel_events: ChannelEventSender,
}

impl SessionState {
    /// Creates a fresh session positioned at the server root.
    pub fn new(peer: SocketAddr, channel_events: ChannelEventSender) -> Self {
        Self {
            peer,
            username: None,
            current_path: "/".to_string(),
            transfer_type: TransferType::default(),
            data_channel: None,
            pending_upload: None,
            channel_events,
        }
    }

    // --------------------
    // Getter methods
    // --------------------

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Returns the current virtual working directory.
    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    pub fn transfer_type(&self) -> TransferType {
        self.transfer_type
    }

    /// Returns the data channel if it can still carry a transfer.
    pub fn live_data_channel(&self) -> Option<&DataChannel> {
        self.data_channel
            .as_ref()
            .filter(|channel| channel.state() != ChannelState::Closed)
    }

    pub fn data_channel(&self) -> Option<&DataChannel> {
        self.data_channel.as_ref()
    }

    pub fn pending_upload(&self) -> Option<&str> {
        self.pending_upload.as_deref()
    }

    /// Sender handed to data channels opened by this session.
    pub fn channel_events(&self) -> &ChannelEventSender {
        &self.channel_events
    }

    // --------------------
    // Setter methods
    // --------------------

    pub fn set_username(&mut self, username: Option<String>) {
        self.username = username;
    }

    pub fn set_current_path(&mut self, path: String) {
        self.current_path = path;
    }

    pub fn set_transfer_type(&mut self, transfer_type: TransferType) {
        self.transfer_type = transfer_type;
    }

    /// Installs a new data channel. Any previous channel is closed and an
    /// upload pending on it is forgotten.
    pub fn set_data_channel(&mut self, channel: DataChannel) {
        self.pending_upload = None;
        self.data_channel = Some(channel);
    }

    /// Closes the current data channel, if any.
    pub fn clear_data_channel(&mut self) {
        self.pending_upload = None;
        self.data_channel = None;
    }

    /// Forgets the channel listening on `port` once it has finished.
    ///
    /// Returns `false` when `port` is not the current channel, e.g. a stale
    /// notification from a channel a later PASV already replaced. The newer
    /// channel is left untouched in that case.
    pub fn release_data_channel(&mut self, port: u16) -> bool {
        let current = self
            .data_channel
            .as_ref()
            .is_some_and(|channel| channel.port() == port);
        if current {
            self.data_channel = None;
        }
        current
    }

    pub fn set_pending_upload(&mut self, path: Option<String>) {
        self.pending_upload = path;
    }

    pub fn take_pending_upload(&mut self) -> Option<String> {
        self.pending_upload.take()
    }
}
