//! Transfer module for FTP server
//!
//! Handles passive-mode port allocation and the lifecycle of data channels.

pub mod data_channel;
pub mod modes;
pub mod port_allocator;
pub mod results;

pub use data_channel::{ChannelEventSender, ChannelState, DataChannel};
pub use modes::TransferType;
pub use port_allocator::{PortAllocator, PortReservation, find_open_port};
pub use results::{ChannelEvent, TransferOutcome};
