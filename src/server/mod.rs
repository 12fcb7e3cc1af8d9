//! Server core functionality
//!
//! This module contains the main server implementation, configuration,
//! and the events published to external subscribers.

pub mod config;
pub mod core;
pub mod events;

pub use self::config::ServerConfig;
pub use self::core::FtpServer;
pub use events::{EventReceiver, ServerEvent};
