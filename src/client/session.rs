//! Client session context
//!
//! Server-wide collaborators every control session needs.

use std::sync::Arc;

use crate::auth::UserRegistry;
use crate::server::config::ServerConfig;
use crate::server::events::EventSender;
use crate::storage::FileSystem;
use crate::transfer::PortAllocator;

/// Shared handles passed to each control session.
#[derive(Clone)]
pub struct SessionContext {
    pub config: Arc<ServerConfig>,
    pub allocator: PortAllocator,
    pub filesystem: Arc<dyn FileSystem>,
    pub users: Arc<UserRegistry>,
    pub events: EventSender,
}
