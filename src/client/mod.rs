//! Client session management
//!
//! Runs the per-connection FTP command state machine.

pub mod handler;
pub mod session;
pub mod state;

pub use handler::handle_client;
pub use session::SessionContext;
pub use state::SessionState;
