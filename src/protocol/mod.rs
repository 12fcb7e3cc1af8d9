//! FTP Protocol implementation
//!
//! Handles FTP command framing, parsing, dispatch and reply encoding.

pub mod commands;
pub mod handlers;
pub mod parser;
pub mod responses;

pub use commands::{Command, CommandResult, CommandStatus, parse_command};
pub use handlers::handle_command;
pub use parser::{Frame, LineBuffer};
pub use responses::{PassiveReply, StatusReply, format_response};
