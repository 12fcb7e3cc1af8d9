//! Command handlers module.
//!
//! Defines one handler per FTP command. Handlers mutate the session state
//! and return the reply to send on the control connection; they never
//! perform control-socket I/O themselves.

use log::{error, info, warn};

use crate::client::SessionState;
use crate::client::session::SessionContext;
use crate::error::{AuthError, StorageError};
use crate::protocol::responses::{PassiveReply, StatusReply, format_response};
use crate::protocol::{Command, CommandResult, CommandStatus};
use crate::storage::resolve_virtual_path;
use crate::transfer::{DataChannel, TransferType};

/// Dispatches a parsed FTP command to its handler.
pub fn handle_command(
    state: &mut SessionState,
    command: &Command,
    ctx: &SessionContext,
) -> CommandResult {
    match command {
        Command::User(username) => handle_cmd_user(state, username, ctx),
        Command::Cwd(path) => handle_cmd_cwd(state, path, ctx),
        Command::Type(code) => handle_cmd_type(state, code),
        Command::Pasv => handle_cmd_pasv(state, ctx),
        Command::Stor(filename) => handle_cmd_stor(state, filename),
        Command::Retr(filename) => handle_cmd_retr(state, filename, ctx),
        Command::List(path) => handle_cmd_list(state, path.as_deref(), ctx),
        Command::Quit => handle_cmd_quit(state),
        Command::Port(_) => reply_failure("Active mode not supported", StatusReply::CommandNotImplemented),
        Command::Unknown(verb) => {
            warn!("Unknown command from {}: {:?}", state.peer(), verb);
            reply_failure("Unknown command", StatusReply::CommandUnrecognized)
        }
    }
}

fn reply_success(reply: StatusReply) -> CommandResult {
    CommandResult::success(reply.line())
}

fn reply_failure(reason: &str, reply: StatusReply) -> CommandResult {
    CommandResult::failure(reason, reply.line())
}

/// USER is accepted for any well-formed name unless the registry is enforced.
fn handle_cmd_user(state: &mut SessionState, username: &str, ctx: &SessionContext) -> CommandResult {
    match ctx
        .users
        .validate_user(username, ctx.config.enforce_user_registry)
    {
        Ok(()) => {
            info!("User {} logged in from {}", username, state.peer());
            state.set_username(Some(username.to_string()));
            reply_success(StatusReply::UserLoggedIn)
        }
        Err(AuthError::UserNotFound(name)) => {
            warn!("Rejected unregistered user {} from {}", name, state.peer());
            state.set_username(None);
            reply_failure("Unknown user", StatusReply::NotLoggedIn)
        }
        Err(e) => {
            state.set_username(None);
            CommandResult::failure(
                e.to_string(),
                StatusReply::ParameterSyntaxError.line(),
            )
        }
    }
}

/// CWD changes the working directory only when the target exists.
fn handle_cmd_cwd(state: &mut SessionState, path: &str, ctx: &SessionContext) -> CommandResult {
    if path.is_empty() {
        return reply_failure("Missing directory path", StatusReply::ParameterSyntaxError);
    }

    let target = match resolve_virtual_path(state.current_path(), path) {
        Ok(target) => target,
        Err(e) => {
            error!("CWD path resolution error: {}", e);
            return reply_failure("Invalid path", StatusReply::ActionNotTaken);
        }
    };

    if !ctx.filesystem.path_exists(&target) || !ctx.filesystem.is_directory(&target) {
        return CommandResult::failure(
            "Directory not found",
            StatusReply::ActionNotTaken.line(),
        );
    }

    state.set_current_path(target);
    reply_success(StatusReply::FileActionOkay)
}

/// TYPE A selects ascii, TYPE I binary; other codes leave the mode as is.
fn handle_cmd_type(state: &mut SessionState, code: &str) -> CommandResult {
    if let Some(transfer_type) = TransferType::from_type_code(code) {
        state.set_transfer_type(transfer_type);
    }
    reply_success(StatusReply::CommandOkay)
}

/// PASV always opens a brand new data channel on a fresh port.
fn handle_cmd_pasv(state: &mut SessionState, ctx: &SessionContext) -> CommandResult {
    if state.data_channel().is_some() {
        info!(
            "Replacing existing data channel for client {} with new PASV channel",
            state.peer()
        );
        state.clear_data_channel();
    }

    match DataChannel::open(
        &ctx.allocator,
        ctx.config.data_bind_ip(),
        ctx.config.buffer_size,
        state.channel_events().clone(),
    ) {
        Ok(channel) => {
            let reply = PassiveReply::new(ctx.config.pasv_ip(), channel.port());
            info!("Client {} entering passive mode: {}", state.peer(), reply);
            state.set_data_channel(channel);
            CommandResult::success(reply.line())
        }
        Err(e) => {
            error!("PASV failed for client {}: {}", state.peer(), e);
            CommandResult::failure(e.to_string(), StatusReply::CantOpenDataConnection.line())
        }
    }
}

/// STOR marks the upload target; the bytes are persisted once the data
/// connection closes.
fn handle_cmd_stor(state: &mut SessionState, filename: &str) -> CommandResult {
    if filename.is_empty() {
        return reply_failure("Missing file name", StatusReply::ParameterSyntaxError);
    }

    if state.live_data_channel().is_none() {
        return reply_failure("No data channel", StatusReply::CantOpenDataConnection);
    }

    let target = match resolve_virtual_path(state.current_path(), filename) {
        Ok(target) if target != "/" => target,
        Ok(_) | Err(_) => {
            return reply_failure("Invalid file name", StatusReply::FileNameNotAllowed);
        }
    };

    info!("Client {} uploading to {}", state.peer(), target);
    state.set_pending_upload(Some(target));
    reply_success(StatusReply::FileStatusOkay)
}

fn handle_cmd_retr(state: &mut SessionState, filename: &str, ctx: &SessionContext) -> CommandResult {
    if filename.is_empty() {
        return reply_failure("Missing file name", StatusReply::ParameterSyntaxError);
    }

    let Some(channel) = state.live_data_channel() else {
        return reply_failure("No data channel", StatusReply::CantOpenDataConnection);
    };

    let contents = resolve_virtual_path(state.current_path(), filename)
        .and_then(|target| ctx.filesystem.read_file(&target));

    match contents {
        Ok(bytes) => queue_outbound(channel, bytes),
        Err(e) => storage_failure(e),
    }
}

fn handle_cmd_list(state: &mut SessionState, path: Option<&str>, ctx: &SessionContext) -> CommandResult {
    let Some(channel) = state.live_data_channel() else {
        return reply_failure("No data channel", StatusReply::CantOpenDataConnection);
    };

    let listing = resolve_virtual_path(state.current_path(), path.unwrap_or("."))
        .and_then(|target| ctx.filesystem.list_dir(&target));

    match listing {
        Ok(entries) => {
            let body: String = entries.iter().map(|name| format!("{}\r\n", name)).collect();
            queue_outbound(channel, body.into_bytes())
        }
        Err(e) => storage_failure(e),
    }
}

fn queue_outbound(channel: &DataChannel, bytes: Vec<u8>) -> CommandResult {
    match channel.send(bytes) {
        Ok(()) => reply_success(StatusReply::FileStatusOkay),
        Err(e) => {
            warn!("Cannot queue transfer on port {}: {}", channel.port(), e);
            CommandResult::failure(e.to_string(), StatusReply::CantOpenDataConnection.line())
        }
    }
}

fn storage_failure(e: StorageError) -> CommandResult {
    let message = match &e {
        StorageError::NotFound(path) => format_response(550, &format!("{}: No such file or directory.", path)),
        _ => StatusReply::ActionNotTaken.line(),
    };
    CommandResult::failure(e.to_string(), message)
}

fn handle_cmd_quit(state: &mut SessionState) -> CommandResult {
    state.clear_data_channel();

    CommandResult {
        status: CommandStatus::CloseConnection,
        message: Some(StatusReply::ClosingControlConnection.line()),
    }
}
