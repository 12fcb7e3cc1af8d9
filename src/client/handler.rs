use log::{debug, error, info, warn};
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;

use crate::client::SessionState;
use crate::client::session::SessionContext;
use crate::protocol::{
    CommandStatus, Frame, LineBuffer, StatusReply, format_response, handle_command, parse_command,
};
use crate::server::events::ServerEvent;
use crate::transfer::{ChannelEvent, TransferOutcome};

const READ_CHUNK: usize = 1024;

/// Runs one FTP control session until the client quits or disconnects.
///
/// - Greets the client with `220`.
/// - Reassembles command lines from the raw byte stream and dispatches
///   each one with `handle_command`.
/// - Relays data channel notifications onto the control connection.
///
/// Data channel events and client commands are multiplexed on the same task,
/// so the session state never needs a lock.
pub async fn handle_client(
    stream: TcpStream,
    client_addr: SocketAddr,
    ctx: SessionContext,
) -> Result<(), std::io::Error> {
    let (mut read_half, mut write_half) = stream.into_split();
    let (channel_tx, mut channel_rx) = mpsc::unbounded_channel();
    let mut state = SessionState::new(client_addr, channel_tx);
    let mut lines = LineBuffer::new(ctx.config.max_command_length);
    let mut buf = [0u8; READ_CHUNK];

    write_half
        .write_all(StatusReply::ServiceReady.line().as_bytes())
        .await?;
    write_half.flush().await?;

    loop {
        tokio::select! {
            read = read_half.read(&mut buf) => {
                let n = match read {
                    Ok(0) => {
                        info!("Connection closed by client {}", client_addr);
                        break;
                    }
                    Ok(n) => n,
                    Err(e) => {
                        warn!("Failed to read from {}: {}", client_addr, e);
                        break;
                    }
                };

                lines.extend(&buf[..n]);
                while let Some(frame) = lines.next_frame() {
                    let line = match frame {
                        Frame::Line(line) => line,
                        Frame::Overlong => {
                            write_half
                                .write_all(format_response(500, "Command too long.").as_bytes())
                                .await?;
                            continue;
                        }
                    };

                    let command = parse_command(&line);
                    info!("Received from {}: {:?}", client_addr, command);

                    let result = handle_command(&mut state, &command, &ctx);
                    if let Some(msg) = &result.message {
                        debug!("Sending response to client {}: {}", client_addr, msg.trim_end());
                        write_half.write_all(msg.as_bytes()).await?;
                    }

                    match result.status {
                        CommandStatus::CloseConnection => {
                            info!("Client {} requested to quit", client_addr);
                            write_half.shutdown().await?;
                            return Ok(());
                        }
                        CommandStatus::Failure(reason) => {
                            debug!("{} failed for {}: {}", command.verb(), client_addr, reason);
                        }
                        CommandStatus::Success => {}
                    }
                }
            }
            Some(event) = channel_rx.recv() => {
                relay_channel_event(&mut state, event, &ctx, &mut write_half).await?;
            }
        }
    }

    if lines.pending() > 0 {
        debug!(
            "Discarding {} unterminated bytes from {}",
            lines.pending(),
            client_addr
        );
    }

    Ok(())
}

/// Turns a data channel notification into control replies and server events.
///
/// Notifications from a channel that a later PASV already replaced are
/// dropped, so they can never consume the current channel's upload target.
async fn relay_channel_event(
    state: &mut SessionState,
    event: ChannelEvent,
    ctx: &SessionContext,
    writer: &mut OwnedWriteHalf,
) -> Result<(), std::io::Error> {
    let port = event.port();
    if state.data_channel().map(|channel| channel.port()) != Some(port) {
        debug!(
            "Ignoring stale event from data port {} for client {}",
            port,
            state.peer()
        );
        return Ok(());
    }

    match event {
        ChannelEvent::Connected { peer, .. } => {
            debug!(
                "Data connection from {} on port {} for client {}",
                peer,
                port,
                state.peer()
            );
            writer
                .write_all(StatusReply::ClosingDataConnection.line().as_bytes())
                .await
        }
        ChannelEvent::Closed {
            payload, outcome, ..
        } => {
            if !state.release_data_channel(port) {
                return Ok(());
            }
            let upload = state.take_pending_upload();

            if let TransferOutcome::Aborted(reason) = outcome {
                warn!(
                    "Transfer on port {} for client {} aborted: {}",
                    port,
                    state.peer(),
                    reason
                );
                return writer
                    .write_all(StatusReply::TransferAborted.line().as_bytes())
                    .await;
            }

            let reply = match &upload {
                Some(path) => match ctx.filesystem.write_file(path, &payload) {
                    Ok(()) => {
                        info!(
                            "Stored {} bytes at {} for client {}",
                            payload.len(),
                            path,
                            state.peer()
                        );
                        StatusReply::ClosingDataConnection
                    }
                    Err(e) => {
                        error!("Failed to store {} for client {}: {}", path, state.peer(), e);
                        StatusReply::LocalError
                    }
                },
                None => StatusReply::ClosingDataConnection,
            };
            writer.write_all(reply.line().as_bytes()).await?;

            // no subscribers is fine
            let _ = ctx.events.send(ServerEvent::Data {
                peer: state.peer(),
                path: upload,
                payload,
            });
            Ok(())
        }
    }
}
