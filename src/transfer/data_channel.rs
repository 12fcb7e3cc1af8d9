//! Module `data_channel`
//!
//! A one-shot passive-mode data endpoint. Each PASV command opens a fresh
//! [`DataChannel`] on a newly reserved port. The channel accepts exactly one
//! inbound connection, stops listening as soon as it has it, buffers every
//! received chunk in arrival order and reports back to its owning session
//! through a [`ChannelEvent`] stream.

use log::{debug, error, info, warn};
use std::net::IpAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::TransferError;
use crate::transfer::port_allocator::{PortAllocator, PortReservation};
use crate::transfer::results::{ChannelEvent, TransferOutcome};

/// Sending half used by channels to notify their session.
pub type ChannelEventSender = mpsc::UnboundedSender<ChannelEvent>;

/// Lifecycle of a data channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Listening,
    Connected,
    Closed,
}

/// Handle to a passive data channel owned by a single control session.
///
/// Dropping the handle tears the channel down and frees its port.
#[derive(Debug)]
pub struct DataChannel {
    port: u16,
    state: watch::Receiver<ChannelState>,
    outbound: mpsc::Sender<Vec<u8>>,
    task: JoinHandle<()>,
}

impl DataChannel {
    /// Reserves a port, starts listening on it and spawns the channel task.
    pub fn open(
        allocator: &PortAllocator,
        host: IpAddr,
        buffer_size: usize,
        events: ChannelEventSender,
    ) -> Result<Self, TransferError> {
        let (reservation, listener) = allocator.reserve(host)?;
        let port = reservation.port();

        listener
            .set_nonblocking(true)
            .map_err(TransferError::ListenerConfigurationFailed)?;
        let listener =
            TcpListener::from_std(listener).map_err(TransferError::ListenerConfigurationFailed)?;

        let (state_tx, state_rx) = watch::channel(ChannelState::Listening);
        let (outbound_tx, outbound_rx) = mpsc::channel(1);

        let task = tokio::spawn(run_channel(ChannelTask {
            listener,
            reservation,
            state: state_tx,
            outbound: outbound_rx,
            events,
            buffer_size: buffer_size.max(1),
        }));

        info!("Data channel listening on {}:{}", host, port);

        Ok(Self {
            port,
            state: state_rx,
            outbound: outbound_tx,
            task,
        })
    }

    /// Port the channel listens on.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    /// Queues `payload` to be written to the peer once it is connected.
    ///
    /// The write half is shut down after the payload has been sent, which
    /// marks end-of-file for the client. Only one payload is accepted per
    /// connection; once it has been taken, further sends fail with
    /// [`TransferError::ChannelClosed`].
    pub fn send(&self, payload: Vec<u8>) -> Result<(), TransferError> {
        self.outbound.try_send(payload).map_err(|e| match e {
            TrySendError::Full(_) => TransferError::TransferPending,
            TrySendError::Closed(_) => TransferError::ChannelClosed,
        })
    }

    /// Resolves once the channel has reached [`ChannelState::Closed`].
    pub async fn wait_closed(&mut self) {
        let _ = self
            .state
            .wait_for(|state| *state == ChannelState::Closed)
            .await;
    }
}

impl Drop for DataChannel {
    fn drop(&mut self) {
        if !self.task.is_finished() {
            debug!("Tearing down data channel on port {}", self.port);
        }
        self.task.abort();
    }
}

struct ChannelTask {
    listener: TcpListener,
    reservation: PortReservation,
    state: watch::Sender<ChannelState>,
    outbound: mpsc::Receiver<Vec<u8>>,
    events: ChannelEventSender,
    buffer_size: usize,
}

async fn run_channel(task: ChannelTask) {
    let ChannelTask {
        listener,
        reservation,
        state,
        mut outbound,
        events,
        buffer_size,
    } = task;
    let port = reservation.port();

    let (stream, peer) = match listener.accept().await {
        Ok(accepted) => accepted,
        Err(e) => {
            error!("Failed to accept data connection on port {}: {}", port, e);
            drop(listener);
            drop(reservation);
            state.send_replace(ChannelState::Closed);
            let _ = events.send(ChannelEvent::Closed {
                port,
                payload: Vec::new(),
                outcome: TransferOutcome::Aborted(e.to_string()),
            });
            return;
        }
    };

    // Single connection per channel.
    drop(listener);
    state.send_replace(ChannelState::Connected);
    info!("Data connection from {} accepted on port {}", peer, port);
    let _ = events.send(ChannelEvent::Connected { port, peer });

    let (payload, outcome) = pump(stream, &mut outbound, buffer_size).await;

    match &outcome {
        TransferOutcome::Completed => {
            info!(
                "Data connection on port {} closed after {} bytes",
                port,
                payload.len()
            );
        }
        TransferOutcome::Aborted(reason) => {
            warn!("Data connection on port {} aborted: {}", port, reason);
        }
    }

    drop(reservation);
    state.send_replace(ChannelState::Closed);
    let _ = events.send(ChannelEvent::Closed {
        port,
        payload,
        outcome,
    });
}

/// Reads until the peer closes, writing any queued outbound payload on the way.
async fn pump(
    mut stream: TcpStream,
    outbound: &mut mpsc::Receiver<Vec<u8>>,
    buffer_size: usize,
) -> (Vec<u8>, TransferOutcome) {
    let mut chunks: Vec<Vec<u8>> = Vec::new();
    let mut buf = vec![0u8; buffer_size];
    let mut awaiting_outbound = true;

    loop {
        tokio::select! {
            read = stream.read(&mut buf) => match read {
                Ok(0) => return (chunks.concat(), TransferOutcome::Completed),
                Ok(n) => chunks.push(buf[..n].to_vec()),
                Err(e) => return (chunks.concat(), TransferOutcome::Aborted(e.to_string())),
            },
            queued = outbound.recv(), if awaiting_outbound => {
                // one outbound transfer per connection
                awaiting_outbound = false;
                outbound.close();
                if let Some(bytes) = queued {
                    debug!("Sending {} bytes over data connection", bytes.len());
                    if let Err(e) = write_and_finish(&mut stream, &bytes).await {
                        return (chunks.concat(), TransferOutcome::Aborted(e.to_string()));
                    }
                }
            }
        }
    }
}

async fn write_and_finish(stream: &mut TcpStream, bytes: &[u8]) -> std::io::Result<()> {
    stream.write_all(bytes).await?;
    stream.flush().await?;
    stream.shutdown().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, SocketAddr};
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    fn test_allocator() -> PortAllocator {
        let probe = std::net::TcpListener::bind((LOCALHOST, 0)).unwrap();
        let start = probe.local_addr().unwrap().port();
        drop(probe);
        PortAllocator::new(start, start.saturating_add(200))
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<ChannelEvent>) -> ChannelEvent {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for channel event")
            .expect("event stream ended")
    }

    #[tokio::test]
    async fn test_payload_is_concatenated_in_arrival_order() {
        let allocator = test_allocator();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut channel = DataChannel::open(&allocator, LOCALHOST, 4, tx).unwrap();
        let addr = SocketAddr::new(LOCALHOST, channel.port());
        assert_eq!(channel.state(), ChannelState::Listening);

        let mut client = TcpStream::connect(addr).await.unwrap();
        assert!(matches!(next_event(&mut rx).await, ChannelEvent::Connected { .. }));

        client.write_all(b"hello ").await.unwrap();
        client.write_all(b"data channel").await.unwrap();
        drop(client);

        match next_event(&mut rx).await {
            ChannelEvent::Closed {
                port,
                payload,
                outcome,
            } => {
                assert_eq!(port, addr.port());
                assert_eq!(payload, b"hello data channel");
                assert_eq!(outcome, TransferOutcome::Completed);
            }
            other => panic!("unexpected event {:?}", other),
        }

        channel.wait_closed().await;
        assert_eq!(channel.state(), ChannelState::Closed);
        assert!(!allocator.is_reserved(addr.port()));
        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_second_connection_is_refused() {
        let allocator = test_allocator();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let channel = DataChannel::open(&allocator, LOCALHOST, 1024, tx).unwrap();
        let addr = SocketAddr::new(LOCALHOST, channel.port());

        let _first = TcpStream::connect(addr).await.unwrap();
        assert!(matches!(next_event(&mut rx).await, ChannelEvent::Connected { .. }));

        assert!(TcpStream::connect(addr).await.is_err());
        assert_eq!(channel.state(), ChannelState::Connected);
    }

    #[tokio::test]
    async fn test_outbound_payload_is_written_then_closed() {
        let allocator = test_allocator();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let channel = DataChannel::open(&allocator, LOCALHOST, 1024, tx).unwrap();
        channel.send(b"file contents".to_vec()).unwrap();
        assert!(matches!(
            channel.send(b"more".to_vec()),
            Err(TransferError::TransferPending)
        ));

        let mut client = TcpStream::connect(SocketAddr::new(LOCALHOST, channel.port()))
            .await
            .unwrap();
        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"file contents");
        drop(client);

        assert!(matches!(next_event(&mut rx).await, ChannelEvent::Connected { .. }));
        match next_event(&mut rx).await {
            ChannelEvent::Closed {
                payload, outcome, ..
            } => {
                assert!(payload.is_empty());
                assert_eq!(outcome, TransferOutcome::Completed);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_second_send_after_transfer_is_rejected() {
        let allocator = test_allocator();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let channel = DataChannel::open(&allocator, LOCALHOST, 1024, tx).unwrap();

        let mut client = TcpStream::connect(SocketAddr::new(LOCALHOST, channel.port()))
            .await
            .unwrap();
        assert!(matches!(next_event(&mut rx).await, ChannelEvent::Connected { .. }));

        channel.send(b"first".to_vec()).unwrap();
        let mut received = Vec::new();
        timeout(Duration::from_secs(5), client.read_to_end(&mut received))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, b"first");

        assert_eq!(channel.state(), ChannelState::Connected);
        assert!(matches!(
            channel.send(b"second".to_vec()),
            Err(TransferError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_dropping_unused_channel_frees_port() {
        let allocator = test_allocator();
        let (tx, _rx) = mpsc::unbounded_channel();
        let channel = DataChannel::open(&allocator, LOCALHOST, 1024, tx).unwrap();
        let port = channel.port();
        assert!(allocator.is_reserved(port));

        drop(channel);
        for _ in 0..50 {
            if !allocator.is_reserved(port) {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        assert!(!allocator.is_reserved(port));
    }
}
