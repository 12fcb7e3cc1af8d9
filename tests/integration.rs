use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use pasv_ftpd::protocol::PassiveReply;
use pasv_ftpd::server::EventReceiver;
use pasv_ftpd::{FtpServer, ServerConfig, ServerEvent};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::{sleep, timeout};

const WAIT: Duration = Duration::from_secs(5);

// Helper to start a server on an OS-assigned control port
async fn start_server(root: &Path, data_port_min: u16) -> (SocketAddr, EventReceiver) {
    start_server_with(ServerConfig {
        control_port: 0,
        server_root: root.to_string_lossy().into_owned(),
        data_port_min,
        data_port_max: data_port_min + 400,
        ..ServerConfig::default()
    })
    .await
}

async fn start_server_with(config: ServerConfig) -> (SocketAddr, EventReceiver) {
    let server = Arc::new(FtpServer::bind(config).await.unwrap());
    let events = server.subscribe();
    let addr = server.local_addr().unwrap();

    tokio::spawn(async move { server.listen().await });
    (addr, events)
}

struct ControlClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl ControlClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer,
        }
    }

    async fn reply(&mut self) -> String {
        let mut line = String::new();
        timeout(WAIT, self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for reply")
            .unwrap();
        line
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    // Helper to send command and read response
    async fn command(&mut self, command: &str) -> String {
        self.send_raw(format!("{}\r\n", command).as_bytes()).await;
        self.reply().await
    }

    async fn pasv(&mut self) -> SocketAddr {
        let reply = self.command("PASV").await;
        assert!(reply.starts_with("227 Entering Passive Mode ("), "{}", reply);
        SocketAddr::V4(PassiveReply::parse(&reply).unwrap())
    }
}

async fn next_event(events: &mut EventReceiver) -> ServerEvent {
    timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for server event")
        .unwrap()
}

async fn next_data_event(events: &mut EventReceiver) -> ServerEvent {
    loop {
        let event = next_event(events).await;
        if matches!(event, ServerEvent::Data { .. }) {
            return event;
        }
    }
}

#[tokio::test]
async fn test_greeting_and_user() {
    let root = tempfile::tempdir().unwrap();
    let (addr, _events) = start_server(root.path(), 20000).await;

    let mut client = ControlClient::connect(addr).await;
    assert_eq!(client.reply().await, "220 Service ready for new user.\r\n");
    assert_eq!(
        client.command("USER anything").await,
        "230 User logged in, proceed.\r\n"
    );
}

#[tokio::test]
async fn test_type_replies() {
    let root = tempfile::tempdir().unwrap();
    let (addr, _events) = start_server(root.path(), 20500).await;

    let mut client = ControlClient::connect(addr).await;
    client.reply().await;
    assert_eq!(client.command("TYPE A").await, "200 Command okay.\r\n");
    assert_eq!(client.command("TYPE I").await, "200 Command okay.\r\n");
}

#[tokio::test]
async fn test_passive_upload_end_to_end() {
    let root = tempfile::tempdir().unwrap();
    let (addr, mut events) = start_server(root.path(), 21000).await;

    let mut client = ControlClient::connect(addr).await;
    assert!(client.reply().await.starts_with("220 Service ready"));
    assert!(matches!(
        next_event(&mut events).await,
        ServerEvent::Connection { .. }
    ));
    assert!(client.command("USER bob").await.starts_with("230 User logged in"));

    let data_addr = client.pasv().await;
    let mut data = TcpStream::connect(data_addr).await.unwrap();
    data.write_all(b"hello").await.unwrap();
    drop(data);

    assert_eq!(client.reply().await, "226 Closing data connection.\r\n");
    assert_eq!(client.reply().await, "226 Closing data connection.\r\n");

    match next_data_event(&mut events).await {
        ServerEvent::Data { payload, path, .. } => {
            assert_eq!(payload, b"hello");
            assert_eq!(path, None);
        }
        other => panic!("unexpected event {:?}", other),
    }

    assert!(TcpStream::connect(data_addr).await.is_err());
}

#[tokio::test]
async fn test_stor_persists_payload() {
    let root = tempfile::tempdir().unwrap();
    let (addr, mut events) = start_server(root.path(), 21500).await;

    let mut client = ControlClient::connect(addr).await;
    client.reply().await;
    client.command("USER alice").await;
    let data_addr = client.pasv().await;
    assert_eq!(
        client.command("STOR upload.bin").await,
        "150 File status okay about to open data connection.\r\n"
    );

    let mut data = TcpStream::connect(data_addr).await.unwrap();
    data.write_all(b"first chunk,").await.unwrap();
    sleep(Duration::from_millis(20)).await;
    data.write_all(b"second chunk").await.unwrap();
    drop(data);

    assert!(client.reply().await.starts_with("226"));
    assert!(client.reply().await.starts_with("226"));

    match next_data_event(&mut events).await {
        ServerEvent::Data { payload, path, .. } => {
            assert_eq!(payload, b"first chunk,second chunk");
            assert_eq!(path.as_deref(), Some("/upload.bin"));
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(
        std::fs::read(root.path().join("upload.bin")).unwrap(),
        b"first chunk,second chunk"
    );
}

#[tokio::test]
async fn test_retr_and_list_stream_to_client() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("notes.txt"), b"some notes").unwrap();
    std::fs::create_dir(root.path().join("pub")).unwrap();
    let (addr, _events) = start_server(root.path(), 22000).await;

    let mut client = ControlClient::connect(addr).await;
    client.reply().await;

    let data_addr = client.pasv().await;
    let mut data = TcpStream::connect(data_addr).await.unwrap();
    assert!(client.reply().await.starts_with("226"));
    assert!(client.command("RETR notes.txt").await.starts_with("150"));
    let mut received = Vec::new();
    timeout(WAIT, data.read_to_end(&mut received)).await.unwrap().unwrap();
    assert_eq!(received, b"some notes");
    drop(data);
    assert!(client.reply().await.starts_with("226"));

    let data_addr = client.pasv().await;
    let mut data = TcpStream::connect(data_addr).await.unwrap();
    assert!(client.reply().await.starts_with("226"));
    assert!(client.command("LIST").await.starts_with("150"));
    let mut listing = String::new();
    timeout(WAIT, data.read_to_string(&mut listing)).await.unwrap().unwrap();
    assert_eq!(listing, "notes.txt\r\npub/\r\n");
    drop(data);
    assert!(client.reply().await.starts_with("226"));
}

#[tokio::test]
async fn test_commands_split_and_merged_across_segments() {
    let root = tempfile::tempdir().unwrap();
    let (addr, _events) = start_server(root.path(), 22500).await;

    let mut client = ControlClient::connect(addr).await;
    client.reply().await;

    client.send_raw(b"US").await;
    sleep(Duration::from_millis(50)).await;
    client.send_raw(b"ER bob\r\nTYPE I\r\nTY").await;
    sleep(Duration::from_millis(50)).await;
    client.send_raw(b"PE A\r\n").await;

    assert!(client.reply().await.starts_with("230"));
    assert!(client.reply().await.starts_with("200"));
    assert!(client.reply().await.starts_with("200"));
}

#[tokio::test]
async fn test_cwd_missing_directory_sends_single_error() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir(root.path().join("pub")).unwrap();
    let (addr, _events) = start_server(root.path(), 23000).await;

    let mut client = ControlClient::connect(addr).await;
    client.reply().await;

    assert!(client.command("CWD nowhere").await.starts_with("550"));
    assert!(client.command("TYPE I").await.starts_with("200"));
    assert!(client.command("CWD pub").await.starts_with("250"));
}

#[tokio::test]
async fn test_unknown_port_and_quit() {
    let root = tempfile::tempdir().unwrap();
    let (addr, _events) = start_server(root.path(), 23500).await;

    let mut client = ControlClient::connect(addr).await;
    client.reply().await;

    assert!(client.command("FOO bar").await.starts_with("500"));
    assert!(client.command("PORT 127,0,0,1,8,174").await.starts_with("502"));
    assert_eq!(
        client.command("QUIT").await,
        "221 Service closing control connection.\r\n"
    );

    let mut rest = String::new();
    let n = timeout(WAIT, client.reader.read_line(&mut rest))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
async fn test_concurrent_sessions_get_distinct_ports() {
    let root = tempfile::tempdir().unwrap();
    let (addr, _events) = start_server(root.path(), 24000).await;

    let mut first = ControlClient::connect(addr).await;
    let mut second = ControlClient::connect(addr).await;
    first.reply().await;
    second.reply().await;

    let (a, b) = tokio::join!(first.pasv(), second.pasv());
    assert_ne!(a.port(), b.port());

    assert!(TcpStream::connect(a).await.is_ok());
    assert!(TcpStream::connect(b).await.is_ok());
}

#[tokio::test]
async fn test_max_clients_rejects_extra_connection() {
    let root = tempfile::tempdir().unwrap();
    let (addr, _events) = start_server_with(ServerConfig {
        control_port: 0,
        server_root: root.path().to_string_lossy().into_owned(),
        data_port_min: 24500,
        max_clients: 1,
        ..ServerConfig::default()
    })
    .await;

    let mut first = ControlClient::connect(addr).await;
    assert!(first.reply().await.starts_with("220"));

    let mut second = ControlClient::connect(addr).await;
    assert!(second.reply().await.starts_with("421"));
}
