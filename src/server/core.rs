use log::{error, info, warn};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::auth::UserRegistry;
use crate::client::{SessionContext, handle_client};
use crate::error::ServerError;
use crate::protocol::StatusReply;
use crate::server::config::ServerConfig;
use crate::server::events::{EventReceiver, EventSender, ServerEvent, event_channel};
use crate::storage::{FileSystem, LocalFileSystem};
use crate::transfer::PortAllocator;

type ClientRegistry = Arc<Mutex<HashMap<SocketAddr, Instant>>>;

/// Top-level FTP server: owns the control listener and spawns one session
/// task per accepted connection.
pub struct FtpServer {
    listener: TcpListener,
    client_registry: ClientRegistry,
    config: Arc<ServerConfig>,
    allocator: PortAllocator,
    filesystem: Arc<dyn FileSystem>,
    users: Arc<UserRegistry>,
    events: EventSender,
}

impl FtpServer {
    /// Binds the control socket described by `config`.
    ///
    /// The server root is created if missing and served through
    /// [`LocalFileSystem`] unless replaced with [`FtpServer::with_filesystem`].
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;

        let socket = config.control_socket();
        let listener = TcpListener::bind(&socket)
            .await
            .map_err(|e| ServerError::Bind(socket.clone(), e))?;
        info!("Server bound to {}", listener.local_addr()?);

        let root = config.server_root_path();
        if let Err(e) = std::fs::create_dir_all(&root) {
            warn!("Failed to create server root directory: {}", e);
        } else {
            info!("Server root directory: {}", root.display());
        }

        let (events, _) = event_channel();

        Ok(Self {
            listener,
            client_registry: Arc::new(Mutex::new(HashMap::new())),
            allocator: PortAllocator::new(config.data_port_min, config.data_port_max),
            filesystem: Arc::new(LocalFileSystem::new(root)),
            users: Arc::new(UserRegistry::new()),
            config: Arc::new(config),
            events,
        })
    }

    /// Replaces the filesystem collaborator used by every session.
    pub fn with_filesystem(mut self, filesystem: Arc<dyn FileSystem>) -> Self {
        self.filesystem = filesystem;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Registers a user.
    pub fn add_user(&self, username: &str, password: &str) {
        self.users.add_user(username, password);
    }

    pub fn users(&self) -> Arc<UserRegistry> {
        Arc::clone(&self.users)
    }

    /// Subscribes to connection and data events.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Accepts control connections forever.
    pub async fn listen(&self) -> Result<(), ServerError> {
        info!(
            "Starting FTP server on {} (max {} clients)",
            self.listener.local_addr()?,
            self.config.max_clients
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let client_registry = Arc::clone(&self.client_registry);
                    let ctx = self.session_context();

                    // Spawn a task for each client so accept loop doesn't block
                    tokio::spawn(async move {
                        if let Err(e) = handle_new_client(stream, addr, client_registry, ctx).await {
                            warn!("Failed to handle client {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }

    fn session_context(&self) -> SessionContext {
        SessionContext {
            config: Arc::clone(&self.config),
            allocator: self.allocator.clone(),
            filesystem: Arc::clone(&self.filesystem),
            users: Arc::clone(&self.users),
            events: self.events.clone(),
        }
    }
}

/// Registers a new client, announces it and runs its session.
async fn handle_new_client(
    mut stream: TcpStream,
    client_addr: SocketAddr,
    client_registry: ClientRegistry,
    ctx: SessionContext,
) -> Result<(), std::io::Error> {
    {
        let mut clients = client_registry.lock().await;
        if clients.len() >= ctx.config.max_clients {
            warn!(
                "Rejecting {}: {} clients already connected",
                client_addr,
                clients.len()
            );
            stream
                .write_all(StatusReply::ServiceNotAvailable.line().as_bytes())
                .await?;
            return Ok(());
        }
        clients.insert(client_addr, Instant::now());
        info!(
            "Client connected: {} ({}/{} clients)",
            client_addr,
            clients.len(),
            ctx.config.max_clients
        );
    }

    let _ = ctx.events.send(ServerEvent::Connection { peer: client_addr });

    let result = handle_client(stream, client_addr, ctx).await;

    let mut clients = client_registry.lock().await;
    if let Some(connected_at) = clients.remove(&client_addr) {
        info!(
            "Client {} disconnected after {:?}",
            client_addr,
            connected_at.elapsed()
        );
    }

    result
}
