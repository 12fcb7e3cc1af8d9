//! pasv-ftpd - Entry Point

use env_logger::{Builder, Env};
use log::{error, info};

use pasv_ftpd::{FtpServer, ServerConfig};

#[tokio::main]
async fn main() {
    // RUST_LOG overrides the default filter
    Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Launching FTP server...");

    let config = match ServerConfig::load("config") {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let server = match FtpServer::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("Server startup failed: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.listen().await {
        error!("Server stopped: {}", e);
        std::process::exit(1);
    }
}
