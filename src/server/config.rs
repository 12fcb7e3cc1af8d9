//! Server configuration
//!
//! Settings are layered: built-in defaults, then an optional TOML file,
//! then `PASV_FTPD_*` environment variables.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Server configuration structure
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// IP address the control listener binds to
    pub bind_address: String,

    /// Port for the FTP control connection
    pub control_port: u16,

    /// IPv4 address advertised in PASV replies
    pub pasv_address: String,

    /// Passive data ports are allocated upward from `data_port_min`
    pub data_port_min: u16,
    pub data_port_max: u16,

    /// Root directory for FTP operations
    pub server_root: String,

    pub max_clients: usize,
    pub max_command_length: usize,

    /// Read buffer size for data connections
    pub buffer_size: usize,

    /// Reject USER for names that were never registered
    pub enforce_user_registry: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            control_port: 2121,
            pasv_address: "127.0.0.1".to_string(),
            data_port_min: 2222,
            data_port_max: u16::MAX,
            server_root: "./server_root".to_string(),
            max_clients: 10,
            max_command_length: 512,
            buffer_size: 8192,
            enforce_user_registry: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from `path` (extension optional) with environment overrides.
    ///
    /// A missing file is not an error; defaults fill every key not provided.
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("PASV_FTPD").try_parsing(true))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        // data channels bind here and 227 replies can only carry IPv4
        if self.bind_address.parse::<Ipv4Addr>().is_err() {
            return Err(config::ConfigError::Message(format!(
                "bind_address must be an IPv4 address: {}",
                self.bind_address
            )));
        }

        if self.pasv_address.parse::<Ipv4Addr>().is_err() {
            return Err(config::ConfigError::Message(format!(
                "pasv_address must be an IPv4 address: {}",
                self.pasv_address
            )));
        }

        if self.data_port_min == 0 || self.data_port_min > self.data_port_max {
            return Err(config::ConfigError::Message(
                "data_port_min must be non-zero and not above data_port_max".into(),
            ));
        }

        if self.server_root.is_empty() {
            return Err(config::ConfigError::Message(
                "server_root cannot be empty".into(),
            ));
        }

        if self.max_clients == 0 {
            return Err(config::ConfigError::Message(
                "max_clients must be greater than 0".into(),
            ));
        }

        if self.max_command_length == 0 || self.buffer_size == 0 {
            return Err(config::ConfigError::Message(
                "max_command_length and buffer_size must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Get bind address and control port as socket address string
    pub fn control_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.control_port)
    }

    /// Address advertised to clients in 227 replies.
    ///
    /// Only meaningful on a configuration that passed [`validate`](Self::validate).
    pub fn pasv_ip(&self) -> Ipv4Addr {
        self.pasv_address.parse().unwrap_or(Ipv4Addr::UNSPECIFIED)
    }

    /// Address data channels listen on.
    ///
    /// Only meaningful on a configuration that passed [`validate`](Self::validate).
    pub fn data_bind_ip(&self) -> IpAddr {
        IpAddr::V4(self.bind_address.parse().unwrap_or(Ipv4Addr::UNSPECIFIED))
    }

    /// Get server root as PathBuf
    pub fn server_root_path(&self) -> PathBuf {
        PathBuf::from(&self.server_root)
    }
}
