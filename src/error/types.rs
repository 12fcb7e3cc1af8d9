//! Error types
//!
//! Defines domain-specific error types for each module of the FTP server.

use std::io;

use thiserror::Error;

/// Authentication module errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    #[error("User not found: {0}")]
    UserNotFound(String),
}

/// Storage module errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Path traversal attempt: {0}")]
    PathTraversal(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Transfer module errors
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("No available port for data connection")]
    NoAvailablePort,
    #[error("Failed to configure listener: {0}")]
    ListenerConfigurationFailed(io::Error),
    #[error("Data channel already closed")]
    ChannelClosed,
    #[error("A transfer is already queued on this data channel")]
    TransferPending,
}

/// Errors raised while starting or running the server itself
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind control socket {0}: {1}")]
    Bind(String, io::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
