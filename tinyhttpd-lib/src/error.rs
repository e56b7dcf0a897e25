use std::net::SocketAddr;

use thiserror::Error;

/// Errors that can occur while running the server
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("No private key found in key file")]
    NoPrivateKey,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Telemetry error: {0}")]
    Telemetry(String),

    #[error("Server shutdown timed out with {active} connection(s) still in flight")]
    ShutdownTimeout { active: usize },
}

pub type Result<T> = std::result::Result<T, ServerError>;
