//! Error types for the bridge client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge connection failed: {0}")]
    ConnectFailed(String),

    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timeout after {duration_ms}ms: {operation}")]
    Timeout { operation: String, duration_ms: u64 },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Wrap an I/O failure from a send or receive on the bridge socket.
    ///
    /// Timeouts keep their own variant so callers can tell a hung peer from a closed one.
    pub(crate) fn transport(operation: &str, err: std::io::Error, timeout_ms: u64) -> Self {
        match err.kind() {
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => BridgeError::Timeout {
                operation: operation.to_string(),
                duration_ms: timeout_ms,
            },
            _ => BridgeError::Transport(format!("{}: {}", operation, err)),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
