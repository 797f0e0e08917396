//! Bridge client configuration.

use crate::error::{BridgeError, Result};
use crate::protocol::{DEFAULT_HOST, DEFAULT_PORT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub host: String,
    pub port: u16,
    /// Pause before every connect attempt, and poll interval while connected.
    pub retry_interval_ms: u64,
    pub connect_timeout_ms: u64,
    /// Deadline for the welcome send and for each block's whole exchange
    /// (lock wait, send and receive together). Defaults to the retry interval
    /// so a hung engine costs at most one backoff interval of silence.
    pub io_timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            retry_interval_ms: 250,
            connect_timeout_ms: 1000,
            io_timeout_ms: 250,
        }
    }
}

impl BridgeConfig {
    /// Default config pointed at another port on the loopback host.
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(BridgeError::InvalidConfig("host is empty".to_string()));
        }
        if self.port == 0 {
            return Err(BridgeError::InvalidConfig("port must be non-zero".to_string()));
        }
        if self.retry_interval_ms == 0 {
            return Err(BridgeError::InvalidConfig(
                "retry_interval_ms must be non-zero".to_string(),
            ));
        }
        // Zero durations are rejected by the socket timeout setters.
        if self.connect_timeout_ms == 0 || self.io_timeout_ms == 0 {
            return Err(BridgeError::InvalidConfig(format!(
                "timeouts must be non-zero (connect {}ms, io {}ms)",
                self.connect_timeout_ms, self.io_timeout_ms
            )));
        }
        Ok(())
    }
}
