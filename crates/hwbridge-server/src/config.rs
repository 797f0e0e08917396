//! Engine server configuration.

use hwbridge_client::protocol::{DEFAULT_HOST, DEFAULT_PORT};
use hwbridge_client::{BridgeError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Largest block accepted in one `AudioProcess` request.
    pub max_frames: u32,
    /// Keep a log of every received message and all non-parameter MIDI.
    /// Both grow with every block, so leave off for long-running engines.
    pub record: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("{}:{}", DEFAULT_HOST, DEFAULT_PORT),
            max_frames: 65536,
            record: false,
        }
    }
}

impl ServerConfig {
    /// Recording engine on an OS-assigned loopback port, for tests and tooling.
    pub fn ephemeral() -> Self {
        Self {
            bind_addr: format!("{}:0", DEFAULT_HOST),
            record: true,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.bind_addr.is_empty() {
            return Err(BridgeError::InvalidConfig("bind_addr is empty".to_string()));
        }
        if self.max_frames == 0 {
            return Err(BridgeError::InvalidConfig(
                "max_frames must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
