//! Reference engine for hwbridge
//!
//! Terminates the bridge protocol on the engine side: accepts one client at a
//! time, tracks the port, sample rate and controls it is sent, records MIDI and
//! answers each audio block through an [`Engine`]. Used by the `bridge-engine`
//! binary and by the integration tests.

pub mod config;
pub mod engine;
pub mod server;

pub use config::ServerConfig;
pub use engine::{EchoEngine, Engine, EngineState, Received};
pub use server::BridgeServer;

// Re-export shared types from hwbridge-client
pub use hwbridge_client::{BridgeError, MidiMessage, Result};
