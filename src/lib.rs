//! # hwbridge - Hardware Audio Bridge
//!
//! Connects an audio plugin to an external audio engine over TCP.
//!
//! ## Architecture
//!
//! hwbridge is an umbrella crate over:
//! - **hwbridge-client** - Plugin side: wire codec, connection manager, state
//!   synchronizer, MIDI event queue and the per-block audio exchange
//! - **hwbridge-server** - Engine side: reference server that terminates the
//!   protocol and echoes audio (feature `server`)
//!
//! ## Quick Start
//!
//! ```ignore
//! use hwbridge::prelude::*;
//!
//! let client = BridgeClient::start(BridgeConfig::default())?;
//! client.set_param(0, 0.5);
//!
//! // In the render callback
//! client.process(&input, &mut output, frames);
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Client plus reference engine
//! - `server` - Reference engine (`BridgeServer`, `EchoEngine`)

pub use hwbridge_client as client;
pub use hwbridge_client::{
    BridgeClient, BridgeConfig, BridgeError, ConnectionState, HostTransport, MidiMessage, Result,
};

#[cfg(feature = "server")]
pub use hwbridge_server as server;

pub mod prelude {
    pub use hwbridge_client::{
        BridgeClient, BridgeConfig, BridgeError, ConnectionState, HostTransport, MidiMessage,
        Result, INPUT_CHANNELS, OUTPUT_CHANNELS, PARAM_COUNT,
    };

    #[cfg(feature = "server")]
    pub use hwbridge_server::{BridgeServer, EchoEngine, Engine, ServerConfig};
}
