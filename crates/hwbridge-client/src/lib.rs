//! Bridge client for hwbridge
//!
//! Keeps a remote audio engine synchronized with local control state and
//! exchanges one audio block (plus any queued MIDI) per host render callback
//! over TCP. A background thread owns connecting, the welcome handshake and
//! reconnecting; the render path never blocks for longer than one round trip.
//!
//! ## Usage
//!
//! ```ignore
//! use hwbridge_client::{BridgeClient, BridgeConfig, HostTransport};
//!
//! let client = BridgeClient::start(BridgeConfig::default())?;
//!
//! // Control thread
//! client.set_port(2);
//! client.set_param(0, 0.5);
//!
//! // Render callback
//! client.set_sample_rate(48000);
//! client.update_transport(HostTransport { playing: true, beat: 0.0, tempo: 120.0 }, frames);
//! client.process(&input, &mut output, frames);
//! ```

pub mod error;
pub use error::{BridgeError, Result};

mod config;
pub use config::BridgeConfig;

pub mod protocol;
pub use protocol::{
    Command, Message, MidiMessage, INPUT_CHANNELS, OUTPUT_CHANNELS, PARAM_COUNT, PORT_COUNT,
};

mod state;
pub use state::{ControlState, ControlUpdates};

mod events;
pub use events::{clock_ticks, EventQueue, HostTransport, MidiBatch, TransportTracker};

mod transport;
pub use transport::{BridgeStream, Link};

mod connection;
pub use connection::ConnectionState;

mod exchange;

mod client;
pub use client::BridgeClient;
