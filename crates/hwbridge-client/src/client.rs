//! Bridge client: the object the plugin shell owns.
//!
//! All methods take `&self` and are safe to call from the render thread.
//! Setters only touch local state; [`BridgeClient::process`] is the single
//! blocking call and bounds its wait by the configured I/O timeout.

use crate::config::BridgeConfig;
use crate::connection::{Connection, ConnectionManager, ConnectionState};
use crate::error::Result;
use crate::events::{EventQueue, HostTransport, TransportTracker};
use crate::exchange;
use crate::protocol::{MidiMessage, OUTPUT_CHANNELS};
use crate::state::ControlState;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// State shared between the client and its connection thread.
pub(crate) struct BridgeShared {
    pub config: BridgeConfig,
    pub connection: Connection,
    pub control: Mutex<ControlState>,
    pub events: EventQueue,
    pub tracker: Mutex<TransportTracker>,
}

pub struct BridgeClient {
    shared: Arc<BridgeShared>,
    manager: Option<ConnectionManager>,
}

impl BridgeClient {
    /// Validate `config` and start the background connection thread.
    pub fn start(config: BridgeConfig) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(BridgeShared {
            config,
            connection: Connection::new(),
            control: Mutex::new(ControlState::new()),
            events: EventQueue::new(),
            tracker: Mutex::new(TransportTracker::new()),
        });
        let manager = ConnectionManager::spawn(Arc::clone(&shared))?;

        Ok(Self {
            shared,
            manager: Some(manager),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.shared.config
    }

    pub fn set_port(&self, port: u8) {
        self.shared.control.lock().set_port(port);
    }

    pub fn set_sample_rate(&self, sample_rate: u32) {
        self.shared.control.lock().set_sample_rate(sample_rate);
    }

    /// Unit-range parameter value. Out-of-range indices are ignored.
    pub fn set_param(&self, index: usize, value: f32) {
        self.shared.control.lock().set_param(index, value);
    }

    pub fn port(&self) -> u8 {
        self.shared.control.lock().port()
    }

    pub fn sample_rate(&self) -> u32 {
        self.shared.control.lock().sample_rate()
    }

    /// Last value set locally, or 0.0 for an out-of-range index.
    pub fn param(&self, index: usize) -> f32 {
        self.shared.control.lock().param(index)
    }

    pub fn push_midi(&self, msg: MidiMessage) {
        self.shared.events.push(msg);
    }

    pub fn push_clock(&self) {
        self.shared.events.push_clock();
    }

    pub fn push_start(&self) {
        self.shared.events.push_start();
    }

    pub fn push_continue(&self) {
        self.shared.events.push_continue();
    }

    pub fn push_stop(&self) {
        self.shared.events.push_stop();
    }

    /// MIDI messages waiting for the next exchanged block.
    pub fn pending_midi(&self) -> usize {
        self.shared.events.len()
    }

    /// Feed this block's host transport so start/stop/continue and clock
    /// messages are queued ahead of its audio.
    pub fn update_transport(&self, transport: HostTransport, frames: usize) {
        let sample_rate = self.sample_rate() as f64;
        self.shared
            .tracker
            .lock()
            .update(transport, frames, sample_rate, &self.shared.events);
    }

    /// Exchange one block: `input` holds `frames * INPUT_CHANNELS` samples,
    /// `output` receives `frames * OUTPUT_CHANNELS`.
    ///
    /// Never fails; the output is silent while disconnected or after an
    /// I/O error, which also schedules a reconnect.
    pub fn process(&self, input: &[f32], output: &mut [f32], frames: usize) {
        exchange::process(&self.shared, input, output, frames);
    }

    /// Allocating variant of [`BridgeClient::process`].
    pub fn process_block(&self, input: &[f32], frames: usize) -> Vec<f32> {
        let mut output = vec![0.0; frames * OUTPUT_CHANNELS];
        self.process(input, &mut output, frames);
        output
    }

    pub fn is_ready(&self) -> bool {
        self.shared.connection.is_ready()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.shared.connection.state()
    }

    /// Block the calling thread until the handshake completes or `timeout` passes.
    ///
    /// Not for the render thread.
    pub fn wait_until_ready(&self, timeout: Duration) -> bool {
        self.shared.connection.wait_until_ready(timeout)
    }

    /// Stop reconnecting, close the socket and join the connection thread.
    pub fn shutdown(&mut self) {
        if let Some(mut manager) = self.manager.take() {
            self.shared.connection.request_shutdown();
            manager.join();
        }
    }
}

impl Drop for BridgeClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}
