//! Local control state mirrored to the engine.
//!
//! Each field remembers whether it changed since it was last handed out for
//! transmission. Setters never perform I/O; the audio exchange collects the
//! dirty fields under the exchange lock and sends them ahead of the next block.

use crate::protocol::{Message, MidiMessage, PARAM_COUNT};
use smallvec::SmallVec;

/// Updates produced by one flush or resync. Fits every field without spilling.
pub type ControlUpdates = SmallVec<[Message; PARAM_COUNT + 2]>;

const DEFAULT_SAMPLE_RATE: u32 = 44100;

#[derive(Debug, Clone)]
pub struct ControlState {
    port: u8,
    port_dirty: bool,
    sample_rate: u32,
    sample_rate_dirty: bool,
    params: [f32; PARAM_COUNT],
    params_dirty: [bool; PARAM_COUNT],
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            port: 0,
            port_dirty: false,
            sample_rate: DEFAULT_SAMPLE_RATE,
            sample_rate_dirty: false,
            params: [0.0; PARAM_COUNT],
            params_dirty: [false; PARAM_COUNT],
        }
    }
}

impl ControlState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_port(&mut self, port: u8) {
        if port == self.port {
            return;
        }
        self.port = port;
        self.port_dirty = true;
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        if sample_rate == self.sample_rate {
            return;
        }
        self.sample_rate = sample_rate;
        self.sample_rate_dirty = true;
    }

    /// Out-of-range indices are ignored.
    pub fn set_param(&mut self, index: usize, value: f32) {
        if index >= PARAM_COUNT {
            return;
        }
        let current = self.params[index];
        if current == value || (current.is_nan() && value.is_nan()) {
            return;
        }
        self.params[index] = value;
        self.params_dirty[index] = true;
    }

    pub fn port(&self) -> u8 {
        self.port
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns 0.0 for an out-of-range index.
    pub fn param(&self, index: usize) -> f32 {
        self.params.get(index).copied().unwrap_or(0.0)
    }

    pub fn is_dirty(&self) -> bool {
        self.port_dirty || self.sample_rate_dirty || self.params_dirty.iter().any(|&d| d)
    }

    /// Take every dirty field as a wire update, clearing its flag.
    ///
    /// Order is port, sample rate, then parameters by ascending index; the
    /// engine interprets parameter values against the current port and rate.
    pub fn take_dirty(&mut self) -> ControlUpdates {
        let mut updates = ControlUpdates::new();
        if self.port_dirty {
            self.port_dirty = false;
            updates.push(Message::SetPort(self.port));
        }
        if self.sample_rate_dirty {
            self.sample_rate_dirty = false;
            updates.push(Message::SetSampleRate(self.sample_rate));
        }
        for (index, dirty) in self.params_dirty.iter_mut().enumerate() {
            if *dirty {
                *dirty = false;
                updates.push(param_message(index, self.params[index]));
            }
        }
        updates
    }

    /// Every field as a wire update regardless of dirty flags, clearing all flags.
    ///
    /// Sent after the handshake: port, each parameter, then sample rate.
    pub fn take_all(&mut self) -> ControlUpdates {
        self.port_dirty = false;
        self.sample_rate_dirty = false;
        self.params_dirty = [false; PARAM_COUNT];

        let mut updates = ControlUpdates::new();
        updates.push(Message::SetPort(self.port));
        for (index, &value) in self.params.iter().enumerate() {
            updates.push(param_message(index, value));
        }
        updates.push(Message::SetSampleRate(self.sample_rate));
        updates
    }
}

fn param_message(index: usize, value: f32) -> Message {
    Message::Midi(MidiMessage::control_change(index as u8, value))
}
