//! Engine-side state and audio processing.

use hwbridge_client::protocol::{MIDI_CONTROL_CHANGE, PARAM_COUNT};
use hwbridge_client::{MidiMessage, INPUT_CHANNELS, OUTPUT_CHANNELS};

/// One decoded client message, in arrival order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Received {
    Hello,
    Port(u8),
    SampleRate(u32),
    Midi(MidiMessage),
    Audio { frames: u32 },
}

/// What the engine currently believes the client's state to be.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub port: u8,
    pub sample_rate: u32,
    /// Last CC value per parameter controller.
    pub controls: [u8; PARAM_COUNT],
    /// MIDI other than parameter CCs.
    pub midi: Vec<MidiMessage>,
    pub blocks: u64,
    pub connections: u64,
    pub log: Vec<Received>,
    record: bool,
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new(false)
    }
}

impl EngineState {
    /// With `record` off, `midi` and `log` stay empty.
    pub fn new(record: bool) -> Self {
        Self {
            port: 0,
            sample_rate: 44100,
            controls: [0; PARAM_COUNT],
            midi: Vec::new(),
            blocks: 0,
            connections: 0,
            log: Vec::new(),
            record,
        }
    }

    pub fn apply(&mut self, msg: Received) {
        match msg {
            Received::Hello => self.connections += 1,
            Received::Port(port) => self.port = port,
            Received::SampleRate(rate) => self.sample_rate = rate,
            Received::Midi(midi) => {
                if midi.status == MIDI_CONTROL_CHANGE && (midi.data1 as usize) < PARAM_COUNT {
                    self.controls[midi.data1 as usize] = midi.data2;
                } else if self.record {
                    self.midi.push(midi);
                }
            }
            Received::Audio { .. } => self.blocks += 1,
        }
        if self.record {
            self.log.push(msg);
        }
    }

    /// Messages received since (and including) the most recent handshake.
    pub fn current_session(&self) -> &[Received] {
        let start = self
            .log
            .iter()
            .rposition(|m| *m == Received::Hello)
            .unwrap_or(0);
        &self.log[start..]
    }
}

/// Audio processing run for every `AudioProcess` block.
///
/// `input` holds `frames * INPUT_CHANNELS` interleaved samples; `output` must be
/// filled with `frames * OUTPUT_CHANNELS`.
pub trait Engine: Send {
    fn process(&mut self, input: &[f32], output: &mut [f32], frames: usize);

    fn set_sample_rate(&mut self, _sample_rate: u32) {}
}

/// Returns each input channel on the output channel of the same index.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoEngine;

impl Engine for EchoEngine {
    fn process(&mut self, input: &[f32], output: &mut [f32], frames: usize) {
        let shared = INPUT_CHANNELS.min(OUTPUT_CHANNELS);
        for frame in 0..frames {
            let inp = &input[frame * INPUT_CHANNELS..(frame + 1) * INPUT_CHANNELS];
            let out = &mut output[frame * OUTPUT_CHANNELS..(frame + 1) * OUTPUT_CHANNELS];
            out[..shared].copy_from_slice(&inp[..shared]);
            out[shared..].fill(0.0);
        }
    }
}
