//! Outgoing MIDI queue and host-transport edge detection.

use crate::protocol::MidiMessage;
use parking_lot::Mutex;
use smallvec::SmallVec;

const MIDI_STACK_CAPACITY: usize = 64;

pub type MidiBatch = SmallVec<[MidiMessage; MIDI_STACK_CAPACITY]>;

/// MIDI clock resolution.
const PULSES_PER_QUARTER: f64 = 24.0;

/// FIFO of MIDI messages waiting for the next audio block.
///
/// Unbounded: while the bridge is disconnected events accumulate rather than
/// being dropped, and are delivered in order once a block goes out.
#[derive(Debug, Default)]
pub struct EventQueue {
    queue: Mutex<MidiBatch>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, msg: MidiMessage) {
        self.queue.lock().push(msg);
    }

    pub fn push_clock(&self) {
        self.push(MidiMessage::clock());
    }

    pub fn push_start(&self) {
        self.push(MidiMessage::start());
    }

    pub fn push_continue(&self) {
        self.push(MidiMessage::continue_());
    }

    pub fn push_stop(&self) {
        self.push(MidiMessage::stop());
    }

    /// Remove and return everything queued, oldest first.
    pub fn drain(&self) -> MidiBatch {
        std::mem::take(&mut *self.queue.lock())
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

/// Host transport sampled once per render callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostTransport {
    pub playing: bool,
    /// Position in quarter notes at the start of the block.
    pub beat: f64,
    /// Beats per minute.
    pub tempo: f64,
}

impl Default for HostTransport {
    fn default() -> Self {
        Self {
            playing: false,
            beat: 0.0,
            tempo: 120.0,
        }
    }
}

/// Turns successive transport samples into MIDI realtime messages.
#[derive(Debug, Default)]
pub struct TransportTracker {
    last_playing: bool,
}

impl TransportTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_playing(&self) -> bool {
        self.last_playing
    }

    /// Queue start/continue/stop on play-state edges, and one clock per
    /// 1/24-beat tick the block covers while playing.
    pub fn update(
        &mut self,
        transport: HostTransport,
        frames: usize,
        sample_rate: f64,
        queue: &EventQueue,
    ) {
        if transport.playing && !self.last_playing {
            if transport.beat == 0.0 {
                queue.push_start();
            }
            queue.push_continue();
        }
        if !transport.playing && self.last_playing {
            queue.push_stop();
        }
        self.last_playing = transport.playing;

        if transport.playing {
            for _ in 0..clock_ticks(transport.beat, transport.tempo, frames, sample_rate) {
                queue.push_clock();
            }
        }
    }
}

/// Number of clock pulses whose tick index falls inside the block.
pub fn clock_ticks(beat: f64, tempo: f64, frames: usize, sample_rate: f64) -> usize {
    if sample_rate <= 0.0 || tempo <= 0.0 || !beat.is_finite() {
        return 0;
    }
    let duration_secs = frames as f64 / sample_rate;
    let pulses = duration_secs * (tempo / 60.0) * PULSES_PER_QUARTER;
    let start = (beat * PULSES_PER_QUARTER).ceil() as i64;
    let end = (beat * PULSES_PER_QUARTER + pulses).ceil() as i64;
    (end - start).max(0) as usize
}
