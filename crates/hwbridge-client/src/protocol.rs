//! Wire protocol spoken between the bridge client and the bridge engine.
//!
//! Every message is a one-byte [`Command`] followed by a fixed payload, except the
//! handshake magic which is sent bare. Multi-byte fields use the platform's native
//! byte order, so both ends must share endianness.

/// Handshake magic, sent once right after connecting.
pub const HELLO: u32 = 0xff00_fefe;

/// Number of continuous parameters mirrored to the engine as CC 0..PARAM_COUNT.
pub const PARAM_COUNT: usize = 16;

/// Number of selectable engine ports.
pub const PORT_COUNT: usize = 16;

/// Channels per frame sent with each audio block.
pub const INPUT_CHANNELS: usize = 8;

/// Channels per frame returned for each audio block.
pub const OUTPUT_CHANNELS: usize = 8;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 12512;

pub const MIDI_CONTROL_CHANGE: u8 = 0xb0;
pub const MIDI_CLOCK: u8 = 0xf8;
pub const MIDI_START: u8 = 0xfa;
pub const MIDI_CONTINUE: u8 = 0xfb;
pub const MIDI_STOP: u8 = 0xfc;

/// Command table of the bridge engine.
///
/// The client only ever sends `SetPort`, `MidiMessage`, `SetSampleRate` and
/// `AudioProcess`; the rest exist in the engine's table and are named so they
/// can be recognised on the receiving side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    NoCommand = 0,
    Start = 1,
    Quit = 2,
    SetPort = 3,
    MidiMessage = 4,
    SetSampleRate = 5,
    SetChannels = 6,
    AudioProcess = 7,
    AudioActivate = 8,
    AudioDeactivate = 9,
}

impl Command {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0 => Some(Command::NoCommand),
            1 => Some(Command::Start),
            2 => Some(Command::Quit),
            3 => Some(Command::SetPort),
            4 => Some(Command::MidiMessage),
            5 => Some(Command::SetSampleRate),
            6 => Some(Command::SetChannels),
            7 => Some(Command::AudioProcess),
            8 => Some(Command::AudioActivate),
            9 => Some(Command::AudioDeactivate),
            _ => None,
        }
    }

    /// Size of the fixed payload following the opcode.
    ///
    /// `AudioProcess` reports only its frame-count header; the samples follow.
    pub fn payload_len(self) -> Option<usize> {
        match self {
            Command::SetPort => Some(1),
            Command::MidiMessage => Some(3),
            Command::SetSampleRate => Some(4),
            Command::AudioProcess => Some(4),
            _ => None,
        }
    }
}

/// Raw three-byte MIDI message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MidiMessage {
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
}

impl MidiMessage {
    pub const fn new(status: u8, data1: u8, data2: u8) -> Self {
        Self {
            status,
            data1,
            data2,
        }
    }

    /// Control change on channel 1 carrying a unit-range parameter value.
    pub fn control_change(controller: u8, value: f32) -> Self {
        Self::new(MIDI_CONTROL_CHANGE, controller, param_to_cc(value))
    }

    pub const fn clock() -> Self {
        Self::new(MIDI_CLOCK, 0, 0)
    }

    pub const fn start() -> Self {
        Self::new(MIDI_START, 0, 0)
    }

    pub const fn continue_() -> Self {
        Self::new(MIDI_CONTINUE, 0, 0)
    }

    pub const fn stop() -> Self {
        Self::new(MIDI_STOP, 0, 0)
    }

    /// Missing trailing bytes are zero.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut data = [0u8; 3];
        let len = bytes.len().min(3);
        data[..len].copy_from_slice(&bytes[..len]);
        Self::new(data[0], data[1], data[2])
    }

    pub fn as_bytes(&self) -> [u8; 3] {
        [self.status, self.data1, self.data2]
    }
}

/// Scale a unit-range parameter to a 7-bit controller value.
pub fn param_to_cc(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * 127.0).round() as u8
}

/// Client to engine message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message {
    Hello,
    SetPort(u8),
    SetSampleRate(u32),
    Midi(MidiMessage),
    /// Header only; the input samples are appended separately.
    AudioProcess { frames: u32 },
}

impl Message {
    /// Append the wire form of this message to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        match *self {
            Message::Hello => buf.extend_from_slice(&HELLO.to_ne_bytes()),
            Message::SetPort(port) => {
                buf.push(Command::SetPort as u8);
                buf.push(port);
            }
            Message::SetSampleRate(rate) => {
                buf.push(Command::SetSampleRate as u8);
                buf.extend_from_slice(&rate.to_ne_bytes());
            }
            Message::Midi(msg) => {
                buf.push(Command::MidiMessage as u8);
                buf.extend_from_slice(&msg.as_bytes());
            }
            Message::AudioProcess { frames } => {
                buf.push(Command::AudioProcess as u8);
                buf.extend_from_slice(&frames.to_ne_bytes());
            }
        }
    }

    pub fn encoded_len(&self) -> usize {
        match self {
            Message::Hello => 4,
            Message::SetPort(_) => 2,
            Message::SetSampleRate(_) | Message::AudioProcess { .. } => 5,
            Message::Midi(_) => 4,
        }
    }
}

/// Append `frames * channels` samples from `samples`, zero-padding a short slice.
pub fn encode_samples(samples: &[f32], frames: usize, channels: usize, buf: &mut Vec<u8>) {
    let count = frames * channels;
    let available = samples.len().min(count);
    buf.reserve(count * 4);
    for sample in &samples[..available] {
        buf.extend_from_slice(&sample.to_ne_bytes());
    }
    for _ in available..count {
        buf.extend_from_slice(&0.0f32.to_ne_bytes());
    }
}

/// Decode native-endian f32 samples from `bytes` into `out`.
///
/// Decodes `min(out.len(), bytes.len() / 4)` samples and returns that count.
pub fn decode_samples(bytes: &[u8], out: &mut [f32]) -> usize {
    let mut written = 0;
    for (chunk, slot) in bytes.chunks_exact(4).zip(out.iter_mut()) {
        *slot = f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        written += 1;
    }
    written
}
