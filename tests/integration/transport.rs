//! Host transport turned into MIDI realtime messages.
//!
//! Uses 32768 Hz, 120 BPM and 512-frame blocks so every block is exactly
//! 1/32 beat (0.75 clock pulses) and the clock arithmetic stays exact.

use crate::helpers::*;
use hwbridge::prelude::*;

const SAMPLE_RATE: u32 = 32768;
const FRAMES: usize = 512;
const BEATS_PER_BLOCK: f64 = 1.0 / 32.0;

fn playing(beat: f64) -> HostTransport {
    HostTransport {
        playing: true,
        beat,
        tempo: 120.0,
    }
}

fn stopped(beat: f64) -> HostTransport {
    HostTransport {
        playing: false,
        beat,
        tempo: 120.0,
    }
}

fn render(client: &BridgeClient, transport: HostTransport) {
    client.update_transport(transport, FRAMES);
    client.process_block(&ramp(FRAMES, INPUT_CHANNELS), FRAMES);
}

fn setup() -> (TestEngine, BridgeClient) {
    let engine = TestEngine::start();
    let client = engine.client();
    client.set_sample_rate(SAMPLE_RATE);
    (engine, client)
}

#[test]
fn test_play_from_start() {
    let (engine, client) = setup();
    render(&client, playing(0.0));

    assert_eq!(
        engine.state().midi,
        vec![
            MidiMessage::start(),
            MidiMessage::continue_(),
            MidiMessage::clock(),
        ]
    );
}

#[test]
fn test_resume_mid_song_sends_continue_only() {
    let (engine, client) = setup();
    render(&client, playing(4.0));

    // 96 pulses in, the block covers pulse 97
    assert_eq!(
        engine.state().midi,
        vec![MidiMessage::continue_(), MidiMessage::clock()]
    );
}

#[test]
fn test_stop_sends_single_stop() {
    let (engine, client) = setup();
    render(&client, playing(4.0));
    render(&client, stopped(4.0 + BEATS_PER_BLOCK));
    render(&client, stopped(4.0 + BEATS_PER_BLOCK));

    let midi = engine.state().midi.clone();
    assert_eq!(midi.last(), Some(&MidiMessage::stop()));
    assert_eq!(midi.iter().filter(|m| **m == MidiMessage::stop()).count(), 1);
}

#[test]
fn test_stopped_transport_sends_nothing() {
    let (engine, client) = setup();
    for _ in 0..4 {
        render(&client, stopped(0.0));
    }
    assert!(engine.state().midi.is_empty());
}

#[test]
fn test_one_beat_of_clocks() {
    let (engine, client) = setup();
    for block in 0..32 {
        render(&client, playing(block as f64 * BEATS_PER_BLOCK));
    }

    let midi = engine.state().midi.clone();
    let clocks = midi.iter().filter(|m| **m == MidiMessage::clock()).count();
    assert_eq!(clocks, 24);
    assert_eq!(midi[0], MidiMessage::start());
}
