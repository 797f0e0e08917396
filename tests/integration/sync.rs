//! Control state and MIDI reaching the engine.

use crate::helpers::*;
use hwbridge::prelude::*;
use hwbridge::server::Received;
use std::io::{Read, Write};
use std::time::Duration;

/// Run one block so everything the client had pending is on the engine.
fn settle(client: &BridgeClient) {
    client.process_block(&ramp(1, INPUT_CHANNELS), 1);
}

#[test]
fn test_offline_changes_arrive_in_welcome() {
    let port = unused_port();
    let client = BridgeClient::start(fast_config(port)).unwrap();

    client.set_port(2);
    client.set_sample_rate(48000);
    client.set_param(0, 1.0);
    client.set_param(5, 0.5);
    client.push_midi(MidiMessage::new(0x90, 60, 100));

    // Nothing to talk to yet
    let output = client.process_block(&ramp(16, INPUT_CHANNELS), 16);
    assert!(output.iter().all(|&s| s == 0.0));
    assert!(!client.is_ready());

    let peer = RawPeer::bind_port(port);
    let (mut stream, welcome) = peer.accept_welcome();
    assert_eq!(welcome.port, 2);
    assert_eq!(welcome.sample_rate, 48000);
    assert_eq!(welcome.controls[0], 127);
    assert_eq!(welcome.controls[5], 64);
    assert!(welcome.controls[1..5].iter().all(|&c| c == 0));
    assert!(client.wait_until_ready(READY_TIMEOUT));

    // No audio was buffered while offline
    stream
        .set_read_timeout(Some(Duration::from_millis(100)))
        .unwrap();
    let mut probe = [0u8; 1];
    assert!(stream.read(&mut probe).is_err());

    // Queued MIDI goes out ahead of the first block
    let frames = 16;
    let peer_thread = std::thread::spawn(move || {
        stream.set_read_timeout(Some(READY_TIMEOUT)).unwrap();
        let mut request = vec![0u8; 4 + audio_request_len(frames)];
        stream.read_exact(&mut request).unwrap();
        stream
            .write_all(&vec![0u8; frames * OUTPUT_CHANNELS * 4])
            .unwrap();
        request
    });
    client.process_block(&ramp(frames, INPUT_CHANNELS), frames);
    let request = peer_thread.join().unwrap();
    assert_eq!(&request[..4], &[4, 0x90, 60, 100]);
    assert_eq!(request[4], 7);
    assert_eq!(&request[5..9], &(frames as u32).to_ne_bytes());
}

#[test]
fn test_unchanged_values_not_resent() {
    let engine = TestEngine::start();
    let client = engine.client();
    settle(&client);
    let n = engine.session_len();

    client.set_param(1, 0.5);
    client.set_param(1, 0.5);
    client.set_port(0);
    client.set_sample_rate(44100);
    settle(&client);

    assert_eq!(
        engine.session_since(n),
        vec![
            Received::Midi(MidiMessage::new(0xb0, 1, 64)),
            Received::Audio { frames: 1 },
        ]
    );
}

#[test]
fn test_changes_flush_before_audio_in_order() {
    let engine = TestEngine::start();
    let client = engine.client();
    settle(&client);
    let n = engine.session_len();

    client.set_param(3, 1.0);
    client.set_param(0, 0.25);
    client.set_sample_rate(48000);
    client.set_port(7);
    client.push_midi(MidiMessage::new(0x90, 64, 90));
    client.process_block(&ramp(2, INPUT_CHANNELS), 2);

    assert_eq!(
        engine.session_since(n),
        vec![
            Received::Port(7),
            Received::SampleRate(48000),
            Received::Midi(MidiMessage::new(0xb0, 0, 32)),
            Received::Midi(MidiMessage::new(0xb0, 3, 127)),
            Received::Midi(MidiMessage::new(0x90, 64, 90)),
            Received::Audio { frames: 2 },
        ]
    );
    let state = engine.state();
    assert_eq!(state.port, 7);
    assert_eq!(state.sample_rate, 48000);
    assert_eq!(state.controls[3], 127);
}

#[test]
fn test_param_values_are_clamped() {
    let engine = TestEngine::start();
    let client = engine.client();

    client.set_param(0, 2.0);
    client.set_param(1, -1.0);
    client.set_param(2, 1.0);
    settle(&client);

    let state = engine.state();
    assert_eq!(state.controls[0], 127);
    assert_eq!(state.controls[1], 0);
    assert_eq!(state.controls[2], 127);
}

#[test]
fn test_midi_sent_exactly_once() {
    let engine = TestEngine::start();
    let client = engine.client();
    settle(&client);

    client.push_midi(MidiMessage::new(0x90, 60, 100));
    client.push_midi(MidiMessage::new(0x80, 60, 0));
    client.push_clock();
    assert_eq!(client.pending_midi(), 3);
    settle(&client);
    assert_eq!(client.pending_midi(), 0);

    let n = engine.session_len();
    settle(&client);
    assert_eq!(engine.session_since(n), vec![Received::Audio { frames: 1 }]);
    assert_eq!(
        engine.state().midi,
        vec![
            MidiMessage::new(0x90, 60, 100),
            MidiMessage::new(0x80, 60, 0),
            MidiMessage::clock(),
        ]
    );
}
