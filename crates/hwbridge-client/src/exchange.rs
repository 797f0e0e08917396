//! Welcome sequence and the per-block audio exchange.

use crate::client::BridgeShared;
use crate::error::{BridgeError, Result};
use crate::events::EventQueue;
use crate::protocol::{Message, OUTPUT_CHANNELS};
use crate::state::ControlState;
use crate::transport::{BridgeStream, Link};
use parking_lot::Mutex;
use std::time::Instant;

/// Send the handshake and a full resync, then publish the link as ready.
pub(crate) fn welcome(shared: &BridgeShared, mut link: Link) -> Result<()> {
    let mut slot = shared.connection.link().lock();
    send_welcome(&shared.control, &mut link)?;
    *slot = Some(link);
    shared.connection.mark_ready();
    Ok(())
}

/// Hello plus every control field, bounded by one I/O timeout.
fn send_welcome<S: BridgeStream>(control: &Mutex<ControlState>, link: &mut Link<S>) -> Result<()> {
    link.stage(&Message::Hello);
    for update in &control.lock().take_all() {
        link.stage(update);
    }
    let deadline = link.deadline();
    link.flush(deadline)
        .map_err(|e| BridgeError::HandshakeFailed(e.to_string()))
}

/// Exchange one audio block with the engine.
///
/// Always leaves `frames * OUTPUT_CHANNELS` samples (or as many as fit) in
/// `output`; they are silent when the bridge is not ready or the exchange fails.
/// Waiting for the socket, sending and receiving together finish within one
/// I/O timeout.
pub(crate) fn process(shared: &BridgeShared, input: &[f32], output: &mut [f32], frames: usize) {
    let count = (frames * OUTPUT_CHANNELS).min(output.len());
    let output = &mut output[..count];
    output.fill(0.0);

    let conn = &shared.connection;
    if !conn.is_ready() {
        return;
    }

    let deadline = Instant::now() + shared.config.io_timeout();
    let Some(mut slot) = conn.link().try_lock_until(deadline) else {
        return;
    };
    let Some(link) = slot.as_mut() else {
        return;
    };

    let control = &shared.control;
    if let Err(e) = exchange_block(control, &shared.events, link, input, output, frames, deadline) {
        output.fill(0.0);
        tracing::warn!("audio exchange failed: {}", e);
        *slot = None;
        conn.mark_not_ready();
    }
}

/// Dirty control state, then queued MIDI, then the audio block, in one send.
fn exchange_block<S: BridgeStream>(
    control: &Mutex<ControlState>,
    events: &EventQueue,
    link: &mut Link<S>,
    input: &[f32],
    output: &mut [f32],
    frames: usize,
    deadline: Instant,
) -> Result<()> {
    for update in &control.lock().take_dirty() {
        link.stage(update);
    }
    for msg in events.drain() {
        link.stage(&Message::Midi(msg));
    }
    link.stage_audio(input, frames);
    link.flush(deadline)?;
    link.recv_audio(output, frames, deadline)
}
