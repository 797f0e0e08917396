//! Test helpers and fixtures for hwbridge integration tests
//!
//! Two kinds of peer:
//! - [`TestEngine`]: the reference server on its own tokio runtime, for
//!   end-to-end behaviour
//! - [`RawPeer`]: a plain blocking listener the test drives byte by byte, for
//!   handshakes, hung engines and dropped connections

#![allow(dead_code)]

use hwbridge::client::protocol::{HELLO, MIDI_CONTROL_CHANGE};
use hwbridge::prelude::*;
use hwbridge::server::{EngineState, Received};
use parking_lot::{Mutex, MutexGuard};
use std::io::Read;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;

/// How long a test waits for the client to finish its handshake.
pub const READY_TIMEOUT: Duration = Duration::from_secs(5);

/// Hello, port, one CC per parameter, sample rate.
pub const WELCOME_LEN: usize = 4 + 2 + PARAM_COUNT * 4 + 5;

/// Client config with short intervals so reconnects happen quickly.
pub fn fast_config(port: u16) -> BridgeConfig {
    BridgeConfig {
        retry_interval_ms: 10,
        connect_timeout_ms: 500,
        io_timeout_ms: 1000,
        ..BridgeConfig::with_port(port)
    }
}

/// A loopback port nothing is listening on.
pub fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind probe listener");
    listener.local_addr().expect("No local addr").port()
}

/// Reference engine serving clients in the background.
pub struct TestEngine {
    runtime: Runtime,
    addr: SocketAddr,
    state: Arc<Mutex<EngineState>>,
}

impl TestEngine {
    pub fn start() -> Self {
        let runtime = Runtime::new().expect("Failed to create runtime");
        let server = runtime
            .block_on(BridgeServer::bind(ServerConfig::ephemeral()))
            .expect("Failed to bind test engine");
        let addr = server.local_addr().expect("No local addr");
        let state = server.state();
        runtime.spawn(server.run());

        Self {
            runtime,
            addr,
            state,
        }
    }

    pub fn config(&self) -> BridgeConfig {
        fast_config(self.addr.port())
    }

    /// Start a client against this engine and wait for its handshake.
    pub fn client(&self) -> BridgeClient {
        let client = BridgeClient::start(self.config()).expect("Failed to start client");
        assert!(
            client.wait_until_ready(READY_TIMEOUT),
            "client did not become ready"
        );
        client
    }

    pub fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock()
    }

    /// Messages received in the current session after the first `skip`.
    pub fn session_since(&self, skip: usize) -> Vec<Received> {
        self.state().current_session()[skip..].to_vec()
    }

    pub fn session_len(&self) -> usize {
        self.state().current_session().len()
    }
}

/// Blocking listener standing in for an engine.
pub struct RawPeer {
    listener: TcpListener,
}

impl RawPeer {
    pub fn bind() -> Self {
        Self::bind_port(0)
    }

    pub fn bind_port(port: u16) -> Self {
        let listener =
            TcpListener::bind(("127.0.0.1", port)).expect("Failed to bind raw peer");
        Self { listener }
    }

    pub fn port(&self) -> u16 {
        self.listener.local_addr().expect("No local addr").port()
    }

    /// Accept the next client without reading anything.
    pub fn accept(&self) -> TcpStream {
        let (stream, _) = self.listener.accept().expect("accept failed");
        stream
    }

    /// Accept the next client and consume its welcome.
    pub fn accept_welcome(&self) -> (TcpStream, Welcome) {
        let mut stream = self.accept();
        stream
            .set_read_timeout(Some(READY_TIMEOUT))
            .expect("set_read_timeout failed");
        let mut bytes = [0u8; WELCOME_LEN];
        stream.read_exact(&mut bytes).expect("short welcome");
        (stream, Welcome::parse(&bytes))
    }
}

/// Decoded welcome sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Welcome {
    pub port: u8,
    pub controls: [u8; PARAM_COUNT],
    pub sample_rate: u32,
}

impl Welcome {
    pub fn parse(bytes: &[u8; WELCOME_LEN]) -> Self {
        assert_eq!(&bytes[..4], &HELLO.to_ne_bytes(), "missing hello");
        assert_eq!(bytes[4], 3, "expected SetPort after hello");
        let port = bytes[5];

        let mut controls = [0u8; PARAM_COUNT];
        for (i, value) in controls.iter_mut().enumerate() {
            let at = 6 + i * 4;
            assert_eq!(bytes[at], 4, "expected MidiMessage for param {}", i);
            assert_eq!(bytes[at + 1], MIDI_CONTROL_CHANGE);
            assert_eq!(bytes[at + 2] as usize, i, "params out of order");
            *value = bytes[at + 3];
        }

        let at = 6 + PARAM_COUNT * 4;
        assert_eq!(bytes[at], 5, "expected SetSampleRate last");
        let mut rate = [0u8; 4];
        rate.copy_from_slice(&bytes[at + 1..at + 5]);

        Self {
            port,
            controls,
            sample_rate: u32::from_ne_bytes(rate),
        }
    }
}

/// Size of an `AudioProcess` request carrying `frames` frames.
pub fn audio_request_len(frames: usize) -> usize {
    1 + 4 + frames * INPUT_CHANNELS * 4
}

/// Deterministic interleaved test signal.
pub fn ramp(frames: usize, channels: usize) -> Vec<f32> {
    (0..frames * channels)
        .map(|i| ((i % 97) as f32 / 97.0) - 0.5)
        .collect()
}

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}
