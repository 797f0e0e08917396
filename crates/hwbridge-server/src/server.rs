//! Bridge engine server
//!
//! Accepts one client at a time, checks the handshake magic, then decodes
//! control messages and answers every audio block until the client goes away.

use crate::config::ServerConfig;
use crate::engine::{EchoEngine, Engine, EngineState, Received};
use hwbridge_client::protocol::{self, Command, HELLO};
use hwbridge_client::{BridgeError, MidiMessage, Result, INPUT_CHANNELS, OUTPUT_CHANNELS};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub struct BridgeServer {
    config: ServerConfig,
    listener: TcpListener,
    state: Arc<Mutex<EngineState>>,
    engine: Box<dyn Engine>,

    // Reused across blocks; grow to the largest block seen.
    input_bytes: Vec<u8>,
    input: Vec<f32>,
    output: Vec<f32>,
    output_bytes: Vec<u8>,
}

impl BridgeServer {
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        config.validate()?;
        let listener = TcpListener::bind(&config.bind_addr).await?;
        let state = Arc::new(Mutex::new(EngineState::new(config.record)));

        Ok(Self {
            config,
            listener,
            state,
            engine: Box::new(EchoEngine),
            input_bytes: Vec::new(),
            input: Vec::new(),
            output: Vec::new(),
            output_bytes: Vec::new(),
        })
    }

    pub fn with_engine(mut self, engine: impl Engine + 'static) -> Self {
        self.engine = Box::new(engine);
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Live view of what the engine has received.
    pub fn state(&self) -> Arc<Mutex<EngineState>> {
        Arc::clone(&self.state)
    }

    /// Serve clients one after another, forever.
    pub async fn run(mut self) -> Result<()> {
        loop {
            self.serve_one().await?;
        }
    }

    /// Accept a single client and serve it until it disconnects.
    ///
    /// Errors on that connection are logged, not returned; only a failing
    /// listener is an error.
    pub async fn serve_one(&mut self) -> Result<()> {
        let (stream, peer) = self.listener.accept().await?;
        tracing::info!("client connected from {}", peer);

        match self.serve_connection(stream).await {
            Ok(()) => tracing::info!("client {} disconnected", peer),
            Err(e) => tracing::warn!("connection with {} ended: {}", peer, e),
        }
        Ok(())
    }

    async fn serve_connection(&mut self, mut stream: TcpStream) -> Result<()> {
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("set_nodelay failed: {}", e);
        }

        let hello = read_u32(&mut stream).await?;
        if hello != HELLO {
            return Err(BridgeError::Protocol(format!(
                "bad handshake magic {:#010x}",
                hello
            )));
        }
        self.record(Received::Hello);

        loop {
            let opcode = match stream.read_u8().await {
                Ok(op) => op,
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(e.into()),
            };
            let command = Command::from_u8(opcode)
                .ok_or_else(|| BridgeError::Protocol(format!("unknown command {}", opcode)))?;

            let Some(len) = command.payload_len() else {
                return Err(BridgeError::Protocol(format!(
                    "unsupported command {:?}",
                    command
                )));
            };
            let mut payload = [0u8; 4];
            stream.read_exact(&mut payload[..len]).await?;

            match command {
                Command::SetPort => self.record(Received::Port(payload[0])),
                Command::SetSampleRate => {
                    let rate = u32::from_ne_bytes(payload);
                    self.engine.set_sample_rate(rate);
                    self.record(Received::SampleRate(rate));
                }
                Command::MidiMessage => {
                    self.record(Received::Midi(MidiMessage::from_bytes(&payload[..len])))
                }
                Command::AudioProcess => {
                    let frames = u32::from_ne_bytes(payload);
                    if frames > self.config.max_frames {
                        return Err(BridgeError::Protocol(format!(
                            "block of {} frames exceeds limit {}",
                            frames, self.config.max_frames
                        )));
                    }
                    self.record(Received::Audio { frames });
                    self.process_block(&mut stream, frames as usize).await?;
                }
                // payload_len is None for everything else
                _ => {}
            }
        }
    }

    async fn process_block(&mut self, stream: &mut TcpStream, frames: usize) -> Result<()> {
        self.input_bytes.resize(frames * INPUT_CHANNELS * 4, 0);
        self.input.resize(frames * INPUT_CHANNELS, 0.0);
        self.output.resize(frames * OUTPUT_CHANNELS, 0.0);

        stream.read_exact(&mut self.input_bytes).await?;
        protocol::decode_samples(&self.input_bytes, &mut self.input);

        self.output.fill(0.0);
        self.engine.process(&self.input, &mut self.output, frames);

        self.output_bytes.clear();
        protocol::encode_samples(&self.output, frames, OUTPUT_CHANNELS, &mut self.output_bytes);
        stream.write_all(&self.output_bytes).await?;
        Ok(())
    }

    fn record(&self, msg: Received) {
        self.state.lock().apply(msg);
    }
}

async fn read_u32(stream: &mut TcpStream) -> Result<u32> {
    let mut raw = [0u8; 4];
    stream.read_exact(&mut raw).await?;
    Ok(u32::from_ne_bytes(raw))
}
