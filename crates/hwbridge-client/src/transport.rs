//! Socket transport to the bridge engine.
//!
//! A [`Link`] owns one connected stream plus reusable scratch buffers, so the
//! per-block exchange does not allocate once the buffers have grown to the
//! host's block size.
//!
//! Sends and receives run against a deadline rather than a per-call timeout:
//! the socket timeout is re-armed with the time left before every syscall, so
//! a peer trickling bytes cannot stretch one exchange past its bound.

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::protocol::{self, Message, INPUT_CHANNELS, OUTPUT_CHANNELS};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

/// Byte stream the bridge can talk over.
pub trait BridgeStream: Read + Write {
    /// Bound the next read or write to `timeout`.
    fn set_io_timeout(&mut self, timeout: Duration) -> io::Result<()>;
}

impl BridgeStream for TcpStream {
    fn set_io_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.set_read_timeout(Some(timeout))?;
        self.set_write_timeout(Some(timeout))
    }
}

pub struct Link<S = TcpStream> {
    stream: S,
    tx: Vec<u8>,
    rx: Vec<u8>,
    io_timeout_ms: u64,
}

impl Link<TcpStream> {
    /// Open a socket to the configured engine address.
    ///
    /// The connect itself is bounded by `connect_timeout_ms`.
    pub fn connect(config: &BridgeConfig) -> Result<Self> {
        let addr = resolve(config)?;
        let mut stream = TcpStream::connect_timeout(&addr, config.connect_timeout())
            .map_err(|e| BridgeError::ConnectFailed(format!("{}: {}", addr, e)))?;

        // Small control messages must not sit in the Nagle buffer behind a block.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("set_nodelay failed on {}: {}", addr, e);
        }
        stream.set_io_timeout(config.io_timeout())?;

        Ok(Self::new(stream, config.io_timeout_ms))
    }
}

impl<S: BridgeStream> Link<S> {
    pub fn new(stream: S, io_timeout_ms: u64) -> Self {
        Self {
            stream,
            tx: Vec::new(),
            rx: Vec::new(),
            io_timeout_ms,
        }
    }

    /// Deadline one full I/O timeout from now.
    pub fn deadline(&self) -> Instant {
        Instant::now() + Duration::from_millis(self.io_timeout_ms)
    }

    /// Queue a message in the outgoing buffer. Nothing is sent until [`Link::flush`].
    pub fn stage(&mut self, msg: &Message) {
        self.tx.reserve(msg.encoded_len());
        msg.encode(&mut self.tx);
    }

    /// Queue an audio block header followed by its input samples.
    pub fn stage_audio(&mut self, input: &[f32], frames: usize) {
        self.stage(&Message::AudioProcess {
            frames: frames as u32,
        });
        protocol::encode_samples(input, frames, INPUT_CHANNELS, &mut self.tx);
    }

    pub fn staged_len(&self) -> usize {
        self.tx.len()
    }

    /// Write everything staged, in order, as one contiguous send, finishing
    /// before `deadline`. The staging buffer is empty afterwards either way.
    pub fn flush(&mut self, deadline: Instant) -> Result<()> {
        if self.tx.is_empty() {
            return Ok(());
        }
        let result = write_all_by(&mut self.stream, &self.tx, deadline);
        self.tx.clear();
        result.map_err(|e| BridgeError::transport("send", e, self.io_timeout_ms))
    }

    /// Read exactly `frames * OUTPUT_CHANNELS` samples before `deadline`.
    ///
    /// Writes as many as fit into `output`; the rest of the payload is consumed
    /// and discarded so the stream stays aligned.
    pub fn recv_audio(
        &mut self,
        output: &mut [f32],
        frames: usize,
        deadline: Instant,
    ) -> Result<()> {
        let len = frames * OUTPUT_CHANNELS * 4;
        self.rx.resize(len, 0);
        read_exact_by(&mut self.stream, &mut self.rx, deadline)
            .map_err(|e| BridgeError::transport("recv audio", e, self.io_timeout_ms))?;
        protocol::decode_samples(&self.rx, output);
        Ok(())
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }
}

/// Time left before `deadline`, or a `TimedOut` error once it has passed.
fn time_left(deadline: Instant) -> io::Result<Duration> {
    match deadline.checked_duration_since(Instant::now()) {
        Some(left) if !left.is_zero() => Ok(left),
        _ => Err(io::Error::new(io::ErrorKind::TimedOut, "deadline passed")),
    }
}

fn write_all_by<S: BridgeStream>(
    stream: &mut S,
    mut buf: &[u8],
    deadline: Instant,
) -> io::Result<()> {
    while !buf.is_empty() {
        stream.set_io_timeout(time_left(deadline)?)?;
        match stream.write(buf) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => buf = &buf[n..],
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    stream.flush()
}

fn read_exact_by<S: BridgeStream>(
    stream: &mut S,
    mut buf: &mut [u8],
    deadline: Instant,
) -> io::Result<()> {
    while !buf.is_empty() {
        stream.set_io_timeout(time_left(deadline)?)?;
        match stream.read(buf) {
            Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(n) => buf = &mut buf[n..],
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn resolve(config: &BridgeConfig) -> Result<SocketAddr> {
    let address = config.address();
    address
        .to_socket_addrs()
        .map_err(|e| BridgeError::ConnectFailed(format!("{}: {}", address, e)))?
        .next()
        .ok_or_else(|| BridgeError::ConnectFailed(format!("{}: no address", address)))
}
