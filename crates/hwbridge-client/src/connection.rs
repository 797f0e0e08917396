//! Background connection manager.
//!
//! One named thread per client runs the connect → handshake → ready →
//! disconnect cycle until shutdown. The render path never connects; it only
//! observes `ready` and, on an I/O failure, clears it to hand the socket back
//! to this loop.

use crate::client::BridgeShared;
use crate::error::Result;
use crate::exchange;
use crate::transport::Link;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Connection lifecycle as published by the manager thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ConnectionState {
    /// Not started, or stopped after shutdown
    #[default]
    Idle = 0,
    /// Backing off before the next connect attempt
    Connecting = 1,
    /// Socket open, sending the welcome sequence
    Handshaking = 2,
    /// Audio and control exchange permitted
    Ready = 3,
    /// Socket closed after a failure, about to retry
    Disconnected = 4,
}

impl ConnectionState {
    fn from_u8(val: u8) -> Self {
        match val {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Handshaking,
            3 => ConnectionState::Ready,
            4 => ConnectionState::Disconnected,
            _ => ConnectionState::Idle,
        }
    }
}

/// Socket slot plus lifecycle flags shared by the manager and the render path.
///
/// The `link` mutex is the exchange lock: the handshake and the per-block
/// exchange both hold it for their whole send/receive sequence.
pub(crate) struct Connection {
    link: Mutex<Option<Link>>,
    running: AtomicBool,
    ready: AtomicBool,
    state: AtomicU8,
    wake_lock: Mutex<()>,
    wake: Condvar,
}

impl Connection {
    pub fn new() -> Self {
        Self {
            link: Mutex::new(None),
            running: AtomicBool::new(true),
            ready: AtomicBool::new(false),
            state: AtomicU8::new(ConnectionState::Idle as u8),
            wake_lock: Mutex::new(()),
            wake: Condvar::new(),
        }
    }

    pub fn link(&self) -> &Mutex<Option<Link>> {
        &self.link
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
        self.set_state(ConnectionState::Ready);
        self.notify();
    }

    pub fn mark_not_ready(&self) {
        self.ready.store(false, Ordering::Release);
        self.set_state(ConnectionState::Disconnected);
        self.notify();
    }

    pub fn request_shutdown(&self) {
        self.running.store(false, Ordering::Release);
        self.notify();
    }

    /// Close the socket, if any, and clear `ready`. Returns whether a socket was open.
    pub fn disconnect(&self) -> bool {
        self.ready.store(false, Ordering::Release);
        self.link.lock().take().is_some()
    }

    fn notify(&self) {
        let _guard = self.wake_lock.lock();
        self.wake.notify_all();
    }

    /// Sleep for `interval` unless shutdown is requested first.
    ///
    /// Returns whether the client is still running.
    pub fn pause(&self, interval: Duration) -> bool {
        let deadline = Instant::now() + interval;
        let mut guard = self.wake_lock.lock();
        while self.is_running() {
            if self.wake.wait_until(&mut guard, deadline).timed_out() {
                break;
            }
        }
        self.is_running()
    }

    /// Block while connected and running, re-checking at least every `interval`.
    pub fn wait_while_ready(&self, interval: Duration) {
        let mut guard = self.wake_lock.lock();
        while self.is_running() && self.is_ready() {
            self.wake.wait_for(&mut guard, interval);
        }
    }

    /// Block until ready, shutdown, or `timeout`. Returns whether ready.
    pub fn wait_until_ready(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.wake_lock.lock();
        while !self.is_ready() {
            if !self.is_running() {
                return false;
            }
            if self.wake.wait_until(&mut guard, deadline).timed_out() {
                return self.is_ready();
            }
        }
        true
    }
}

/// Handle to the manager thread. Joins on shutdown.
pub(crate) struct ConnectionManager {
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl ConnectionManager {
    pub fn spawn(shared: Arc<BridgeShared>) -> Result<Self> {
        let thread_handle = thread::Builder::new()
            .name("bridge-connection".to_string())
            .spawn(move || run(shared))?;
        Ok(Self {
            thread_handle: Some(thread_handle),
        })
    }

    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                tracing::error!("bridge connection thread panicked");
            }
        }
    }
}

fn run(shared: Arc<BridgeShared>) {
    let conn = &shared.connection;
    let config = &shared.config;
    tracing::info!("bridge client started, engine at {}", config.address());

    while conn.is_running() {
        conn.set_state(ConnectionState::Connecting);
        if !conn.pause(config.retry_interval()) {
            break;
        }

        let link = match Link::connect(config) {
            Ok(link) => link,
            Err(e) => {
                tracing::debug!("connect attempt failed: {}", e);
                continue;
            }
        };

        conn.set_state(ConnectionState::Handshaking);
        if let Err(e) = exchange::welcome(&shared, link) {
            tracing::warn!("handshake failed: {}", e);
            conn.disconnect();
            conn.set_state(ConnectionState::Disconnected);
            continue;
        }
        tracing::info!("bridge connected to {}", config.address());

        conn.wait_while_ready(config.retry_interval());

        conn.disconnect();
        conn.set_state(ConnectionState::Disconnected);
        tracing::info!("bridge disconnected");
    }

    conn.disconnect();
    conn.set_state(ConnectionState::Idle);
    tracing::info!("bridge client stopped");
}
