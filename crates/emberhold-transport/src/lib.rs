//! Transport abstraction layer for Emberhold.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! the byte streams players connect with. A connection carries raw terminal
//! bytes in both directions; decoding them into lines is the session
//! layer's job.
//!
//! # Feature Flags
//!
//! - `websocket` (default): browser terminals via `tokio-tungstenite`
//! - `telnet` (default): classic MUD clients over raw TCP with telnet
//!   option negotiation

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "telnet")]
mod telnet;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "telnet")]
pub use telnet::{IacParser, Parsed, TelnetConnection, TelnetTransport};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONNECTION: AtomicU64 = AtomicU64::new(1);

/// Identifies one accepted connection for as long as the process runs.
///
/// Ids come from one counter shared by every transport, so a telnet
/// client and a browser never collide in the session registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The next unused id.
    pub(crate) fn next() -> Self {
        Self(NEXT_CONNECTION.fetch_add(1, Ordering::Relaxed))
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A listener that produces player connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next client. Any per-protocol handshake (telnet
    /// option announcement, WebSocket upgrade) is finished before this
    /// returns.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;

    /// Stops taking new clients. Connections already handed out are
    /// unaffected.
    fn shutdown(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// The address the transport is listening on.
    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }
}

/// One client's byte stream.
///
/// `send` and `recv` may be called concurrently from different tasks:
/// the session runs a dedicated reader and a dedicated writer per
/// connection, so implementations must not serialize the two directions
/// behind one lock. The returned futures are `Send` so those tasks can be
/// spawned on the multi-threaded runtime.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Writes terminal output to the client.
    fn send(&self, data: &[u8]) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// The next chunk of terminal input, with any transport framing or
    /// in-band negotiation already removed. `Ok(None)` at end of stream.
    fn recv(&self) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send;

    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn id(&self) -> ConnectionId;

    /// The most recent terminal size reported by the peer, as
    /// `(width, height)`.
    ///
    /// Transports without a size negotiation return `None`.
    fn window_size(&self) -> Option<(u16, u16)> {
        None
    }
}
