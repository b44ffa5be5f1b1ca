//! Unified error type for Emberhold.

use emberhold_protocol::ProtocolError;
use emberhold_session::SessionError;
use emberhold_store::StoreError;
use emberhold_transport::TransportError;
use emberhold_world::WorldError;

/// Top-level error that wraps every layer's error.
///
/// The `#[from]` attribute on each variant generates a `From` impl, so
/// `?` converts layer errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum EmberholdError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encoding or decoding a stored record failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (auth, duplicate login, closed output).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The record store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A world invariant was violated (unknown room, bad seed...).
    #[error(transparent)]
    World(#[from] WorldError),
}
