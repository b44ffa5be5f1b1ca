//! Error types for the session layer.

use emberhold_protocol::AccountName;
use emberhold_transport::ConnectionId;

/// Errors that can occur during session management.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The [`Authenticator`](crate::Authenticator) rejected the credentials.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// No session is tracked for this connection.
    #[error("no session for {0}")]
    NotFound(ConnectionId),

    /// The account is already logged in on another connection.
    #[error("account {0} is already connected")]
    AlreadyConnected(AccountName),

    /// The session's output queue is gone: the writer exited or the
    /// player disconnected.
    #[error("session closed")]
    Closed,
}
