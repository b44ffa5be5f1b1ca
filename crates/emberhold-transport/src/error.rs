/// What can go wrong between the socket and the session.
///
/// Every variant except `AcceptFailed` ends the one connection it
/// happened on; `AcceptFailed` is logged by the accept loop, which keeps
/// listening.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer went away while we still expected to talk to it.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding, accepting or the per-protocol handshake failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    #[error("transport shut down")]
    Shutdown,
}

impl TransportError {
    /// A write-side failure from a library that doesn't speak `io::Error`.
    pub(crate) fn send<E>(e: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::SendFailed(std::io::Error::new(std::io::ErrorKind::BrokenPipe, e))
    }

    /// A read-side failure from a library that doesn't speak `io::Error`.
    pub(crate) fn receive<E>(e: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::ReceiveFailed(std::io::Error::new(std::io::ErrorKind::ConnectionReset, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_errors_keep_their_message() {
        let err = TransportError::send("frame too large");
        assert!(matches!(&err, TransportError::SendFailed(io) if io.kind() == std::io::ErrorKind::BrokenPipe));
        assert_eq!(err.to_string(), "send failed: frame too large");
    }
}
