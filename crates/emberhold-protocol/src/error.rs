//! Error types for the protocol layer.
//!
//! Each crate in Emberhold defines its own error enum. A `ProtocolError`
//! means the problem is in decoding input or (de)serializing a record, not
//! in networking or world state.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: a record written by an older build with a field
    /// missing, or a truncated value in the store.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A terminal line grew past the configured limit and was discarded.
    #[error("line exceeded {limit} characters")]
    LineTooLong { limit: usize },

    /// Input that decodes fine but makes no sense, e.g. an item id that
    /// is not a UUID.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
