//! Protocol layer for Emberhold.
//!
//! This crate defines everything that sits between raw terminal bytes and
//! the game:
//!
//! - **Types** ([`CharacterId`], [`RoomId`], [`ItemId`], [`AccountName`]):
//!   the identities every other crate refers to entities by.
//! - **Line discipline** ([`Utf8Decoder`], [`LineEditor`]): how a byte
//!   stream typed on a terminal becomes discrete command lines.
//! - **Text** ([`wrap_text`], [`Color`]): how output is laid out for a
//!   viewport of a given width.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how persistent records
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (code points → lines) → Session → Game
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod error;
mod line;
mod text;
mod types;
mod utf8;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use line::{Edit, LineEditor, DEFAULT_INTERRUPT, DEFAULT_MAX_LINE_LEN};
pub use text::{paint, visible_len, wrap_text, Color, CRLF};
pub use types::{AccountName, CharacterId, ItemId, RoomId};
pub use utf8::Utf8Decoder;
