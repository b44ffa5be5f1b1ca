//! Session layer for Emberhold.
//!
//! This crate turns an accepted transport connection into something the
//! game can talk to:
//!
//! 1. **Authentication**: validating who a player is ([`Authenticator`])
//! 2. **I/O pipeline**: a reader task that cooks keystrokes into lines
//!    and a writer task that lays out and sends output ([`Session`])
//! 3. **Output handle**: a cloneable, bounded queue into the writer
//!    ([`Outbox`]) that other characters' broadcasts can use
//! 4. **Tracking**: which connections are live and which account each
//!    one logged in as ([`SessionManager`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Game (above)       ← reads lines, sends text through an Outbox
//!     ↕
//! Session (this crate)  ← reader/writer tasks, terminal state
//!     ↕
//! Transport (below)  ← raw bytes
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod config;
mod error;
mod manager;
mod outbox;
mod session;
mod terminal;

pub use auth::{Authenticator, Credentials, StaticAuthenticator};
pub use config::SessionConfig;
pub use error::SessionError;
pub use manager::SessionManager;
pub use outbox::{Outbox, OutboxReceiver};
pub use session::{Session, SessionSignal, INPUT_TOO_LONG};
pub use terminal::TerminalState;
