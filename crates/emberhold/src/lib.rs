//! # Emberhold
//!
//! Live-session engine for a multi-player text world.
//!
//! Players connect over telnet or WebSocket, log in, pick a character and
//! type commands. Each connection runs its own session pipeline (see
//! `emberhold-session`); once a character is in the world its commands
//! are paced by a per-character dispatch tick and run against the shared
//! [`World`](emberhold_world::World), which locks rooms, characters and
//! items individually.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use emberhold::prelude::*;
//!
//! # async fn start(seed: SeedData) -> Result<(), EmberholdError> {
//! let server = EmberholdServerBuilder::new()
//!     .bind("0.0.0.0:4000")
//!     .seed(seed)
//!     .build_telnet(StaticAuthenticator::new().with_user("ann", "secret"), MemoryStore::new())
//!     .await?;
//! server.run(CancellationToken::new()).await
//! # }
//! ```

mod autosave;
pub mod commands;
mod config;
mod error;
mod game;
mod handler;
mod input_loop;
mod persist;
mod server;

pub use autosave::{SaveReport, run_autosave};
pub use commands::{CommandError, CommandTable, Verb, dispatch};
pub use config::GameConfig;
pub use error::EmberholdError;
pub use game::Game;
pub use input_loop::{LoopExit, run_input_loop};
pub use server::{EmberholdServer, EmberholdServerBuilder};

/// Everything needed to start a server.
pub mod prelude {
    pub use crate::{EmberholdError, EmberholdServer, EmberholdServerBuilder, Game, GameConfig};
    pub use emberhold_session::{Authenticator, Credentials, SessionConfig, StaticAuthenticator};
    pub use emberhold_store::{MemoryStore, RecordStore, SledStore};
    pub use emberhold_tick::TickConfig;
    pub use emberhold_world::{SeedData, WorldConfig};
    pub use tokio_util::sync::CancellationToken;
}
