//! `EmberholdServer` builder and server loop.
//!
//! This is the entry point for running an Emberhold server. It ties
//! together all the layers: transport → session → game → world.

use std::net::SocketAddr;
use std::sync::Arc;

use emberhold_session::{Authenticator, SessionManager};
use emberhold_store::RecordStore;
use emberhold_transport::{TelnetTransport, Transport, WebSocketTransport};
use emberhold_world::SeedData;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::autosave::run_autosave;
use crate::handler::handle_connection;
use crate::{EmberholdError, Game, GameConfig};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks.
pub(crate) struct ServerState<A: Authenticator, S: RecordStore> {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) game: Arc<Game<S>>,
    pub(crate) auth: A,
}

/// Builder for configuring and starting an Emberhold server.
///
/// # Example
///
/// ```rust,ignore
/// use emberhold::prelude::*;
///
/// let server = EmberholdServerBuilder::new()
///     .bind("0.0.0.0:4000")
///     .seed(seed)
///     .build_telnet(StaticAuthenticator::new().with_user("ann", "pw"), MemoryStore::new())
///     .await?;
/// server.run(shutdown).await
/// ```
pub struct EmberholdServerBuilder {
    bind_addr: String,
    config: GameConfig,
    seed: SeedData,
}

impl EmberholdServerBuilder {
    /// Creates a new builder with default settings and an empty seed.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:4000".to_string(),
            config: GameConfig::default(),
            seed: SeedData::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    pub fn config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the rooms, prototypes and archetypes the world is built from.
    pub fn seed(mut self, seed: SeedData) -> Self {
        self.seed = seed;
        self
    }

    /// Loads the game and listens for telnet clients.
    ///
    /// # Errors
    /// Fails if the seed is inconsistent, the store can't be read, or the
    /// address can't be bound.
    pub async fn build_telnet<A, S>(
        self,
        auth: A,
        store: S,
    ) -> Result<EmberholdServer<TelnetTransport, A, S>, EmberholdError>
    where
        A: Authenticator,
        S: RecordStore,
    {
        let game = Game::load(self.seed, self.config, store).await?;
        let transport = TelnetTransport::bind(&self.bind_addr).await?;
        Ok(EmberholdServer::new(transport, game, auth))
    }

    /// Loads the game and listens for browser terminals over WebSocket.
    ///
    /// # Errors
    /// As [`build_telnet`](Self::build_telnet).
    pub async fn build_websocket<A, S>(
        self,
        auth: A,
        store: S,
    ) -> Result<EmberholdServer<WebSocketTransport, A, S>, EmberholdError>
    where
        A: Authenticator,
        S: RecordStore,
    {
        let game = Game::load(self.seed, self.config, store).await?;
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        Ok(EmberholdServer::new(transport, game, auth))
    }
}

impl Default for EmberholdServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Emberhold server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct EmberholdServer<T: Transport, A: Authenticator, S: RecordStore> {
    transport: T,
    state: Arc<ServerState<A, S>>,
}

impl<T, A, S> EmberholdServer<T, A, S>
where
    T: Transport,
    A: Authenticator,
    S: RecordStore,
{
    fn new(transport: T, game: Game<S>, auth: A) -> Self {
        Self {
            transport,
            state: Arc::new(ServerState {
                sessions: Mutex::new(SessionManager::new()),
                game: Arc::new(game),
                auth,
            }),
        }
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.transport.local_addr()
    }

    /// The shared game, for inspection while the server runs.
    pub fn game(&self) -> Arc<Game<S>> {
        Arc::clone(&self.state.game)
    }

    /// Runs the accept loop and the autosave task until `shutdown` fires.
    ///
    /// On shutdown: stop accepting, tell everyone, hang up every session,
    /// wait for their handlers to tear down (each saves its character),
    /// then save everything one last time.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), EmberholdError> {
        let game = Arc::clone(&self.state.game);
        let tasks = TaskTracker::new();
        tasks.spawn(run_autosave(Arc::clone(&game), shutdown.child_token()));

        tracing::info!(addr = ?self.local_addr(), "Emberhold server running");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tasks.spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        tracing::info!(active = game.world.active_count(), "shutting down");
        if let Err(e) = self.transport.shutdown().await {
            tracing::warn!(error = %e, "transport shutdown failed");
        }
        game.announce_shutdown().await;
        let hung_up = self.state.sessions.lock().await.hangup_all();
        tracing::debug!(sessions = hung_up, "sessions hung up");

        tasks.close();
        tasks.wait().await;

        let report = game.save_all().await;
        tracing::info!(
            saved = report.saved,
            failed = report.failed,
            rooms_failed = report.rooms_failed,
            "final save complete"
        );
        Ok(())
    }
}
