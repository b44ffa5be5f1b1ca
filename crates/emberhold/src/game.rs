//! The shared game context.
//!
//! One [`Game`] exists per server. It owns the world, the name registry,
//! the record store and the command table, and is handed to every
//! connection task and the autosave task behind an `Arc`. Nothing in
//! here is a global.

use std::time::Duration;

use emberhold_protocol::JsonCodec;
use emberhold_store::RecordStore;
use emberhold_world::{NameRegistry, SeedData, World};
use tracing::{info, warn};

use crate::commands::CommandTable;
use crate::{EmberholdError, GameConfig};

pub struct Game<S: RecordStore> {
    pub(crate) world: World,
    pub(crate) names: NameRegistry,
    pub(crate) store: S,
    pub(crate) codec: JsonCodec,
    pub(crate) commands: CommandTable,
    pub(crate) config: GameConfig,
    pub(crate) motd: Vec<String>,
}

impl<S: RecordStore> Game<S> {
    /// Builds the world from `seed`, fills the name registry from stored
    /// characters, and puts saved floor items back where they were left.
    ///
    /// # Errors
    /// Fails if the seed is inconsistent or the store can't be read.
    pub async fn load(seed: SeedData, config: GameConfig, store: S) -> Result<Self, EmberholdError> {
        let motd = seed.motd.clone();
        let world = World::from_seed(seed, config.world.clone())?;
        let codec = JsonCodec;
        let names = crate::persist::load_names(&store, &codec, config.names_fp_rate).await?;

        let game = Self {
            world,
            names,
            store,
            codec,
            commands: CommandTable::standard(),
            config,
            motd,
        };
        game.restore_floors().await?;

        info!(
            rooms = game.world.room_ids().len(),
            verbs = game.commands.len(),
            "game loaded"
        );
        Ok(game)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn names(&self) -> &NameRegistry {
        &self.names
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    pub fn motd(&self) -> &[String] {
        &self.motd
    }

    /// Tells every active player the server is going down.
    ///
    /// Gives up after the session flush timeout so one stalled client
    /// can't hold up the hangup. Returns `false` if it had to.
    pub async fn announce_shutdown(&self) -> bool {
        let within = Duration::from_millis(self.config.session.flush_timeout_ms);
        let notice = self.world.announce("\n\rServer is shutting down.\n\r");
        if tokio::time::timeout(within, notice).await.is_err() {
            warn!("shutdown notice did not reach every player in time");
            return false;
        }
        true
    }
}
