//! Game-wide configuration.

use std::time::Duration;

use emberhold_session::SessionConfig;
use emberhold_tick::TickConfig;
use emberhold_world::WorldConfig;
use serde::Deserialize;

/// Everything tunable about a running game.
///
/// `#[serde(default)]` lets the binary build one from whatever subset of
/// settings it was given.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Command dispatch pacing for every input loop.
    pub tick: TickConfig,
    pub session: SessionConfig,
    pub world: WorldConfig,
    /// How often every active character is saved.
    #[serde(with = "secs")]
    pub autosave_interval: Duration,
    /// Failed password attempts before the connection is dropped.
    pub max_login_attempts: u32,
    pub max_name_len: usize,
    /// Target false-positive rate of the name registry.
    pub names_fp_rate: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick: TickConfig::default(),
            session: SessionConfig::default(),
            world: WorldConfig::default(),
            autosave_interval: Duration::from_secs(5 * 60),
            max_login_attempts: 3,
            max_name_len: 15,
            names_fp_rate: 0.01,
        }
    }
}

impl GameConfig {
    pub fn with_tick(mut self, tick: TickConfig) -> Self {
        self.tick = tick;
        self
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn with_world(mut self, world: WorldConfig) -> Self {
        self.world = world;
        self
    }

    pub fn with_autosave_interval(mut self, interval: Duration) -> Self {
        self.autosave_interval = interval;
        self
    }
}

mod secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
