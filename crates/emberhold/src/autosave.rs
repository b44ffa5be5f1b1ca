//! Periodic saving of everything live.

use std::sync::Arc;
use std::time::Duration;

use emberhold_store::RecordStore;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::Game;

/// Outcome of one save pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SaveReport {
    pub saved: usize,
    pub failed: usize,
    pub rooms_failed: usize,
}

impl<S: RecordStore> Game<S> {
    /// Saves every active character with its items, then every room's
    /// floor. One failure is logged and the pass carries on.
    pub async fn save_all(&self) -> SaveReport {
        let mut report = SaveReport::default();
        for actor in self.world.active_characters() {
            match self.save_character(&actor).await {
                Ok(()) => report.saved += 1,
                Err(e) => {
                    warn!(character_id = %actor.id, error = %e, "autosave failed for character");
                    report.failed += 1;
                }
            }
        }
        report.rooms_failed = self.save_floors().await;
        report
    }
}

/// Runs [`Game::save_all`] every `autosave_interval` until `cancel` fires.
pub async fn run_autosave<S: RecordStore>(game: Arc<Game<S>>, cancel: CancellationToken) {
    // A zero period would make `interval` panic.
    let period = game.config.autosave_interval.max(Duration::from_secs(1));
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let report = game.save_all().await;
                info!(
                    saved = report.saved,
                    failed = report.failed,
                    rooms_failed = report.rooms_failed,
                    "autosave complete"
                );
            }
        }
    }
}
