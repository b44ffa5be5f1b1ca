//! One character's command loop.
//!
//! ```text
//!   WaitingForInput ──line──→ CommandPending ──tick──→ (execute) ─┐
//!         ▲    ▲                 │    ▲                            │
//!         │    └──── tick ───────┘    └── line (replaces) ──┘      │
//!         └────────────────────────────────────────────────────────┘
//!   queue closed (any state) ──→ Terminated
//! ```
//!
//! At most one command runs per dispatch tick. A line that arrives while
//! another is still waiting replaces it, so a flood of input costs the
//! server one command per period.

use std::sync::Arc;

use emberhold_store::RecordStore;
use emberhold_tick::TickScheduler;
use emberhold_world::ActiveCharacter;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::Game;
use crate::commands::{self, look};

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The player quit.
    Quit,
    /// The line queue closed: the player disconnected or was hung up on.
    Disconnected,
}

/// Runs `actor`'s commands from `lines` until the player quits or the
/// queue closes, then takes the character out of the world and saves it.
///
/// The character must already be active and in its room.
pub async fn run_input_loop<S: RecordStore>(
    game: &Game<S>,
    actor: Arc<ActiveCharacter>,
    lines: &mut mpsc::Receiver<String>,
) -> LoopExit {
    let mut scheduler = TickScheduler::new(game.config.tick.clone());
    let mut pending: Option<String> = None;

    look(game, &actor).await;
    prompt(&actor).await;

    let exit = loop {
        tokio::select! {
            biased;

            line = lines.recv() => match line {
                Some(line) => {
                    if pending.replace(line).is_some() {
                        debug!(character_id = %actor.id, "pending command replaced");
                    }
                }
                None => break LoopExit::Disconnected,
            },

            _ = scheduler.wait_for_tick() => {
                let Some(line) = pending.take() else {
                    continue;
                };
                let done = execute(game, &actor, &line).await;
                scheduler.record_tick_end();
                if done {
                    break LoopExit::Quit;
                }
                prompt(&actor).await;
            }
        }
    };

    teardown(game, &actor).await;
    info!(character_id = %actor.id, name = %actor.name, ?exit, "left the world");
    exit
}

/// Validates and runs one line. Returns `true` if the player quit.
async fn execute<S: RecordStore>(game: &Game<S>, actor: &ActiveCharacter, line: &str) -> bool {
    match game.commands.validate(line) {
        Ok((verb, tokens)) => commands::dispatch(game, actor, verb, &tokens).await,
        Err(e) => {
            actor.tell(format!("\n\r{e}\n\r")).await;
            false
        }
    }
}

async fn prompt(actor: &ActiveCharacter) {
    if actor.outbox.prompt().await.is_err() {
        debug!(character_id = %actor.id, "prompt dropped, session closed");
    }
}

/// Takes a character out of play: out of its room, out of the active
/// registry, out of every fight, then saved.
pub(crate) async fn teardown<S: RecordStore>(game: &Game<S>, actor: &ActiveCharacter) {
    let room = game.world.leave_room(actor).await;
    game.world
        .broadcast(room, &format!("\n\r{} has left the game.\n\r", actor.name), Some(actor.id))
        .await;
    game.world.deactivate(actor.id);
    game.world.disengage(actor).await;

    if let Err(e) = game.save_character(actor).await {
        warn!(character_id = %actor.id, error = %e, "failed to save character on exit");
    }
}
