use emberhold_store::RecordStore;
use emberhold_world::{ActiveCharacter, WorldError};
use tracing::warn;

use super::info;
use crate::Game;

pub(super) async fn go<S: RecordStore>(game: &Game<S>, actor: &ActiveCharacter, direction: Option<&str>) {
    let Some(direction) = direction else {
        actor.tell("\n\rWhich direction do you want to go?\n\r").await;
        return;
    };

    match game.world.move_character(actor, direction).await {
        Ok(_) => info::look(game, actor).await,
        Err(WorldError::CannotGo(_)) => actor.tell("\n\rYou can't go that way.\n\r").await,
        Err(WorldError::CannotEscape) => actor.tell("\n\rYou can't escape!\n\r").await,
        Err(WorldError::RoomNotFound(target)) => {
            warn!(character_id = %actor.id, %direction, %target, "exit leads nowhere");
            actor.tell("\n\rThe path leads nowhere.\n\r").await;
        }
        Err(e) => {
            warn!(character_id = %actor.id, %direction, error = %e, "move failed");
            actor.tell("\n\rYou can't go that way.\n\r").await;
        }
    }
}
