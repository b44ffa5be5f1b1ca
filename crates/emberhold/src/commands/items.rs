use emberhold_store::RecordStore;
use emberhold_world::{ActiveCharacter, WorldError};
use tracing::warn;

use super::rest;
use crate::Game;

pub(super) async fn take<S: RecordStore>(game: &Game<S>, actor: &ActiveCharacter, tokens: &[String]) {
    let Some(needle) = rest(tokens) else {
        actor.tell("\n\rUsage: take <item name>\n\r").await;
        return;
    };
    match game.world.take(actor, &needle).await {
        Ok((name, _)) => {
            actor.tell(format!("\n\rYou take {name}.\n\r")).await;
            announce(game, actor, &format!("{} picks up {name}.", actor.name)).await;
        }
        Err(e) => report(actor, "take", e).await,
    }
}

pub(super) async fn drop<S: RecordStore>(game: &Game<S>, actor: &ActiveCharacter, tokens: &[String]) {
    let Some(needle) = rest(tokens) else {
        actor.tell("\n\rUsage: drop <item name>\n\r").await;
        return;
    };
    match game.world.drop_item(actor, &needle).await {
        Ok(name) => {
            actor.tell(format!("\n\rYou drop {name}.\n\r")).await;
            announce(game, actor, &format!("{} drops {name}.", actor.name)).await;
        }
        Err(e) => report(actor, "drop", e).await,
    }
}

pub(super) async fn wear<S: RecordStore>(game: &Game<S>, actor: &ActiveCharacter, tokens: &[String]) {
    let Some(needle) = rest(tokens) else {
        actor.tell("\n\rUsage: wear <item name>\n\r").await;
        return;
    };
    match game.world.wear(actor, &needle).await {
        Ok((name, _)) => {
            actor.tell(format!("\n\rYou wear {name}.\n\r")).await;
            announce(game, actor, &format!("{} wears {name}.", actor.name)).await;
        }
        Err(e) => report(actor, "wear", e).await,
    }
}

pub(super) async fn remove<S: RecordStore>(game: &Game<S>, actor: &ActiveCharacter, tokens: &[String]) {
    let Some(needle) = rest(tokens) else {
        actor.tell("\n\rUsage: remove <item name>\n\r").await;
        return;
    };
    match game.world.remove_worn(actor, &needle).await {
        Ok(name) => {
            actor.tell(format!("\n\rYou remove {name}.\n\r")).await;
            announce(game, actor, &format!("{} removes {name}.", actor.name)).await;
        }
        Err(WorldError::NotCarried(_)) => actor.tell("\n\rYou aren't wearing that.\n\r").await,
        Err(e) => report(actor, "remove", e).await,
    }
}

/// Tells everyone else in the actor's room.
async fn announce<S: RecordStore>(game: &Game<S>, actor: &ActiveCharacter, text: &str) {
    let room = actor.state.lock().await.room;
    game.world
        .broadcast(room, &format!("\n\r{text}\n\r"), Some(actor.id))
        .await;
}

async fn report(actor: &ActiveCharacter, verb: &str, err: WorldError) {
    let text = match err {
        WorldError::NotHere(_) => "You don't see that item here.".to_string(),
        WorldError::NotCarried(_) => "You don't have that item.".to_string(),
        WorldError::CannotPickUp(name) => format!("You can't pick up {name}."),
        WorldError::Inventory(e) => e.to_string(),
        other => {
            warn!(character_id = %actor.id, verb, error = %other, "item command failed");
            "You can't do that right now.".to_string()
        }
    };
    actor.tell(format!("\n\r{text}\n\r")).await;
}
