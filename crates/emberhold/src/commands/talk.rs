use emberhold_store::RecordStore;
use emberhold_world::ActiveCharacter;

use super::rest;
use crate::Game;

pub(super) async fn say<S: RecordStore>(game: &Game<S>, actor: &ActiveCharacter, tokens: &[String]) {
    let Some(message) = rest(tokens) else {
        actor.tell("\n\rWhat do you want to say?\n\r").await;
        return;
    };

    actor.tell(format!("\n\rYou say {message}\n\r")).await;
    let room = actor.state.lock().await.room;
    game.world
        .broadcast(room, &format!("\n\r{} says {message}\n\r", actor.name), Some(actor.id))
        .await;
}
