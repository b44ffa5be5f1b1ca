//! Range-band commands.
//!
//! Each side's range is set separately, one character lock at a time.

use std::sync::Arc;

use emberhold_store::RecordStore;
use emberhold_world::{ActiveCharacter, RangeBand};

use super::rest;
use crate::Game;

pub(super) async fn engage<S: RecordStore>(game: &Game<S>, actor: &ActiveCharacter, tokens: &[String]) {
    let Some(name) = rest(tokens) else {
        actor.tell("\n\rUsage: engage <name>\n\r").await;
        return;
    };
    let room = actor.state.lock().await.room;
    let Some(target) = game.world.find_occupant(room, &name, actor.id).await else {
        actor.tell("\n\rThey aren't here.\n\r").await;
        return;
    };

    {
        let mut ch = actor.state.lock().await;
        if ch.combat.opponents().contains(&target.id) {
            drop(ch);
            actor
                .tell(format!("\n\rYou are already fighting {}.\n\r", target.name))
                .await;
            return;
        }
        ch.combat.enter_combat();
        ch.combat.set_range(target.id, RangeBand::Reach);
    }
    {
        let mut other = target.state.lock().await;
        other.combat.enter_combat();
        other.combat.set_range(actor.id, RangeBand::Reach);
    }

    actor.tell(format!("\n\rYou engage {}.\n\r", target.name)).await;
    target
        .tell_with_prompt(format!("\n\r{} engages you!\n\r", actor.name))
        .await;
}

pub(super) async fn advance<S: RecordStore>(game: &Game<S>, actor: &ActiveCharacter, tokens: &[String]) {
    let Some(target) = engaged_target(game, actor, tokens, "advance").await else {
        return;
    };
    game.world
        .set_mutual_range(actor, &target, RangeBand::Melee)
        .await;

    actor
        .tell(format!("\n\rYou close to melee range with {}.\n\r", target.name))
        .await;
    target
        .tell_with_prompt(format!("\n\r{} closes to melee range with you!\n\r", actor.name))
        .await;
}

pub(super) async fn retreat<S: RecordStore>(game: &Game<S>, actor: &ActiveCharacter, tokens: &[String]) {
    let Some(target) = engaged_target(game, actor, tokens, "retreat").await else {
        return;
    };
    let band = actor.state.lock().await.combat.range_to(target.id).farther();
    game.world.set_mutual_range(actor, &target, band).await;

    actor
        .tell(format!(
            "\n\rYou fall back to {} range from {}.\n\r",
            band.as_str(),
            target.name
        ))
        .await;
    target
        .tell_with_prompt(format!(
            "\n\r{} falls back to {} range.\n\r",
            actor.name,
            band.as_str()
        ))
        .await;
}

pub(super) async fn flee<S: RecordStore>(game: &Game<S>, actor: &ActiveCharacter) {
    let (in_combat, can_escape, opponents) = {
        let ch = actor.state.lock().await;
        (ch.combat.in_combat(), ch.combat.can_escape(), ch.combat.opponents())
    };
    if !in_combat {
        actor.tell("\n\rYou aren't fighting anyone.\n\r").await;
        return;
    }
    if !can_escape {
        actor.tell("\n\rYou can't escape!\n\r").await;
        return;
    }

    game.world.disengage(actor).await;
    actor.tell("\n\rYou break off from the fight.\n\r").await;
    for id in opponents {
        if let Some(other) = game.world.active(id) {
            other
                .tell_with_prompt(format!("\n\r{} breaks off from the fight.\n\r", actor.name))
                .await;
        }
    }
}

/// Resolves the named opponent for `advance`/`retreat` among the people
/// in the actor's room, telling the actor why not if there isn't one.
async fn engaged_target<S: RecordStore>(
    game: &Game<S>,
    actor: &ActiveCharacter,
    tokens: &[String],
    verb: &str,
) -> Option<Arc<ActiveCharacter>> {
    let Some(name) = rest(tokens) else {
        actor.tell(format!("\n\rUsage: {verb} <name>\n\r")).await;
        return None;
    };
    let (room, opponents) = {
        let ch = actor.state.lock().await;
        (ch.room, ch.combat.opponents())
    };
    let needle = name.to_lowercase();
    let target = game
        .world
        .occupants(room, Some(actor.id))
        .await
        .into_iter()
        .find(|c| opponents.contains(&c.id) && c.name.to_lowercase().starts_with(&needle));
    if target.is_none() {
        actor
            .tell(format!("\n\rYou aren't fighting anyone called {name}.\n\r"))
            .await;
    }
    target
}
