//! Shared fixtures: a three-room town and characters wired to in-memory
//! outboxes.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use emberhold::{Game, GameConfig};
use emberhold_protocol::{AccountName, CharacterId, RoomId};
use emberhold_session::{Outbox, OutboxReceiver};
use emberhold_store::RecordStore;
use emberhold_tick::TickConfig;
use emberhold_world::{ActiveCharacter, Archetype, ExitSeed, Prototype, PrototypeId, RoomSeed, SeedData};

pub const PROMPT: &str = "> ";

fn room(id: u64, title: &str, exits: &[(&str, u64)]) -> RoomSeed {
    RoomSeed {
        id: RoomId(id),
        area: "town".into(),
        title: title.into(),
        description: format!("The {title}."),
        exits: exits
            .iter()
            .map(|(dir, to)| ExitSeed {
                direction: dir.to_string(),
                target: RoomId(*to),
                visible: true,
            })
            .collect(),
    }
}

/// Square (1) ─north→ Tower (2), Square ─east→ Market (3), and a broken
/// stair from the Market down to nowhere.
pub fn seed() -> SeedData {
    let mut pack = Prototype::simple("pack", "a leather pack", "Worn straps.");
    pack.container = true;
    pack.contents = vec![PrototypeId::new("lamp"), PrototypeId::new("lamp")];

    let mut room_items = BTreeMap::new();
    room_items.insert(
        RoomId(1),
        vec![PrototypeId::new("sword"), PrototypeId::new("cloak")],
    );
    room_items.insert(RoomId(3), vec![PrototypeId::new("pack")]);

    SeedData {
        rooms: vec![
            room(1, "Square", &[("north", 2), ("east", 3)]),
            room(2, "Tower", &[("south", 1)]),
            room(3, "Market", &[("west", 1), ("down", 99)]),
        ],
        prototypes: vec![
            Prototype::simple("sword", "a short sword", "Notched."),
            Prototype::simple("cloak", "a grey cloak", "Warm.").worn_on(["shoulders", "back"]),
            Prototype::simple("lamp", "a brass lamp", "Dented."),
            pack,
        ],
        archetypes: vec![Archetype {
            name: "Warrior".into(),
            description: "Hits things.".into(),
            attributes: BTreeMap::from([("strength".to_string(), 3.0)]),
            abilities: BTreeMap::from([("swords".to_string(), 2.0), ("sewing".to_string(), 0.0)]),
        }],
        start_room: None,
        room_items,
        motd: vec!["Welcome to Emberhold.".into()],
    }
}

pub fn config() -> GameConfig {
    GameConfig::default().with_tick(TickConfig::with_period(Duration::from_secs(1)))
}

pub async fn game_with<S: RecordStore>(store: S) -> Game<S> {
    Game::load(seed(), config(), store).await.unwrap()
}

/// A new character, active and standing in `room`.
pub async fn join_at<S: RecordStore>(
    game: &Game<S>,
    id: u64,
    name: &str,
    room: u64,
) -> (Arc<ActiveCharacter>, OutboxReceiver) {
    let (outbox, rx) = Outbox::detached(64, PROMPT);
    (join_with(game, id, name, room, outbox).await, rx)
}

/// A new character, active in `room`, writing to the given outbox.
pub async fn join_with<S: RecordStore>(
    game: &Game<S>,
    id: u64,
    name: &str,
    room: u64,
    outbox: Outbox,
) -> Arc<ActiveCharacter> {
    let ch = game
        .world()
        .new_character(CharacterId(id), AccountName::new("tester"), name, None);
    let actor = ActiveCharacter::new(ch, outbox);
    game.world().activate(actor.clone()).unwrap();
    game.world().enter_room(&actor, RoomId(room)).await.unwrap();
    actor
}

/// A new character in the start room.
pub async fn join<S: RecordStore>(game: &Game<S>, id: u64, name: &str) -> (Arc<ActiveCharacter>, OutboxReceiver) {
    join_at(game, id, name, 1).await
}

/// Validates and runs one line the way the input loop does. Returns
/// `true` if the player quit.
pub async fn run<S: RecordStore>(game: &Game<S>, actor: &ActiveCharacter, line: &str) -> bool {
    let (verb, tokens) = game.commands().validate(line).unwrap();
    emberhold::dispatch(game, actor, verb, &tokens).await
}

/// Everything queued for a player, concatenated.
pub fn text(rx: &mut OutboxReceiver) -> String {
    rx.drain().concat()
}
