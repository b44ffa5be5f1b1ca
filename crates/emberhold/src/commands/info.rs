//! Read-only commands: look, who, show, inventory, examine, help.

use std::fmt::Write as _;
use std::sync::Arc;

use emberhold_protocol::{Color, ItemId, paint};
use emberhold_store::RecordStore;
use emberhold_world::{ActiveCharacter, Item, LEFT_HAND, RIGHT_HAND, WEAR_LOCATIONS};
use tokio::sync::Mutex;

use super::rest;
use crate::Game;

const WHO_COLUMN: usize = 17;

/// Describes the actor's current room.
pub(crate) async fn look<S: RecordStore>(game: &Game<S>, actor: &ActiveCharacter) {
    let room_id = actor.state.lock().await.room;
    let Ok(room) = game.world.room(room_id) else {
        actor.tell("\n\rYou are nowhere at all.\n\r").await;
        return;
    };

    let (title, description, exits, items) = {
        let room = room.lock().await;
        let exits: Vec<String> = room.visible_exits().into_iter().map(String::from).collect();
        (room.title.clone(), room.description.clone(), exits, room.items.clone())
    };
    let others: Vec<String> = game
        .world
        .occupants(room_id, Some(actor.id))
        .await
        .iter()
        .map(|c| c.name.clone())
        .collect();
    let item_names = names_of(game, &items).await;

    let mut out = format!("\n\r[{}]\n\r{description}\n\r", paint(&title, Color::White));
    if exits.is_empty() {
        out.push_str("There are no exits.\n\r");
    } else {
        let _ = write!(out, "Obvious exits: {}\n\r", exits.join(", "));
    }
    if others.is_empty() {
        out.push_str("You are alone.\n\r");
    } else {
        let _ = write!(out, "Also here: {}\n\r", others.join(", "));
    }
    if !item_names.is_empty() {
        out.push_str("Items in the room:\n\r");
        for name in item_names {
            let _ = write!(out, "- {name}\n\r");
        }
    }
    actor.tell(out).await;
}

pub(super) async fn who<S: RecordStore>(game: &Game<S>, actor: &ActiveCharacter) {
    let names: Vec<String> = game
        .world
        .active_characters()
        .iter()
        .map(|c| c.name.clone())
        .collect();
    let width = usize::from(actor.outbox.terminal().width());
    let mut out = String::from("\n\rOnline Characters:\n\r");
    out.push_str(&columns(&names, width));
    actor.tell(out).await;
}

/// Lays `names` out top-to-bottom, then left-to-right, in as many
/// fixed-width columns as fit.
fn columns(names: &[String], width: usize) -> String {
    if names.is_empty() {
        return String::new();
    }
    let cols = (width / WHO_COLUMN).max(1);
    let rows = names.len().div_ceil(cols);
    let mut out = String::new();
    for r in 0..rows {
        let mut line = String::new();
        for c in 0..cols {
            if let Some(name) = names.get(c * rows + r) {
                let _ = write!(line, "{name:<15}  ");
            }
        }
        out.push_str(line.trim_end());
        out.push_str("\n\r");
    }
    out
}

pub(super) async fn show(actor: &ActiveCharacter) {
    let out = {
        let ch = actor.state.lock().await;
        let mut out = format!("\n\rName: {}\n\r", ch.name);
        let _ = write!(
            out,
            "Health: {}, Essence: {}\n\r",
            ch.health as i64, ch.essence as i64
        );
        out.push_str("Attributes:\n\r");
        for (name, value) in &ch.attributes {
            let _ = write!(out, "  {name:<15}: {:>2}\n\r", *value as i64);
        }
        let abilities: Vec<_> = ch.abilities.iter().filter(|(_, v)| **v >= 1.0).collect();
        if !abilities.is_empty() {
            out.push_str("Abilities:\n\r");
            for (name, value) in abilities {
                let _ = write!(out, "  {name:<15}: {:>2}\n\r", *value as i64);
            }
        }
        out
    };
    actor.tell(out).await;
}

pub(super) async fn inventory<S: RecordStore>(game: &Game<S>, actor: &ActiveCharacter) {
    let slots = actor.state.lock().await.inventory.slots().clone();
    if slots.is_empty() {
        actor.tell("\n\rYour inventory is empty.\n\r").await;
        return;
    }

    let mut held = Vec::new();
    let mut carried = Vec::new();
    let mut worn: Vec<ItemId> = Vec::new();
    for (slot, id) in &slots {
        let slot = slot.as_str();
        if slot == RIGHT_HAND || slot == LEFT_HAND {
            held.push(*id);
        } else if WEAR_LOCATIONS.contains(&slot) {
            if !worn.contains(id) {
                worn.push(*id);
            }
        } else {
            carried.push(*id);
        }
    }

    let mut out = String::from("\n\rInventory:\n\r");
    if !held.is_empty() {
        let _ = write!(out, "Held items: {}\n\r", names_of(game, &held).await.join(", "));
    }
    if !carried.is_empty() {
        let _ = write!(out, "Carried items: {}\n\r", names_of(game, &carried).await.join(", "));
    }
    if !worn.is_empty() {
        let mut parts = Vec::with_capacity(worn.len());
        for id in worn {
            if let Some(item) = game.world.item(id) {
                let item = item.lock().await;
                parts.push(format!("{} (worn on {})", item.name, item.worn_on.join(", ")));
            }
        }
        let _ = write!(out, "Worn items: {}\n\r", parts.join(", "));
    }
    actor.tell(out).await;
}

pub(super) async fn examine<S: RecordStore>(game: &Game<S>, actor: &ActiveCharacter, tokens: &[String]) {
    let Some(needle) = rest(tokens) else {
        actor.tell("\n\rUsage: examine <item name>\n\r").await;
        return;
    };

    let Some(item) = find_visible(game, actor, &needle).await else {
        actor.tell("\n\rYou don't see that item here.\n\r").await;
        return;
    };
    let item = item.lock().await.clone();
    let contents = names_of(game, &item.contents).await;
    actor.tell(describe_item(&item, &contents)).await;
}

/// Carried first, then the floor.
async fn find_visible<S: RecordStore>(
    game: &Game<S>,
    actor: &ActiveCharacter,
    needle: &str,
) -> Option<Arc<Mutex<Item>>> {
    let room_id = {
        let ch = actor.state.lock().await;
        if let Some((_, item)) = game.world.find_carried(&ch, needle).await {
            return Some(item);
        }
        ch.room
    };
    let room = game.world.room(room_id).ok()?;
    let room = room.lock().await;
    game.world
        .find_on_floor(&room, needle)
        .await
        .map(|(_, item)| item)
}

fn describe_item(item: &Item, contents: &[String]) -> String {
    let yes_no = |b: bool| if b { "yes" } else { "no" };

    let mut out = format!("\n\rItem: {}\n\r", item.name);
    let _ = write!(out, "Description: {}\n\r", item.description);
    let _ = write!(out, "Mass: {:.2}\n\r", item.mass);
    let _ = write!(out, "Value: {}\n\r", item.value);
    let _ = write!(out, "Stackable: {}\n\r", yes_no(item.stackable));
    if item.stackable {
        let _ = write!(out, "Quantity: {}/{}\n\r", item.quantity, item.max_stack);
    }
    if item.wearable {
        let _ = write!(out, "Wearable on: {}\n\r", item.worn_on.join(", "));
    }
    if item.is_worn {
        out.push_str("This item is currently being worn.\n\r");
    }
    if item.container {
        if contents.is_empty() {
            out.push_str("It is empty.\n\r");
        } else {
            out.push_str("It contains:\n\r");
            for name in contents {
                let _ = write!(out, "- {name}\n\r");
            }
        }
    }
    if !item.verbs.is_empty() {
        out.push_str("Special actions:\n\r");
        for (verb, text) in &item.verbs {
            let _ = write!(out, "- {verb}: {text}\n\r");
        }
    }
    if !item.trait_mods.is_empty() {
        out.push_str("Trait Modifications:\n\r");
        for (name, delta) in &item.trait_mods {
            let _ = write!(out, "- {name}: {delta:+}\n\r");
        }
    }
    if !item.metadata.is_empty() {
        out.push_str("Additional Information:\n\r");
        for (key, value) in &item.metadata {
            let _ = write!(out, "- {key}: {value}\n\r");
        }
    }
    out
}

pub(super) async fn help(actor: &ActiveCharacter) {
    actor.tell(HELP).await;
}

const HELP: &str = "\n\rAvailable commands:\n\r\
  look (l)                    describe your surroundings\n\r\
  say <text> (', \")          speak to the room\n\r\
  go <direction> (move)       walk through an exit\n\r\
  north south east west up down (n s e w u d)\n\r\
  who                         list everyone online\n\r\
  show (score)                your character sheet\n\r\
  inventory (i, inv)          what you carry\n\r\
  take <item> (get)           pick something up\n\r\
  drop <item>                 put something down\n\r\
  wear <item>                 put on something you hold\n\r\
  remove <item>               take off something you wear\n\r\
  examine <item> (x)          look closely at an item\n\r\
  engage <name>               start a fight\n\r\
  advance <name>              close to melee\n\r\
  retreat <name>              back off one range band\n\r\
  flee                        leave every fight\n\r\
  help (?)                    this list\n\r\
  quit (q!)                   leave the game\n\r";

/// Names of the live items among `ids`, in order. Missing items are
/// skipped.
async fn names_of<S: RecordStore>(game: &Game<S>, ids: &[ItemId]) -> Vec<String> {
    let mut names = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(item) = game.world.item(*id) {
            names.push(item.lock().await.name.clone());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Name{i}")).collect()
    }

    #[test]
    fn test_columns_fill_downwards() {
        // 40 columns fit two 17-wide columns.
        let out = columns(&names(3), 40);
        assert_eq!(out, "Name0            Name2\n\rName1\n\r");
    }

    #[test]
    fn test_columns_narrow_terminal_is_one_column() {
        let out = columns(&names(2), 10);
        assert_eq!(out, "Name0\n\rName1\n\r");
    }

    #[test]
    fn test_columns_empty() {
        assert_eq!(columns(&[], 80), "");
    }

    #[test]
    fn test_describe_container_and_worn() {
        let proto = emberhold_world::Prototype {
            container: true,
            ..emberhold_world::Prototype::simple("pack", "leather pack", "A worn pack.")
        }
        .worn_on(["back"]);
        let mut item = Item::from_prototype(&proto, Vec::new());
        item.is_worn = true;

        let text = describe_item(&item, &[]);
        assert!(text.starts_with("\n\rItem: leather pack\n\r"));
        assert!(text.contains("Mass: 0.00\n\r"));
        assert!(text.contains("Wearable on: back\n\r"));
        assert!(text.contains("This item is currently being worn.\n\r"));
        assert!(text.contains("It is empty.\n\r"));

        let text = describe_item(&item, &["brass lamp".to_string()]);
        assert!(text.contains("It contains:\n\r- brass lamp\n\r"));
    }

    #[test]
    fn test_describe_trait_mods_signed() {
        let mut item = Item::from_prototype(&emberhold_world::Prototype::simple("r", "ring", ""), Vec::new());
        item.trait_mods.insert("strength".into(), 2);
        item.trait_mods.insert("wit".into(), -1);
        let text = describe_item(&item, &[]);
        assert!(text.contains("- strength: +2\n\r"));
        assert!(text.contains("- wit: -1\n\r"));
    }
}
