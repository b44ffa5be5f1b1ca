//! Rooms: the nodes of the world graph.

use std::collections::{BTreeMap, BTreeSet};

use emberhold_protocol::{CharacterId, ItemId, RoomId};
use serde::{Deserialize, Serialize};

/// One way out of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exit {
    pub target: RoomId,
    /// Hidden exits work but aren't listed by `look`.
    pub visible: bool,
}

/// A location characters stand in.
///
/// Rooms are built from seed data at startup and live for the whole
/// process. Occupants and items are ids; the entities themselves live in
/// the [`World`](crate::World) registries.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub area: String,
    pub title: String,
    pub description: String,
    /// Keyed by lower-cased direction.
    pub exits: BTreeMap<String, Exit>,
    pub occupants: BTreeSet<CharacterId>,
    /// Items lying on the floor, oldest first.
    pub items: Vec<ItemId>,
}

impl Room {
    pub fn new(id: RoomId, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            area: String::new(),
            title: title.into(),
            description: description.into(),
            exits: BTreeMap::new(),
            occupants: BTreeSet::new(),
            items: Vec::new(),
        }
    }

    /// Adds an exit; builder style for seed code and tests.
    pub fn with_exit(mut self, direction: &str, target: RoomId) -> Self {
        self.exits.insert(
            direction.to_lowercase(),
            Exit {
                target,
                visible: true,
            },
        );
        self
    }

    pub fn exit(&self, direction: &str) -> Option<&Exit> {
        self.exits.get(&direction.to_lowercase())
    }

    /// Visible exit directions, sorted.
    pub fn visible_exits(&self) -> Vec<&str> {
        self.exits
            .iter()
            .filter(|(_, e)| e.visible)
            .map(|(d, _)| d.as_str())
            .collect()
    }

    pub fn add_item(&mut self, id: ItemId) {
        if !self.items.contains(&id) {
            self.items.push(id);
        }
    }

    /// Returns `false` if the item wasn't here.
    pub fn remove_item(&mut self, id: ItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| *i != id);
        self.items.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_exits_are_sorted_and_skip_hidden() {
        let mut room = Room::new(RoomId(1), "Square", "")
            .with_exit("west", RoomId(2))
            .with_exit("East", RoomId(3))
            .with_exit("down", RoomId(4));
        room.exits.get_mut("down").unwrap().visible = false;

        assert_eq!(room.visible_exits(), vec!["east", "west"]);
        assert_eq!(room.exit("EAST").map(|e| e.target), Some(RoomId(3)));
        assert!(room.exit("down").is_some());
    }

    #[test]
    fn test_items_keep_drop_order() {
        let mut room = Room::new(RoomId(1), "Square", "");
        let (a, b) = (ItemId::new(), ItemId::new());
        room.add_item(a);
        room.add_item(b);
        room.add_item(a);
        assert_eq!(room.items, vec![a, b]);
        assert!(room.remove_item(a));
        assert!(!room.remove_item(a));
        assert_eq!(room.items, vec![b]);
    }
}
