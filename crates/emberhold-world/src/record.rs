//! Stored forms of world entities.
//!
//! | collection   | key              | value             |
//! |--------------|------------------|-------------------|
//! | `characters` | character id     | [`CharacterRecord`] |
//! | `items`      | item uuid        | [`Item`](crate::Item) |
//! | `accounts`   | username         | [`AccountRecord`] |
//! | `rooms`      | room id          | [`RoomRecord`]    |

use std::collections::BTreeMap;

use emberhold_protocol::{AccountName, CharacterId, ItemId, RoomId};
use serde::{Deserialize, Serialize};

pub const CHARACTERS: &str = "characters";
pub const ITEMS: &str = "items";
pub const ACCOUNTS: &str = "accounts";
pub const ROOMS: &str = "rooms";

/// A character at rest. Combat state is never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterRecord {
    pub id: CharacterId,
    pub account: AccountName,
    pub name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, f64>,
    #[serde(default)]
    pub abilities: BTreeMap<String, f64>,
    pub health: f64,
    pub essence: f64,
    pub room: RoomId,
    /// Slot name to item id.
    #[serde(default)]
    pub inventory: BTreeMap<String, ItemId>,
}

/// A player login and the characters it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub name: AccountName,
    /// Character name to id; the menu lists them in this order.
    #[serde(default)]
    pub characters: BTreeMap<String, CharacterId>,
}

impl AccountRecord {
    pub fn new(name: AccountName) -> Self {
        Self {
            name,
            characters: BTreeMap::new(),
        }
    }
}

/// What is lying on a room's floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomRecord {
    pub id: RoomId,
    #[serde(default)]
    pub items: Vec<ItemId>,
}
