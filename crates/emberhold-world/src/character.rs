//! Characters and the live handle for one being played.

use std::collections::BTreeMap;
use std::sync::Arc;

use emberhold_protocol::{AccountName, CharacterId, RoomId};
use emberhold_session::Outbox;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{CharacterRecord, CombatRange, Inventory};

/// A character's mutable state.
#[derive(Debug, Clone)]
pub struct Character {
    pub id: CharacterId,
    pub account: AccountName,
    pub name: String,
    pub attributes: BTreeMap<String, f64>,
    pub abilities: BTreeMap<String, f64>,
    pub health: f64,
    pub essence: f64,
    pub room: RoomId,
    pub inventory: Inventory,
    /// Never persisted.
    pub combat: CombatRange,
}

impl Character {
    pub fn to_record(&self) -> CharacterRecord {
        CharacterRecord {
            id: self.id,
            account: self.account.clone(),
            name: self.name.clone(),
            attributes: self.attributes.clone(),
            abilities: self.abilities.clone(),
            health: self.health,
            essence: self.essence,
            room: self.room,
            inventory: self.inventory.slots().clone(),
        }
    }

    pub fn from_record(record: CharacterRecord) -> Self {
        Self {
            id: record.id,
            account: record.account,
            name: record.name,
            attributes: record.attributes,
            abilities: record.abilities,
            health: record.health,
            essence: record.essence,
            room: record.room,
            inventory: Inventory::from_slots(record.inventory),
            combat: CombatRange::new(),
        }
    }
}

/// A character currently being played.
///
/// `id`, `name` and `outbox` never change while the character is active,
/// so they sit outside the lock: broadcasts and room listings read them
/// without contending with the owner's commands.
#[derive(Debug)]
pub struct ActiveCharacter {
    pub id: CharacterId,
    pub name: String,
    pub outbox: Outbox,
    pub state: Mutex<Character>,
}

impl ActiveCharacter {
    pub fn new(character: Character, outbox: Outbox) -> Arc<Self> {
        Arc::new(Self {
            id: character.id,
            name: character.name.clone(),
            outbox,
            state: Mutex::new(character),
        })
    }

    /// Sends to this player, ignoring a closed outbox (they're leaving).
    pub async fn tell(&self, text: impl Into<String>) {
        if self.outbox.send(text).await.is_err() {
            debug!(character_id = %self.id, "output dropped, session closed");
        }
    }

    /// Like [`tell`](Self::tell), then re-prompts.
    pub async fn tell_with_prompt(&self, text: impl Into<String>) {
        if self.outbox.send_with_prompt(text).await.is_err() {
            debug!(character_id = %self.id, "output dropped, session closed");
        }
    }
}
