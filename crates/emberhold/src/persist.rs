//! Moving characters, items, accounts and floors in and out of the
//! record store.
//!
//! Records are encoded with the game's [`Codec`]. Item trees are saved
//! and loaded whole: a container brings its contents with it.

use std::collections::HashSet;

use emberhold_protocol::{AccountName, CharacterId, Codec, ItemId};
use emberhold_store::RecordStore;
use emberhold_world::record::{ACCOUNTS, CHARACTERS, ITEMS, ROOMS};
use emberhold_world::{
    AccountRecord, ActiveCharacter, Character, CharacterRecord, Item, NameRegistry, RoomRecord,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::{EmberholdError, Game};

/// Reads every stored character name into a fresh registry.
pub(crate) async fn load_names<S: RecordStore, C: Codec>(
    store: &S,
    codec: &C,
    fp_rate: f64,
) -> Result<NameRegistry, EmberholdError> {
    let mut names = Vec::new();
    for (key, bytes) in store.scan(CHARACTERS).await? {
        match codec.decode::<CharacterRecord>(&bytes) {
            Ok(record) => names.push(record.name),
            Err(e) => warn!(key = %key, error = %e, "unreadable character record, name not reserved"),
        }
    }
    info!(names = names.len(), "name registry built");
    Ok(NameRegistry::from_names(&names, fp_rate))
}

impl<S: RecordStore> Game<S> {
    async fn put<T: Serialize>(&self, collection: &str, key: &str, value: &T) -> Result<(), EmberholdError> {
        let bytes = self.codec.encode(value)?;
        self.store.put(collection, key, bytes).await?;
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, collection: &str, key: &str) -> Result<Option<T>, EmberholdError> {
        match self.store.get(collection, key).await? {
            Some(bytes) => Ok(Some(self.codec.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    // -----------------------------------------------------------------------
    // Accounts
    // -----------------------------------------------------------------------

    /// Loads an account, creating and storing it on first login.
    pub async fn load_account(&self, name: &AccountName) -> Result<AccountRecord, EmberholdError> {
        if let Some(account) = self.get::<AccountRecord>(ACCOUNTS, name.as_str()).await? {
            return Ok(account);
        }
        let account = AccountRecord::new(name.clone());
        self.save_account(&account).await?;
        info!(account = %name, "account created");
        Ok(account)
    }

    pub async fn save_account(&self, account: &AccountRecord) -> Result<(), EmberholdError> {
        self.put(ACCOUNTS, account.name.as_str(), account).await
    }

    // -----------------------------------------------------------------------
    // Characters
    // -----------------------------------------------------------------------

    pub async fn allocate_character_id(&self) -> Result<CharacterId, EmberholdError> {
        Ok(CharacterId(self.store.next_index(CHARACTERS).await?))
    }

    /// Saves a character's record and every item it carries.
    pub async fn save_character(&self, actor: &ActiveCharacter) -> Result<(), EmberholdError> {
        let (record, items) = {
            let ch = actor.state.lock().await;
            (ch.to_record(), ch.inventory.items())
        };
        self.save_character_record(&record).await?;
        self.save_items(items).await?;
        debug!(character_id = %actor.id, "character saved");
        Ok(())
    }

    pub(crate) async fn save_character_record(&self, record: &CharacterRecord) -> Result<(), EmberholdError> {
        self.put(CHARACTERS, &record.id.0.to_string(), record).await
    }

    /// Loads a stored character and brings its items into the world.
    ///
    /// Items that can't be found are dropped from the inventory with a
    /// warning. A character saved in a room that no longer exists is put
    /// in the start room.
    pub async fn load_character(&self, id: CharacterId) -> Result<Option<Character>, EmberholdError> {
        let Some(record) = self.get::<CharacterRecord>(CHARACTERS, &id.0.to_string()).await? else {
            return Ok(None);
        };
        let mut ch = Character::from_record(record);

        let mut missing = Vec::new();
        for item in ch.inventory.items() {
            if !self.load_item_tree(item).await? {
                warn!(character_id = %id, item_id = %item, "carried item missing from store");
                missing.push(item);
            }
        }
        if !missing.is_empty() {
            let kept = ch
                .inventory
                .slots()
                .iter()
                .filter(|(_, item)| !missing.contains(item))
                .map(|(slot, item)| (slot.clone(), *item))
                .collect();
            ch.inventory = emberhold_world::Inventory::from_slots(kept);
        }

        if !self.world.has_room(ch.room) {
            warn!(character_id = %id, room_id = %ch.room, "saved room gone, using start room");
            ch.room = self.world.start_room();
        }
        Ok(Some(ch))
    }

    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    /// Saves each item and everything inside it.
    pub async fn save_items(&self, roots: Vec<ItemId>) -> Result<(), EmberholdError> {
        let mut stack = roots;
        let mut seen = HashSet::new();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Some(item) = self.world.item(id) else {
                warn!(item_id = %id, "item vanished before save");
                continue;
            };
            let snapshot = item.lock().await.clone();
            stack.extend(snapshot.contents.iter().copied());
            self.put(ITEMS, &id.to_string(), &snapshot).await?;
        }
        Ok(())
    }

    /// Makes `root` and its contents live, reading from the store any
    /// that aren't already. Returns `false` if `root` itself is missing.
    pub(crate) async fn load_item_tree(&self, root: ItemId) -> Result<bool, EmberholdError> {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if self.world.has_item(id) {
                continue;
            }
            match self.get::<Item>(ITEMS, &id.to_string()).await? {
                Some(item) => {
                    stack.extend(item.contents.iter().copied());
                    self.world.insert_item(item);
                }
                None if id == root => return Ok(false),
                None => warn!(item_id = %id, container = %root, "contained item missing from store"),
            }
        }
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Floors
    // -----------------------------------------------------------------------

    /// Saves what lies in every room. Returns how many rooms failed.
    pub async fn save_floors(&self) -> usize {
        let mut failed = 0;
        for room_id in self.world.room_ids() {
            let Ok(room) = self.world.room(room_id) else {
                continue;
            };
            let items = room.lock().await.items.clone();
            let record = RoomRecord {
                id: room_id,
                items: items.clone(),
            };
            let saved = match self.put(ROOMS, &room_id.0.to_string(), &record).await {
                Ok(()) => self.save_items(items).await,
                Err(e) => Err(e),
            };
            if let Err(e) = saved {
                warn!(%room_id, error = %e, "failed to save room contents");
                failed += 1;
            }
        }
        failed
    }

    /// Replaces seeded floor items with whatever was saved, room by room.
    pub(crate) async fn restore_floors(&self) -> Result<(), EmberholdError> {
        for (key, bytes) in self.store.scan(ROOMS).await? {
            let record: RoomRecord = match self.codec.decode(&bytes) {
                Ok(r) => r,
                Err(e) => {
                    warn!(key = %key, error = %e, "unreadable room record, keeping seed items");
                    continue;
                }
            };
            if !self.world.has_room(record.id) {
                warn!(room_id = %record.id, "saved contents for unknown room ignored");
                continue;
            }

            let mut present = Vec::with_capacity(record.items.len());
            for id in record.items {
                if self.load_item_tree(id).await? {
                    present.push(id);
                } else {
                    warn!(room_id = %record.id, item_id = %id, "floor item missing from store");
                }
            }
            let replaced = self.world.replace_floor(record.id, present.clone()).await?;
            for old in replaced.into_iter().filter(|id| !present.contains(id)) {
                self.forget_item_tree(old).await;
            }
            debug!(room_id = %record.id, items = present.len(), "room contents restored");
        }
        Ok(())
    }

    async fn forget_item_tree(&self, root: ItemId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(item) = self.world.forget_item(id) {
                stack.extend(item.lock().await.contents.iter().copied());
            }
        }
    }
}
