//! The world arena.
//!
//! [`World`] owns every registry: rooms, active characters, live items,
//! prototypes and archetypes. It holds no lock of its own; each room,
//! character and item has its own `tokio::sync::Mutex`, and operations
//! that touch several entities lock them one after another.
//!
//! # Lock order
//!
//! - character, then item
//! - room, then item
//! - a room and a character are never held together
//!
//! No lock is held while sending output.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use emberhold_protocol::{AccountName, CharacterId, ItemId, RoomId};
use futures_util::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    ActiveCharacter, Archetype, Character, CombatRange, Exit, Inventory, Item, Placement,
    Prototype, PrototypeId, RangeBand, Room, SeedData, WorldConfig, WorldError,
};

pub struct World {
    rooms: HashMap<RoomId, Arc<Mutex<Room>>>,
    characters: DashMap<CharacterId, Arc<ActiveCharacter>>,
    items: DashMap<ItemId, Arc<Mutex<Item>>>,
    prototypes: HashMap<PrototypeId, Prototype>,
    archetypes: BTreeMap<String, Archetype>,
    start_room: RoomId,
    config: WorldConfig,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("rooms", &self.rooms.len())
            .field("active", &self.characters.len())
            .field("items", &self.items.len())
            .field("start_room", &self.start_room)
            .finish()
    }
}

impl World {
    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Builds the world from seed tables, materializing each room's
    /// starting items.
    ///
    /// # Errors
    /// - [`WorldError::EmptyWorld`] if there are no rooms
    /// - [`WorldError::RoomNotFound`] if the start room or a `room_items`
    ///   key names an unknown room
    /// - [`WorldError::PrototypeNotFound`] if a starting item names an
    ///   unknown prototype
    pub fn from_seed(seed: SeedData, config: WorldConfig) -> Result<Self, WorldError> {
        let mut rooms: HashMap<RoomId, Room> = HashMap::with_capacity(seed.rooms.len());
        for r in seed.rooms {
            let mut room = Room::new(r.id, r.title, r.description);
            room.area = r.area;
            for e in r.exits {
                room.exits.insert(
                    e.direction.to_lowercase(),
                    Exit {
                        target: e.target,
                        visible: e.visible,
                    },
                );
            }
            rooms.insert(r.id, room);
        }

        for room in rooms.values() {
            for (dir, exit) in &room.exits {
                if !rooms.contains_key(&exit.target) {
                    warn!(room_id = %room.id, direction = %dir, target = %exit.target, "exit leads to unknown room");
                }
            }
        }

        let start_room = match seed.start_room {
            Some(id) if rooms.contains_key(&id) => id,
            Some(id) => return Err(WorldError::RoomNotFound(id)),
            None if rooms.contains_key(&RoomId(1)) => RoomId(1),
            None => *rooms.keys().min().ok_or(WorldError::EmptyWorld)?,
        };

        let mut world = World {
            rooms: HashMap::new(),
            characters: DashMap::new(),
            items: DashMap::new(),
            prototypes: seed
                .prototypes
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect(),
            archetypes: seed
                .archetypes
                .into_iter()
                .map(|a| (a.name.clone(), a))
                .collect(),
            start_room,
            config,
        };

        for (room_id, protos) in seed.room_items {
            let room = rooms
                .get_mut(&room_id)
                .ok_or(WorldError::RoomNotFound(room_id))?;
            for proto in &protos {
                let id = world.materialize(proto)?;
                room.add_item(id);
            }
        }

        world.rooms = rooms
            .into_iter()
            .map(|(id, room)| (id, Arc::new(Mutex::new(room))))
            .collect();

        info!(
            rooms = world.rooms.len(),
            items = world.items.len(),
            prototypes = world.prototypes.len(),
            %start_room,
            "world loaded"
        );
        Ok(world)
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn start_room(&self) -> RoomId {
        self.start_room
    }

    // -----------------------------------------------------------------------
    // Rooms
    // -----------------------------------------------------------------------

    pub fn room(&self, id: RoomId) -> Result<Arc<Mutex<Room>>, WorldError> {
        self.rooms
            .get(&id)
            .cloned()
            .ok_or(WorldError::RoomNotFound(id))
    }

    pub fn has_room(&self, id: RoomId) -> bool {
        self.rooms.contains_key(&id)
    }

    /// All room ids, sorted.
    pub fn room_ids(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> = self.rooms.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Replaces what lies on a room's floor and returns what was there.
    pub async fn replace_floor(
        &self,
        room: RoomId,
        items: Vec<ItemId>,
    ) -> Result<Vec<ItemId>, WorldError> {
        let room = self.room(room)?;
        let mut room = room.lock().await;
        Ok(std::mem::replace(&mut room.items, items))
    }

    // -----------------------------------------------------------------------
    // Prototypes, archetypes and items
    // -----------------------------------------------------------------------

    pub fn prototype(&self, id: &PrototypeId) -> Option<&Prototype> {
        self.prototypes.get(id)
    }

    /// Archetypes, sorted by name.
    pub fn archetypes(&self) -> impl Iterator<Item = &Archetype> {
        self.archetypes.values()
    }

    pub fn archetype(&self, name: &str) -> Option<&Archetype> {
        self.archetypes.get(name)
    }

    /// Creates a live item from a prototype, with fresh ids all the way
    /// down its contents.
    pub fn materialize(&self, id: &PrototypeId) -> Result<ItemId, WorldError> {
        let mut path = Vec::new();
        self.materialize_inner(id, &mut path)
    }

    fn materialize_inner(
        &self,
        id: &PrototypeId,
        path: &mut Vec<PrototypeId>,
    ) -> Result<ItemId, WorldError> {
        let proto = self
            .prototypes
            .get(id)
            .ok_or_else(|| WorldError::PrototypeNotFound(id.clone()))?;

        path.push(id.clone());
        let mut contents = Vec::with_capacity(proto.contents.len());
        for child in &proto.contents {
            if path.contains(child) {
                warn!(prototype = %id, child = %child, "prototype contains itself, skipping");
                continue;
            }
            contents.push(self.materialize_inner(child, path)?);
        }
        path.pop();

        Ok(self.insert_item(Item::from_prototype(proto, contents)))
    }

    /// Registers a live item (freshly materialized or loaded from storage).
    pub fn insert_item(&self, item: Item) -> ItemId {
        let id = item.id;
        self.items.insert(id, Arc::new(Mutex::new(item)));
        id
    }

    pub fn item(&self, id: ItemId) -> Option<Arc<Mutex<Item>>> {
        self.items.get(&id).map(|e| e.value().clone())
    }

    pub fn has_item(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    /// Drops an item from the registry, returning it if it was live.
    pub fn forget_item(&self, id: ItemId) -> Option<Arc<Mutex<Item>>> {
        self.items.remove(&id).map(|(_, item)| item)
    }

    // -----------------------------------------------------------------------
    // Characters
    // -----------------------------------------------------------------------

    /// A brand-new character standing in the start room.
    pub fn new_character(
        &self,
        id: CharacterId,
        account: AccountName,
        name: impl Into<String>,
        archetype: Option<&Archetype>,
    ) -> Character {
        Character {
            id,
            account,
            name: name.into(),
            attributes: archetype.map(|a| a.attributes.clone()).unwrap_or_default(),
            abilities: archetype.map(|a| a.abilities.clone()).unwrap_or_default(),
            health: self.config.starting_health,
            essence: self.config.starting_essence,
            room: self.start_room,
            inventory: Inventory::new(),
            combat: CombatRange::new(),
        }
    }

    /// Registers a character as being played.
    ///
    /// # Errors
    /// [`WorldError::AlreadyActive`] if another session is driving it.
    pub fn activate(&self, active: Arc<ActiveCharacter>) -> Result<(), WorldError> {
        match self.characters.entry(active.id) {
            Entry::Occupied(_) => Err(WorldError::AlreadyActive(active.id)),
            Entry::Vacant(slot) => {
                slot.insert(active);
                Ok(())
            }
        }
    }

    pub fn deactivate(&self, id: CharacterId) -> Option<Arc<ActiveCharacter>> {
        self.characters.remove(&id).map(|(_, c)| c)
    }

    pub fn active(&self, id: CharacterId) -> Option<Arc<ActiveCharacter>> {
        self.characters.get(&id).map(|e| e.value().clone())
    }

    pub fn is_active(&self, id: CharacterId) -> bool {
        self.characters.contains_key(&id)
    }

    /// Everyone being played, sorted by name.
    pub fn active_characters(&self) -> Vec<Arc<ActiveCharacter>> {
        let mut all: Vec<Arc<ActiveCharacter>> =
            self.characters.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn active_count(&self) -> usize {
        self.characters.len()
    }

    // -----------------------------------------------------------------------
    // Presence and movement
    // -----------------------------------------------------------------------

    /// Puts a character into a room's occupant set.
    pub async fn enter_room(&self, actor: &ActiveCharacter, room_id: RoomId) -> Result<(), WorldError> {
        let room = self.room(room_id)?;
        actor.state.lock().await.room = room_id;
        room.lock().await.occupants.insert(actor.id);
        debug!(character_id = %actor.id, %room_id, "entered room");
        Ok(())
    }

    /// Takes a character out of its room's occupant set. Returns the room
    /// it was in.
    pub async fn leave_room(&self, actor: &ActiveCharacter) -> RoomId {
        let room_id = actor.state.lock().await.room;
        if let Ok(room) = self.room(room_id) {
            room.lock().await.occupants.remove(&actor.id);
        }
        room_id
    }

    /// Walks `actor` through the exit named `direction`.
    ///
    /// The source and destination rooms are locked one at a time, so for a
    /// moment the character is in neither occupant set. Walking away ends
    /// any fight still at reach or beyond.
    ///
    /// # Errors
    /// - [`WorldError::CannotEscape`] while anything is at melee range
    /// - [`WorldError::CannotGo`] if there's no such exit
    /// - [`WorldError::RoomNotFound`] if the exit leads nowhere
    pub async fn move_character(
        &self,
        actor: &ActiveCharacter,
        direction: &str,
    ) -> Result<RoomId, WorldError> {
        let direction = direction.to_lowercase();
        let (from, can_escape) = {
            let ch = actor.state.lock().await;
            (ch.room, ch.combat.can_escape())
        };
        if !can_escape {
            return Err(WorldError::CannotEscape);
        }

        let from_room = self.room(from)?;
        let target = from_room
            .lock()
            .await
            .exit(&direction)
            .map(|e| e.target)
            .ok_or_else(|| WorldError::CannotGo(direction.clone()))?;
        let to_room = self.room(target)?;

        from_room.lock().await.occupants.remove(&actor.id);
        self.disengage(actor).await;
        self.broadcast(
            from,
            &format!("\n\r{} has left going {}.\n\r", actor.name, direction),
            None,
        )
        .await;

        actor.state.lock().await.room = target;
        to_room.lock().await.occupants.insert(actor.id);
        self.broadcast(
            target,
            &format!("\n\r{} has arrived.\n\r", actor.name),
            Some(actor.id),
        )
        .await;

        debug!(character_id = %actor.id, from = %from, to = %target, "moved");
        Ok(target)
    }

    // -----------------------------------------------------------------------
    // Messaging
    // -----------------------------------------------------------------------

    /// Active characters in `room`, minus `except`. Taken under the room
    /// lock, which is released before returning.
    pub async fn occupants(&self, room: RoomId, except: Option<CharacterId>) -> Vec<Arc<ActiveCharacter>> {
        let Some(room) = self.rooms.get(&room) else {
            return Vec::new();
        };
        let room = room.lock().await;
        room.occupants
            .iter()
            .filter(|id| Some(**id) != except)
            .filter_map(|id| self.active(*id))
            .collect()
    }

    /// Finds someone else in `room` whose name starts with `name`.
    pub async fn find_occupant(
        &self,
        room: RoomId,
        name: &str,
        except: CharacterId,
    ) -> Option<Arc<ActiveCharacter>> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.occupants(room, Some(except))
            .await
            .into_iter()
            .find(|c| c.name.to_lowercase().starts_with(&needle))
    }

    /// Sends `text` to everyone in `room` except `except`, each followed
    /// by their own prompt.
    ///
    /// Sends run concurrently: a recipient with a full queue holds up
    /// only this call, not delivery to the others.
    pub async fn broadcast(&self, room: RoomId, text: &str, except: Option<CharacterId>) {
        let recipients = self.occupants(room, except).await;
        join_all(recipients.iter().map(|c| c.tell_with_prompt(text))).await;
    }

    /// Sends `text` to every active character, each followed by their
    /// prompt.
    pub async fn announce(&self, text: &str) {
        let everyone = self.active_characters();
        join_all(everyone.iter().map(|c| c.tell_with_prompt(text))).await;
    }

    // -----------------------------------------------------------------------
    // Inventory
    // -----------------------------------------------------------------------

    /// First item among `ids` whose name matches `needle` and that passes
    /// `filter`.
    async fn find_among(
        &self,
        ids: impl IntoIterator<Item = ItemId>,
        needle: &str,
        filter: impl Fn(&Item) -> bool,
    ) -> Option<(ItemId, Arc<Mutex<Item>>)> {
        for id in ids {
            let Some(item) = self.item(id) else {
                continue;
            };
            let hit = {
                let guard = item.lock().await;
                guard.matches(needle) && filter(&*guard)
            };
            if hit {
                return Some((id, item));
            }
        }
        None
    }

    /// Something `ch` carries whose name contains `needle`. Call with the
    /// character already locked.
    pub async fn find_carried(
        &self,
        ch: &Character,
        needle: &str,
    ) -> Option<(ItemId, Arc<Mutex<Item>>)> {
        self.find_among(ch.inventory.items(), needle, |_| true).await
    }

    /// Something on `room`'s floor whose name contains `needle`. Call with
    /// the room already locked.
    pub async fn find_on_floor(&self, room: &Room, needle: &str) -> Option<(ItemId, Arc<Mutex<Item>>)> {
        self.find_among(room.items.iter().copied(), needle, |_| true)
            .await
    }

    /// Picks an item up off the floor. Returns its name and where it went.
    pub async fn take(
        &self,
        actor: &ActiveCharacter,
        needle: &str,
    ) -> Result<(String, Placement), WorldError> {
        let room_id = actor.state.lock().await.room;
        let room = self.room(room_id)?;

        let item = {
            let mut room = room.lock().await;
            let (id, item) = self
                .find_on_floor(&room, needle)
                .await
                .ok_or_else(|| WorldError::NotHere(needle.to_string()))?;
            {
                let guard = item.lock().await;
                if !guard.can_pick_up {
                    return Err(WorldError::CannotPickUp(guard.name.clone()));
                }
            }
            room.remove_item(id);
            item
        };

        let mut ch = actor.state.lock().await;
        let mut item = item.lock().await;
        let placement = ch.inventory.place(&mut item);
        debug!(character_id = %actor.id, item_id = %item.id, ?placement, "took item");
        Ok((item.name.clone(), placement))
    }

    /// Puts a carried item on the floor, taking it off first if worn.
    pub async fn drop_item(&self, actor: &ActiveCharacter, needle: &str) -> Result<String, WorldError> {
        let (room_id, id, name) = {
            let mut ch = actor.state.lock().await;
            let (id, item) = self
                .find_carried(&ch, needle)
                .await
                .ok_or_else(|| WorldError::NotCarried(needle.to_string()))?;
            let mut item = item.lock().await;
            ch.inventory.take_out(&mut item);
            (ch.room, id, item.name.clone())
        };

        self.room(room_id)?.lock().await.add_item(id);
        debug!(character_id = %actor.id, item_id = %id, %room_id, "dropped item");
        Ok(name)
    }

    /// Wears a held item. Returns its name and the locations it covers.
    ///
    /// An unworn match is preferred; naming only something already worn
    /// fails with [`InventoryError::AlreadyWorn`](crate::InventoryError::AlreadyWorn).
    pub async fn wear(
        &self,
        actor: &ActiveCharacter,
        needle: &str,
    ) -> Result<(String, Vec<String>), WorldError> {
        let mut ch = actor.state.lock().await;
        let carried = ch.inventory.items();
        let found = match self.find_among(carried.clone(), needle, |i| !i.is_worn).await {
            Some(hit) => Some(hit),
            None => self.find_among(carried, needle, |_| true).await,
        };
        let (_, item) = found.ok_or_else(|| WorldError::NotCarried(needle.to_string()))?;
        let mut item = item.lock().await;
        ch.inventory.wear(&mut item)?;
        Ok((item.name.clone(), item.worn_on.clone()))
    }

    /// Takes off a worn item into a free hand. Returns its name.
    pub async fn remove_worn(&self, actor: &ActiveCharacter, needle: &str) -> Result<String, WorldError> {
        let mut ch = actor.state.lock().await;
        let (_, item) = self
            .find_among(ch.inventory.items(), needle, |i| i.is_worn)
            .await
            .ok_or_else(|| WorldError::NotCarried(needle.to_string()))?;
        let mut item = item.lock().await;
        ch.inventory.remove_worn(&mut item)?;
        Ok(item.name.clone())
    }

    // -----------------------------------------------------------------------
    // Combat
    // -----------------------------------------------------------------------

    /// Sets both sides' range to each other, locking one side at a time.
    pub async fn set_mutual_range(&self, a: &ActiveCharacter, b: &ActiveCharacter, band: RangeBand) {
        a.state.lock().await.combat.set_range(b.id, band);
        b.state.lock().await.combat.set_range(a.id, band);
    }

    /// Takes `actor` out of combat and drops it from every opponent's map.
    pub async fn disengage(&self, actor: &ActiveCharacter) {
        let opponents = {
            let mut ch = actor.state.lock().await;
            let opponents = ch.combat.opponents();
            ch.combat.exit_combat();
            opponents
        };
        for id in opponents {
            if let Some(other) = self.active(id) {
                other.state.lock().await.combat.forget(actor.id);
            }
        }
    }
}
