//! Slot-based inventories.
//!
//! An inventory maps slot names to item ids. Two kinds of slot exist:
//!
//! - **wear locations** ([`WEAR_LOCATIONS`]), occupied by a worn item; an
//!   item worn on several locations appears under each of them
//! - **carry slots**: the two hands, then a catch-all slot named after the
//!   item itself (suffixed when that name is taken or is a hand or wear
//!   location)
//!
//! The inventory only stores ids. Callers lock the [`Item`] and pass it in
//! so the inventory can read its wear data and flip `is_worn`; the
//! owning character's lock is always taken first.

use std::collections::BTreeMap;

use emberhold_protocol::ItemId;
use serde::{Deserialize, Serialize};

use crate::{InventoryError, Item};

/// The dominant hand, filled first.
pub const RIGHT_HAND: &str = "right_hand";
pub const LEFT_HAND: &str = "left_hand";

const HANDS: [&str; 2] = [RIGHT_HAND, LEFT_HAND];

/// Every place an item can be worn.
pub const WEAR_LOCATIONS: [&str; 14] = [
    "head", "neck", "shoulders", "torso", "back", "arms", "wrists", "hands", "finger", "waist",
    "legs", "feet", "body", "about",
];

/// Where [`Inventory::place`] put an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Worn,
    Hand(&'static str),
    Stowed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory {
    slots: BTreeMap<String, ItemId>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds an inventory from its stored slot map.
    pub fn from_slots(slots: BTreeMap<String, ItemId>) -> Self {
        Self { slots }
    }

    pub fn slots(&self) -> &BTreeMap<String, ItemId> {
        &self.slots
    }

    pub fn slot(&self, name: &str) -> Option<ItemId> {
        self.slots.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.slots.values().any(|v| *v == id)
    }

    /// Every distinct item, in slot-name order. A worn item spanning
    /// several locations is listed once.
    pub fn items(&self) -> Vec<ItemId> {
        let mut out: Vec<ItemId> = Vec::with_capacity(self.slots.len());
        for id in self.slots.values() {
            if !out.contains(id) {
                out.push(*id);
            }
        }
        out
    }

    /// Puts `item` into the inventory.
    ///
    /// A worn item goes back onto its wear locations if they are all
    /// free; otherwise it is taken off and carried like anything else.
    pub fn place(&mut self, item: &mut Item) -> Placement {
        if item.is_worn && item.wearable && !item.worn_on.is_empty() {
            let free = item
                .worn_on
                .iter()
                .all(|loc| self.slots.get(loc).is_none_or(|id| *id == item.id));
            if free {
                for loc in &item.worn_on {
                    self.slots.insert(loc.clone(), item.id);
                }
                return Placement::Worn;
            }
        }
        item.is_worn = false;

        if let Some(hand) = self.free_hand() {
            self.slots.insert(hand.to_string(), item.id);
            return Placement::Hand(hand);
        }

        let base = item.name.to_lowercase();
        let mut key = base.clone();
        let mut n = 2;
        while self.slots.contains_key(&key) || is_reserved(&key) {
            key = format!("{base}#{n}");
            n += 1;
        }
        self.slots.insert(key.clone(), item.id);
        Placement::Stowed(key)
    }

    /// Moves a held item onto its wear locations.
    pub fn wear(&mut self, item: &mut Item) -> Result<(), InventoryError> {
        if !item.wearable || item.worn_on.is_empty() {
            return Err(InventoryError::NotWearable);
        }
        if item.is_worn {
            return Err(InventoryError::AlreadyWorn);
        }
        if let Some(bad) = item
            .worn_on
            .iter()
            .find(|loc| !WEAR_LOCATIONS.contains(&loc.as_str()))
        {
            return Err(InventoryError::InvalidLocation(bad.clone()));
        }
        let hand = HANDS
            .into_iter()
            .find(|hand| self.slot(hand) == Some(item.id))
            .ok_or(InventoryError::NotInHand)?;
        if let Some(taken) = item.worn_on.iter().find(|loc| self.slots.contains_key(*loc)) {
            return Err(InventoryError::LocationOccupied(taken.clone()));
        }

        self.slots.remove(hand);
        for loc in &item.worn_on {
            self.slots.insert(loc.clone(), item.id);
        }
        item.is_worn = true;
        Ok(())
    }

    /// Takes a worn item off into a free hand and returns which one.
    pub fn remove_worn(&mut self, item: &mut Item) -> Result<&'static str, InventoryError> {
        if !item.is_worn {
            return Err(InventoryError::NotWorn);
        }
        let hand = self.free_hand().ok_or(InventoryError::HandsFull)?;
        self.slots
            .retain(|slot, id| *id != item.id || !WEAR_LOCATIONS.contains(&slot.as_str()));
        self.slots.insert(hand.to_string(), item.id);
        item.is_worn = false;
        Ok(hand)
    }

    /// Removes `item` from every slot it occupies, taking it off if worn.
    /// Returns `false` if it wasn't here.
    pub fn take_out(&mut self, item: &mut Item) -> bool {
        let before = self.slots.len();
        self.slots.retain(|_, id| *id != item.id);
        item.is_worn = false;
        self.slots.len() != before
    }

    fn free_hand(&self) -> Option<&'static str> {
        HANDS.into_iter().find(|hand| !self.slots.contains_key(*hand))
    }
}

/// Hand and wear-location names never key a catch-all slot, even while
/// empty.
fn is_reserved(key: &str) -> bool {
    HANDS.contains(&key) || WEAR_LOCATIONS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Prototype;

    fn thing(name: &str) -> Item {
        Item::from_prototype(&Prototype::simple(name, name, ""), Vec::new())
    }

    fn cloak() -> Item {
        Item::from_prototype(
            &Prototype::simple("cloak", "a grey cloak", "").worn_on(["shoulders", "back"]),
            Vec::new(),
        )
    }

    #[test]
    fn test_hands_fill_right_then_left_then_named_slot() {
        let mut inv = Inventory::new();
        let (mut a, mut b, mut c) = (thing("rope"), thing("torch"), thing("Apple"));

        assert_eq!(inv.place(&mut a), Placement::Hand(RIGHT_HAND));
        assert_eq!(inv.place(&mut b), Placement::Hand(LEFT_HAND));
        assert_eq!(inv.place(&mut c), Placement::Stowed("apple".into()));
        assert_eq!(inv.slot("apple"), Some(c.id));
    }

    #[test]
    fn test_named_slot_collisions_get_suffixes() {
        let mut inv = Inventory::new();
        inv.place(&mut thing("x"));
        inv.place(&mut thing("y"));
        let mut first = thing("coin");
        let mut second = thing("coin");
        let mut third = thing("coin");
        inv.place(&mut first);
        assert_eq!(inv.place(&mut second), Placement::Stowed("coin#2".into()));
        assert_eq!(inv.place(&mut third), Placement::Stowed("coin#3".into()));
    }

    #[test]
    fn test_wear_moves_item_from_hand_to_every_location() {
        let mut inv = Inventory::new();
        let mut c = cloak();
        inv.place(&mut c);
        inv.wear(&mut c).unwrap();

        assert!(c.is_worn);
        assert_eq!(inv.slot(RIGHT_HAND), None);
        assert_eq!(inv.slot("shoulders"), Some(c.id));
        assert_eq!(inv.slot("back"), Some(c.id));
        assert_eq!(inv.items(), vec![c.id]);
    }

    #[test]
    fn test_wear_errors() {
        let mut inv = Inventory::new();
        let mut rope = thing("rope");
        inv.place(&mut rope);
        assert_eq!(inv.wear(&mut rope), Err(InventoryError::NotWearable));

        let mut hat = Item::from_prototype(
            &Prototype::simple("hat", "a hat", "").worn_on(["scalp"]),
            Vec::new(),
        );
        assert_eq!(
            inv.wear(&mut hat),
            Err(InventoryError::InvalidLocation("scalp".into()))
        );

        // Third item lands in the named slot, not a hand.
        let mut c = cloak();
        inv.place(&mut thing("torch"));
        inv.place(&mut c);
        assert_eq!(inv.wear(&mut c), Err(InventoryError::NotInHand));
    }

    #[test]
    fn test_wear_refuses_occupied_location() {
        let mut inv = Inventory::new();
        let mut first = cloak();
        let mut second = cloak();
        inv.place(&mut first);
        inv.wear(&mut first).unwrap();
        inv.place(&mut second);
        assert_eq!(
            inv.wear(&mut second),
            Err(InventoryError::LocationOccupied("shoulders".into()))
        );
        assert_eq!(inv.wear(&mut first), Err(InventoryError::AlreadyWorn));
    }

    #[test]
    fn test_remove_needs_a_free_hand() {
        let mut inv = Inventory::new();
        let mut c = cloak();
        inv.place(&mut c);
        inv.wear(&mut c).unwrap();
        let mut torch = thing("torch");
        inv.place(&mut thing("rope"));
        inv.place(&mut torch);

        assert_eq!(inv.remove_worn(&mut c), Err(InventoryError::HandsFull));
        assert!(c.is_worn);

        inv.take_out(&mut torch);

        assert_eq!(inv.remove_worn(&mut c), Ok(LEFT_HAND));
        assert!(!c.is_worn);
        assert_eq!(inv.slot("shoulders"), None);
        assert_eq!(inv.remove_worn(&mut c), Err(InventoryError::NotWorn));
    }

    #[test]
    fn test_take_out_unwears() {
        let mut inv = Inventory::new();
        let mut c = cloak();
        inv.place(&mut c);
        inv.wear(&mut c).unwrap();

        assert!(inv.take_out(&mut c));
        assert!(!c.is_worn);
        assert!(inv.is_empty());
        assert!(!inv.take_out(&mut c));
    }

    #[test]
    fn test_place_restores_worn_item_to_locations() {
        let mut inv = Inventory::new();
        let mut c = cloak();
        c.is_worn = true;
        assert_eq!(inv.place(&mut c), Placement::Worn);
        assert_eq!(inv.slot("back"), Some(c.id));
    }

    #[test]
    fn test_named_slot_never_claims_a_wear_location() {
        let mut inv = Inventory::new();
        let mut rope = thing("rope");
        inv.place(&mut rope);
        inv.place(&mut thing("torch"));
        let mut odd = thing("Hands");
        assert_eq!(inv.place(&mut odd), Placement::Stowed("hands#2".into()));
        assert_eq!(inv.slot("hands"), None);

        inv.take_out(&mut rope);
        let mut gloves = Item::from_prototype(
            &Prototype::simple("gloves", "leather gloves", "").worn_on(["hands"]),
            Vec::new(),
        );
        assert_eq!(inv.place(&mut gloves), Placement::Hand(RIGHT_HAND));
        assert_eq!(inv.wear(&mut gloves), Ok(()));
        assert_eq!(inv.slot("hands"), Some(gloves.id));
    }
}
