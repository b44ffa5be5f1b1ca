//! Items and the prototypes they are cut from.

use std::collections::BTreeMap;
use std::fmt;

use emberhold_protocol::ItemId;
use serde::{Deserialize, Serialize};

/// Names a [`Prototype`] in seed data.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrototypeId(pub String);

impl PrototypeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for PrototypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn yes() -> bool {
    true
}

fn one() -> u32 {
    1
}

/// An immutable item template.
///
/// Prototypes never appear in world state. [`World::materialize`] turns one
/// into a live [`Item`] with a fresh identity, recursively materializing
/// any `contents`.
///
/// [`World::materialize`]: crate::World::materialize
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prototype {
    pub id: PrototypeId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mass: f64,
    #[serde(default)]
    pub value: u64,
    #[serde(default)]
    pub stackable: bool,
    #[serde(default = "one")]
    pub max_stack: u32,
    #[serde(default = "one")]
    pub quantity: u32,
    #[serde(default)]
    pub wearable: bool,
    #[serde(default)]
    pub worn_on: Vec<String>,
    #[serde(default)]
    pub verbs: BTreeMap<String, String>,
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
    #[serde(default)]
    pub trait_mods: BTreeMap<String, i8>,
    #[serde(default)]
    pub container: bool,
    /// Prototypes to materialize inside this one, in order.
    #[serde(default)]
    pub contents: Vec<PrototypeId>,
    #[serde(default = "yes")]
    pub can_pick_up: bool,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Prototype {
    /// A plain carryable thing with just a name and description.
    pub fn simple(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: PrototypeId::new(id),
            name: name.into(),
            description: description.into(),
            mass: 0.0,
            value: 0,
            stackable: false,
            max_stack: 1,
            quantity: 1,
            wearable: false,
            worn_on: Vec::new(),
            verbs: BTreeMap::new(),
            overrides: BTreeMap::new(),
            trait_mods: BTreeMap::new(),
            container: false,
            contents: Vec::new(),
            can_pick_up: true,
            metadata: BTreeMap::new(),
        }
    }

    /// Marks the prototype wearable on `locations`.
    pub fn worn_on<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.wearable = true;
        self.worn_on = locations.into_iter().map(Into::into).collect();
        self
    }
}

/// A live item. This is also its stored form in the `items` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(default)]
    pub prototype_id: Option<PrototypeId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mass: f64,
    #[serde(default)]
    pub value: u64,
    #[serde(default)]
    pub stackable: bool,
    #[serde(default = "one")]
    pub max_stack: u32,
    #[serde(default = "one")]
    pub quantity: u32,
    #[serde(default)]
    pub wearable: bool,
    #[serde(default)]
    pub worn_on: Vec<String>,
    #[serde(default)]
    pub is_worn: bool,
    #[serde(default)]
    pub verbs: BTreeMap<String, String>,
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
    #[serde(default)]
    pub trait_mods: BTreeMap<String, i8>,
    #[serde(default)]
    pub container: bool,
    #[serde(default)]
    pub contents: Vec<ItemId>,
    #[serde(default = "yes")]
    pub can_pick_up: bool,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Item {
    /// Copies every field of `proto` under a fresh id. `contents` are the
    /// already-materialized children.
    pub fn from_prototype(proto: &Prototype, contents: Vec<ItemId>) -> Self {
        Self {
            id: ItemId::new(),
            prototype_id: Some(proto.id.clone()),
            name: proto.name.clone(),
            description: proto.description.clone(),
            mass: proto.mass,
            value: proto.value,
            stackable: proto.stackable,
            max_stack: proto.max_stack,
            quantity: proto.quantity,
            wearable: proto.wearable,
            worn_on: proto.worn_on.clone(),
            is_worn: false,
            verbs: proto.verbs.clone(),
            overrides: proto.overrides.clone(),
            trait_mods: proto.trait_mods.clone(),
            container: proto.container,
            contents,
            can_pick_up: proto.can_pick_up,
            metadata: proto.metadata.clone(),
        }
    }

    /// Case-insensitive substring match against the item's name.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        !needle.is_empty() && self.name.to_lowercase().contains(&needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_prototype_gets_fresh_identity() {
        let proto = Prototype::simple("sword", "a short sword", "Notched but sharp.");
        let a = Item::from_prototype(&proto, Vec::new());
        let b = Item::from_prototype(&proto, Vec::new());
        assert_ne!(a.id, b.id);
        assert_eq!(a.name, b.name);
        assert_eq!(a.prototype_id, Some(PrototypeId::new("sword")));
    }

    #[test]
    fn test_matches_is_case_insensitive_substring() {
        let item = Item::from_prototype(&Prototype::simple("lamp", "Brass Lamp", ""), Vec::new());
        assert!(item.matches("lamp"));
        assert!(item.matches("BRASS"));
        assert!(!item.matches("sword"));
        assert!(!item.matches("  "));
    }

    #[test]
    fn test_item_deserializes_with_defaults() {
        let id = ItemId::new();
        let json = format!(r#"{{"id": "{id}", "name": "pebble"}}"#);
        let item: Item = serde_json::from_str(&json).unwrap();
        assert_eq!(item.id, id);
        assert!(item.can_pick_up);
        assert_eq!(item.quantity, 1);
        assert!(!item.is_worn);
    }
}
