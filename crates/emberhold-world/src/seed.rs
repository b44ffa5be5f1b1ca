//! Seed data: the static world a server boots from.
//!
//! The core only ever sees these tables already parsed; the binary reads
//! them from a JSON file.

use std::collections::BTreeMap;

use emberhold_protocol::RoomId;
use serde::{Deserialize, Serialize};

use crate::{Prototype, PrototypeId};

fn yes() -> bool {
    true
}

/// Everything needed to build a [`World`](crate::World).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedData {
    pub rooms: Vec<RoomSeed>,
    #[serde(default)]
    pub prototypes: Vec<Prototype>,
    #[serde(default)]
    pub archetypes: Vec<Archetype>,
    /// Where new characters appear. Defaults to room 1, or the lowest
    /// room id if there is no room 1.
    #[serde(default)]
    pub start_room: Option<RoomId>,
    /// Items to materialize on each room's floor at startup.
    #[serde(default)]
    pub room_items: BTreeMap<RoomId, Vec<PrototypeId>>,
    /// Messages of the day, shown after login.
    #[serde(default)]
    pub motd: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSeed {
    pub id: RoomId,
    #[serde(default)]
    pub area: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub exits: Vec<ExitSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitSeed {
    pub direction: String,
    pub target: RoomId,
    #[serde(default = "yes")]
    pub visible: bool,
}

/// A starting template offered at character creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archetype {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, f64>,
    #[serde(default)]
    pub abilities: BTreeMap<String, f64>,
}
