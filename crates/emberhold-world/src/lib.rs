//! Shared world state for Emberhold.
//!
//! Rooms, characters and items each sit behind their own
//! `tokio::sync::Mutex` and refer to one another only by id. There is no
//! world-wide lock: a command touching two entities locks them one after
//! the other, never together (see [`World`] for the lock order).
//!
//! Alongside the arena live two small per-character helpers, the slot
//! [`Inventory`] and the [`CombatRange`] tracker, and the process-wide
//! [`NameRegistry`].

mod character;
mod combat;
mod config;
mod error;
mod inventory;
mod item;
mod names;
pub mod record;
mod room;
mod seed;
mod world;

pub use character::{ActiveCharacter, Character};
pub use combat::{CombatRange, RangeBand};
pub use config::WorldConfig;
pub use error::{InventoryError, WorldError};
pub use inventory::{Inventory, LEFT_HAND, Placement, RIGHT_HAND, WEAR_LOCATIONS};
pub use item::{Item, Prototype, PrototypeId};
pub use names::NameRegistry;
pub use record::{AccountRecord, CharacterRecord, RoomRecord};
pub use room::{Exit, Room};
pub use seed::{Archetype, ExitSeed, RoomSeed, SeedData};
pub use world::World;
