//! Error types for the world layer.

use emberhold_protocol::{CharacterId, ItemId, RoomId};

use crate::PrototypeId;

/// Why an inventory operation was refused.
///
/// The `Display` text is what the player sees.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    #[error("You can't wear that.")]
    NotWearable,

    #[error("You are already wearing that.")]
    AlreadyWorn,

    #[error("You need to be holding that to wear it.")]
    NotInHand,

    #[error("Nobody wears anything on their {0}.")]
    InvalidLocation(String),

    #[error("You are already wearing something on your {0}.")]
    LocationOccupied(String),

    #[error("You aren't wearing that.")]
    NotWorn,

    #[error("Your hands are full.")]
    HandsFull,
}

/// Errors that can occur during world operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// No room with this id exists.
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// The character is not active in the world.
    #[error("character {0} not found")]
    CharacterNotFound(CharacterId),

    /// No live item with this id exists.
    #[error("item {0} not found")]
    ItemNotFound(ItemId),

    /// Seed data or a record refers to a template that doesn't exist.
    #[error("prototype {0} not found")]
    PrototypeNotFound(PrototypeId),

    /// Nothing on the floor matches the name.
    #[error("no {0:?} here")]
    NotHere(String),

    /// Nothing carried matches the name.
    #[error("not carrying {0:?}")]
    NotCarried(String),

    /// The item is fixed in place.
    #[error("{0} can't be picked up")]
    CannotPickUp(String),

    /// The room has no exit in that direction.
    #[error("no exit {0}")]
    CannotGo(String),

    /// Something is at melee range; the character can't leave.
    #[error("cannot escape combat")]
    CannotEscape,

    /// The character is already being played on another session.
    #[error("character {0} is already active")]
    AlreadyActive(CharacterId),

    /// Seed data contains no rooms.
    #[error("the world has no rooms")]
    EmptyWorld,

    #[error(transparent)]
    Inventory(#[from] InventoryError),
}
