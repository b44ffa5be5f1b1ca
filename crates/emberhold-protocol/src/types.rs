//! Identity types shared by every Emberhold crate.
//!
//! Entities never hold references to each other; a room lists its
//! occupants by [`CharacterId`], a character stands in a [`RoomId`], an
//! inventory slot holds an [`ItemId`]. These newtypes keep the ids from
//! being mixed up with each other or with plain integers.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Numeric identities
// ---------------------------------------------------------------------------

/// A persistent character, allocated from the record store's index
/// counter when the character is created.
///
/// `#[serde(transparent)]` keeps the JSON form a bare number, so a record
/// key and the id inside the record look the same.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CharacterId(pub u64);

/// `tracing::info!(%character_id, "entered")` prints "C-42".
impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

/// A room in the world graph. Room ids come from seed data and never
/// change while the process runs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Item identity
// ---------------------------------------------------------------------------

/// A live item.
///
/// Every item materialized from a prototype gets a fresh random UUID, so
/// two swords cut from the same template are still distinct objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub Uuid);

impl ItemId {
    /// A new random (v4) identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ItemId {
    type Err = crate::ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| crate::ProtocolError::InvalidMessage(format!("item id {s:?}: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// The login name an authenticator vouched for.
///
/// Account names are compared case-sensitively; they are whatever the
/// identity provider says they are.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountName(pub String);

impl AccountName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
