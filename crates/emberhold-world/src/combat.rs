//! Combat range tracking.
//!
//! Each character keeps its own sparse map of opponents to range bands.
//! Nothing here is reciprocal: when A closes to melee with B, the command
//! handler updates A's map and then B's, locking one character at a time.

use std::collections::HashMap;

use emberhold_protocol::CharacterId;
use serde::{Deserialize, Serialize};

/// Distance between two combatants.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RangeBand {
    /// Out of reach. Also the answer for anyone not tracked.
    #[default]
    Far = 0,
    Reach = 1,
    /// Close enough that walking away isn't possible.
    Melee = 2,
}

impl RangeBand {
    /// One band closer, stopping at melee.
    pub fn closer(self) -> Self {
        match self {
            RangeBand::Far => RangeBand::Reach,
            RangeBand::Reach | RangeBand::Melee => RangeBand::Melee,
        }
    }

    /// One band further, stopping at far.
    pub fn farther(self) -> Self {
        match self {
            RangeBand::Melee => RangeBand::Reach,
            RangeBand::Reach | RangeBand::Far => RangeBand::Far,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RangeBand::Far => "far",
            RangeBand::Reach => "reach",
            RangeBand::Melee => "melee",
        }
    }
}

/// One character's view of who it is fighting.
///
/// The map is only allocated while in combat and is thrown away whole on
/// [`exit_combat`](Self::exit_combat).
#[derive(Debug, Clone, Default)]
pub struct CombatRange {
    ranges: Option<HashMap<CharacterId, RangeBand>>,
}

impl CombatRange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent.
    pub fn enter_combat(&mut self) {
        self.ranges.get_or_insert_with(HashMap::new);
    }

    pub fn exit_combat(&mut self) {
        self.ranges = None;
    }

    /// Sets this side's range to `target`, entering combat if needed.
    pub fn set_range(&mut self, target: CharacterId, band: RangeBand) {
        self.ranges.get_or_insert_with(HashMap::new).insert(target, band);
    }

    pub fn range_to(&self, target: CharacterId) -> RangeBand {
        self.ranges
            .as_ref()
            .and_then(|r| r.get(&target).copied())
            .unwrap_or_default()
    }

    /// Stops tracking one opponent.
    pub fn forget(&mut self, target: CharacterId) {
        if let Some(r) = self.ranges.as_mut() {
            r.remove(&target);
        }
    }

    pub fn in_combat(&self) -> bool {
        self.ranges.as_ref().is_some_and(|r| !r.is_empty())
    }

    /// False while any opponent is at melee range.
    pub fn can_escape(&self) -> bool {
        !self
            .ranges
            .as_ref()
            .is_some_and(|r| r.values().any(|b| *b == RangeBand::Melee))
    }

    /// Tracked opponents, lowest id first.
    pub fn opponents(&self) -> Vec<CharacterId> {
        let mut ids: Vec<CharacterId> = self
            .ranges
            .as_ref()
            .map(|r| r.keys().copied().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOB: CharacterId = CharacterId(2);
    const EVE: CharacterId = CharacterId(3);

    #[test]
    fn test_untracked_opponent_is_far() {
        let c = CombatRange::new();
        assert_eq!(c.range_to(BOB), RangeBand::Far);
        assert!(!c.in_combat());
        assert!(c.can_escape());
    }

    #[test]
    fn test_enter_combat_alone_is_not_in_combat() {
        let mut c = CombatRange::new();
        c.enter_combat();
        c.enter_combat();
        assert!(!c.in_combat());
    }

    #[test]
    fn test_melee_blocks_escape_until_moved_away() {
        let mut c = CombatRange::new();
        c.set_range(BOB, RangeBand::Reach);
        c.set_range(EVE, RangeBand::Melee);
        assert!(c.in_combat());
        assert!(!c.can_escape());

        c.set_range(EVE, RangeBand::Reach);
        assert!(c.can_escape());
    }

    #[test]
    fn test_exit_combat_discards_everything() {
        let mut c = CombatRange::new();
        c.set_range(BOB, RangeBand::Melee);
        c.exit_combat();
        assert!(!c.in_combat());
        assert!(c.can_escape());
        assert_eq!(c.range_to(BOB), RangeBand::Far);
    }

    #[test]
    fn test_forget_one_opponent() {
        let mut c = CombatRange::new();
        c.set_range(EVE, RangeBand::Melee);
        c.set_range(BOB, RangeBand::Far);
        c.forget(EVE);
        assert_eq!(c.opponents(), vec![BOB]);
        assert!(c.can_escape());
    }

    #[test]
    fn test_band_steps_saturate() {
        assert_eq!(RangeBand::Far.closer(), RangeBand::Reach);
        assert_eq!(RangeBand::Melee.closer(), RangeBand::Melee);
        assert_eq!(RangeBand::Melee.farther(), RangeBand::Reach);
        assert_eq!(RangeBand::Far.farther(), RangeBand::Far);
        assert!(RangeBand::Melee > RangeBand::Reach);
    }
}
