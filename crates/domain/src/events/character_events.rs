//! Character-related domain events
//!
//! These enums communicate what happened when character state was modified,
//! allowing callers to react appropriately.

use crate::entities::SlotType;
use crate::value_objects::Slug;

/// Outcome of gaining a level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelUpOutcome {
    /// An existing class went up a level
    Leveled {
        class: Slug,
        class_level: u8,
        total_level: u8,
    },
    /// The character took a first level in a new class
    Multiclassed { class: Slug, total_level: u8 },
}

impl LevelUpOutcome {
    pub fn total_level(&self) -> u8 {
        match self {
            Self::Leveled { total_level, .. } | Self::Multiclassed { total_level, .. } => {
                *total_level
            }
        }
    }
}

/// Outcome of spending one use of a counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterUse {
    Used { remaining: u32 },
    /// Nothing left; the counter is unchanged
    Exhausted,
    /// Unlimited pools are never decremented
    Unlimited,
}

/// Outcome of restoring uses to a counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterRestore {
    Restored { current: u32 },
    AlreadyFull,
    Unlimited,
}

/// Outcome of expending a spell slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotUse {
    Used {
        level: u8,
        slot_type: SlotType,
        remaining: u8,
    },
    NoSlotsRemaining,
}

/// Outcome of casting a spell through its own limited uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpellUse {
    Used { remaining: u32 },
    /// No uses left before the next reset; nothing changed
    Exhausted,
    Unlimited,
}

/// Outcome of a prepare or unprepare request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreparationChange {
    Prepared,
    /// Already prepared or always prepared; nothing changed
    AlreadyPrepared,
    /// Back to known, still in the spellbook or known list
    Unprepared,
    /// Prepared from the class list and dropped again
    Removed,
    NotPrepared,
}

impl PreparationChange {
    pub fn changed(&self) -> bool {
        matches!(self, Self::Prepared | Self::Unprepared | Self::Removed)
    }
}

/// Everything a rest restored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestOutcome {
    /// Names of counters that were refilled
    pub counters_reset: Vec<String>,
    pub slots_restored: u32,
    pub spell_uses_reset: usize,
    pub hit_dice_recovered: u8,
    pub hit_points_restored: i32,
}
