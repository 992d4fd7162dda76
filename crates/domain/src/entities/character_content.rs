//! Character content - the child records owned by a character.
//!
//! Every reference to compendium content is a slug or an [`EntityRef`], never
//! an internal key. Rows produced by a choice carry a [`Provenance`] with the
//! choice group so a later resolution can find and replace exactly them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::compendium::{EntityKind, EntityRef, ProficiencySubject};
use crate::value_objects::{Ability, ResetTiming, Slug, UsesLimit};

// ============================================================================
// Provenance
// ============================================================================

/// Group recorded on rows added by a spell operation instead of a choice.
const MANUAL_GROUP: &str = "manual";

/// Which entity granted a row, and through which choice group if any.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub source: EntityRef,
    pub choice_group: Option<String>,
}

impl Provenance {
    pub fn fixed(source: EntityRef) -> Self {
        Self {
            source,
            choice_group: None,
        }
    }

    pub fn choice(source: EntityRef, group: impl Into<String>) -> Self {
        Self {
            source,
            choice_group: Some(group.into()),
        }
    }

    /// A row learned or prepared directly; kept while its class remains.
    pub fn manual(source: EntityRef) -> Self {
        Self::choice(source, MANUAL_GROUP)
    }

    pub fn is_manual(&self) -> bool {
        self.choice_group.as_deref() == Some(MANUAL_GROUP)
    }

    #[inline]
    pub fn is_choice(&self) -> bool {
        self.choice_group.is_some()
    }

    /// True for rows produced by this `(source, group)`.
    pub fn is_from(&self, source: &EntityRef, group: &str) -> bool {
        self.choice_group.as_deref() == Some(group) && self.source.refers_to(source)
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.choice_group {
            Some(group) => write!(f, "{}#{}", self.source, group),
            None => write!(f, "{}", self.source),
        }
    }
}

// ============================================================================
// Classes and level history
// ============================================================================

/// One class the character has levels in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterClass {
    pub class: Slug,
    pub level: u8,
    /// The first class taken; decides saving throws and starting proficiencies
    pub is_primary: bool,
    pub hit_dice_spent: u8,
    pub subclass: Option<Slug>,
    /// Denormalized from the compendium on every resolution
    pub hit_die: u8,
}

impl CharacterClass {
    pub fn new(class: Slug, is_primary: bool) -> Self {
        Self {
            class,
            level: 1,
            is_primary,
            hit_dice_spent: 0,
            subclass: None,
            hit_die: 0,
        }
    }

    pub fn hit_dice_remaining(&self) -> u8 {
        self.level.saturating_sub(self.hit_dice_spent)
    }
}

/// One gained character level, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelRecord {
    pub class: Slug,
    /// Rolled hit-die result; `None` means the fixed average was taken
    pub hp_roll: Option<u8>,
}

// ============================================================================
// Derived grant rows
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterAbilityScore {
    pub ability: Ability,
    pub bonus: i32,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterProficiency {
    pub subject: ProficiencySubject,
    /// Doubles the proficiency bonus when any row for the subject sets it
    pub expertise: bool,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterLanguage {
    pub language: Slug,
    pub provenance: Provenance,
}

// ============================================================================
// Spells
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreparationStatus {
    Known,
    Prepared,
    AlwaysPrepared,
}

/// Per-spell limited casting ("once per long rest without a slot").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellUses {
    pub max_uses: UsesLimit,
    pub used: u32,
    pub reset_timing: ResetTiming,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterSpell {
    pub spell: Slug,
    /// Class whose spellcasting ability applies
    pub class: Option<Slug>,
    pub status: PreparationStatus,
    pub uses: Option<SpellUses>,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotType {
    Standard,
    Pact,
}

impl SlotType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Pact => "pact",
        }
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One slot pool row, keyed by `(level, slot_type)`.
///
/// `used_slots` is runtime state: resolution only ever rewrites `max_slots`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterSpellSlot {
    pub level: u8,
    pub slot_type: SlotType,
    pub max_slots: u8,
    pub used_slots: u8,
}

impl CharacterSpellSlot {
    pub fn new(level: u8, slot_type: SlotType, max_slots: u8) -> Self {
        Self {
            level,
            slot_type,
            max_slots,
            used_slots: 0,
        }
    }

    pub fn available(&self) -> u8 {
        self.max_slots.saturating_sub(self.used_slots)
    }
}

// ============================================================================
// Features and counters
// ============================================================================

/// A trait materialized from one of the character's sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterFeature {
    pub name: String,
    pub description: String,
    pub category: Option<String>,
    pub source: EntityRef,
    /// Level at which the source grants it
    pub level: u8,
}

/// A picked feat or optional feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSelection {
    pub feature: EntityRef,
    /// Set when the pick came through a choice group
    pub provenance: Option<Provenance>,
    pub level_acquired: u8,
}

impl FeatureSelection {
    pub fn is_feat(&self) -> bool {
        self.feature.kind == EntityKind::Feat
    }
}

/// A limited-use resource pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterCounter {
    pub source: EntityRef,
    pub name: String,
    pub current_uses: u32,
    pub max_uses: UsesLimit,
    pub reset_timing: Option<ResetTiming>,
}

impl CharacterCounter {
    /// Remaining uses, `None` for unlimited pools.
    pub fn remaining(&self) -> Option<u32> {
        match self.max_uses {
            UsesLimit::Unlimited => None,
            UsesLimit::Limited(_) => Some(self.current_uses),
        }
    }

    /// Unlimited, or no use spent since the last refill.
    pub fn is_full(&self) -> bool {
        match self.max_uses {
            UsesLimit::Unlimited => true,
            UsesLimit::Limited(max) => self.current_uses >= max,
        }
    }

    pub fn natural_key(&self) -> (&EntityRef, &str) {
        (&self.source, self.name.as_str())
    }
}

// ============================================================================
// Inventory, conditions, notes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterEquipment {
    pub item: Slug,
    pub quantity: u32,
    pub equipped: bool,
    /// Set for starting-equipment picks
    pub provenance: Option<Provenance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterCondition {
    pub condition: Slug,
    /// Exhaustion-style stacking level
    pub level: Option<u8>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterNote {
    pub category: String,
    pub text: String,
}

// ============================================================================
// Vital state
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitPoints {
    pub max: i32,
    /// `None` until first computed, then kept within `max`
    pub current: Option<i32>,
    pub temporary: i32,
}

impl HitPoints {
    pub fn current(&self) -> i32 {
        self.current.unwrap_or(self.max)
    }

    /// Install a recomputed maximum.
    ///
    /// A higher maximum adds the gain to current hit points; a lower one clamps.
    pub fn set_max(&mut self, max: i32) {
        let gained = (max - self.max).max(0);
        self.current = Some(match self.current {
            None => max,
            Some(hp) => hp.saturating_add(gained).min(max),
        });
        self.max = max;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeathSaves {
    pub successes: u8,
    pub failures: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    LawfulGood,
    NeutralGood,
    ChaoticGood,
    LawfulNeutral,
    TrueNeutral,
    ChaoticNeutral,
    LawfulEvil,
    NeutralEvil,
    ChaoticEvil,
    #[default]
    Unaligned,
}

/// How starting equipment is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentMode {
    #[default]
    Package,
    Gold,
}
