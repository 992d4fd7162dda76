//! Rules vocabulary and the calculation engine.
//!
//! Enumerations here are shared by the compendium model and the build
//! components. Formulas live behind [`CalculationEngine`] so the build
//! components never hard-code a rule set.

mod dnd5e;

pub use dnd5e::Dnd5eRules;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// Calculation rules that vary per game system.
pub trait CalculationEngine: Send + Sync {
    /// Calculate ability modifier from score.
    ///
    /// For D&D-like systems: floor((score - 10) / 2)
    fn ability_modifier(&self, score: i32) -> i32;

    /// Calculate proficiency bonus from total character level.
    fn proficiency_bonus(&self, level: u8) -> i32;

    /// Spell save DC from the casting ability modifier and proficiency bonus.
    fn spell_save_dc(&self, ability_modifier: i32, proficiency_bonus: i32) -> i32;

    /// Spell attack bonus from the casting ability modifier and proficiency bonus.
    fn spell_attack_bonus(&self, ability_modifier: i32, proficiency_bonus: i32) -> i32;

    /// Skill or save modifier at a given proficiency level.
    fn check_modifier(
        &self,
        ability_modifier: i32,
        proficiency_bonus: i32,
        proficiency_level: ProficiencyLevel,
    ) -> i32;

    /// Fixed hit point gain per level when not rolling.
    fn average_hit_die_gain(&self, hit_die: u8) -> i32;

    /// Maximum number of prepared spells for one class.
    fn preparation_limit(&self, caster_type: CasterType, class_level: u8, ability_modifier: i32)
        -> u32;
}

/// Proficiency level for skills and saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProficiencyLevel {
    /// Not proficient
    None,
    /// Half proficiency (Jack of All Trades, etc.)
    Half,
    /// Standard proficiency
    Proficient,
    /// Expertise (double proficiency)
    Expert,
}

impl ProficiencyLevel {
    /// Proficiency bonus contributed at this level.
    pub fn apply(&self, proficiency_bonus: i32) -> i32 {
        match self {
            ProficiencyLevel::None => 0,
            ProficiencyLevel::Half => proficiency_bonus / 2,
            ProficiencyLevel::Proficient => proficiency_bonus,
            ProficiencyLevel::Expert => proficiency_bonus * 2,
        }
    }
}

/// Type of spellcaster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CasterType {
    /// Full caster (Wizard, Cleric, Druid, Sorcerer, Bard)
    Full,
    /// Half caster (Paladin, Ranger)
    Half,
    /// Half caster that rounds up when multiclassing (Artificer)
    HalfRoundedUp,
    /// Third caster (Eldritch Knight, Arcane Trickster)
    Third,
    /// Pact magic (Warlock)
    Pact,
    /// Innate spellcasting (racial abilities)
    Innate,
}

impl CasterType {
    /// Get the caster level for multiclassing calculations.
    pub fn effective_caster_levels(&self, class_level: u8) -> u8 {
        match self {
            CasterType::Full => class_level,
            CasterType::Half => class_level / 2,
            CasterType::HalfRoundedUp => class_level.div_ceil(2),
            CasterType::Third => class_level / 3,
            CasterType::Pact => 0,
            CasterType::Innate => 0,
        }
    }

    /// Whether this caster type feeds the shared multiclass slot pool.
    pub fn shares_slot_pool(&self) -> bool {
        matches!(
            self,
            CasterType::Full | CasterType::Half | CasterType::HalfRoundedUp | CasterType::Third
        )
    }
}

impl FromStr for CasterType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "half" => Ok(Self::Half),
            "half_rounded_up" | "artificer" => Ok(Self::HalfRoundedUp),
            "third" => Ok(Self::Third),
            "pact" => Ok(Self::Pact),
            "innate" => Ok(Self::Innate),
            _ => Err(DomainError::parse(format!("Unknown caster type: {}", s))),
        }
    }
}

/// How a class decides which spells are available to cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreparationMethod {
    /// Fixed list of known spells (Sorcerer, Bard, Warlock, Ranger)
    Known,
    /// Learns spells into a book, prepares a subset (Wizard)
    Spellbook,
    /// Prepares from the whole class list (Cleric, Druid, Paladin)
    Prepared,
}

impl PreparationMethod {
    pub fn prepares(&self) -> bool {
        matches!(self, Self::Spellbook | Self::Prepared)
    }
}

impl fmt::Display for PreparationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Known => "known",
            Self::Spellbook => "spellbook",
            Self::Prepared => "prepared",
        };
        write!(f, "{}", label)
    }
}

/// Rest type for resource recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestType {
    /// Short rest (typically 1 hour)
    Short,
    /// Long rest (typically 8 hours)
    Long,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_levels_follow_caster_fraction() {
        assert_eq!(CasterType::Full.effective_caster_levels(6), 6);
        assert_eq!(CasterType::Half.effective_caster_levels(5), 2);
        assert_eq!(CasterType::Half.effective_caster_levels(3), 1);
        assert_eq!(CasterType::HalfRoundedUp.effective_caster_levels(3), 2);
        assert_eq!(CasterType::Third.effective_caster_levels(8), 2);
        assert_eq!(CasterType::Pact.effective_caster_levels(10), 0);
    }

    #[test]
    fn pact_and_innate_stay_out_of_shared_pool() {
        assert!(CasterType::Third.shares_slot_pool());
        assert!(!CasterType::Pact.shares_slot_pool());
        assert!(!CasterType::Innate.shares_slot_pool());
    }

    #[test]
    fn proficiency_level_scaling() {
        assert_eq!(ProficiencyLevel::None.apply(3), 0);
        assert_eq!(ProficiencyLevel::Half.apply(3), 1);
        assert_eq!(ProficiencyLevel::Proficient.apply(3), 3);
        assert_eq!(ProficiencyLevel::Expert.apply(3), 6);
    }

    #[test]
    fn caster_type_parses() {
        assert_eq!("half".parse::<CasterType>().unwrap(), CasterType::Half);
        assert_eq!("Artificer".parse::<CasterType>().unwrap(), CasterType::HalfRoundedUp);
        assert!("quarter".parse::<CasterType>().is_err());
    }
}
