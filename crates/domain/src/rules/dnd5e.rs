//! D&D 5th Edition calculation rules.

use super::{CalculationEngine, CasterType, ProficiencyLevel};

/// D&D 5e formulas.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dnd5eRules;

impl Dnd5eRules {
    pub fn new() -> Self {
        Self
    }
}

impl CalculationEngine for Dnd5eRules {
    fn ability_modifier(&self, score: i32) -> i32 {
        // Rust's / rounds toward zero; the rule wants floor((score - 10) / 2)
        (score - 10).div_euclid(2)
    }

    fn proficiency_bonus(&self, level: u8) -> i32 {
        ((level.max(1) as i32 - 1) / 4) + 2
    }

    fn spell_save_dc(&self, ability_modifier: i32, proficiency_bonus: i32) -> i32 {
        8 + proficiency_bonus + ability_modifier
    }

    fn spell_attack_bonus(&self, ability_modifier: i32, proficiency_bonus: i32) -> i32 {
        proficiency_bonus + ability_modifier
    }

    fn check_modifier(
        &self,
        ability_modifier: i32,
        proficiency_bonus: i32,
        proficiency_level: ProficiencyLevel,
    ) -> i32 {
        ability_modifier + proficiency_level.apply(proficiency_bonus)
    }

    fn average_hit_die_gain(&self, hit_die: u8) -> i32 {
        (hit_die as i32 / 2) + 1
    }

    fn preparation_limit(
        &self,
        caster_type: CasterType,
        class_level: u8,
        ability_modifier: i32,
    ) -> u32 {
        let level = match caster_type {
            CasterType::Full | CasterType::Pact | CasterType::Innate => class_level,
            CasterType::Half => class_level / 2,
            CasterType::HalfRoundedUp => class_level.div_ceil(2),
            CasterType::Third => class_level / 3,
        };
        (level as i32 + ability_modifier).max(1) as u32
    }
}
