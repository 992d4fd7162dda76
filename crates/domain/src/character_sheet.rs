//! Derived character sheet.
//!
//! A read model computed from a resolved [`Character`] and the compendium:
//! ability totals and modifiers, saves, skills, per-class spellcasting
//! figures and the situational modifiers that stay outside the totals.
//! Nothing here is stored; the sheet is rebuilt on demand.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aggregates::Character;
use crate::build::context::BuildContext;
use crate::build::features::{active_modifiers, modifier_total, ActiveModifier};
use crate::build::issues::ValidationIssue;
use crate::build::spellcasting::{class_casting, ClassCasting};
use crate::build::{ability_totals, consolidate};
use crate::compendium::{CompendiumRepository, EntityKind, ModifierCategory, ProficiencySubject};
use crate::entities::{CharacterCounter, CharacterFeature, CharacterSpellSlot, HitPoints};
use crate::ids::CharacterId;
use crate::rules::{CalculationEngine, ProficiencyLevel};
use crate::value_objects::{Ability, Slug};

// =============================================================================
// Sheet
// =============================================================================

/// Everything a sheet shows that is computed rather than chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterSheet {
    pub character_id: CharacterId,
    pub name: String,
    pub total_level: u8,
    pub proficiency_bonus: i32,
    pub abilities: Vec<AbilityLine>,
    pub skills: Vec<SkillLine>,
    /// Tool, weapon and armor proficiencies
    pub other_proficiencies: Vec<ProficiencyLine>,
    pub languages: Vec<Slug>,
    pub speed: i32,
    pub initiative: i32,
    pub hit_points: HitPoints,
    pub hit_dice: Vec<HitDiceLine>,
    pub spellcasting: Vec<ClassCasting>,
    pub spell_slots: Vec<CharacterSpellSlot>,
    pub counters: Vec<CharacterCounter>,
    pub features: Vec<CharacterFeature>,
    pub active_modifiers: Vec<ActiveModifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityLine {
    pub ability: Ability,
    pub score: i32,
    pub modifier: i32,
    pub save_proficient: bool,
    pub save: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillLine {
    pub skill: Slug,
    pub name: String,
    pub ability: Ability,
    pub proficiency: ProficiencyLevel,
    pub modifier: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProficiencyLine {
    pub subject: ProficiencySubject,
    pub proficiency: ProficiencyLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitDiceLine {
    pub die: u8,
    pub total: u8,
    pub remaining: u8,
}

impl CharacterSheet {
    /// Compute the sheet for an already resolved character.
    ///
    /// # Errors
    ///
    /// The character's race, background or classes no longer resolve.
    pub fn derive(
        repo: &dyn CompendiumRepository,
        rules: &dyn CalculationEngine,
        character: &Character,
    ) -> Result<Self, Vec<ValidationIssue>> {
        let context = BuildContext::load(repo, character)?;
        let sources = context.sources();
        let totals = ability_totals(character.base_scores(), character.ability_scores());
        let proficiency_bonus = rules.proficiency_bonus(character.total_level());
        let levels = consolidate(character.proficiencies());
        let modifiers = active_modifiers(repo, &sources);

        let abilities = Ability::all()
            .into_iter()
            .map(|ability| {
                let modifier = rules.ability_modifier(totals.get(ability));
                let level = levels
                    .get(&ProficiencySubject::SavingThrow(ability))
                    .copied()
                    .unwrap_or(ProficiencyLevel::None);
                let bonus: i32 = unconditional(&modifiers, ModifierCategory::SavingThrow)
                    .filter(|m| m.modifier.ability.map_or(true, |a| a == ability))
                    .map(|m| m.modifier.value)
                    .sum();
                AbilityLine {
                    ability,
                    score: totals.get(ability),
                    modifier,
                    save_proficient: level != ProficiencyLevel::None,
                    save: rules.check_modifier(modifier, proficiency_bonus, level) + bonus,
                }
            })
            .collect();

        let mut skills: Vec<SkillLine> = repo
            .list(EntityKind::Skill)
            .iter()
            .filter_map(|e| e.as_skill())
            .map(|skill| {
                let level = levels
                    .iter()
                    .find(|(subject, _)| match subject {
                        ProficiencySubject::Skill(s) => s.loosely_matches(&skill.slug),
                        _ => false,
                    })
                    .map_or(ProficiencyLevel::None, |(_, level)| *level);
                let bonus: i32 = unconditional(&modifiers, ModifierCategory::Skill)
                    .filter(|m| {
                        m.modifier
                            .skill
                            .as_ref()
                            .map_or(true, |s| s.loosely_matches(&skill.slug))
                    })
                    .map(|m| m.modifier.value)
                    .sum();
                let ability_modifier = rules.ability_modifier(totals.get(skill.ability));
                SkillLine {
                    skill: skill.slug.clone(),
                    name: skill.name.clone(),
                    ability: skill.ability,
                    proficiency: level,
                    modifier: rules.check_modifier(ability_modifier, proficiency_bonus, level)
                        + bonus,
                }
            })
            .collect();
        skills.sort_by(|a, b| a.name.cmp(&b.name));

        let other_proficiencies = levels
            .iter()
            .filter(|(subject, _)| {
                !matches!(
                    subject,
                    ProficiencySubject::Skill(_) | ProficiencySubject::SavingThrow(_)
                )
            })
            .map(|(subject, level)| ProficiencyLine {
                subject: subject.clone(),
                proficiency: *level,
            })
            .collect();

        let base_speed = context.race.speed as i32;
        let dex = rules.ability_modifier(totals.get(Ability::Dex));

        let mut dice: BTreeMap<u8, HitDiceLine> = BTreeMap::new();
        for class in character.classes() {
            let line = dice.entry(class.hit_die).or_insert(HitDiceLine {
                die: class.hit_die,
                total: 0,
                remaining: 0,
            });
            line.total += class.level;
            line.remaining += class.level.saturating_sub(class.hit_dice_spent);
        }

        Ok(Self {
            character_id: character.id(),
            name: character.name().to_string(),
            total_level: character.total_level(),
            proficiency_bonus,
            abilities,
            skills,
            other_proficiencies,
            languages: character.languages().iter().map(|l| l.language.clone()).collect(),
            speed: base_speed + modifier_total(&modifiers, ModifierCategory::Speed),
            initiative: dex + modifier_total(&modifiers, ModifierCategory::Initiative),
            hit_points: *character.hit_points(),
            hit_dice: dice.into_values().rev().collect(),
            spellcasting: class_casting(repo, rules, &context, &totals),
            spell_slots: character.spell_slots().to_vec(),
            counters: character.counters().to_vec(),
            features: character.features().to_vec(),
            active_modifiers: modifiers,
        })
    }

    /// Sheet line for one ability.
    pub fn ability(&self, ability: Ability) -> Option<&AbilityLine> {
        self.abilities.iter().find(|a| a.ability == ability)
    }

    /// Sheet line for one skill, by loose slug.
    pub fn skill(&self, skill: &Slug) -> Option<&SkillLine> {
        self.skills.iter().find(|s| s.skill.loosely_matches(skill))
    }
}

fn unconditional(
    modifiers: &[ActiveModifier],
    category: ModifierCategory,
) -> impl Iterator<Item = &ActiveModifier> {
    modifiers
        .iter()
        .filter(move |m| m.modifier.category == category && m.modifier.condition.is_none())
}
