//! Spellcasting progression: per-class casting numbers and the slot pools.
//!
//! Known and prepared counts stay per class. Slots are pooled: one
//! contributing class uses its own progression row, two or more use the
//! shared multiclass table over the summed effective caster levels. Pact
//! slots are tracked separately from the pact class's own row.

use serde::{Deserialize, Serialize};

use super::context::{BuildContext, BuildSource, ClassContext};
use crate::compendium::{CompendiumRepository, ProgressionRow};
use crate::entities::{
    CharacterSpell, CharacterSpellSlot, PreparationStatus, Provenance, SlotType, SpellUses,
};
use crate::rules::{CalculationEngine, CasterType, PreparationMethod};
use crate::value_objects::{Ability, AbilityScores, Slug};

/// Casting numbers for one class entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassCasting {
    pub class: Slug,
    pub subclass: Option<Slug>,
    pub class_level: u8,
    pub caster_type: CasterType,
    pub ability: Option<Ability>,
    pub preparation_method: Option<PreparationMethod>,
    pub cantrips_known: u8,
    /// Only for the `known` method
    pub spells_known: Option<u8>,
    /// Only for methods that prepare
    pub preparation_limit: Option<u32>,
    /// Highest spell level this class alone could cast, 0 when none
    pub max_spell_level: u8,
    pub spell_save_dc: Option<i32>,
    pub spell_attack_bonus: Option<i32>,
}

/// The class's own row, most specific progression first.
fn own_row(repo: &dyn CompendiumRepository, class: &ClassContext) -> Option<ProgressionRow> {
    class
        .progression_slugs()
        .into_iter()
        .find_map(|slug| repo.progression(slug, class.level))
}

/// Casting numbers for every class that can cast.
pub fn class_casting(
    repo: &dyn CompendiumRepository,
    rules: &dyn CalculationEngine,
    context: &BuildContext,
    scores: &AbilityScores,
) -> Vec<ClassCasting> {
    let proficiency = rules.proficiency_bonus(context.total_level);
    context
        .classes
        .iter()
        .filter_map(|class| {
            let caster_type = class.caster_type()?;
            let row = own_row(repo, class);
            let ability = class.spellcasting_ability();
            let modifier = ability.map(|a| rules.ability_modifier(scores.get(a)));
            let method = class.preparation_method();

            Some(ClassCasting {
                class: class.class.slug.clone(),
                subclass: class.subclass.as_ref().map(|s| s.slug.clone()),
                class_level: class.level,
                caster_type,
                ability,
                preparation_method: method,
                cantrips_known: row.as_ref().map_or(0, |r| r.cantrips_known),
                spells_known: match method {
                    Some(PreparationMethod::Known) => row.as_ref().and_then(|r| r.spells_known),
                    _ => None,
                },
                preparation_limit: match (method, modifier) {
                    (Some(m), Some(modifier)) if m.prepares() => {
                        Some(rules.preparation_limit(caster_type, class.level, modifier))
                    }
                    _ => None,
                },
                max_spell_level: row.as_ref().map_or(0, |r| r.highest_slot_level()),
                spell_save_dc: modifier.map(|m| rules.spell_save_dc(m, proficiency)),
                spell_attack_bonus: modifier.map(|m| rules.spell_attack_bonus(m, proficiency)),
            })
        })
        .collect()
}

/// One planned slot pool row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedSlot {
    pub level: u8,
    pub slot_type: SlotType,
    pub max_slots: u8,
}

/// Slot maxima for the character's classes.
pub fn plan_slots(repo: &dyn CompendiumRepository, context: &BuildContext) -> Vec<PlannedSlot> {
    let mut plan = Vec::new();

    let shared: Vec<(&ClassContext, CasterType)> = context
        .classes
        .iter()
        .filter_map(|c| c.caster_type().map(|t| (c, t)))
        .filter(|(_, t)| t.shares_slot_pool())
        .collect();

    let single_row = match shared.as_slice() {
        [(class, _)] => own_row(repo, class).filter(|r| r.has_slots()),
        _ => None,
    };
    let standard: [u8; 9] = match single_row {
        Some(row) => row.spell_slots,
        None if shared.is_empty() => [0; 9],
        None => {
            let total: u8 = shared
                .iter()
                .map(|(c, t)| t.effective_caster_levels(c.level))
                .sum();
            repo.multiclass_slots(total)
        }
    };
    for (index, &count) in standard.iter().enumerate() {
        if count > 0 {
            plan.push(PlannedSlot {
                level: index as u8 + 1,
                slot_type: SlotType::Standard,
                max_slots: count,
            });
        }
    }

    for class in context
        .classes
        .iter()
        .filter(|c| c.caster_type() == Some(CasterType::Pact))
    {
        let Some(row) = own_row(repo, class) else {
            continue;
        };
        for (level, count) in row.slots() {
            match plan
                .iter_mut()
                .find(|p| p.slot_type == SlotType::Pact && p.level == level)
            {
                Some(existing) => existing.max_slots += count,
                None => plan.push(PlannedSlot {
                    level,
                    slot_type: SlotType::Pact,
                    max_slots: count,
                }),
            }
        }
    }

    plan
}

/// Write planned maxima onto the existing slot rows.
///
/// `used_slots` is never changed. A row missing from the plan drops to zero
/// maximum and is removed only once nothing is used from it.
pub fn apply_slot_plan(
    existing: &[CharacterSpellSlot],
    plan: &[PlannedSlot],
) -> Vec<CharacterSpellSlot> {
    let mut rows: Vec<CharacterSpellSlot> = plan
        .iter()
        .map(|p| {
            let used = existing
                .iter()
                .find(|e| e.level == p.level && e.slot_type == p.slot_type)
                .map_or(0, |e| e.used_slots);
            CharacterSpellSlot {
                level: p.level,
                slot_type: p.slot_type,
                max_slots: p.max_slots,
                used_slots: used,
            }
        })
        .collect();

    for old in existing {
        let planned = plan
            .iter()
            .any(|p| p.level == old.level && p.slot_type == old.slot_type);
        if !planned && old.used_slots > 0 {
            rows.push(CharacterSpellSlot {
                max_slots: 0,
                ..old.clone()
            });
        }
    }

    rows.sort_by_key(|r| (r.slot_type, r.level));
    rows
}

/// Fixed spell grants as always-prepared rows, one per spell.
///
/// Limited-use rows keep the `used` count of the matching existing row.
pub fn fixed_spells(
    repo: &dyn CompendiumRepository,
    sources: &[BuildSource],
    existing: &[CharacterSpell],
) -> Vec<CharacterSpell> {
    let mut rows: Vec<CharacterSpell> = Vec::new();
    for source in sources {
        for grant in repo.spell_grants(source.entity.target()) {
            let Some(spell) = grant.spell.clone() else {
                continue;
            };
            if !grant.active_at(source.level)
                || rows.iter().any(|r| r.spell.loosely_matches(&spell))
            {
                continue;
            }
            let uses = grant.uses.map(|(max_uses, reset_timing)| {
                let used = existing
                    .iter()
                    .find(|s| s.spell.loosely_matches(&spell))
                    .and_then(|s| s.uses)
                    .map_or(0, |u| u.used);
                SpellUses {
                    max_uses,
                    used: max_uses.cap(used),
                    reset_timing,
                }
            });
            rows.push(CharacterSpell {
                spell,
                class: source.class.clone(),
                status: PreparationStatus::AlwaysPrepared,
                uses,
                provenance: Provenance::fixed(source.entity_ref()),
            });
        }
    }
    rows
}

/// Status for a spell picked through a class's choice group.
pub fn chosen_spell_status(class: Option<&ClassContext>) -> PreparationStatus {
    match class.and_then(|c| c.preparation_method()) {
        Some(PreparationMethod::Prepared) => PreparationStatus::Prepared,
        _ => PreparationStatus::Known,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregates::Character;
    use crate::rules::Dnd5eRules;
    use crate::testing::srd_catalog;
    use crate::value_objects::CharacterName;

    fn slug(s: &str) -> Slug {
        Slug::new(s).unwrap()
    }

    /// A character with `levels` of each `(class, count)` in order.
    fn build(classes: &[(&str, u8)]) -> Character {
        let mut character = Character::new(
            CharacterName::new("Vex").unwrap(),
            slug("human"),
            None,
            AbilityScores::uniform(16),
            slug(classes[0].0),
        );
        for (index, (class, levels)) in classes.iter().enumerate() {
            let start = if index == 0 { 1 } else { 0 };
            for _ in start..*levels {
                character.add_class_level(slug(class), None, 20).unwrap();
            }
        }
        character
    }

    fn plan(character: &Character) -> Vec<PlannedSlot> {
        let catalog = srd_catalog().unwrap();
        let context = BuildContext::load(&catalog, character).unwrap();
        plan_slots(&catalog, &context)
    }

    fn standard(plan: &[PlannedSlot]) -> Vec<u8> {
        plan.iter()
            .filter(|p| p.slot_type == SlotType::Standard)
            .map(|p| p.max_slots)
            .collect()
    }

    #[test]
    fn single_class_uses_own_row() {
        assert_eq!(standard(&plan(&build(&[("cleric", 1)]))), vec![2]);
        assert_eq!(standard(&plan(&build(&[("paladin", 5)]))), vec![4, 2]);
    }

    #[test]
    fn two_full_casters_use_shared_table() {
        let slots = standard(&plan(&build(&[("cleric", 6), ("wizard", 6)])));
        // total caster level 12
        assert_eq!(slots, vec![4, 3, 3, 3, 2, 1]);
    }

    #[test]
    fn full_and_half_caster_combine() {
        let slots = standard(&plan(&build(&[("cleric", 3), ("paladin", 3)])));
        // 3 + floor(3/2) = 4
        assert_eq!(slots, vec![4, 3]);
    }

    #[test]
    fn paladin_sorcerer_uses_level_seven_row() {
        let slots = standard(&plan(&build(&[("paladin", 5), ("sorcerer", 5)])));
        assert_eq!(slots, vec![4, 3, 3, 1]);
    }

    #[test]
    fn pact_slots_stay_separate() {
        let slots = plan(&build(&[("warlock", 3), ("sorcerer", 2)]));
        assert_eq!(standard(&slots), vec![3]);
        let pact: Vec<(u8, u8)> = slots
            .iter()
            .filter(|p| p.slot_type == SlotType::Pact)
            .map(|p| (p.level, p.max_slots))
            .collect();
        assert_eq!(pact, vec![(2, 2)]);
    }

    #[test]
    fn subclass_caster_uses_own_progression() {
        let mut character = build(&[("fighter", 3)]);
        character.set_subclass(&slug("fighter"), slug("eldritch-knight")).unwrap();
        assert_eq!(standard(&plan(&character)), vec![2]);
    }

    #[test]
    fn half_caster_level_one_has_no_slots() {
        assert!(plan(&build(&[("paladin", 1)])).is_empty());
    }

    #[test]
    fn applying_plan_keeps_used_slots() {
        let existing = vec![
            CharacterSpellSlot {
                level: 1,
                slot_type: SlotType::Standard,
                max_slots: 4,
                used_slots: 3,
            },
            CharacterSpellSlot {
                level: 2,
                slot_type: SlotType::Standard,
                max_slots: 2,
                used_slots: 1,
            },
            CharacterSpellSlot::new(3, SlotType::Standard, 2),
        ];
        let plan = vec![PlannedSlot {
            level: 1,
            slot_type: SlotType::Standard,
            max_slots: 2,
        }];
        let rows = apply_slot_plan(&existing, &plan);
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].max_slots, rows[0].used_slots), (2, 3));
        assert_eq!((rows[1].level, rows[1].max_slots, rows[1].used_slots), (2, 0, 1));
    }

    #[test]
    fn class_casting_reports_per_class_numbers() {
        let catalog = srd_catalog().unwrap();
        let character = build(&[("cleric", 1)]);
        let context = BuildContext::load(&catalog, &character).unwrap();
        let casting = class_casting(&catalog, &Dnd5eRules::new(), &context, &AbilityScores::uniform(16));

        assert_eq!(casting.len(), 1);
        let cleric = &casting[0];
        assert_eq!(cleric.cantrips_known, 3);
        assert_eq!(cleric.preparation_limit, Some(4));
        assert_eq!(cleric.spells_known, None);
        assert_eq!(cleric.max_spell_level, 1);
        assert_eq!(cleric.spell_save_dc, Some(13));
        assert_eq!(cleric.spell_attack_bonus, Some(5));
    }

    #[test]
    fn fixed_spells_are_always_prepared() {
        let catalog = srd_catalog().unwrap();
        let mut character = build(&[("cleric", 1)]);
        character.set_subclass(&slug("cleric"), slug("life-domain")).unwrap();
        let sources = BuildContext::load(&catalog, &character).unwrap().sources();

        let rows = fixed_spells(&catalog, &sources, &[]);
        let names: Vec<&str> = rows.iter().map(|r| r.spell.as_str()).collect();
        assert_eq!(names, vec!["bless", "cure-wounds"]);
        assert!(rows.iter().all(|r| r.status == PreparationStatus::AlwaysPrepared));
        assert_eq!(rows[0].class, Some(slug("phb:cleric")));
    }
}
