//! Ability score aggregation.
//!
//! Totals are always recomputed from base scores plus the stored
//! contribution rows; nothing is incremented in place.

use super::context::BuildSource;
use crate::compendium::{CompendiumRepository, ModifierCategory};
use crate::entities::{CharacterAbilityScore, Provenance};
use crate::value_objects::{Ability, AbilityScores, MAX_ABILITY_SCORE, MIN_ABILITY_SCORE};

/// Fixed ability-score modifiers from every source, level gated.
///
/// Modifiers with a `condition` are situational and stay out of the totals.
pub fn fixed_ability_rows(
    repo: &dyn CompendiumRepository,
    sources: &[BuildSource],
) -> Vec<CharacterAbilityScore> {
    let mut rows = Vec::new();
    for source in sources {
        for modifier in repo.modifiers(source.entity.target()) {
            if modifier.category != ModifierCategory::AbilityScore
                || modifier.condition.is_some()
                || !modifier.active_at(source.level)
            {
                continue;
            }
            if let Some(ability) = modifier.ability {
                rows.push(CharacterAbilityScore {
                    ability,
                    bonus: modifier.value,
                    provenance: Provenance::fixed(source.entity_ref()),
                });
            }
        }
    }
    rows
}

/// Base scores plus every contribution, clamped to the legal range.
pub fn ability_totals(base: &AbilityScores, rows: &[CharacterAbilityScore]) -> AbilityScores {
    let mut totals = *base;
    for ability in Ability::all() {
        let bonus: i32 = rows
            .iter()
            .filter(|r| r.ability == ability)
            .map(|r| r.bonus)
            .sum();
        let total = (base.get(ability) + bonus).clamp(MIN_ABILITY_SCORE, MAX_ABILITY_SCORE);
        totals.set(ability, total);
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compendium::{EntityKind, EntityRef};
    use crate::value_objects::Slug;

    fn row(ability: Ability, bonus: i32, source: &str, group: Option<&str>) -> CharacterAbilityScore {
        let source = EntityRef::new(EntityKind::Race, Slug::new(source).unwrap());
        CharacterAbilityScore {
            ability,
            bonus,
            provenance: match group {
                Some(group) => Provenance::choice(source, group),
                None => Provenance::fixed(source),
            },
        }
    }

    #[test]
    fn sums_contributions_per_ability() {
        let rows = vec![
            row(Ability::Con, 2, "dwarf", None),
            row(Ability::Wis, 1, "hill-dwarf", None),
            row(Ability::Wis, 1, "human", Some("asi")),
        ];
        let totals = ability_totals(&AbilityScores::uniform(10), &rows);
        assert_eq!(totals.get(Ability::Con), 12);
        assert_eq!(totals.get(Ability::Wis), 12);
        assert_eq!(totals.get(Ability::Str), 10);
    }

    #[test]
    fn recomputing_does_not_accumulate() {
        let rows = vec![row(Ability::Str, 2, "dwarf", None)];
        let base = AbilityScores::uniform(10);
        let once = ability_totals(&base, &rows);
        let twice = ability_totals(&base, &rows);
        assert_eq!(once, twice);
    }

    #[test]
    fn totals_are_clamped() {
        let rows = vec![row(Ability::Str, 10, "giant", None)];
        let totals = ability_totals(&AbilityScores::uniform(25), &rows);
        assert_eq!(totals.get(Ability::Str), MAX_ABILITY_SCORE);
    }
}
