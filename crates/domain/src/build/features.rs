//! Features, resource counters and situational modifiers.

use serde::{Deserialize, Serialize};

use super::context::BuildSource;
use crate::compendium::{CompendiumRepository, EntityRef, Modifier, ModifierCategory};
use crate::entities::{CharacterCounter, CharacterFeature};
use crate::value_objects::{ResetTiming, UsesLimit};

/// Every trait whose level gate the source has reached.
pub fn collect_features(
    repo: &dyn CompendiumRepository,
    sources: &[BuildSource],
) -> Vec<CharacterFeature> {
    let mut features = Vec::new();
    for source in sources {
        let mut traits = repo.traits(source.entity.target());
        traits.retain(|t| t.active_at(source.level));
        traits.sort_by_key(|t| (t.level.unwrap_or(1), t.sort_order));
        features.extend(traits.into_iter().map(|t| CharacterFeature {
            level: t.level.unwrap_or(1),
            name: t.name,
            description: t.description,
            category: t.category,
            source: source.entity_ref(),
        }));
    }
    features
}

/// The resolved maximum of one counter at the character's current levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterDefinition {
    pub source: EntityRef,
    pub name: String,
    pub max_uses: UsesLimit,
    pub reset_timing: Option<ResetTiming>,
}

/// Counter definitions from `EntityCounter` rows and resetting traits.
///
/// For each counter name the definition with the highest level not above the
/// source level wins. A trait with a reset timing and no counter of its name
/// takes its maximum from its linked data table, or one use without one.
pub fn counter_definitions(
    repo: &dyn CompendiumRepository,
    sources: &[BuildSource],
) -> Vec<CounterDefinition> {
    let mut definitions: Vec<CounterDefinition> = Vec::new();
    for source in sources {
        let target = source.entity.target();
        let source_ref = source.entity_ref();
        let first_for_source = definitions.len();

        let mut counters = repo.counters(target);
        counters.retain(|c| c.level <= source.level);
        counters.sort_by_key(|c| c.level);
        for counter in counters {
            match definitions[first_for_source..]
                .iter_mut()
                .find(|d| d.name.eq_ignore_ascii_case(&counter.counter_name))
            {
                Some(existing) => {
                    existing.max_uses = counter.value;
                    existing.reset_timing = counter.reset_timing.or(existing.reset_timing);
                }
                None => definitions.push(CounterDefinition {
                    source: source_ref.clone(),
                    name: counter.counter_name,
                    max_uses: counter.value,
                    reset_timing: counter.reset_timing,
                }),
            }
        }

        let tables = repo.data_tables(target);
        for feature in repo.traits(target) {
            let Some(reset) = feature.resets_on else {
                continue;
            };
            if !feature.active_at(source.level)
                || definitions[first_for_source..]
                    .iter()
                    .any(|d| d.name.eq_ignore_ascii_case(&feature.name))
            {
                continue;
            }
            let scaled = feature.data_table.as_ref().and_then(|name| {
                tables
                    .iter()
                    .find(|t| t.name.eq_ignore_ascii_case(name))
                    .and_then(|t| t.entry_at_level(source.level))
                    .and_then(|e| e.numeric_value())
                    .and_then(|v| UsesLimit::try_from(v).ok())
            });
            definitions.push(CounterDefinition {
                source: source_ref.clone(),
                name: feature.name,
                max_uses: scaled.unwrap_or(UsesLimit::Limited(1)),
                reset_timing: Some(reset),
            });
        }
    }
    definitions
}

/// Upsert counters by `(source, name)`.
///
/// A new counter, or one that was full, starts at its new maximum. A partly
/// spent counter keeps its remaining uses, capped to the new maximum.
/// Counters without a definition are dropped.
pub fn merge_counters(
    existing: &[CharacterCounter],
    definitions: Vec<CounterDefinition>,
) -> Vec<CharacterCounter> {
    definitions
        .into_iter()
        .map(|definition| {
            let previous = existing.iter().find(|c| {
                c.source.refers_to(&definition.source) && c.name.eq_ignore_ascii_case(&definition.name)
            });
            let current_uses = match (previous, definition.max_uses) {
                (_, UsesLimit::Unlimited) => 0,
                (Some(previous), limit) if !previous.is_full() => limit.cap(previous.current_uses),
                (_, UsesLimit::Limited(max)) => max,
            };
            CharacterCounter {
                source: definition.source,
                name: definition.name,
                current_uses,
                max_uses: definition.max_uses,
                reset_timing: definition.reset_timing,
            }
        })
        .collect()
}

/// A modifier that applies outside the ability totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveModifier {
    pub source: EntityRef,
    pub modifier: Modifier,
}

/// Non-ability modifiers, plus ability modifiers that only apply under a
/// condition.
pub fn active_modifiers(
    repo: &dyn CompendiumRepository,
    sources: &[BuildSource],
) -> Vec<ActiveModifier> {
    let mut active = Vec::new();
    for source in sources {
        for modifier in repo.modifiers(source.entity.target()) {
            let in_totals =
                modifier.category == ModifierCategory::AbilityScore && modifier.condition.is_none();
            if in_totals || !modifier.active_at(source.level) {
                continue;
            }
            active.push(ActiveModifier {
                source: source.entity_ref(),
                modifier,
            });
        }
    }
    active
}

/// Sum of unconditional modifiers of one category.
pub fn modifier_total(modifiers: &[ActiveModifier], category: ModifierCategory) -> i32 {
    modifiers
        .iter()
        .filter(|m| m.modifier.category == category && m.modifier.condition.is_none())
        .map(|m| m.modifier.value)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregates::Character;
    use crate::build::context::BuildContext;
    use crate::compendium::EntityKind;
    use crate::testing::srd_catalog;
    use crate::value_objects::{AbilityScores, CharacterName, Slug};

    fn slug(s: &str) -> Slug {
        Slug::new(s).unwrap()
    }

    fn character(class: &str, levels: u8) -> Character {
        let mut character = Character::new(
            CharacterName::new("Brakka").unwrap(),
            slug("hill-dwarf"),
            None,
            AbilityScores::uniform(14),
            slug(class),
        );
        for _ in 1..levels {
            character.add_class_level(slug(class), None, 20).unwrap();
        }
        character
    }

    fn definitions_for(character: &Character) -> Vec<CounterDefinition> {
        let catalog = srd_catalog().unwrap();
        let sources = BuildContext::load(&catalog, character).unwrap().sources();
        counter_definitions(&catalog, &sources)
    }

    #[test]
    fn counter_takes_highest_reached_level() {
        let defs = definitions_for(&character("barbarian", 6));
        let rage = defs.iter().find(|d| d.name == "Rage").unwrap();
        assert_eq!(rage.max_uses, UsesLimit::Limited(4));
        assert_eq!(rage.reset_timing, Some(ResetTiming::LongRest));
    }

    #[test]
    fn unlimited_counter_at_top_level() {
        let defs = definitions_for(&character("barbarian", 20));
        let rage = defs.iter().find(|d| d.name == "Rage").unwrap();
        assert!(rage.max_uses.is_unlimited());
    }

    #[test]
    fn trait_counter_scales_from_data_table() {
        let defs = definitions_for(&character("cleric", 6));
        let channel = defs.iter().find(|d| d.name == "Channel Divinity").unwrap();
        assert_eq!(channel.max_uses, UsesLimit::Limited(2));
        assert_eq!(channel.reset_timing, Some(ResetTiming::ShortRest));

        let low = definitions_for(&character("cleric", 1));
        assert!(low.iter().all(|d| d.name != "Channel Divinity"));
    }

    #[test]
    fn resetting_trait_without_table_gets_one_use() {
        let defs = definitions_for(&character("wizard", 1));
        let recovery = defs.iter().find(|d| d.name == "Arcane Recovery").unwrap();
        assert_eq!(recovery.max_uses, UsesLimit::Limited(1));
    }

    #[test]
    fn merge_preserves_and_caps_current_uses() {
        let source = EntityRef::new(EntityKind::Class, slug("barbarian"));
        let existing = vec![
            CharacterCounter {
                source: source.clone(),
                name: "Rage".into(),
                current_uses: 1,
                max_uses: UsesLimit::Limited(3),
                reset_timing: Some(ResetTiming::LongRest),
            },
            CharacterCounter {
                source: EntityRef::new(EntityKind::Feat, slug("lucky")),
                name: "Luck Points".into(),
                current_uses: 3,
                max_uses: UsesLimit::Limited(3),
                reset_timing: Some(ResetTiming::LongRest),
            },
        ];
        let merged = merge_counters(
            &existing,
            vec![CounterDefinition {
                source,
                name: "Rage".into(),
                max_uses: UsesLimit::Limited(4),
                reset_timing: Some(ResetTiming::LongRest),
            }],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].current_uses, 1);
        assert_eq!(merged[0].max_uses, UsesLimit::Limited(4));

        let capped = merge_counters(
            &merged,
            vec![CounterDefinition {
                source: merged[0].source.clone(),
                name: "rage".into(),
                max_uses: UsesLimit::Limited(0),
                reset_timing: Some(ResetTiming::LongRest),
            }],
        );
        assert_eq!(capped[0].current_uses, 0);
    }

    #[test]
    fn full_counter_grows_with_its_maximum() {
        let source = EntityRef::new(EntityKind::Class, slug("barbarian"));
        let rage = |current_uses, max| CharacterCounter {
            source: source.clone(),
            name: "Rage".into(),
            current_uses,
            max_uses: UsesLimit::Limited(max),
            reset_timing: Some(ResetTiming::LongRest),
        };
        let level_three = || {
            vec![CounterDefinition {
                source: source.clone(),
                name: "Rage".into(),
                max_uses: UsesLimit::Limited(3),
                reset_timing: Some(ResetTiming::LongRest),
            }]
        };

        let untouched = merge_counters(&[rage(2, 2)], level_three());
        assert_eq!(untouched[0].current_uses, 3);

        let spent = merge_counters(&[rage(1, 2)], level_three());
        assert_eq!(spent[0].current_uses, 1);
    }

    #[test]
    fn unused_rage_refills_across_a_level_up() {
        let catalog = srd_catalog().unwrap();
        let at = |levels| {
            let sources = BuildContext::load(&catalog, &character("barbarian", levels))
                .unwrap()
                .sources();
            counter_definitions(&catalog, &sources)
        };

        let level_two = merge_counters(&[], at(2));
        let level_three = merge_counters(&level_two, at(3));
        let rage = level_three.iter().find(|c| c.name == "Rage").unwrap();
        assert_eq!(rage.max_uses, UsesLimit::Limited(3));
        assert_eq!(rage.current_uses, 3);
    }

    #[test]
    fn conditional_modifiers_are_surfaced_not_summed() {
        let catalog = srd_catalog().unwrap();
        let sources = BuildContext::load(&catalog, &character("barbarian", 5))
            .unwrap()
            .sources();
        let active = active_modifiers(&catalog, &sources);
        assert_eq!(modifier_total(&active, ModifierCategory::Speed), 10);
        assert_eq!(modifier_total(&active, ModifierCategory::HitPointsPerLevel), 1);
        assert!(active
            .iter()
            .any(|m| m.modifier.category == ModifierCategory::DamageResistance));
    }
}
