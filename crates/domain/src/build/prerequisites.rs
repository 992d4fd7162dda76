//! Prerequisite evaluation.
//!
//! Rows sharing a `group_id` are ANDed; groups are ORed. A row that cannot be
//! checked mechanically is unverifiable, and a group whose only non-met rows
//! are unverifiable is itself unverifiable: it neither passes nor fails.

use std::collections::BTreeMap;

use super::context::BuildContext;
use super::issues::{UnmetRequirement, UnverifiableRequirement};
use crate::aggregates::Character;
use crate::compendium::{
    EntityKind, EntityRef, Prerequisite, PrerequisiteTarget, ProficiencySubject,
};
use crate::value_objects::{AbilityScores, Slug};

use super::abilities::ability_totals;

/// What the validator knows about a character.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharacterFacts {
    /// Race and parent race
    pub races: Vec<Slug>,
    pub background: Option<Slug>,
    /// Classes and subclasses with the class level
    pub classes: Vec<(Slug, u8)>,
    pub feats: Vec<Slug>,
    pub optional_features: Vec<Slug>,
    pub proficiencies: Vec<ProficiencySubject>,
    pub languages: Vec<Slug>,
    pub spells: Vec<Slug>,
    pub items: Vec<Slug>,
    pub scores: AbilityScores,
    pub total_level: u8,
    pub can_cast: bool,
}

impl CharacterFacts {
    /// Facts from a character's current rows and its loaded sources.
    pub fn gather(character: &Character, context: &BuildContext) -> Self {
        let mut classes = Vec::new();
        for class in &context.classes {
            classes.push((class.class.slug.clone(), class.level));
            if let Some(subclass) = &class.subclass {
                classes.push((subclass.slug.clone(), class.level));
            }
        }

        let (feats, optional_features): (Vec<_>, Vec<_>) = context
            .selections
            .iter()
            .map(|(entity, _)| entity.entity_ref())
            .partition(|r| r.kind == EntityKind::Feat);

        let can_cast = !character.spells().is_empty()
            || character.spell_slots().iter().any(|s| s.max_slots > 0);

        Self {
            races: context.race_slugs().into_iter().cloned().collect(),
            background: context.background.as_ref().map(|b| b.slug.clone()),
            classes,
            feats: feats.into_iter().map(|r| r.slug).collect(),
            optional_features: optional_features.into_iter().map(|r| r.slug).collect(),
            proficiencies: character
                .proficiencies()
                .iter()
                .map(|p| p.subject.clone())
                .collect(),
            languages: character.languages().iter().map(|l| l.language.clone()).collect(),
            spells: character.spells().iter().map(|s| s.spell.clone()).collect(),
            items: character.equipment().iter().map(|e| e.item.clone()).collect(),
            scores: ability_totals(character.base_scores(), character.ability_scores()),
            total_level: context.total_level,
            can_cast,
        }
    }

    fn has(list: &[Slug], slug: &Slug) -> bool {
        list.iter().any(|s| s.loosely_matches(slug))
    }

    fn check_entity(&self, entity: &EntityRef) -> Check {
        let slug = &entity.slug;
        let met = match entity.kind {
            EntityKind::Race => Self::has(&self.races, slug),
            EntityKind::Background => self.background.as_ref().is_some_and(|b| b.loosely_matches(slug)),
            EntityKind::Class => self.classes.iter().any(|(c, _)| c.loosely_matches(slug)),
            EntityKind::Feat => Self::has(&self.feats, slug),
            EntityKind::OptionalFeature => Self::has(&self.optional_features, slug),
            EntityKind::Language => Self::has(&self.languages, slug),
            EntityKind::Spell => Self::has(&self.spells, slug),
            EntityKind::Item => Self::has(&self.items, slug),
            EntityKind::Skill => self
                .proficiencies
                .iter()
                .any(|p| matches!(p, ProficiencySubject::Skill(s) if s.loosely_matches(slug))),
            EntityKind::ProficiencyType => self.proficiencies.iter().any(|p| {
                !matches!(p, ProficiencySubject::Skill(_))
                    && p.slug().is_some_and(|s| s.loosely_matches(slug))
            }),
            EntityKind::Monster | EntityKind::Condition => return Check::Unverifiable,
        };
        if met {
            Check::Met
        } else {
            Check::Unmet
        }
    }

    fn check(&self, prerequisite: &Prerequisite) -> Check {
        match &prerequisite.target {
            PrerequisiteTarget::Entity(entity) => self.check_entity(entity),
            PrerequisiteTarget::AbilityScore { ability, minimum } => {
                Check::from(self.scores.get(*ability) >= *minimum)
            }
            PrerequisiteTarget::Level { minimum } => Check::from(self.total_level >= *minimum),
            PrerequisiteTarget::Spellcasting => Check::from(self.can_cast),
            PrerequisiteTarget::Text => Check::Unverifiable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Check {
    Met,
    Unmet,
    Unverifiable,
}

impl From<bool> for Check {
    fn from(met: bool) -> Self {
        if met {
            Check::Met
        } else {
            Check::Unmet
        }
    }
}

/// Result of evaluating one entity's prerequisites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrerequisiteOutcome {
    Eligible,
    /// No group is fully met; lists every failing row by group
    NotMet { unmet: Vec<UnmetRequirement> },
    /// No group is met, but at least one could be with manual confirmation.
    /// `unmet` lists the failing rows of the other groups.
    Unverifiable {
        requirements: Vec<UnverifiableRequirement>,
        unmet: Vec<UnmetRequirement>,
    },
}

impl PrerequisiteOutcome {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eligible => "eligible",
            Self::NotMet { .. } => "not_met",
            Self::Unverifiable { .. } => "unverifiable",
        }
    }
}

/// Evaluate the prerequisites of `target` against `facts`.
///
/// No rows at all means eligible.
pub fn evaluate(
    target: &EntityRef,
    prerequisites: &[Prerequisite],
    facts: &CharacterFacts,
) -> PrerequisiteOutcome {
    if prerequisites.is_empty() {
        return PrerequisiteOutcome::Eligible;
    }

    let mut groups: BTreeMap<u8, Vec<(&Prerequisite, Check)>> = BTreeMap::new();
    for prerequisite in prerequisites {
        groups
            .entry(prerequisite.group_id)
            .or_default()
            .push((prerequisite, facts.check(prerequisite)));
    }

    let mut unmet = Vec::new();
    let mut unverifiable = Vec::new();
    for (group, rows) in &groups {
        let failing: Vec<&Prerequisite> = rows
            .iter()
            .filter(|(_, c)| *c == Check::Unmet)
            .map(|(p, _)| *p)
            .collect();
        if !failing.is_empty() {
            unmet.extend(failing.into_iter().map(|p| UnmetRequirement {
                target: target.clone(),
                group: *group,
                requirement: p.describe(),
            }));
            continue;
        }

        let pending: Vec<&Prerequisite> = rows
            .iter()
            .filter(|(_, c)| *c == Check::Unverifiable)
            .map(|(p, _)| *p)
            .collect();
        if pending.is_empty() {
            return PrerequisiteOutcome::Eligible;
        }
        unverifiable.extend(pending.into_iter().map(|p| UnverifiableRequirement {
            target: target.clone(),
            group: *group,
            description: p.describe(),
        }));
    }

    if unverifiable.is_empty() {
        PrerequisiteOutcome::NotMet { unmet }
    } else {
        PrerequisiteOutcome::Unverifiable {
            requirements: unverifiable,
            unmet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::Ability;

    fn slug(s: &str) -> Slug {
        Slug::new(s).unwrap()
    }

    fn feat() -> EntityRef {
        EntityRef::new(EntityKind::Feat, slug("grappler"))
    }

    fn facts() -> CharacterFacts {
        CharacterFacts {
            races: vec![slug("phb:high-elf"), slug("phb:elf")],
            classes: vec![(slug("wizard"), 4)],
            proficiencies: vec![ProficiencySubject::Skill(slug("arcana"))],
            scores: AbilityScores::uniform(10).with(Ability::Str, 13),
            total_level: 4,
            can_cast: true,
            ..CharacterFacts::default()
        }
    }

    #[test]
    fn no_rows_is_eligible() {
        assert!(evaluate(&feat(), &[], &facts()).is_eligible());
    }

    #[test]
    fn one_full_group_satisfies_the_set() {
        let rows = vec![
            Prerequisite::ability(1, Ability::Str, 13),
            Prerequisite::entity(2, EntityKind::Race, slug("dwarf")),
            Prerequisite::ability(2, Ability::Con, 13),
        ];
        assert!(evaluate(&feat(), &rows, &facts()).is_eligible());
    }

    #[test]
    fn and_within_group() {
        let rows = vec![
            Prerequisite::ability(1, Ability::Str, 13),
            Prerequisite::ability(1, Ability::Dex, 13),
        ];
        match evaluate(&feat(), &rows, &facts()) {
            PrerequisiteOutcome::NotMet { unmet } => {
                assert_eq!(unmet.len(), 1);
                assert_eq!(unmet[0].group, 1);
                assert_eq!(unmet[0].requirement, "Dexterity 13 or higher");
            }
            other => panic!("expected NotMet, got {:?}", other),
        }
    }

    #[test]
    fn unmet_lists_every_group() {
        let rows = vec![
            Prerequisite::ability(1, Ability::Dex, 13),
            Prerequisite::entity(2, EntityKind::Race, slug("dwarf")),
        ];
        match evaluate(&feat(), &rows, &facts()) {
            PrerequisiteOutcome::NotMet { unmet } => {
                let groups: Vec<u8> = unmet.iter().map(|u| u.group).collect();
                assert_eq!(groups, vec![1, 2]);
            }
            other => panic!("expected NotMet, got {:?}", other),
        }
    }

    #[test]
    fn subrace_satisfies_parent_race() {
        let rows = vec![Prerequisite::entity(1, EntityKind::Race, slug("elf"))];
        assert!(evaluate(&feat(), &rows, &facts()).is_eligible());
    }

    #[test]
    fn text_only_group_is_unverifiable() {
        let rows = vec![
            Prerequisite::ability(1, Ability::Str, 13),
            Prerequisite::text(1, "Must have sworn an oath"),
        ];
        match evaluate(&feat(), &rows, &facts()) {
            PrerequisiteOutcome::Unverifiable { requirements, unmet } => {
                assert_eq!(requirements[0].description, "Must have sworn an oath");
                assert!(unmet.is_empty());
            }
            other => panic!("expected Unverifiable, got {:?}", other),
        }
    }

    #[test]
    fn unverifiable_outcome_keeps_unmet_rows_of_other_groups() {
        let rows = vec![
            Prerequisite::text(1, "Must have sworn an oath"),
            Prerequisite::ability(2, Ability::Cha, 13),
            Prerequisite::entity(2, EntityKind::Skill, slug("arcana")),
        ];
        match evaluate(&feat(), &rows, &facts()) {
            PrerequisiteOutcome::Unverifiable { requirements, unmet } => {
                assert_eq!(requirements.len(), 1);
                assert_eq!(unmet.len(), 1);
                assert_eq!(unmet[0].group, 2);
            }
            other => panic!("expected Unverifiable, got {:?}", other),
        }
    }

    #[test]
    fn met_group_beats_unverifiable_group() {
        let rows = vec![
            Prerequisite::text(1, "Approval of the guild"),
            Prerequisite::entity(2, EntityKind::Skill, slug("arcana")),
        ];
        assert!(evaluate(&feat(), &rows, &facts()).is_eligible());
    }

    #[test]
    fn level_and_spellcasting_targets() {
        let rows = vec![
            Prerequisite {
                group_id: 1,
                target: PrerequisiteTarget::Level { minimum: 4 },
                description: None,
            },
            Prerequisite {
                group_id: 1,
                target: PrerequisiteTarget::Spellcasting,
                description: None,
            },
        ];
        assert!(evaluate(&feat(), &rows, &facts()).is_eligible());

        let no_magic = CharacterFacts {
            can_cast: false,
            ..facts()
        };
        assert!(!evaluate(&feat(), &rows, &no_magic).is_eligible());
    }
}
