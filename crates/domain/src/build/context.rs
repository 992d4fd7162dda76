//! The character's sources, loaded from the compendium by slug.
//!
//! A [`BuildContext`] is the snapshot every other build component reads:
//! race and parent race, background, each class with its subclass, and the
//! feats and optional features the character has picked.

use super::issues::{IssueCode, ValidationIssue};
use crate::aggregates::Character;
use crate::compendium::{
    Background, Class, CompendiumRepository, Entity, EntityKind, EntityRef, Race,
};
use crate::rules::{CasterType, PreparationMethod};
use crate::value_objects::{Ability, Slug};

/// Why an entity is one of the character's sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceRole {
    Race,
    ParentRace,
    Background,
    Class { primary: bool },
    Subclass { primary: bool },
    Feat,
    OptionalFeature,
}

/// One entity whose attachments apply to the character.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSource {
    pub entity: Entity,
    pub role: SourceRole,
    /// Level gates are compared against this: class level for class and
    /// subclass sources, total character level otherwise
    pub level: u8,
    /// Owning class for class and subclass sources
    pub class: Option<Slug>,
}

impl BuildSource {
    pub fn entity_ref(&self) -> EntityRef {
        self.entity.entity_ref()
    }

    /// Class source for a class the character did not start in.
    pub fn is_secondary_class(&self) -> bool {
        matches!(self.role, SourceRole::Class { primary: false })
    }

    pub fn is_primary_class(&self) -> bool {
        matches!(self.role, SourceRole::Class { primary: true })
    }
}

/// One class entry with its compendium records.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassContext {
    pub class: Class,
    pub subclass: Option<Class>,
    pub level: u8,
    pub primary: bool,
}

impl ClassContext {
    /// The subclass's caster type wins over the base class's.
    pub fn caster_type(&self) -> Option<CasterType> {
        self.subclass
            .as_ref()
            .and_then(|s| s.caster_type)
            .or(self.class.caster_type)
    }

    pub fn spellcasting_ability(&self) -> Option<Ability> {
        self.subclass
            .as_ref()
            .and_then(|s| s.spellcasting_ability)
            .or(self.class.spellcasting_ability)
    }

    pub fn preparation_method(&self) -> Option<PreparationMethod> {
        self.subclass
            .as_ref()
            .and_then(|s| s.preparation_method)
            .or(self.class.preparation_method)
    }

    /// Slugs to consult for a progression row, most specific first.
    pub fn progression_slugs(&self) -> Vec<&Slug> {
        let mut slugs = Vec::with_capacity(2);
        if let Some(subclass) = self.subclass.as_ref().filter(|s| s.caster_type.is_some()) {
            slugs.push(&subclass.slug);
        }
        slugs.push(&self.class.slug);
        slugs
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildContext {
    pub race: Race,
    pub parent_race: Option<Race>,
    pub background: Option<Background>,
    pub classes: Vec<ClassContext>,
    /// Feats and optional features, with the level they were taken at
    pub selections: Vec<(Entity, u8)>,
    pub total_level: u8,
}

impl BuildContext {
    /// Load every source the character names.
    ///
    /// # Errors
    ///
    /// Every reference that fails to resolve, plus structural problems
    /// (missing subrace pick, subclass of the wrong class), as one list.
    pub fn load(
        repo: &dyn CompendiumRepository,
        character: &Character,
    ) -> Result<Self, Vec<ValidationIssue>> {
        let mut issues = Vec::new();

        let race = repo
            .race(character.race())
            .map_err(|e| issues.push(ValidationIssue::lookup("race", &e)))
            .ok();
        let parent_race = race.as_ref().and_then(|r| r.parent_race.as_ref()).and_then(|p| {
            repo.race(p)
                .map_err(|e| issues.push(ValidationIssue::lookup("race.parent", &e)))
                .ok()
        });
        if let Some(race) = race.as_ref().filter(|r| r.subrace_required && r.parent_race.is_none()) {
            issues.push(ValidationIssue::new(
                "race",
                IssueCode::SubraceRequired,
                format!("{} requires a subrace pick", race.name),
            ));
        }

        let background = character.background().and_then(|slug| {
            repo.entity(EntityKind::Background, slug)
                .map_err(|e| issues.push(ValidationIssue::lookup("background", &e)))
                .ok()
                .and_then(|e| match e {
                    Entity::Background(b) => Some(b),
                    _ => None,
                })
        });

        let mut classes = Vec::with_capacity(character.classes().len());
        for (index, entry) in character.classes().iter().enumerate() {
            let field = format!("classes[{}]", index);
            let class = match repo.class(&entry.class) {
                Ok(class) => class,
                Err(e) => {
                    issues.push(ValidationIssue::lookup(field, &e));
                    continue;
                }
            };
            let subclass = match &entry.subclass {
                Some(slug) => match repo.class(slug) {
                    Ok(sub) if sub.parent_class.as_ref().is_some_and(|p| p.loosely_matches(&class.slug)) => {
                        Some(sub)
                    }
                    Ok(sub) => {
                        issues.push(ValidationIssue::new(
                            format!("{}.subclass", field),
                            IssueCode::TargetMismatch,
                            format!("{} is not a subclass of {}", sub.name, class.name),
                        ));
                        None
                    }
                    Err(e) => {
                        issues.push(ValidationIssue::lookup(format!("{}.subclass", field), &e));
                        None
                    }
                },
                None => None,
            };
            classes.push(ClassContext {
                class,
                subclass,
                level: entry.level,
                primary: entry.is_primary,
            });
        }

        let mut selections = Vec::new();
        for (index, selection) in character.feature_selections().iter().enumerate() {
            match repo.entity_by_ref(&selection.feature) {
                Ok(entity) => selections.push((entity, selection.level_acquired)),
                Err(e) => issues.push(ValidationIssue::lookup(
                    format!("featureSelections[{}]", index),
                    &e,
                )),
            }
        }

        match race {
            Some(race) if issues.is_empty() => Ok(Self {
                race,
                parent_race,
                background,
                classes,
                selections,
                total_level: character.total_level(),
            }),
            _ => Err(issues),
        }
    }

    /// Every source in application order.
    pub fn sources(&self) -> Vec<BuildSource> {
        let total = self.total_level;
        let mut sources = Vec::new();

        if let Some(parent) = &self.parent_race {
            sources.push(BuildSource {
                entity: Entity::Race(parent.clone()),
                role: SourceRole::ParentRace,
                level: total,
                class: None,
            });
        }
        sources.push(BuildSource {
            entity: Entity::Race(self.race.clone()),
            role: SourceRole::Race,
            level: total,
            class: None,
        });
        if let Some(background) = &self.background {
            sources.push(BuildSource {
                entity: Entity::Background(background.clone()),
                role: SourceRole::Background,
                level: total,
                class: None,
            });
        }
        for class in &self.classes {
            sources.push(BuildSource {
                entity: Entity::Class(class.class.clone()),
                role: SourceRole::Class {
                    primary: class.primary,
                },
                level: class.level,
                class: Some(class.class.slug.clone()),
            });
            if let Some(subclass) = &class.subclass {
                sources.push(BuildSource {
                    entity: Entity::Class(subclass.clone()),
                    role: SourceRole::Subclass {
                        primary: class.primary,
                    },
                    level: class.level,
                    class: Some(class.class.slug.clone()),
                });
            }
        }
        for (entity, _) in &self.selections {
            let role = match entity.kind() {
                EntityKind::Feat => SourceRole::Feat,
                _ => SourceRole::OptionalFeature,
            };
            sources.push(BuildSource {
                entity: entity.clone(),
                role,
                level: total,
                class: None,
            });
        }
        sources
    }

    pub fn class(&self, slug: &Slug) -> Option<&ClassContext> {
        self.classes.iter().find(|c| c.class.slug.loosely_matches(slug))
    }

    pub fn has_selection(&self, entity: &EntityRef) -> bool {
        self.selections
            .iter()
            .any(|(e, _)| e.entity_ref().refers_to(entity))
    }

    /// Race slugs that count as "the character's race": the race and its parent.
    pub fn race_slugs(&self) -> Vec<&Slug> {
        let mut slugs = vec![&self.race.slug];
        if let Some(parent) = &self.parent_race {
            slugs.push(&parent.slug);
        }
        slugs
    }
}
