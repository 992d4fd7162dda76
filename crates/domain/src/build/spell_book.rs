//! Spell list management: learning, forgetting and preparing spells.
//!
//! Prepared casters prepare straight from their class list; those rows are
//! dropped again when unprepared. Spellbook casters learn spells first and
//! prepare from the book. Known casters learn up to their known count and
//! never prepare. Preparation limits are per class and count leveled spells
//! only; cantrips and always-prepared grants never count.

use super::abilities::ability_totals;
use super::context::BuildContext;
use super::resolver::CharacterBuilder;
use super::spellcasting::{class_casting, ClassCasting};
use crate::aggregates::Character;
use crate::compendium::{Entity, EntityKind, EntityRef, Spell};
use crate::entities::{CharacterSpell, PreparationStatus, Provenance};
use crate::error::DomainError;
use crate::events::PreparationChange;
use crate::rules::PreparationMethod;
use crate::value_objects::Slug;

/// A class's casting numbers paired with the spell being acted on.
struct SpellAccess {
    casting: ClassCasting,
    spell: Spell,
    on_class_list: bool,
}

impl SpellAccess {
    fn method(&self) -> Result<PreparationMethod, DomainError> {
        self.casting.preparation_method.ok_or_else(|| {
            DomainError::validation(format!(
                "{} has no spell list to manage",
                self.casting.class
            ))
        })
    }

    /// On the class list and within the class's highest castable level.
    fn check_castable(&self) -> Result<(), DomainError> {
        if !self.on_class_list {
            return Err(DomainError::validation(format!(
                "{} is not on the {} spell list",
                self.spell.name, self.casting.class
            )));
        }
        if self.spell.level > self.casting.max_spell_level {
            return Err(DomainError::validation(format!(
                "{} is level {}; {} can cast up to level {}",
                self.spell.name, self.spell.level, self.casting.class, self.casting.max_spell_level
            )));
        }
        Ok(())
    }

    fn manual_row(&self, status: PreparationStatus) -> CharacterSpell {
        CharacterSpell {
            spell: self.spell.slug.clone(),
            class: Some(self.casting.class.clone()),
            status,
            uses: None,
            provenance: Provenance::manual(EntityRef::new(
                EntityKind::Class,
                self.casting.class.clone(),
            )),
        }
    }
}

impl CharacterBuilder {
    /// Add `spell` to a spellbook or known-spells list for `class` (the
    /// primary class when `None`).
    ///
    /// # Errors
    ///
    /// - `Validation` for prepared casters, off-list or too-high spells
    /// - `Constraint` when the spell is already held or the cantrip or
    ///   known-spell count is full
    pub fn learn_spell(
        &self,
        character: &mut Character,
        spell: &Slug,
        class: Option<&Slug>,
    ) -> Result<CharacterSpell, DomainError> {
        let access = self.spell_access(character, spell, class)?;
        let method = access.method()?;
        if method == PreparationMethod::Prepared {
            return Err(DomainError::validation(format!(
                "{} prepares from its whole class list; prepare {} instead",
                access.casting.class, access.spell.name
            )));
        }
        access.check_castable()?;
        if character.spell(&access.spell.slug).is_some() {
            return Err(DomainError::constraint(format!(
                "{} is already known",
                access.spell.name
            )));
        }

        let rows = self.class_rows(character, &access.casting.class);
        if access.spell.is_cantrip() {
            let known = rows.iter().filter(|(_, level)| *level == 0).count();
            if known >= usize::from(access.casting.cantrips_known) {
                return Err(DomainError::constraint(format!(
                    "{} knows {} of {} cantrips",
                    access.casting.class, known, access.casting.cantrips_known
                )));
            }
        } else if let Some(limit) = access.casting.spells_known {
            let known = rows.iter().filter(|(_, level)| *level > 0).count();
            if known >= usize::from(limit) {
                return Err(DomainError::constraint(format!(
                    "{} knows {} of {} spells",
                    access.casting.class, known, limit
                )));
            }
        }

        let row = access.manual_row(PreparationStatus::Known);
        character.add_spell(row.clone())?;
        Ok(row)
    }

    /// Drop a spell that was learned or prepared directly.
    ///
    /// Rows from fixed grants or choice groups belong to their grant and are
    /// refused with `Constraint`.
    pub fn forget_spell(
        &self,
        character: &mut Character,
        spell: &Slug,
    ) -> Result<CharacterSpell, DomainError> {
        let row = character
            .spell(spell)
            .ok_or_else(|| DomainError::not_found("spell", spell.to_string()))?;
        if !row.provenance.is_manual() {
            return Err(DomainError::constraint(format!(
                "{} comes from {}; change that grant instead",
                row.spell, row.provenance
            )));
        }
        character
            .remove_spell(spell)
            .ok_or_else(|| DomainError::not_found("spell", spell.to_string()))
    }

    /// Prepare `spell` for `class`, defaulting to the row's class and then
    /// the primary class.
    ///
    /// Prepared casters may prepare any castable spell on their list without
    /// learning it first.
    ///
    /// # Errors
    ///
    /// - `Validation` for cantrips and for classes that do not prepare
    /// - `NotFound` when a spellbook caster has not learned the spell
    /// - `Constraint` when the class's preparation limit is reached
    pub fn prepare_spell(
        &self,
        character: &mut Character,
        spell: &Slug,
        class: Option<&Slug>,
    ) -> Result<PreparationChange, DomainError> {
        let existing = character.spell(spell).cloned();
        let class = class.or_else(|| existing.as_ref().and_then(|r| r.class.as_ref()));
        let access = self.spell_access(character, spell, class)?;
        if access.spell.is_cantrip() {
            return Err(DomainError::validation(format!(
                "{} is a cantrip; cantrips are always prepared",
                access.spell.name
            )));
        }
        let method = access.method()?;
        if !method.prepares() {
            return Err(DomainError::validation(format!(
                "{} casts known spells and does not prepare",
                access.casting.class
            )));
        }

        match existing {
            Some(row) if row.status != PreparationStatus::Known => {
                Ok(PreparationChange::AlreadyPrepared)
            }
            Some(row) => {
                self.check_preparation_limit(character, &access)?;
                character.set_spell_status(&row.spell, PreparationStatus::Prepared);
                Ok(PreparationChange::Prepared)
            }
            None if method == PreparationMethod::Prepared => {
                access.check_castable()?;
                self.check_preparation_limit(character, &access)?;
                character.add_spell(access.manual_row(PreparationStatus::Prepared))?;
                Ok(PreparationChange::Prepared)
            }
            None => Err(DomainError::not_found(
                "spellbook spell",
                access.spell.slug.to_string(),
            )),
        }
    }

    /// Unprepare `spell`.
    ///
    /// A row prepared straight from a prepared caster's list is removed;
    /// anything else goes back to known.
    pub fn unprepare_spell(
        &self,
        character: &mut Character,
        spell: &Slug,
    ) -> Result<PreparationChange, DomainError> {
        let row = character
            .spell(spell)
            .cloned()
            .ok_or_else(|| DomainError::not_found("spell", spell.to_string()))?;
        if self.spell_level(&row.spell) == Some(0) {
            return Err(DomainError::validation(format!(
                "{} is a cantrip; cantrips are always prepared",
                row.spell
            )));
        }

        match row.status {
            PreparationStatus::AlwaysPrepared => Err(DomainError::constraint(format!(
                "{} is always prepared by {}",
                row.spell, row.provenance.source
            ))),
            PreparationStatus::Known => Ok(PreparationChange::NotPrepared),
            PreparationStatus::Prepared => {
                let from_list = row.provenance.is_manual()
                    && self.preparation_method(character, row.class.as_ref())
                        == Some(PreparationMethod::Prepared);
                if from_list {
                    character.remove_spell(&row.spell);
                    Ok(PreparationChange::Removed)
                } else {
                    character.set_spell_status(&row.spell, PreparationStatus::Known);
                    Ok(PreparationChange::Unprepared)
                }
            }
        }
    }

    fn spell_access(
        &self,
        character: &Character,
        spell: &Slug,
        class: Option<&Slug>,
    ) -> Result<SpellAccess, DomainError> {
        let class = match class {
            Some(class) => character
                .class_entry(class)
                .ok_or_else(|| DomainError::not_found("character class", class.to_string()))?,
            None => character
                .primary_class()
                .ok_or_else(|| DomainError::validation("character has no primary class"))?,
        };

        let repo = self.repository();
        let context = load_context(self, character)?;
        let totals = ability_totals(character.base_scores(), character.ability_scores());
        let casting = class_casting(repo, self.rules(), &context, &totals)
            .into_iter()
            .find(|c| c.class.loosely_matches(&class.class))
            .ok_or_else(|| {
                DomainError::validation(format!("{} cannot cast spells", class.class))
            })?;

        let spell = match repo.entity(EntityKind::Spell, spell) {
            Ok(Entity::Spell(spell)) => spell,
            _ => return Err(DomainError::not_found("spell", spell.to_string())),
        };
        let on_class_list = repo.spell_lists(&spell.slug).iter().any(|list| {
            list.loosely_matches(&casting.class)
                || casting.subclass.as_ref().is_some_and(|s| list.loosely_matches(s))
        });

        Ok(SpellAccess {
            casting,
            spell,
            on_class_list,
        })
    }

    fn check_preparation_limit(
        &self,
        character: &Character,
        access: &SpellAccess,
    ) -> Result<(), DomainError> {
        let Some(limit) = access.casting.preparation_limit else {
            return Ok(());
        };
        let prepared = self
            .class_rows(character, &access.casting.class)
            .iter()
            .filter(|(row, level)| row.status == PreparationStatus::Prepared && *level > 0)
            .count();
        if prepared as u32 >= limit {
            return Err(DomainError::constraint(format!(
                "{} has {} of {} spells prepared",
                access.casting.class, prepared, limit
            )));
        }
        Ok(())
    }

    /// Rows cast through `class` with their spell level, always-prepared
    /// grants excluded.
    fn class_rows<'a>(
        &self,
        character: &'a Character,
        class: &Slug,
    ) -> Vec<(&'a CharacterSpell, u8)> {
        character
            .spells()
            .iter()
            .filter(|row| row.status != PreparationStatus::AlwaysPrepared)
            .filter(|row| row.class.as_ref().is_some_and(|c| c.loosely_matches(class)))
            .filter_map(|row| self.spell_level(&row.spell).map(|level| (row, level)))
            .collect()
    }

    fn spell_level(&self, spell: &Slug) -> Option<u8> {
        match self.repository().entity(EntityKind::Spell, spell) {
            Ok(Entity::Spell(spell)) => Some(spell.level),
            _ => None,
        }
    }

    fn preparation_method(
        &self,
        character: &Character,
        class: Option<&Slug>,
    ) -> Option<PreparationMethod> {
        let context = load_context(self, character).ok()?;
        context.class(class?)?.preparation_method()
    }
}

fn load_context(
    builder: &CharacterBuilder,
    character: &Character,
) -> Result<BuildContext, DomainError> {
    BuildContext::load(builder.repository(), character).map_err(|issues| {
        let message = issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        DomainError::validation(message)
    })
}
