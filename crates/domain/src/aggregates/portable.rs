//! Portable character document.
//!
//! The export format carries the full build and runtime state with every
//! compendium reference as a slug, and no identity. Importing it into a
//! catalog with different internal keys (a reseed) loses nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::character::Character;
use crate::entities::{
    Alignment, CharacterAbilityScore, CharacterClass, CharacterCondition, CharacterCounter,
    CharacterEquipment, CharacterFeature, CharacterLanguage, CharacterNote, CharacterProficiency,
    CharacterSpell, CharacterSpellSlot, DeathSaves, EquipmentMode, FeatureSelection, HitPoints,
    LevelRecord,
};
use crate::error::DomainError;
use crate::ids::CharacterId;
use crate::value_objects::{AbilityScores, CharacterName, Slug};

/// Current document version.
pub const EXPORT_FORMAT_VERSION: u32 = 1;

/// Versioned export envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterExport {
    pub format_version: u32,
    pub exported_at: DateTime<Utc>,
    pub character: PortableCharacter,
}

/// A character without identity or timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortableCharacter {
    pub name: String,
    pub race: Slug,
    pub background: Option<Slug>,
    pub base_scores: AbilityScores,
    #[serde(default)]
    pub alignment: Alignment,
    #[serde(default)]
    pub equipment_mode: EquipmentMode,
    pub classes: Vec<CharacterClass>,
    pub level_history: Vec<LevelRecord>,
    #[serde(default)]
    pub hit_points: HitPoints,
    #[serde(default)]
    pub death_saves: DeathSaves,
    #[serde(default)]
    pub ability_scores: Vec<CharacterAbilityScore>,
    #[serde(default)]
    pub proficiencies: Vec<CharacterProficiency>,
    #[serde(default)]
    pub languages: Vec<CharacterLanguage>,
    #[serde(default)]
    pub spells: Vec<CharacterSpell>,
    #[serde(default)]
    pub spell_slots: Vec<CharacterSpellSlot>,
    #[serde(default)]
    pub features: Vec<CharacterFeature>,
    #[serde(default)]
    pub feature_selections: Vec<FeatureSelection>,
    #[serde(default)]
    pub counters: Vec<CharacterCounter>,
    #[serde(default)]
    pub equipment: Vec<CharacterEquipment>,
    #[serde(default)]
    pub conditions: Vec<CharacterCondition>,
    #[serde(default)]
    pub notes: Vec<CharacterNote>,
}

impl CharacterExport {
    pub fn new(character: &Character, exported_at: DateTime<Utc>) -> Self {
        Self {
            format_version: EXPORT_FORMAT_VERSION,
            exported_at,
            character: PortableCharacter::from(character),
        }
    }

    /// Rebuild a character under a fresh id.
    ///
    /// # Errors
    ///
    /// `DomainError::Validation` for an unsupported version, a bad name or
    /// out-of-range scores; `DomainError::Constraint` for duplicated natural
    /// keys or a level history that disagrees with the class levels.
    pub fn into_character(self, id: CharacterId) -> Result<Character, DomainError> {
        if self.format_version == 0 || self.format_version > EXPORT_FORMAT_VERSION {
            return Err(DomainError::validation(format!(
                "unsupported export format version {}",
                self.format_version
            )));
        }
        self.character.into_character(id)
    }
}

impl From<&Character> for PortableCharacter {
    fn from(c: &Character) -> Self {
        Self {
            name: c.name().to_string(),
            race: c.race().clone(),
            background: c.background().cloned(),
            base_scores: *c.base_scores(),
            alignment: c.alignment(),
            equipment_mode: c.equipment_mode(),
            classes: c.classes().to_vec(),
            level_history: c.level_history().to_vec(),
            hit_points: *c.hit_points(),
            death_saves: *c.death_saves(),
            ability_scores: c.ability_scores().to_vec(),
            proficiencies: c.proficiencies().to_vec(),
            languages: c.languages().to_vec(),
            spells: c.spells().to_vec(),
            spell_slots: c.spell_slots().to_vec(),
            features: c.features().to_vec(),
            feature_selections: c.feature_selections().to_vec(),
            counters: c.counters().to_vec(),
            equipment: c.equipment().to_vec(),
            conditions: c.conditions().to_vec(),
            notes: c.notes().to_vec(),
        }
    }
}

impl PortableCharacter {
    fn into_character(self, id: CharacterId) -> Result<Character, DomainError> {
        let name = CharacterName::new(self.name)?;
        self.base_scores.validate()?;

        let Some(first) = self.classes.iter().find(|c| c.is_primary).cloned() else {
            return Err(DomainError::constraint("export has no primary class"));
        };
        let history_levels = self.level_history.len();
        let class_levels: usize = self.classes.iter().map(|c| usize::from(c.level)).sum();
        if history_levels != class_levels {
            return Err(DomainError::constraint(format!(
                "level history has {} entries but class levels sum to {}",
                history_levels, class_levels
            )));
        }

        let mut character = Character::new(
            name,
            self.race,
            self.background,
            self.base_scores,
            first.class,
        )
        .with_id(id)
        .with_alignment(self.alignment)
        .with_equipment_mode(self.equipment_mode);

        character.restore_build(self.classes, self.level_history);
        character.restore_vitals(self.hit_points, self.death_saves);
        character.replace_ability_scores(self.ability_scores);
        character.replace_proficiencies(self.proficiencies);
        character.replace_languages(self.languages);
        character.replace_spells(self.spells);
        character.replace_spell_slots(self.spell_slots);
        character.replace_features(self.features);
        character.replace_feature_selections(self.feature_selections);
        character.replace_counters(self.counters);
        character.replace_equipment(self.equipment);
        for condition in self.conditions {
            character.apply_condition(condition);
        }
        for note in self.notes {
            character.add_note(note.category, note.text);
        }

        character.check_integrity()?;
        Ok(character)
    }
}
