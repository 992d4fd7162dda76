//! Sheetsmith domain: the rules compendium, the character aggregate and the
//! pure build resolution that turns one into a fully derived other.
//!
//! Nothing in this crate performs I/O. Storage, configuration and logging
//! live in `sheetsmith-engine`.

pub mod aggregates;
pub mod build;
pub mod character_sheet;
pub mod compendium;
pub mod entities;
pub mod error;
pub mod events;
pub mod ids;
pub mod rules;
pub mod value_objects;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use aggregates::{Character, CharacterExport, GrantKey, PortableCharacter, EXPORT_FORMAT_VERSION};
pub use build::{
    CharacterBuilder, ChoiceSelection, IssueCode, PendingChoice, PrerequisiteOutcome, Resolution,
    ResolutionPolicy, ResolutionRequest, UnmetRequirement, UnverifiablePolicy,
    UnverifiableRequirement, ValidationIssue,
};
pub use character_sheet::CharacterSheet;
pub use compendium::{
    Catalog, CatalogBuilder, CompendiumError, CompendiumRepository, Entity, EntityKind, EntityRef,
};
pub use entities::{
    CharacterAbilityScore, CharacterClass, CharacterCounter, CharacterEquipment,
    CharacterFeature, CharacterLanguage, CharacterProficiency, CharacterSpell, CharacterSpellSlot,
    FeatureSelection, HitPoints, LevelRecord, PreparationStatus, Provenance, SlotType,
};
pub use error::DomainError;
pub use events::{
    CounterRestore, CounterUse, LevelUpOutcome, PreparationChange, RestOutcome, SlotUse, SpellUse,
};
pub use ids::{CharacterId, CompendiumKey};
pub use rules::{
    CalculationEngine, CasterType, Dnd5eRules, PreparationMethod, ProficiencyLevel, RestType,
};
pub use value_objects::{
    Ability, AbilityScores, CharacterName, ResetTiming, Slug, UsesLimit, UNLIMITED_USES,
};
