//! The static rules graph: entities, their polymorphic attachments, and the
//! read-only repository the build components consume.

pub mod attachments;
pub mod catalog;
pub mod choice;
pub mod entities;
pub mod kind;
pub mod progression;
pub mod repository;

pub use attachments::{
    Attachment, DataTable, DataTableEntry, DataTableType, EntityCounter, LanguageGrant, Modifier,
    ModifierCategory, Prerequisite, PrerequisiteTarget, ProficiencyCategory, ProficiencyGrant,
    ProficiencySubject, SaveModifier, SavingThrowRequirement, SpellGrant, Trait,
};
pub use catalog::{Catalog, CatalogBuilder};
pub use choice::{Choice, ChoiceConstraint, ChoiceFilter, ChoiceGroup, ChoiceType};
pub use entities::{
    Background, Class, Condition, Entity, Feat, Item, Language, Monster, OptionalFeature,
    ProficiencyType, Race, Skill, Spell,
};
pub use kind::{AttachmentKind, AttachmentTarget, EntityKind, EntityRef};
pub use progression::{multiclass_slots, ProgressionRow, MAX_LEVEL, MULTICLASS_SPELL_SLOTS};
pub use repository::{CompendiumError, CompendiumRepository};
