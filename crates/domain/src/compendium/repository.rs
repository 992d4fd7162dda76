//! Read-only access to the static rules graph.

use thiserror::Error;

use super::attachments::{
    Attachment, DataTable, EntityCounter, LanguageGrant, Modifier, Prerequisite,
    ProficiencyGrant, SavingThrowRequirement, SpellGrant, Trait,
};
use super::choice::Choice;
use super::entities::{Class, Entity, Race};
use super::kind::{AttachmentKind, AttachmentTarget, EntityKind, EntityRef};
use super::progression::{self, ProgressionRow};
use crate::value_objects::Slug;

/// Error type for compendium lookups.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompendiumError {
    /// No entity of that kind has the slug.
    #[error("{kind} not found: {slug}")]
    NotFound { kind: EntityKind, slug: String },

    /// An unprefixed slug matches entities from more than one source.
    #[error("{kind} slug '{slug}' is ambiguous: {candidates:?}")]
    Ambiguous {
        kind: EntityKind,
        slug: String,
        candidates: Vec<String>,
    },

    /// The entity exists but is not of the expected shape (e.g. a race
    /// record was asked for as a class).
    #[error("{kind} '{slug}' has unexpected shape")]
    WrongKind { kind: EntityKind, slug: String },
}

impl CompendiumError {
    pub fn not_found(kind: EntityKind, slug: &Slug) -> Self {
        Self::NotFound {
            kind,
            slug: slug.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

macro_rules! typed_attachments {
    ($fn_name:ident, $kind:ident, $variant:ident, $ty:ty) => {
        fn $fn_name(&self, target: AttachmentTarget) -> Vec<$ty> {
            self.attachments(target, AttachmentKind::$kind)
                .into_iter()
                .filter_map(|a| match a {
                    Attachment::$variant(row) => Some(row),
                    _ => None,
                })
                .collect()
        }
    };
}

/// Read-only accessor over compendium entities and their attachments.
///
/// Results are owned snapshots. Implementations must not mutate while a
/// resolution is reading from them.
///
/// # Example
///
/// ```ignore
/// let cleric = compendium.class(&Slug::new("cleric")?)?;
/// let saves = compendium.proficiency_grants(AttachmentTarget::new(EntityKind::Class, cleric.key));
/// let row = compendium.progression(&cleric.slug, 1);
/// ```
pub trait CompendiumRepository: Send + Sync {
    /// Entity lookup by kind and slug.
    ///
    /// A source-prefixed slug must match exactly. An unprefixed slug matches
    /// the one entity with that body across sources.
    fn entity(&self, kind: EntityKind, slug: &Slug) -> Result<Entity, CompendiumError>;

    /// Entity lookup by internal key.
    fn entity_by_target(&self, target: AttachmentTarget) -> Option<Entity>;

    /// Attachments of one kind on an owner, in authoring order.
    fn attachments(&self, target: AttachmentTarget, kind: AttachmentKind) -> Vec<Attachment>;

    /// Progression row of a class (or subclass) at a level.
    fn progression(&self, class: &Slug, level: u8) -> Option<ProgressionRow>;

    /// Every entity of a kind.
    fn list(&self, kind: EntityKind) -> Vec<Entity>;

    /// Slugs of classes whose spell list includes the spell.
    fn spell_lists(&self, spell: &Slug) -> Vec<Slug>;

    /// Shared multiclass slot table row by total caster level.
    fn multiclass_slots(&self, total_caster_level: u8) -> [u8; 9] {
        progression::multiclass_slots(total_caster_level)
    }

    // =========================================================================
    // Typed helpers
    // =========================================================================

    fn entity_by_ref(&self, entity: &EntityRef) -> Result<Entity, CompendiumError> {
        self.entity(entity.kind, &entity.slug)
    }

    fn race(&self, slug: &Slug) -> Result<Race, CompendiumError> {
        match self.entity(EntityKind::Race, slug)? {
            Entity::Race(race) => Ok(race),
            _ => Err(CompendiumError::WrongKind {
                kind: EntityKind::Race,
                slug: slug.to_string(),
            }),
        }
    }

    fn class(&self, slug: &Slug) -> Result<Class, CompendiumError> {
        match self.entity(EntityKind::Class, slug)? {
            Entity::Class(class) => Ok(class),
            _ => Err(CompendiumError::WrongKind {
                kind: EntityKind::Class,
                slug: slug.to_string(),
            }),
        }
    }

    typed_attachments!(modifiers, Modifier, Modifier, Modifier);
    typed_attachments!(proficiency_grants, Proficiency, Proficiency, ProficiencyGrant);
    typed_attachments!(language_grants, Language, Language, LanguageGrant);
    typed_attachments!(saving_throws, SavingThrow, SavingThrow, SavingThrowRequirement);
    typed_attachments!(spell_grants, SpellGrant, SpellGrant, SpellGrant);
    typed_attachments!(prerequisites, Prerequisite, Prerequisite, Prerequisite);
    typed_attachments!(choices, Choice, Choice, Choice);
    typed_attachments!(traits, Trait, Trait, Trait);
    typed_attachments!(data_tables, DataTable, DataTable, DataTable);
    typed_attachments!(counters, Counter, Counter, EntityCounter);
}
