//! Entity and attachment addressing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;
use crate::ids::CompendiumKey;
use crate::value_objects::Slug;

/// Every kind of compendium entity that can own or be referenced by an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Race,
    Class,
    Background,
    Feat,
    Item,
    Spell,
    Monster,
    OptionalFeature,
    Language,
    Skill,
    ProficiencyType,
    Condition,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Race => "race",
            Self::Class => "class",
            Self::Background => "background",
            Self::Feat => "feat",
            Self::Item => "item",
            Self::Spell => "spell",
            Self::Monster => "monster",
            Self::OptionalFeature => "optional_feature",
            Self::Language => "language",
            Self::Skill => "skill",
            Self::ProficiencyType => "proficiency_type",
            Self::Condition => "condition",
        }
    }

    pub fn all() -> [EntityKind; 12] {
        [
            Self::Race,
            Self::Class,
            Self::Background,
            Self::Feat,
            Self::Item,
            Self::Spell,
            Self::Monster,
            Self::OptionalFeature,
            Self::Language,
            Self::Skill,
            Self::ProficiencyType,
            Self::Condition,
        ]
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        Self::all()
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| DomainError::parse(format!("Unknown entity kind: {}", s)))
    }
}

/// Owner of an attachment row: an entity-kind tag plus the opaque internal key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttachmentTarget {
    pub kind: EntityKind,
    pub key: CompendiumKey,
}

impl AttachmentTarget {
    pub fn new(kind: EntityKind, key: CompendiumKey) -> Self {
        Self { kind, key }
    }
}

impl fmt::Display for AttachmentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind, self.key)
    }
}

/// A slug-based reference to an entity.
///
/// This is the only form of entity reference stored on a character and the
/// form compendium rows use to point at each other, so both survive reseeds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub slug: Slug,
}

impl EntityRef {
    pub fn new(kind: EntityKind, slug: Slug) -> Self {
        Self { kind, slug }
    }

    /// Loose equality: same kind, slugs equal modulo a missing source prefix.
    pub fn refers_to(&self, other: &EntityRef) -> bool {
        self.kind == other.kind && self.slug.loosely_matches(&other.slug)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.slug)
    }
}

/// The canonical attachment kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Modifier,
    Proficiency,
    Language,
    SavingThrow,
    SpellGrant,
    Prerequisite,
    Choice,
    Trait,
    DataTable,
    Counter,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_kind_parses_loosely() {
        assert_eq!("optional-feature".parse::<EntityKind>().unwrap(), EntityKind::OptionalFeature);
        assert_eq!("Race".parse::<EntityKind>().unwrap(), EntityKind::Race);
        assert!("vehicle".parse::<EntityKind>().is_err());
    }

    #[test]
    fn entity_ref_loose_match() {
        let full = EntityRef::new(EntityKind::Race, Slug::new("phb:elf").unwrap());
        let bare = EntityRef::new(EntityKind::Race, Slug::new("elf").unwrap());
        let other_kind = EntityRef::new(EntityKind::Language, Slug::new("elf").unwrap());
        assert!(full.refers_to(&bare));
        assert!(!full.refers_to(&other_kind));
    }
}
