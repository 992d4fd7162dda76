//! Compendium entities.
//!
//! Simple data structs with public fields. `key` is assigned by the catalog
//! builder; anything built by hand carries [`CompendiumKey::UNASSIGNED`]
//! until then.

use serde::{Deserialize, Serialize};

use super::attachments::ProficiencyCategory;
use super::kind::{AttachmentTarget, EntityKind, EntityRef};
use crate::ids::CompendiumKey;
use crate::rules::{CasterType, PreparationMethod};
use crate::value_objects::{Ability, Slug};

// ============================================================================
// Race
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Race {
    pub key: CompendiumKey,
    pub slug: Slug,
    pub name: String,
    /// Set on subraces
    pub parent_race: Option<Slug>,
    /// Set on a parent race whose subrace pick is mandatory
    pub subrace_required: bool,
    pub speed: u32,
    pub size: Option<String>,
}

impl Race {
    pub fn new(slug: Slug, name: impl Into<String>) -> Self {
        Self {
            key: CompendiumKey::UNASSIGNED,
            slug,
            name: name.into(),
            parent_race: None,
            subrace_required: false,
            speed: 30,
            size: None,
        }
    }

    pub fn subrace_of(mut self, parent: Slug) -> Self {
        self.parent_race = Some(parent);
        self
    }

    pub fn requiring_subrace(mut self) -> Self {
        self.subrace_required = true;
        self
    }

    pub fn with_speed(mut self, speed: u32) -> Self {
        self.speed = speed;
        self
    }
}

// ============================================================================
// Class
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub key: CompendiumKey,
    pub slug: Slug,
    pub name: String,
    /// Set on subclasses
    pub parent_class: Option<Slug>,
    /// Subclass family label ("Divine Domain", "Martial Archetype")
    pub archetype: Option<String>,
    pub hit_die: u8,
    pub spellcasting_ability: Option<Ability>,
    pub preparation_method: Option<PreparationMethod>,
    pub caster_type: Option<CasterType>,
    /// Class level at which the subclass is picked (base classes only)
    pub subclass_level: Option<u8>,
}

impl Class {
    pub fn new(slug: Slug, name: impl Into<String>, hit_die: u8) -> Self {
        Self {
            key: CompendiumKey::UNASSIGNED,
            slug,
            name: name.into(),
            parent_class: None,
            archetype: None,
            hit_die,
            spellcasting_ability: None,
            preparation_method: None,
            caster_type: None,
            subclass_level: None,
        }
    }

    /// A subclass inherits the hit die of its parent; the value here is informational.
    pub fn subclass(slug: Slug, name: impl Into<String>, parent: Slug, archetype: &str) -> Self {
        Self {
            parent_class: Some(parent),
            archetype: Some(archetype.to_string()),
            ..Self::new(slug, name, 0)
        }
    }

    pub fn with_spellcasting(
        mut self,
        ability: Ability,
        caster_type: CasterType,
        method: PreparationMethod,
    ) -> Self {
        self.spellcasting_ability = Some(ability);
        self.caster_type = Some(caster_type);
        self.preparation_method = Some(method);
        self
    }

    pub fn with_subclass_level(mut self, level: u8) -> Self {
        self.subclass_level = Some(level);
        self
    }

    pub fn is_subclass(&self) -> bool {
        self.parent_class.is_some()
    }
}

// ============================================================================
// Simple entities
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Background {
    pub key: CompendiumKey,
    pub slug: Slug,
    pub name: String,
}

impl Background {
    pub fn new(slug: Slug, name: impl Into<String>) -> Self {
        Self {
            key: CompendiumKey::UNASSIGNED,
            slug,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feat {
    pub key: CompendiumKey,
    pub slug: Slug,
    pub name: String,
    pub description: Option<String>,
}

impl Feat {
    pub fn new(slug: Slug, name: impl Into<String>) -> Self {
        Self {
            key: CompendiumKey::UNASSIGNED,
            slug,
            name: name.into(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub key: CompendiumKey,
    pub slug: Slug,
    pub name: String,
    /// Free category label ("weapon", "armor", "gear", "focus")
    pub item_type: String,
    pub requires_attunement: bool,
}

impl Item {
    pub fn new(slug: Slug, name: impl Into<String>, item_type: impl Into<String>) -> Self {
        Self {
            key: CompendiumKey::UNASSIGNED,
            slug,
            name: name.into(),
            item_type: item_type.into(),
            requires_attunement: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spell {
    pub key: CompendiumKey,
    pub slug: Slug,
    pub name: String,
    /// 0 for cantrips
    pub level: u8,
    pub school: String,
}

impl Spell {
    pub fn new(slug: Slug, name: impl Into<String>, level: u8, school: impl Into<String>) -> Self {
        Self {
            key: CompendiumKey::UNASSIGNED,
            slug,
            name: name.into(),
            level,
            school: school.into(),
        }
    }

    pub fn is_cantrip(&self) -> bool {
        self.level == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monster {
    pub key: CompendiumKey,
    pub slug: Slug,
    pub name: String,
    pub challenge_rating: String,
}

impl Monster {
    pub fn new(slug: Slug, name: impl Into<String>, challenge_rating: impl Into<String>) -> Self {
        Self {
            key: CompendiumKey::UNASSIGNED,
            slug,
            name: name.into(),
            challenge_rating: challenge_rating.into(),
        }
    }
}

/// Invocations, fighting styles, metamagic and similar pick-lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionalFeature {
    pub key: CompendiumKey,
    pub slug: Slug,
    pub name: String,
    pub feature_type: String,
}

impl OptionalFeature {
    pub fn new(slug: Slug, name: impl Into<String>, feature_type: impl Into<String>) -> Self {
        Self {
            key: CompendiumKey::UNASSIGNED,
            slug,
            name: name.into(),
            feature_type: feature_type.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub key: CompendiumKey,
    pub slug: Slug,
    pub name: String,
    pub is_exotic: bool,
}

impl Language {
    pub fn new(slug: Slug, name: impl Into<String>) -> Self {
        Self {
            key: CompendiumKey::UNASSIGNED,
            slug,
            name: name.into(),
            is_exotic: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub key: CompendiumKey,
    pub slug: Slug,
    pub name: String,
    pub ability: Ability,
}

impl Skill {
    pub fn new(slug: Slug, name: impl Into<String>, ability: Ability) -> Self {
        Self {
            key: CompendiumKey::UNASSIGNED,
            slug,
            name: name.into(),
            ability,
        }
    }
}

/// A tool, weapon or armor proficiency target ("thieves-tools", "martial-weapons").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProficiencyType {
    pub key: CompendiumKey,
    pub slug: Slug,
    pub name: String,
    pub category: ProficiencyCategory,
}

impl ProficiencyType {
    pub fn new(slug: Slug, name: impl Into<String>, category: ProficiencyCategory) -> Self {
        Self {
            key: CompendiumKey::UNASSIGNED,
            slug,
            name: name.into(),
            category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub key: CompendiumKey,
    pub slug: Slug,
    pub name: String,
}

impl Condition {
    pub fn new(slug: Slug, name: impl Into<String>) -> Self {
        Self {
            key: CompendiumKey::UNASSIGNED,
            slug,
            name: name.into(),
        }
    }
}

// ============================================================================
// Entity (tagged union)
// ============================================================================

/// Any compendium entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Race(Race),
    Class(Class),
    Background(Background),
    Feat(Feat),
    Item(Item),
    Spell(Spell),
    Monster(Monster),
    OptionalFeature(OptionalFeature),
    Language(Language),
    Skill(Skill),
    ProficiencyType(ProficiencyType),
    Condition(Condition),
}

macro_rules! entity_dispatch {
    ($self:expr, $e:ident => $body:expr) => {
        match $self {
            Entity::Race($e) => $body,
            Entity::Class($e) => $body,
            Entity::Background($e) => $body,
            Entity::Feat($e) => $body,
            Entity::Item($e) => $body,
            Entity::Spell($e) => $body,
            Entity::Monster($e) => $body,
            Entity::OptionalFeature($e) => $body,
            Entity::Language($e) => $body,
            Entity::Skill($e) => $body,
            Entity::ProficiencyType($e) => $body,
            Entity::Condition($e) => $body,
        }
    };
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Race(_) => EntityKind::Race,
            Entity::Class(_) => EntityKind::Class,
            Entity::Background(_) => EntityKind::Background,
            Entity::Feat(_) => EntityKind::Feat,
            Entity::Item(_) => EntityKind::Item,
            Entity::Spell(_) => EntityKind::Spell,
            Entity::Monster(_) => EntityKind::Monster,
            Entity::OptionalFeature(_) => EntityKind::OptionalFeature,
            Entity::Language(_) => EntityKind::Language,
            Entity::Skill(_) => EntityKind::Skill,
            Entity::ProficiencyType(_) => EntityKind::ProficiencyType,
            Entity::Condition(_) => EntityKind::Condition,
        }
    }

    pub fn key(&self) -> CompendiumKey {
        entity_dispatch!(self, e => e.key)
    }

    pub fn slug(&self) -> &Slug {
        entity_dispatch!(self, e => &e.slug)
    }

    pub fn name(&self) -> &str {
        entity_dispatch!(self, e => e.name.as_str())
    }

    pub fn target(&self) -> AttachmentTarget {
        AttachmentTarget::new(self.kind(), self.key())
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.kind(), self.slug().clone())
    }

    pub(crate) fn set_key(&mut self, key: CompendiumKey) {
        entity_dispatch!(self, e => e.key = key)
    }

    pub fn as_race(&self) -> Option<&Race> {
        match self {
            Entity::Race(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&Class> {
        match self {
            Entity::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_spell(&self) -> Option<&Spell> {
        match self {
            Entity::Spell(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_item(&self) -> Option<&Item> {
        match self {
            Entity::Item(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_skill(&self) -> Option<&Skill> {
        match self {
            Entity::Skill(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_proficiency_type(&self) -> Option<&ProficiencyType> {
        match self {
            Entity::ProficiencyType(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_optional_feature(&self) -> Option<&OptionalFeature> {
        match self {
            Entity::OptionalFeature(o) => Some(o),
            _ => None,
        }
    }
}

macro_rules! impl_into_entity {
    ($($ty:ident),* $(,)?) => {
        $(
            impl From<$ty> for Entity {
                fn from(value: $ty) -> Self {
                    Entity::$ty(value)
                }
            }
        )*
    };
}

impl_into_entity!(
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
);

#[cfg(test)]
mod tests {
    use super::*;

    fn slug(s: &str) -> Slug {
        Slug::new(s).unwrap()
    }

    #[test]
    fn entity_accessors_dispatch() {
        let entity: Entity = Spell::new(slug("phb:fire-bolt"), "Fire Bolt", 0, "evocation").into();
        assert_eq!(entity.kind(), EntityKind::Spell);
        assert_eq!(entity.slug().base(), "fire-bolt");
        assert_eq!(entity.name(), "Fire Bolt");
        assert!(entity.as_spell().map(Spell::is_cantrip).unwrap_or(false));
        assert!(entity.as_race().is_none());
    }

    #[test]
    fn subclass_points_at_parent() {
        let domain = Class::subclass(slug("life-domain"), "Life Domain", slug("cleric"), "Divine Domain");
        assert!(domain.is_subclass());
        assert_eq!(domain.parent_class, Some(slug("cleric")));
    }

    #[test]
    fn set_key_updates_target() {
        let mut entity: Entity = Race::new(slug("human"), "Human").into();
        entity.set_key(CompendiumKey::new(7));
        assert_eq!(entity.target(), AttachmentTarget::new(EntityKind::Race, CompendiumKey::new(7)));
    }
}
