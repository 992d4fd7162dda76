//! Polymorphic attachment rows.
//!
//! Every row hangs off an [`AttachmentTarget`](super::AttachmentTarget). Rows
//! reference other entities by slug, never by internal key.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::choice::Choice;
use super::kind::{AttachmentKind, EntityKind, EntityRef};
use crate::value_objects::{Ability, ResetTiming, Slug, UsesLimit};

// ============================================================================
// Modifier
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierCategory {
    AbilityScore,
    Skill,
    SavingThrow,
    Speed,
    ArmorClass,
    Initiative,
    HitPointsPerLevel,
    PassivePerception,
    DamageResistance,
    DamageImmunity,
}

impl ModifierCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AbilityScore => "ability_score",
            Self::Skill => "skill",
            Self::SavingThrow => "saving_throw",
            Self::Speed => "speed",
            Self::ArmorClass => "armor_class",
            Self::Initiative => "initiative",
            Self::HitPointsPerLevel => "hit_points_per_level",
            Self::PassivePerception => "passive_perception",
            Self::DamageResistance => "damage_resistance",
            Self::DamageImmunity => "damage_immunity",
        }
    }
}

/// A numeric or qualitative effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifier {
    pub category: ModifierCategory,
    pub ability: Option<Ability>,
    pub skill: Option<Slug>,
    pub damage_type: Option<String>,
    pub value: i32,
    pub condition: Option<String>,
    /// Minimum level at which the modifier applies
    pub level: Option<u8>,
}

impl Modifier {
    pub fn new(category: ModifierCategory, value: i32) -> Self {
        Self {
            category,
            ability: None,
            skill: None,
            damage_type: None,
            value,
            condition: None,
            level: None,
        }
    }

    pub fn ability_score(ability: Ability, value: i32) -> Self {
        Self {
            ability: Some(ability),
            ..Self::new(ModifierCategory::AbilityScore, value)
        }
    }

    pub fn at_level(mut self, level: u8) -> Self {
        self.level = Some(level);
        self
    }

    pub fn when(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn active_at(&self, level: u8) -> bool {
        self.level.map_or(true, |gate| level >= gate)
    }
}

// ============================================================================
// Proficiency
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProficiencyCategory {
    Skill,
    Tool,
    Weapon,
    Armor,
    SavingThrow,
}

impl ProficiencyCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skill => "skill",
            Self::Tool => "tool",
            Self::Weapon => "weapon",
            Self::Armor => "armor",
            Self::SavingThrow => "saving_throw",
        }
    }

    /// Compendium kind that holds valid targets of this category.
    pub fn target_kind(&self) -> Option<EntityKind> {
        match self {
            Self::Skill => Some(EntityKind::Skill),
            Self::Tool | Self::Weapon | Self::Armor => Some(EntityKind::ProficiencyType),
            Self::SavingThrow => None,
        }
    }
}

impl fmt::Display for ProficiencyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a proficiency is in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "category", content = "target", rename_all = "snake_case")]
pub enum ProficiencySubject {
    Skill(Slug),
    Tool(Slug),
    Weapon(Slug),
    Armor(Slug),
    SavingThrow(Ability),
}

impl ProficiencySubject {
    pub fn category(&self) -> ProficiencyCategory {
        match self {
            Self::Skill(_) => ProficiencyCategory::Skill,
            Self::Tool(_) => ProficiencyCategory::Tool,
            Self::Weapon(_) => ProficiencyCategory::Weapon,
            Self::Armor(_) => ProficiencyCategory::Armor,
            Self::SavingThrow(_) => ProficiencyCategory::SavingThrow,
        }
    }

    pub fn slug(&self) -> Option<&Slug> {
        match self {
            Self::Skill(s) | Self::Tool(s) | Self::Weapon(s) | Self::Armor(s) => Some(s),
            Self::SavingThrow(_) => None,
        }
    }

    /// Build a subject of the given category from a picked slug.
    ///
    /// Saving throws take an ability code instead of a slug.
    pub fn from_pick(category: ProficiencyCategory, pick: &Slug) -> Option<Self> {
        match category {
            ProficiencyCategory::Skill => Some(Self::Skill(pick.clone())),
            ProficiencyCategory::Tool => Some(Self::Tool(pick.clone())),
            ProficiencyCategory::Weapon => Some(Self::Weapon(pick.clone())),
            ProficiencyCategory::Armor => Some(Self::Armor(pick.clone())),
            ProficiencyCategory::SavingThrow => {
                pick.base().parse::<Ability>().ok().map(Self::SavingThrow)
            }
        }
    }

    /// Same subject, ignoring a missing source prefix on either slug.
    pub fn matches(&self, other: &ProficiencySubject) -> bool {
        match (self, other) {
            (Self::SavingThrow(a), Self::SavingThrow(b)) => a == b,
            _ => {
                self.category() == other.category()
                    && match (self.slug(), other.slug()) {
                        (Some(a), Some(b)) => a.loosely_matches(b),
                        _ => false,
                    }
            }
        }
    }
}

impl fmt::Display for ProficiencySubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SavingThrow(ability) => write!(f, "saving_throw:{}", ability),
            other => match other.slug() {
                Some(slug) => write!(f, "{}:{}", other.category(), slug.base()),
                None => write!(f, "{}", other.category()),
            },
        }
    }
}

/// Grants (or requires) a proficiency.
///
/// Rows with `is_choice` are options of a choice group; one row per option,
/// or a single row without `subject` meaning "any of `category`".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProficiencyGrant {
    pub category: ProficiencyCategory,
    pub subject: Option<ProficiencySubject>,
    /// false when the row is a requirement rather than a grant
    pub grants: bool,
    pub is_choice: bool,
    pub choice_group: Option<String>,
    pub quantity: Option<u8>,
    pub level: Option<u8>,
    /// Also granted when the owning class is taken as a second or later class
    pub multiclass: bool,
}

impl ProficiencyGrant {
    pub fn fixed(subject: ProficiencySubject) -> Self {
        Self {
            category: subject.category(),
            subject: Some(subject),
            grants: true,
            is_choice: false,
            choice_group: None,
            quantity: None,
            level: None,
            multiclass: false,
        }
    }

    pub fn saving_throw(ability: Ability) -> Self {
        Self::fixed(ProficiencySubject::SavingThrow(ability))
    }

    pub fn option(group: &str, subject: ProficiencySubject) -> Self {
        Self {
            is_choice: true,
            choice_group: Some(group.to_string()),
            ..Self::fixed(subject)
        }
    }

    pub fn any_of(group: &str, category: ProficiencyCategory, quantity: u8) -> Self {
        Self {
            category,
            subject: None,
            grants: true,
            is_choice: true,
            choice_group: Some(group.to_string()),
            quantity: Some(quantity),
            level: None,
            multiclass: false,
        }
    }

    pub fn with_quantity(mut self, quantity: u8) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn on_multiclass(mut self) -> Self {
        self.multiclass = true;
        self
    }

    pub fn active_at(&self, level: u8) -> bool {
        self.level.map_or(true, |gate| level >= gate)
    }
}

// ============================================================================
// Language
// ============================================================================

/// A fixed language grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageGrant {
    pub language: Slug,
}

// ============================================================================
// Saving throw requirement
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveModifier {
    None,
    Advantage,
    Disadvantage,
}

/// A saving throw a spell, item or monster forces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingThrowRequirement {
    pub ability: Ability,
    pub dc: Option<u8>,
    /// Effect on a successful save ("half_damage", "negates")
    pub save_effect: Option<String>,
    /// Repeats at the end of each turn
    pub recurring: bool,
    pub save_modifier: SaveModifier,
}

impl SavingThrowRequirement {
    /// Natural key within one owner.
    pub fn unique_key(&self) -> (Ability, SaveModifier) {
        (self.ability, self.save_modifier)
    }
}

// ============================================================================
// Spell grant
// ============================================================================

/// A fixed spell, or a parametrized spell choice when `spell` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellGrant {
    pub spell: Option<Slug>,
    pub max_level: Option<u8>,
    pub school: Option<String>,
    /// Spell list (class slug) the pick must come from
    pub class_list: Option<Slug>,
    pub cantrip: bool,
    pub charges_min: Option<u8>,
    pub charges_max: Option<u8>,
    pub level: Option<u8>,
    pub choice_group: Option<String>,
    pub quantity: Option<u8>,
    /// Cast without a slot this many times per reset
    pub uses: Option<(UsesLimit, ResetTiming)>,
}

impl SpellGrant {
    pub fn fixed(spell: Slug) -> Self {
        Self {
            spell: Some(spell),
            max_level: None,
            school: None,
            class_list: None,
            cantrip: false,
            charges_min: None,
            charges_max: None,
            level: None,
            choice_group: None,
            quantity: None,
            uses: None,
        }
    }

    pub fn at_level(mut self, level: u8) -> Self {
        self.level = Some(level);
        self
    }

    pub fn limited(mut self, uses: UsesLimit, reset: ResetTiming) -> Self {
        self.uses = Some((uses, reset));
        self
    }

    pub fn active_at(&self, level: u8) -> bool {
        self.level.map_or(true, |gate| level >= gate)
    }

    pub fn is_choice(&self) -> bool {
        self.spell.is_none()
    }
}

// ============================================================================
// Prerequisite
// ============================================================================

/// What a single prerequisite row checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PrerequisiteTarget {
    /// The character has this entity (race, class, feat, skill, ...)
    Entity(EntityRef),
    AbilityScore { ability: Ability, minimum: i32 },
    Level { minimum: u8 },
    /// The character can cast at least one spell
    Spellcasting,
    /// Description only; cannot be checked mechanically
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prerequisite {
    /// Rows sharing a group are ANDed; groups are ORed
    pub group_id: u8,
    pub target: PrerequisiteTarget,
    pub description: Option<String>,
}

impl Prerequisite {
    pub fn entity(group_id: u8, kind: EntityKind, slug: Slug) -> Self {
        Self {
            group_id,
            target: PrerequisiteTarget::Entity(EntityRef::new(kind, slug)),
            description: None,
        }
    }

    pub fn ability(group_id: u8, ability: Ability, minimum: i32) -> Self {
        Self {
            group_id,
            target: PrerequisiteTarget::AbilityScore { ability, minimum },
            description: None,
        }
    }

    pub fn text(group_id: u8, description: impl Into<String>) -> Self {
        Self {
            group_id,
            target: PrerequisiteTarget::Text,
            description: Some(description.into()),
        }
    }

    /// Human-readable requirement line.
    pub fn describe(&self) -> String {
        if let Some(description) = &self.description {
            return description.clone();
        }
        match &self.target {
            PrerequisiteTarget::Entity(entity) => {
                format!("{} {}", entity.kind.as_str().replace('_', " "), entity.slug.base())
            }
            PrerequisiteTarget::AbilityScore { ability, minimum } => {
                format!("{} {} or higher", ability.display_name(), minimum)
            }
            PrerequisiteTarget::Level { minimum } => format!("level {} or higher", minimum),
            PrerequisiteTarget::Spellcasting => "the ability to cast at least one spell".into(),
            PrerequisiteTarget::Text => "unspecified requirement".into(),
        }
    }
}

// ============================================================================
// Traits, data tables, counters
// ============================================================================

/// Descriptive feature text, optionally a limited-use feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trait {
    pub name: String,
    pub category: Option<String>,
    pub description: String,
    pub level: Option<u8>,
    pub resets_on: Option<ResetTiming>,
    /// Name of a data table on the same owner that scales the uses by level
    pub data_table: Option<String>,
    pub sort_order: u32,
}

impl Trait {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            description: description.into(),
            level: None,
            resets_on: None,
            data_table: None,
            sort_order: 0,
        }
    }

    pub fn at_level(mut self, level: u8) -> Self {
        self.level = Some(level);
        self
    }

    pub fn resetting(mut self, timing: ResetTiming) -> Self {
        self.resets_on = Some(timing);
        self
    }

    pub fn scaled_by(mut self, table: impl Into<String>) -> Self {
        self.data_table = Some(table.into());
        self
    }

    pub fn active_at(&self, level: u8) -> bool {
        self.level.map_or(true, |gate| level >= gate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataTableType {
    Random,
    Damage,
    Modifier,
    Lookup,
    Progression,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTableEntry {
    pub roll_min: Option<u8>,
    pub roll_max: Option<u8>,
    pub result_text: String,
    pub level: Option<u8>,
    pub resource_cost: Option<u8>,
}

impl DataTableEntry {
    pub fn at_level(level: u8, result_text: impl Into<String>) -> Self {
        Self {
            roll_min: None,
            roll_max: None,
            result_text: result_text.into(),
            level: Some(level),
            resource_cost: None,
        }
    }

    /// Numeric reading of the result: plain integers, or "unlimited" as -1.
    pub fn numeric_value(&self) -> Option<i32> {
        let text = self.result_text.trim();
        if text.eq_ignore_ascii_case("unlimited") {
            return Some(crate::value_objects::UNLIMITED_USES);
        }
        text.trim_start_matches('+').parse().ok()
    }
}

/// Roll or lookup table (personality traits, uses-by-level, damage scaling).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTable {
    pub name: String,
    pub dice_type: Option<String>,
    pub table_type: DataTableType,
    pub entries: Vec<DataTableEntry>,
}

impl DataTable {
    pub fn progression(name: impl Into<String>, entries: Vec<DataTableEntry>) -> Self {
        Self {
            name: name.into(),
            dice_type: None,
            table_type: DataTableType::Progression,
            entries,
        }
    }

    /// Entry with the highest level gate not above `level`.
    pub fn entry_at_level(&self, level: u8) -> Option<&DataTableEntry> {
        self.entries
            .iter()
            .filter(|e| e.level.map_or(false, |gate| gate <= level))
            .max_by_key(|e| e.level)
    }

    /// Entry whose roll range contains `roll`.
    pub fn entry_for_roll(&self, roll: u8) -> Option<&DataTableEntry> {
        self.entries.iter().find(|e| match (e.roll_min, e.roll_max) {
            (Some(min), Some(max)) => (min..=max).contains(&roll),
            (Some(min), None) => roll == min,
            _ => false,
        })
    }
}

/// A resource track defined per level ("Rage" 2 uses at 1st, 3 at 3rd, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounter {
    pub counter_name: String,
    pub value: UsesLimit,
    pub level: u8,
    pub reset_timing: Option<ResetTiming>,
}

impl EntityCounter {
    pub fn new(name: impl Into<String>, level: u8, value: UsesLimit, reset: ResetTiming) -> Self {
        Self {
            counter_name: name.into(),
            value,
            level,
            reset_timing: Some(reset),
        }
    }
}

// ============================================================================
// Attachment (tagged union)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "attachment", rename_all = "snake_case")]
pub enum Attachment {
    Modifier(Modifier),
    Proficiency(ProficiencyGrant),
    Language(LanguageGrant),
    SavingThrow(SavingThrowRequirement),
    SpellGrant(SpellGrant),
    Prerequisite(Prerequisite),
    Choice(Choice),
    Trait(Trait),
    DataTable(DataTable),
    Counter(EntityCounter),
}

impl Attachment {
    pub fn kind(&self) -> AttachmentKind {
        match self {
            Attachment::Modifier(_) => AttachmentKind::Modifier,
            Attachment::Proficiency(_) => AttachmentKind::Proficiency,
            Attachment::Language(_) => AttachmentKind::Language,
            Attachment::SavingThrow(_) => AttachmentKind::SavingThrow,
            Attachment::SpellGrant(_) => AttachmentKind::SpellGrant,
            Attachment::Prerequisite(_) => AttachmentKind::Prerequisite,
            Attachment::Choice(_) => AttachmentKind::Choice,
            Attachment::Trait(_) => AttachmentKind::Trait,
            Attachment::DataTable(_) => AttachmentKind::DataTable,
            Attachment::Counter(_) => AttachmentKind::Counter,
        }
    }
}

macro_rules! impl_into_attachment {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Attachment {
                fn from(value: $ty) -> Self {
                    Attachment::$variant(value)
                }
            }
        )*
    };
}

impl_into_attachment!(
    Modifier => Modifier,
    Proficiency => ProficiencyGrant,
    Language => LanguageGrant,
    SavingThrow => SavingThrowRequirement,
    SpellGrant => SpellGrant,
    Prerequisite => Prerequisite,
    Choice => Choice,
    Trait => Trait,
    DataTable => DataTable,
    Counter => EntityCounter,
);
