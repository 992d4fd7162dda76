//! Character aggregate - a player character and every record it owns.
//!
//! # Ownership
//!
//! The aggregate owns its child collections outright. Build state (classes,
//! level history, base scores, feats and choice-driven rows) is the input to
//! resolution; derived rows (fixed grants, features, counters, slot maxima,
//! hit points) are rewritten by it. Runtime state (`used_slots`, counter
//! `current_uses`, current HP) survives every recompute.
//!
//! # Invariants
//!
//! Natural keys are unique, checked by [`Character::check_integrity`]:
//! - one class entry per class slug
//! - one spell row per spell slug
//! - one language row per language slug
//! - one slot row per `(level, slot_type)`
//! - one counter per `(source, name)`
//! - one selection per feat or optional feature

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::compendium::{EntityKind, EntityRef, MAX_LEVEL};
use crate::entities::{
    Alignment, CharacterAbilityScore, CharacterClass, CharacterCondition, CharacterCounter,
    CharacterEquipment, CharacterFeature, CharacterLanguage, CharacterNote, CharacterProficiency,
    CharacterSpell, CharacterSpellSlot, DeathSaves, EquipmentMode, FeatureSelection, HitPoints,
    LevelRecord, PreparationStatus, SlotType,
};
use crate::error::DomainError;
use crate::events::{CounterRestore, CounterUse, LevelUpOutcome, RestOutcome, SlotUse, SpellUse};
use crate::ids::CharacterId;
use crate::rules::RestType;
use crate::value_objects::{AbilityScores, CharacterName, Slug, UsesLimit};

/// A natural grant key, as persisted in a uniqueness index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GrantKey {
    pub kind: &'static str,
    pub key: String,
}

impl GrantKey {
    fn new(kind: &'static str, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
        }
    }
}

/// A player character.
///
/// # Example
///
/// ```
/// use sheetsmith_domain::aggregates::Character;
/// use sheetsmith_domain::value_objects::{AbilityScores, CharacterName, Slug};
///
/// let name = CharacterName::new("Sister Maren").unwrap();
/// let race = Slug::new("human").unwrap();
/// let cleric = Slug::new("cleric").unwrap();
/// let character = Character::new(name, race, None, AbilityScores::default(), cleric);
///
/// assert_eq!(character.total_level(), 1);
/// assert!(character.spell_slots().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    // Identity
    id: CharacterId,
    name: CharacterName,

    // Build inputs
    race: Slug,
    background: Option<Slug>,
    base_scores: AbilityScores,
    alignment: Alignment,
    equipment_mode: EquipmentMode,
    classes: Vec<CharacterClass>,
    level_history: Vec<LevelRecord>,

    // Vital state
    hit_points: HitPoints,
    death_saves: DeathSaves,

    // Grants
    #[serde(default)]
    ability_scores: Vec<CharacterAbilityScore>,
    #[serde(default)]
    proficiencies: Vec<CharacterProficiency>,
    #[serde(default)]
    languages: Vec<CharacterLanguage>,
    #[serde(default)]
    spells: Vec<CharacterSpell>,
    #[serde(default)]
    spell_slots: Vec<CharacterSpellSlot>,
    #[serde(default)]
    features: Vec<CharacterFeature>,
    #[serde(default)]
    feature_selections: Vec<FeatureSelection>,
    #[serde(default)]
    counters: Vec<CharacterCounter>,

    // Inventory and table notes
    #[serde(default)]
    equipment: Vec<CharacterEquipment>,
    #[serde(default)]
    conditions: Vec<CharacterCondition>,
    #[serde(default)]
    notes: Vec<CharacterNote>,

    updated_at: Option<DateTime<Utc>>,
}

impl Character {
    // =========================================================================
    // Constructor
    // =========================================================================

    /// Create a level-1 character in `first_class`.
    ///
    /// Nothing is derived yet; run a resolution to fill grants and hit points.
    pub fn new(
        name: CharacterName,
        race: Slug,
        background: Option<Slug>,
        base_scores: AbilityScores,
        first_class: Slug,
    ) -> Self {
        Self {
            id: CharacterId::new(),
            name,
            race,
            background,
            base_scores,
            alignment: Alignment::default(),
            equipment_mode: EquipmentMode::default(),
            classes: vec![CharacterClass::new(first_class.clone(), true)],
            level_history: vec![LevelRecord {
                class: first_class,
                hp_roll: None,
            }],
            hit_points: HitPoints::default(),
            death_saves: DeathSaves::default(),
            ability_scores: Vec::new(),
            proficiencies: Vec::new(),
            languages: Vec::new(),
            spells: Vec::new(),
            spell_slots: Vec::new(),
            features: Vec::new(),
            feature_selections: Vec::new(),
            counters: Vec::new(),
            equipment: Vec::new(),
            conditions: Vec::new(),
            notes: Vec::new(),
            updated_at: None,
        }
    }

    // =========================================================================
    // Identity Accessors (read-only)
    // =========================================================================

    #[inline]
    pub fn id(&self) -> CharacterId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &CharacterName {
        &self.name
    }

    #[inline]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    // =========================================================================
    // Build Accessors
    // =========================================================================

    #[inline]
    pub fn race(&self) -> &Slug {
        &self.race
    }

    #[inline]
    pub fn background(&self) -> Option<&Slug> {
        self.background.as_ref()
    }

    #[inline]
    pub fn base_scores(&self) -> &AbilityScores {
        &self.base_scores
    }

    #[inline]
    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    #[inline]
    pub fn equipment_mode(&self) -> EquipmentMode {
        self.equipment_mode
    }

    #[inline]
    pub fn classes(&self) -> &[CharacterClass] {
        &self.classes
    }

    #[inline]
    pub fn level_history(&self) -> &[LevelRecord] {
        &self.level_history
    }

    /// Sum of all class levels.
    pub fn total_level(&self) -> u8 {
        self.classes.iter().map(|c| c.level).sum()
    }

    pub fn primary_class(&self) -> Option<&CharacterClass> {
        self.classes.iter().find(|c| c.is_primary)
    }

    /// Class entry by slug, tolerating a missing source prefix.
    pub fn class_entry(&self, class: &Slug) -> Option<&CharacterClass> {
        self.classes.iter().find(|c| c.class.loosely_matches(class))
    }

    // =========================================================================
    // Vital Accessors
    // =========================================================================

    #[inline]
    pub fn hit_points(&self) -> &HitPoints {
        &self.hit_points
    }

    #[inline]
    pub fn death_saves(&self) -> &DeathSaves {
        &self.death_saves
    }

    // =========================================================================
    // Grant Accessors
    // =========================================================================

    #[inline]
    pub fn ability_scores(&self) -> &[CharacterAbilityScore] {
        &self.ability_scores
    }

    #[inline]
    pub fn proficiencies(&self) -> &[CharacterProficiency] {
        &self.proficiencies
    }

    #[inline]
    pub fn languages(&self) -> &[CharacterLanguage] {
        &self.languages
    }

    #[inline]
    pub fn spells(&self) -> &[CharacterSpell] {
        &self.spells
    }

    #[inline]
    /// The row for `spell`, matched loosely on its slug.
    pub fn spell(&self, spell: &Slug) -> Option<&CharacterSpell> {
        self.spells.iter().find(|s| s.spell.loosely_matches(spell))
    }

    pub fn spell_slots(&self) -> &[CharacterSpellSlot] {
        &self.spell_slots
    }

    #[inline]
    pub fn features(&self) -> &[CharacterFeature] {
        &self.features
    }

    #[inline]
    pub fn feature_selections(&self) -> &[FeatureSelection] {
        &self.feature_selections
    }

    #[inline]
    pub fn counters(&self) -> &[CharacterCounter] {
        &self.counters
    }

    #[inline]
    pub fn equipment(&self) -> &[CharacterEquipment] {
        &self.equipment
    }

    #[inline]
    pub fn conditions(&self) -> &[CharacterCondition] {
        &self.conditions
    }

    #[inline]
    pub fn notes(&self) -> &[CharacterNote] {
        &self.notes
    }

    /// Feats taken, in acquisition order.
    pub fn feats(&self) -> impl Iterator<Item = &EntityRef> + '_ {
        self.feature_selections
            .iter()
            .filter(|s| s.is_feat())
            .map(|s| &s.feature)
    }

    pub fn has_feat(&self, feat: &Slug) -> bool {
        self.feats().any(|f| f.slug.loosely_matches(feat))
    }

    /// Whether any row was produced by the `(source, group)` choice.
    pub fn has_choice_grants(&self, source: &EntityRef, group: &str) -> bool {
        self.ability_scores.iter().any(|r| r.provenance.is_from(source, group))
            || self.proficiencies.iter().any(|r| r.provenance.is_from(source, group))
            || self.languages.iter().any(|r| r.provenance.is_from(source, group))
            || self.spells.iter().any(|r| r.provenance.is_from(source, group))
            || self
                .equipment
                .iter()
                .any(|r| r.provenance.as_ref().is_some_and(|p| p.is_from(source, group)))
            || self
                .feature_selections
                .iter()
                .any(|r| r.provenance.as_ref().is_some_and(|p| p.is_from(source, group)))
    }

    // =========================================================================
    // Builder Methods
    // =========================================================================

    pub fn with_id(mut self, id: CharacterId) -> Self {
        self.id = id;
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_equipment_mode(mut self, mode: EquipmentMode) -> Self {
        self.equipment_mode = mode;
        self
    }

    // =========================================================================
    // Build Mutations
    // =========================================================================

    /// Gain one level in `class`, recording the hit-die roll if one was made.
    ///
    /// # Errors
    ///
    /// `DomainError::Constraint` when the character is already at `max_level`
    /// (capped at 20).
    pub fn add_class_level(
        &mut self,
        class: Slug,
        hp_roll: Option<u8>,
        max_level: u8,
    ) -> Result<LevelUpOutcome, DomainError> {
        let cap = max_level.min(MAX_LEVEL);
        if self.total_level() >= cap {
            return Err(DomainError::constraint(format!(
                "character is already at the maximum level {}",
                cap
            )));
        }

        let outcome = match self.classes.iter_mut().find(|c| c.class.loosely_matches(&class)) {
            Some(entry) => {
                entry.level += 1;
                let class_level = entry.level;
                self.level_history.push(LevelRecord {
                    class: entry.class.clone(),
                    hp_roll,
                });
                LevelUpOutcome::Leveled {
                    class: class.clone(),
                    class_level,
                    total_level: 0,
                }
            }
            None => {
                self.classes.push(CharacterClass::new(class.clone(), false));
                self.level_history.push(LevelRecord {
                    class: class.clone(),
                    hp_roll,
                });
                LevelUpOutcome::Multiclassed {
                    class,
                    total_level: 0,
                }
            }
        };

        let total = self.total_level();
        Ok(match outcome {
            LevelUpOutcome::Leveled {
                class, class_level, ..
            } => LevelUpOutcome::Leveled {
                class,
                class_level,
                total_level: total,
            },
            LevelUpOutcome::Multiclassed { class, .. } => LevelUpOutcome::Multiclassed {
                class,
                total_level: total,
            },
        })
    }

    /// Pick the subclass of one of the character's classes.
    ///
    /// # Errors
    ///
    /// `DomainError::NotFound` when the character has no levels in `class`.
    pub fn set_subclass(&mut self, class: &Slug, subclass: Slug) -> Result<(), DomainError> {
        let entry = self
            .classes
            .iter_mut()
            .find(|c| c.class.loosely_matches(class))
            .ok_or_else(|| DomainError::not_found("character class", class.to_string()))?;
        entry.subclass = Some(subclass);
        Ok(())
    }

    pub fn set_base_scores(&mut self, scores: AbilityScores) -> Result<(), DomainError> {
        scores.validate()?;
        self.base_scores = scores;
        Ok(())
    }

    pub fn add_note(&mut self, category: impl Into<String>, text: impl Into<String>) {
        self.notes.push(CharacterNote {
            category: category.into(),
            text: text.into(),
        });
    }

    /// Apply a condition; an existing one of the same slug is replaced.
    pub fn apply_condition(&mut self, condition: CharacterCondition) {
        self.conditions
            .retain(|c| !c.condition.loosely_matches(&condition.condition));
        self.conditions.push(condition);
    }

    pub fn remove_condition(&mut self, condition: &Slug) -> bool {
        let before = self.conditions.len();
        self.conditions.retain(|c| !c.condition.loosely_matches(condition));
        self.conditions.len() != before
    }

    /// Add carried equipment outside any choice group.
    pub fn add_equipment(&mut self, item: Slug, quantity: u32) {
        match self
            .equipment
            .iter_mut()
            .find(|e| e.provenance.is_none() && e.item.loosely_matches(&item))
        {
            Some(existing) => existing.quantity += quantity,
            None => self.equipment.push(CharacterEquipment {
                item,
                quantity,
                equipped: false,
                provenance: None,
            }),
        }
    }

    // =========================================================================
    // Resolution Writes (crate-internal)
    // =========================================================================

    pub(crate) fn restore_build(&mut self, classes: Vec<CharacterClass>, history: Vec<LevelRecord>) {
        self.classes = classes;
        self.level_history = history;
    }

    pub(crate) fn restore_vitals(&mut self, hit_points: HitPoints, death_saves: DeathSaves) {
        self.hit_points = hit_points;
        self.death_saves = death_saves;
    }

    pub(crate) fn set_class_hit_die(&mut self, class: &Slug, hit_die: u8) {
        if let Some(entry) = self.classes.iter_mut().find(|c| c.class.loosely_matches(class)) {
            entry.hit_die = hit_die;
        }
    }

    pub(crate) fn set_max_hit_points(&mut self, max: i32) {
        self.hit_points.set_max(max);
    }

    pub(crate) fn replace_ability_scores(&mut self, rows: Vec<CharacterAbilityScore>) {
        self.ability_scores = rows;
    }

    pub(crate) fn replace_proficiencies(&mut self, rows: Vec<CharacterProficiency>) {
        self.proficiencies = rows;
    }

    pub(crate) fn replace_languages(&mut self, rows: Vec<CharacterLanguage>) {
        self.languages = rows;
    }

    pub(crate) fn replace_spells(&mut self, rows: Vec<CharacterSpell>) {
        self.spells = rows;
    }

    pub(crate) fn replace_spell_slots(&mut self, rows: Vec<CharacterSpellSlot>) {
        self.spell_slots = rows;
    }

    pub(crate) fn replace_features(&mut self, rows: Vec<CharacterFeature>) {
        self.features = rows;
    }

    pub(crate) fn replace_feature_selections(&mut self, rows: Vec<FeatureSelection>) {
        self.feature_selections = rows;
    }

    pub(crate) fn replace_counters(&mut self, rows: Vec<CharacterCounter>) {
        self.counters = rows;
    }

    pub(crate) fn replace_equipment(&mut self, rows: Vec<CharacterEquipment>) {
        self.equipment = rows;
    }

    // =========================================================================
    // Spell List (crate-internal, checked by the builder)
    // =========================================================================

    pub(crate) fn add_spell(&mut self, row: CharacterSpell) -> Result<(), DomainError> {
        if self.spell(&row.spell).is_some() {
            return Err(DomainError::constraint(format!(
                "spell '{}' is already on character {}",
                row.spell, self.id
            )));
        }
        self.spells.push(row);
        Ok(())
    }

    pub(crate) fn remove_spell(&mut self, spell: &Slug) -> Option<CharacterSpell> {
        let index = self.spells.iter().position(|s| s.spell.loosely_matches(spell))?;
        Some(self.spells.remove(index))
    }

    pub(crate) fn set_spell_status(&mut self, spell: &Slug, status: PreparationStatus) -> bool {
        match self.spells.iter_mut().find(|s| s.spell.loosely_matches(spell)) {
            Some(row) => {
                row.status = status;
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Resource Mutations
    // =========================================================================

    /// Spend one use of the named counter.
    ///
    /// When `source` is `None` the name must be unique across sources.
    pub fn use_counter(
        &mut self,
        name: &str,
        source: Option<&EntityRef>,
    ) -> Result<CounterUse, DomainError> {
        let counter = self.counter_mut(name, source)?;
        Ok(match counter.max_uses {
            UsesLimit::Unlimited => CounterUse::Unlimited,
            UsesLimit::Limited(_) if counter.current_uses == 0 => CounterUse::Exhausted,
            UsesLimit::Limited(_) => {
                counter.current_uses -= 1;
                CounterUse::Used {
                    remaining: counter.current_uses,
                }
            }
        })
    }

    /// Restore `amount` uses (all when `None`), capped at the maximum.
    pub fn restore_counter(
        &mut self,
        name: &str,
        source: Option<&EntityRef>,
        amount: Option<u32>,
    ) -> Result<CounterRestore, DomainError> {
        let counter = self.counter_mut(name, source)?;
        let UsesLimit::Limited(max) = counter.max_uses else {
            return Ok(CounterRestore::Unlimited);
        };
        if counter.current_uses >= max {
            return Ok(CounterRestore::AlreadyFull);
        }
        let restored = match amount {
            Some(n) => counter.current_uses.saturating_add(n).min(max),
            None => max,
        };
        counter.current_uses = restored;
        Ok(CounterRestore::Restored { current: restored })
    }

    fn counter_mut(
        &mut self,
        name: &str,
        source: Option<&EntityRef>,
    ) -> Result<&mut CharacterCounter, DomainError> {
        let matches: Vec<usize> = self
            .counters
            .iter()
            .enumerate()
            .filter(|(_, c)| c.name.eq_ignore_ascii_case(name))
            .filter(|(_, c)| source.map_or(true, |s| c.source.refers_to(s)))
            .map(|(i, _)| i)
            .collect();
        match matches.as_slice() {
            [index] => Ok(&mut self.counters[*index]),
            [] => Err(DomainError::not_found("counter", name.to_string())),
            _ => Err(DomainError::validation(format!(
                "counter '{}' exists on several sources; name the source",
                name
            ))),
        }
    }

    /// Expend a slot of `level`.
    ///
    /// With no explicit `slot_type`, a standard slot is preferred and a pact
    /// slot of the same level is used when no standard one remains.
    pub fn use_spell_slot(
        &mut self,
        level: u8,
        slot_type: Option<SlotType>,
    ) -> Result<SlotUse, DomainError> {
        let candidates: Vec<SlotType> = match slot_type {
            Some(t) => vec![t],
            None => vec![SlotType::Standard, SlotType::Pact],
        };
        let mut found_row = false;
        for wanted in candidates {
            if let Some(row) = self
                .spell_slots
                .iter_mut()
                .find(|r| r.level == level && r.slot_type == wanted)
            {
                found_row = true;
                if row.available() > 0 {
                    row.used_slots += 1;
                    return Ok(SlotUse::Used {
                        level,
                        slot_type: wanted,
                        remaining: row.available(),
                    });
                }
            }
        }
        if found_row {
            Ok(SlotUse::NoSlotsRemaining)
        } else {
            Err(DomainError::not_found("spell slot", format!("level {}", level)))
        }
    }

    /// Cast `spell` through its own limited uses instead of a slot.
    ///
    /// # Errors
    ///
    /// `NotFound` when the character lacks the spell, `Validation` when the
    /// row has no per-spell uses.
    pub fn use_spell(&mut self, spell: &Slug) -> Result<SpellUse, DomainError> {
        let row = self
            .spells
            .iter_mut()
            .find(|s| s.spell.loosely_matches(spell))
            .ok_or_else(|| DomainError::not_found("spell", spell.to_string()))?;
        let Some(uses) = row.uses.as_mut() else {
            return Err(DomainError::validation(format!(
                "spell '{}' has no limited uses; cast it with a slot",
                row.spell
            )));
        };
        Ok(match uses.max_uses {
            UsesLimit::Unlimited => SpellUse::Unlimited,
            UsesLimit::Limited(max) if uses.used >= max => SpellUse::Exhausted,
            UsesLimit::Limited(max) => {
                uses.used += 1;
                SpellUse::Used {
                    remaining: max - uses.used,
                }
            }
        })
    }

    /// Apply a short or long rest.
    ///
    /// Counters refill by their reset timing. Pact slots recover on any rest,
    /// standard slots on a long rest. A long rest also restores hit points and
    /// half the character's hit dice (minimum one).
    pub fn take_rest(&mut self, rest: RestType) -> RestOutcome {
        let mut outcome = RestOutcome::default();

        for counter in &mut self.counters {
            let refills = counter.reset_timing.is_some_and(|t| t.refills_on(rest));
            if let (true, UsesLimit::Limited(max)) = (refills, counter.max_uses) {
                if counter.current_uses < max {
                    counter.current_uses = max;
                    outcome.counters_reset.push(counter.name.clone());
                }
            }
        }

        for slot in &mut self.spell_slots {
            let recovers = rest == RestType::Long || slot.slot_type == SlotType::Pact;
            if recovers && slot.used_slots > 0 {
                outcome.slots_restored += u32::from(slot.used_slots);
                slot.used_slots = 0;
            }
        }

        for spell in &mut self.spells {
            if let Some(uses) = spell.uses.as_mut() {
                if uses.used > 0 && uses.reset_timing.refills_on(rest) {
                    uses.used = 0;
                    outcome.spell_uses_reset += 1;
                }
            }
        }

        if rest == RestType::Long {
            let mut budget = (self.total_level() / 2).max(1);
            for class in &mut self.classes {
                let recovered = class.hit_dice_spent.min(budget);
                class.hit_dice_spent -= recovered;
                budget -= recovered;
                outcome.hit_dice_recovered += recovered;
            }

            let before = self.hit_points.current();
            self.hit_points.current = Some(self.hit_points.max);
            self.hit_points.temporary = 0;
            self.death_saves = DeathSaves::default();
            outcome.hit_points_restored = self.hit_points.max - before;
        }

        outcome
    }

    /// Spend one hit die of `class` during a short rest.
    pub fn spend_hit_die(&mut self, class: &Slug) -> Result<u8, DomainError> {
        let entry = self
            .classes
            .iter_mut()
            .find(|c| c.class.loosely_matches(class))
            .ok_or_else(|| DomainError::not_found("character class", class.to_string()))?;
        if entry.hit_dice_remaining() == 0 {
            return Err(DomainError::constraint(format!(
                "no {} hit dice remaining",
                entry.class
            )));
        }
        entry.hit_dice_spent += 1;
        Ok(entry.hit_dice_remaining())
    }

    /// Lose hit points, temporary ones first. Current HP does not go below 0.
    pub fn take_damage(&mut self, amount: u32) {
        let amount = i32::try_from(amount).unwrap_or(i32::MAX);
        let absorbed = amount.min(self.hit_points.temporary);
        self.hit_points.temporary -= absorbed;
        let current = self.hit_points.current();
        self.hit_points.current = Some(current.saturating_sub(amount - absorbed).max(0));
    }

    /// Set temporary hit points. A lower value than the current pool is ignored.
    pub fn set_temporary_hit_points(&mut self, amount: u32) {
        let amount = i32::try_from(amount).unwrap_or(i32::MAX);
        self.hit_points.temporary = self.hit_points.temporary.max(amount);
    }

    /// Regain up to `amount` hit points, capped at the maximum.
    ///
    /// Returns the hit points actually regained.
    pub fn heal(&mut self, amount: u32) -> i32 {
        let before = self.hit_points.current();
        let gained = i32::try_from(amount).unwrap_or(i32::MAX);
        let after = before.saturating_add(gained).min(self.hit_points.max).max(before);
        self.hit_points.current = Some(after);
        after - before
    }

    // =========================================================================
    // Persistence Support
    // =========================================================================

    /// Stamp the save time.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(now);
    }

    /// Every natural grant key, for a store's uniqueness index.
    pub fn grant_keys(&self) -> Vec<GrantKey> {
        let mut keys = Vec::new();
        keys.extend(self.classes.iter().map(|c| GrantKey::new("class", c.class.base())));
        keys.extend(self.spells.iter().map(|s| GrantKey::new("spell", s.spell.base())));
        keys.extend(
            self.languages
                .iter()
                .map(|l| GrantKey::new("language", l.language.base())),
        );
        keys.extend(self.spell_slots.iter().map(|s| {
            GrantKey::new("spell_slot", format!("{}:{}", s.slot_type, s.level))
        }));
        keys.extend(self.counters.iter().map(|c| {
            GrantKey::new(
                "counter",
                format!("{}:{}:{}", c.source.kind, c.source.slug.base(), c.name.to_lowercase()),
            )
        }));
        keys.extend(self.feature_selections.iter().map(|s| {
            GrantKey::new(
                "feature_selection",
                format!("{}:{}", s.feature.kind, s.feature.slug.base()),
            )
        }));
        keys
    }

    /// Verify natural-key uniqueness across the child collections.
    ///
    /// # Errors
    ///
    /// `DomainError::Constraint` naming the first duplicated key.
    pub fn check_integrity(&self) -> Result<(), DomainError> {
        let mut seen: HashSet<GrantKey> = HashSet::new();
        for key in self.grant_keys() {
            if !seen.insert(key.clone()) {
                return Err(DomainError::constraint(format!(
                    "duplicate {} '{}' on character {}",
                    key.kind, key.key, self.id
                )));
            }
        }
        if self.classes.iter().filter(|c| c.is_primary).count() != 1 {
            return Err(DomainError::constraint(format!(
                "character {} must have exactly one primary class",
                self.id
            )));
        }
        Ok(())
    }

    /// Distinct slugs of a given kind this character refers to, for reference
    /// validation after a reseed.
    pub fn referenced(&self) -> Vec<EntityRef> {
        let mut refs: Vec<EntityRef> = Vec::new();
        let mut push = |kind: EntityKind, slug: &Slug| {
            let r = EntityRef::new(kind, slug.clone());
            if !refs.contains(&r) {
                refs.push(r);
            }
        };
        push(EntityKind::Race, &self.race);
        if let Some(background) = &self.background {
            push(EntityKind::Background, background);
        }
        for class in &self.classes {
            push(EntityKind::Class, &class.class);
            if let Some(subclass) = &class.subclass {
                push(EntityKind::Class, subclass);
            }
        }
        for spell in &self.spells {
            push(EntityKind::Spell, &spell.spell);
        }
        for language in &self.languages {
            push(EntityKind::Language, &language.language);
        }
        for selection in &self.feature_selections {
            push(selection.feature.kind, &selection.feature.slug);
        }
        for item in &self.equipment {
            push(EntityKind::Item, &item.item);
        }
        for condition in &self.conditions {
            push(EntityKind::Condition, &condition.condition);
        }
        for proficiency in &self.proficiencies {
            if let Some(slug) = proficiency.subject.slug() {
                let kind = proficiency
                    .subject
                    .category()
                    .target_kind()
                    .unwrap_or(EntityKind::ProficiencyType);
                push(kind, slug);
            }
        }
        refs
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Provenance, SpellUses};
    use crate::value_objects::ResetTiming;

    fn slug(s: &str) -> Slug {
        Slug::new(s).unwrap()
    }

    fn create_test_character() -> Character {
        Character::new(
            CharacterName::new("Test Hero").unwrap(),
            slug("human"),
            Some(slug("acolyte")),
            AbilityScores::default(),
            slug("cleric"),
        )
    }

    fn counter(name: &str, current: u32, max: UsesLimit, reset: ResetTiming) -> CharacterCounter {
        CharacterCounter {
            source: EntityRef::new(EntityKind::Class, slug("barbarian")),
            name: name.into(),
            current_uses: current,
            max_uses: max,
            reset_timing: Some(reset),
        }
    }

    mod constructor {
        use super::*;

        #[test]
        fn new_character_is_level_one_in_its_first_class() {
            let character = create_test_character();
            assert_eq!(character.total_level(), 1);
            assert_eq!(character.level_history().len(), 1);
            assert!(character.primary_class().is_some());
            assert!(character.check_integrity().is_ok());
        }
    }

    mod levels {
        use super::*;

        #[test]
        fn level_up_existing_class() {
            let mut character = create_test_character();
            let outcome = character.add_class_level(slug("cleric"), Some(6), 20).unwrap();
            assert_eq!(
                outcome,
                LevelUpOutcome::Leveled {
                    class: slug("cleric"),
                    class_level: 2,
                    total_level: 2
                }
            );
            assert_eq!(character.level_history()[1].hp_roll, Some(6));
        }

        #[test]
        fn multiclass_adds_non_primary_entry() {
            let mut character = create_test_character();
            let outcome = character.add_class_level(slug("wizard"), None, 20).unwrap();
            assert!(matches!(outcome, LevelUpOutcome::Multiclassed { total_level: 2, .. }));
            let wizard = character.class_entry(&slug("wizard")).unwrap();
            assert!(!wizard.is_primary);
        }

        #[test]
        fn max_level_is_enforced() {
            let mut character = create_test_character();
            character.add_class_level(slug("cleric"), None, 2).unwrap();
            assert!(matches!(
                character.add_class_level(slug("cleric"), None, 2),
                Err(DomainError::Constraint(_))
            ));
        }

        #[test]
        fn subclass_requires_class_entry() {
            let mut character = create_test_character();
            assert!(character.set_subclass(&slug("wizard"), slug("evocation")).is_err());
            character.set_subclass(&slug("cleric"), slug("life-domain")).unwrap();
            assert_eq!(character.classes()[0].subclass, Some(slug("life-domain")));
        }
    }

    mod resources {
        use super::*;

        #[test]
        fn unlimited_counter_is_never_decremented() {
            let mut character = create_test_character();
            character.replace_counters(vec![counter(
                "Rage",
                0,
                UsesLimit::Unlimited,
                ResetTiming::LongRest,
            )]);
            assert_eq!(character.use_counter("Rage", None).unwrap(), CounterUse::Unlimited);
            assert_eq!(character.counters()[0].current_uses, 0);
        }

        #[test]
        fn limited_counter_decrements_to_zero_then_exhausts() {
            let mut character = create_test_character();
            character.replace_counters(vec![counter(
                "Rage",
                1,
                UsesLimit::Limited(2),
                ResetTiming::LongRest,
            )]);
            assert_eq!(
                character.use_counter("rage", None).unwrap(),
                CounterUse::Used { remaining: 0 }
            );
            assert_eq!(character.use_counter("rage", None).unwrap(), CounterUse::Exhausted);
            assert!(character.use_counter("Ki", None).is_err());
        }

        #[test]
        fn restore_counter_caps_at_max() {
            let mut character = create_test_character();
            character.replace_counters(vec![counter(
                "Rage",
                0,
                UsesLimit::Limited(3),
                ResetTiming::LongRest,
            )]);
            assert_eq!(
                character.restore_counter("Rage", None, Some(5)).unwrap(),
                CounterRestore::Restored { current: 3 }
            );
            assert_eq!(
                character.restore_counter("Rage", None, None).unwrap(),
                CounterRestore::AlreadyFull
            );
        }

        #[test]
        fn slot_use_prefers_standard_then_pact() {
            let mut character = create_test_character();
            character.replace_spell_slots(vec![
                CharacterSpellSlot::new(1, SlotType::Standard, 1),
                CharacterSpellSlot::new(1, SlotType::Pact, 1),
            ]);
            assert!(matches!(
                character.use_spell_slot(1, None).unwrap(),
                SlotUse::Used { slot_type: SlotType::Standard, .. }
            ));
            assert!(matches!(
                character.use_spell_slot(1, None).unwrap(),
                SlotUse::Used { slot_type: SlotType::Pact, .. }
            ));
            assert_eq!(character.use_spell_slot(1, None).unwrap(), SlotUse::NoSlotsRemaining);
            assert!(character.use_spell_slot(3, None).is_err());
        }

        fn limited_spell(spell: &str, max: UsesLimit, used: u32) -> CharacterSpell {
            CharacterSpell {
                spell: slug(spell),
                class: None,
                status: PreparationStatus::AlwaysPrepared,
                uses: Some(SpellUses {
                    max_uses: max,
                    used,
                    reset_timing: ResetTiming::LongRest,
                }),
                provenance: Provenance::fixed(EntityRef::new(EntityKind::Feat, slug("fey-touched"))),
            }
        }

        #[test]
        fn spell_uses_spend_until_exhausted() {
            let mut character = create_test_character();
            character.replace_spells(vec![
                limited_spell("tce:misty-step", UsesLimit::Limited(2), 0),
                limited_spell("detect-magic", UsesLimit::Unlimited, 0),
            ]);

            assert_eq!(
                character.use_spell(&slug("misty-step")).unwrap(),
                SpellUse::Used { remaining: 1 }
            );
            assert_eq!(
                character.use_spell(&slug("misty-step")).unwrap(),
                SpellUse::Used { remaining: 0 }
            );
            assert_eq!(character.use_spell(&slug("misty-step")).unwrap(), SpellUse::Exhausted);
            assert_eq!(character.spell(&slug("misty-step")).unwrap().uses.unwrap().used, 2);

            assert_eq!(character.use_spell(&slug("detect-magic")).unwrap(), SpellUse::Unlimited);
        }

        #[test]
        fn spell_without_uses_needs_a_slot() {
            let mut character = create_test_character();
            character.replace_spells(vec![CharacterSpell {
                uses: None,
                ..limited_spell("bless", UsesLimit::Limited(1), 0)
            }]);
            assert!(matches!(
                character.use_spell(&slug("bless")),
                Err(DomainError::Validation(_))
            ));
            assert!(matches!(
                character.use_spell(&slug("shield")),
                Err(DomainError::NotFound { .. })
            ));
        }

        #[test]
        fn short_rest_recovers_pact_slots_and_short_counters() {
            let mut character = create_test_character();
            character.replace_spell_slots(vec![
                CharacterSpellSlot {
                    used_slots: 2,
                    ..CharacterSpellSlot::new(1, SlotType::Standard, 2)
                },
                CharacterSpellSlot {
                    used_slots: 1,
                    ..CharacterSpellSlot::new(2, SlotType::Pact, 2)
                },
            ]);
            character.replace_counters(vec![
                counter("Second Wind", 0, UsesLimit::Limited(1), ResetTiming::ShortRest),
                counter("Rage", 0, UsesLimit::Limited(2), ResetTiming::LongRest),
            ]);

            let outcome = character.take_rest(RestType::Short);
            assert_eq!(outcome.counters_reset, vec!["Second Wind".to_string()]);
            assert_eq!(outcome.slots_restored, 1);
            assert_eq!(character.spell_slots()[0].used_slots, 2);
            assert_eq!(character.spell_slots()[1].used_slots, 0);
        }

        #[test]
        fn long_rest_restores_everything_and_half_hit_dice() {
            let mut character = create_test_character();
            for _ in 0..3 {
                character.add_class_level(slug("cleric"), None, 20).unwrap();
            }
            for _ in 0..4 {
                character.spend_hit_die(&slug("cleric")).unwrap();
            }
            assert!(character.spend_hit_die(&slug("cleric")).is_err());

            character.replace_spells(vec![CharacterSpell {
                spell: slug("misty-step"),
                class: None,
                status: PreparationStatus::AlwaysPrepared,
                uses: Some(SpellUses {
                    max_uses: UsesLimit::Limited(1),
                    used: 1,
                    reset_timing: ResetTiming::LongRest,
                }),
                provenance: Provenance::fixed(EntityRef::new(EntityKind::Race, slug("fey"))),
            }]);
            character.set_max_hit_points(30);
            character.hit_points.current = Some(4);

            let outcome = character.take_rest(RestType::Long);
            assert_eq!(outcome.hit_dice_recovered, 2);
            assert_eq!(outcome.spell_uses_reset, 1);
            assert_eq!(outcome.hit_points_restored, 26);
            assert_eq!(character.classes()[0].hit_dice_spent, 2);
        }

        #[test]
        fn damage_spends_temporary_hit_points_first() {
            let mut character = create_test_character();
            character.set_max_hit_points(20);
            character.hit_points.temporary = 5;

            character.take_damage(8);
            assert_eq!(character.hit_points().temporary, 0);
            assert_eq!(character.hit_points().current(), 17);

            character.take_damage(40);
            assert_eq!(character.hit_points().current(), 0);

            assert_eq!(character.heal(12), 12);
            assert_eq!(character.heal(12), 8);
            assert_eq!(character.hit_points().current(), 20);
        }
    }

    mod integrity {
        use super::*;

        #[test]
        fn duplicate_counter_key_is_rejected() {
            let mut character = create_test_character();
            let rage = counter("Rage", 2, UsesLimit::Limited(2), ResetTiming::LongRest);
            character.replace_counters(vec![rage.clone(), rage]);
            assert!(matches!(
                character.check_integrity(),
                Err(DomainError::Constraint(_))
            ));
        }

        #[test]
        fn duplicate_slot_row_is_rejected() {
            let mut character = create_test_character();
            character.replace_spell_slots(vec![
                CharacterSpellSlot::new(1, SlotType::Standard, 2),
                CharacterSpellSlot::new(1, SlotType::Standard, 3),
            ]);
            assert!(character.check_integrity().is_err());
        }

        #[test]
        fn serde_round_trip_preserves_state() {
            let mut character = create_test_character();
            character.add_note("backstory", "Raised in the temple");
            let json = serde_json::to_string(&character).unwrap();
            let back: Character = serde_json::from_str(&json).unwrap();
            assert_eq!(back, character);
        }
    }
}
