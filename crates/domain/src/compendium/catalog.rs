//! Immutable in-memory compendium.
//!
//! A [`Catalog`] is assembled once through [`CatalogBuilder`], which assigns
//! internal keys and enforces the data invariants of the rules graph. After
//! `build()` nothing mutates, so a shared `Arc<Catalog>` is a consistent
//! snapshot for any number of concurrent resolutions.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use super::attachments::{Attachment, ModifierCategory, SaveModifier};
use super::choice::{Choice, ChoiceGroup};
use super::entities::Entity;
use super::kind::{AttachmentKind, AttachmentTarget, EntityKind};
use super::progression::ProgressionRow;
use super::repository::{CompendiumError, CompendiumRepository};
use crate::error::DomainError;
use crate::ids::CompendiumKey;
use crate::value_objects::{Ability, Slug};

// ============================================================================
// Catalog
// ============================================================================

#[derive(Debug, Default)]
pub struct Catalog {
    entities: HashMap<AttachmentTarget, Entity>,
    /// Exact slug index
    by_slug: HashMap<(EntityKind, Slug), CompendiumKey>,
    /// Slug body index, for unprefixed lookups
    by_base: HashMap<(EntityKind, String), Vec<CompendiumKey>>,
    /// Entities per kind in insertion order
    ordered: BTreeMap<EntityKind, Vec<CompendiumKey>>,
    attachments: HashMap<(AttachmentTarget, AttachmentKind), Vec<Attachment>>,
    progression: HashMap<CompendiumKey, BTreeMap<u8, ProgressionRow>>,
    /// class key -> spell keys
    class_spells: BTreeSet<(CompendiumKey, CompendiumKey)>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn resolve_key(&self, kind: EntityKind, slug: &Slug) -> Result<CompendiumKey, CompendiumError> {
        if let Some(key) = self.by_slug.get(&(kind, slug.clone())) {
            return Ok(*key);
        }

        let candidates: Vec<CompendiumKey> = self
            .by_base
            .get(&(kind, slug.base().to_string()))
            .map(|keys| {
                keys.iter()
                    .copied()
                    .filter(|key| {
                        self.entities
                            .get(&AttachmentTarget::new(kind, *key))
                            .is_some_and(|e| e.slug().loosely_matches(slug))
                    })
                    .collect()
            })
            .unwrap_or_default();

        match candidates.as_slice() {
            [key] => Ok(*key),
            [] => Err(CompendiumError::not_found(kind, slug)),
            many => Err(CompendiumError::Ambiguous {
                kind,
                slug: slug.to_string(),
                candidates: many
                    .iter()
                    .filter_map(|key| self.entities.get(&AttachmentTarget::new(kind, *key)))
                    .map(|e| e.slug().to_string())
                    .collect(),
            }),
        }
    }
}

impl CompendiumRepository for Catalog {
    fn entity(&self, kind: EntityKind, slug: &Slug) -> Result<Entity, CompendiumError> {
        let key = self.resolve_key(kind, slug)?;
        self.entities
            .get(&AttachmentTarget::new(kind, key))
            .cloned()
            .ok_or_else(|| CompendiumError::not_found(kind, slug))
    }

    fn entity_by_target(&self, target: AttachmentTarget) -> Option<Entity> {
        self.entities.get(&target).cloned()
    }

    fn attachments(&self, target: AttachmentTarget, kind: AttachmentKind) -> Vec<Attachment> {
        self.attachments
            .get(&(target, kind))
            .cloned()
            .unwrap_or_default()
    }

    fn progression(&self, class: &Slug, level: u8) -> Option<ProgressionRow> {
        let key = self.resolve_key(EntityKind::Class, class).ok()?;
        self.progression.get(&key)?.get(&level).cloned()
    }

    fn list(&self, kind: EntityKind) -> Vec<Entity> {
        self.ordered
            .get(&kind)
            .map(|keys| {
                keys.iter()
                    .filter_map(|key| self.entities.get(&AttachmentTarget::new(kind, *key)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn spell_lists(&self, spell: &Slug) -> Vec<Slug> {
        let Ok(spell_key) = self.resolve_key(EntityKind::Spell, spell) else {
            return Vec::new();
        };
        self.class_spells
            .iter()
            .filter(|(_, s)| *s == spell_key)
            .filter_map(|(class, _)| {
                self.entities
                    .get(&AttachmentTarget::new(EntityKind::Class, *class))
                    .map(|e| e.slug().clone())
            })
            .collect()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Assembles a [`Catalog`].
///
/// Keys are assigned sequentially from `key_offset + 1`. Two catalogs built
/// from the same content with different offsets differ only in internal keys,
/// which is how a reseed of the static content looks to characters.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    next_key: u64,
    catalog: Catalog,
    pending_progression: Vec<(Slug, ProgressionRow)>,
    pending_class_spells: Vec<(Slug, Slug)>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key_offset(mut self, offset: u64) -> Self {
        self.next_key = offset;
        self
    }

    /// Register an entity and return its attachment address.
    ///
    /// # Errors
    ///
    /// `DomainError::Constraint` when the same kind already has this slug.
    pub fn add(&mut self, entity: impl Into<Entity>) -> Result<AttachmentTarget, DomainError> {
        let mut entity = entity.into();
        let kind = entity.kind();
        let slug = entity.slug().clone();
        if self.catalog.by_slug.contains_key(&(kind, slug.clone())) {
            return Err(DomainError::constraint(format!(
                "duplicate {} slug '{}'",
                kind, slug
            )));
        }

        self.next_key += 1;
        let key = CompendiumKey::new(self.next_key);
        entity.set_key(key);
        let target = AttachmentTarget::new(kind, key);

        self.catalog.by_slug.insert((kind, slug.clone()), key);
        self.catalog
            .by_base
            .entry((kind, slug.base().to_string()))
            .or_default()
            .push(key);
        self.catalog.ordered.entry(kind).or_default().push(key);
        self.catalog.entities.insert(target, entity);
        Ok(target)
    }

    /// Hang an attachment row off a registered entity.
    pub fn attach(
        &mut self,
        target: AttachmentTarget,
        attachment: impl Into<Attachment>,
    ) -> Result<&mut Self, DomainError> {
        if !self.catalog.entities.contains_key(&target) {
            return Err(DomainError::not_found("attachment target", target.to_string()));
        }
        let attachment = attachment.into();
        self.catalog
            .attachments
            .entry((target, attachment.kind()))
            .or_default()
            .push(attachment);
        Ok(self)
    }

    /// Attach several rows at once.
    pub fn attach_all<A: Into<Attachment>>(
        &mut self,
        target: AttachmentTarget,
        rows: impl IntoIterator<Item = A>,
    ) -> Result<&mut Self, DomainError> {
        for row in rows {
            self.attach(target, row)?;
        }
        Ok(self)
    }

    /// Progression rows are bound to their class at `build()`.
    pub fn progression(&mut self, class: Slug, row: ProgressionRow) -> &mut Self {
        self.pending_progression.push((class, row));
        self
    }

    pub fn class_spell(&mut self, class: Slug, spell: Slug) -> &mut Self {
        self.pending_class_spells.push((class, spell));
        self
    }

    /// Validate the graph and freeze it.
    ///
    /// # Errors
    ///
    /// `DomainError::Constraint` or `DomainError::NotFound` when:
    /// - a subrace or subclass names a parent that does not exist;
    /// - rows of one choice group disagree on type or quantity;
    /// - an entity carries two saving-throw requirements for one
    ///   ability and modifier;
    /// - an entity declares the same counter twice at one level;
    /// - a progression row or class-spell pair names an unknown class or spell,
    ///   or repeats a level.
    pub fn build(mut self) -> Result<Catalog, DomainError> {
        self.check_parents()?;
        self.check_attachments()?;

        for (class, row) in std::mem::take(&mut self.pending_progression) {
            let key = self
                .catalog
                .resolve_key(EntityKind::Class, &class)
                .map_err(|_| DomainError::not_found("class", class.to_string()))?;
            let rows = self.catalog.progression.entry(key).or_default();
            if rows.insert(row.level, row.clone()).is_some() {
                return Err(DomainError::constraint(format!(
                    "class '{}' has two progression rows for level {}",
                    class, row.level
                )));
            }
        }

        for (class, spell) in std::mem::take(&mut self.pending_class_spells) {
            let class_key = self
                .catalog
                .resolve_key(EntityKind::Class, &class)
                .map_err(|_| DomainError::not_found("class", class.to_string()))?;
            let spell_key = self
                .catalog
                .resolve_key(EntityKind::Spell, &spell)
                .map_err(|_| DomainError::not_found("spell", spell.to_string()))?;
            self.catalog.class_spells.insert((class_key, spell_key));
        }

        Ok(self.catalog)
    }

    fn check_parents(&self) -> Result<(), DomainError> {
        for entity in self.catalog.entities.values() {
            let parent = match entity {
                Entity::Race(race) => race.parent_race.as_ref().map(|p| (EntityKind::Race, p)),
                Entity::Class(class) => class.parent_class.as_ref().map(|p| (EntityKind::Class, p)),
                _ => None,
            };
            if let Some((kind, parent)) = parent {
                if self.catalog.resolve_key(kind, parent).is_err() {
                    return Err(DomainError::not_found(
                        kind.as_str(),
                        format!("{} (parent of {})", parent, entity.slug()),
                    ));
                }
            }
        }
        Ok(())
    }

    fn check_attachments(&self) -> Result<(), DomainError> {
        for ((target, kind), rows) in &self.catalog.attachments {
            match kind {
                AttachmentKind::Choice => {
                    let choices: Vec<Choice> = rows
                        .iter()
                        .filter_map(|a| match a {
                            Attachment::Choice(c) => Some(c.clone()),
                            _ => None,
                        })
                        .collect();
                    ChoiceGroup::from_rows(&choices).map_err(|e| {
                        DomainError::constraint(format!("{}: {}", target, e))
                    })?;
                }
                AttachmentKind::SavingThrow => {
                    let mut seen: HashSet<(Ability, SaveModifier)> = HashSet::new();
                    for row in rows {
                        if let Attachment::SavingThrow(save) = row {
                            if !seen.insert(save.unique_key()) {
                                return Err(DomainError::constraint(format!(
                                    "{} has two {} saving throws with the same modifier",
                                    target, save.ability
                                )));
                            }
                        }
                    }
                }
                AttachmentKind::Counter => {
                    let mut seen: HashSet<(String, u8)> = HashSet::new();
                    for row in rows {
                        if let Attachment::Counter(counter) = row {
                            if !seen.insert((counter.counter_name.clone(), counter.level)) {
                                return Err(DomainError::constraint(format!(
                                    "{} defines counter '{}' twice at level {}",
                                    target, counter.counter_name, counter.level
                                )));
                            }
                        }
                    }
                }
                AttachmentKind::Modifier => {
                    for row in rows {
                        if let Attachment::Modifier(m) = row {
                            if m.category == ModifierCategory::AbilityScore && m.ability.is_none() {
                                return Err(DomainError::constraint(format!(
                                    "{} has an ability-score modifier without an ability",
                                    target
                                )));
                            }
                        }
                    }
                }
                AttachmentKind::Proficiency => {
                    let mut groups: HashMap<&str, (u8, bool)> = HashMap::new();
                    for row in rows {
                        if let Attachment::Proficiency(grant) = row {
                            if !grant.is_choice {
                                continue;
                            }
                            let Some(group) = grant.choice_group.as_deref() else {
                                return Err(DomainError::constraint(format!(
                                    "{} has a proficiency choice without a group",
                                    target
                                )));
                            };
                            if let Some(quantity) = grant.quantity {
                                let entry = groups.entry(group).or_insert((quantity, false));
                                if entry.1 && entry.0 != quantity {
                                    return Err(DomainError::constraint(format!(
                                        "{} proficiency group '{}' defines quantity twice",
                                        target, group
                                    )));
                                }
                                *entry = (quantity, true);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}
