//! Full character resolution.
//!
//! [`CharacterBuilder::resolve`] turns a character plus a request (choice
//! picks, feats to add or remove) into a fully derived character. It is pure:
//! the input is never touched, and a failed resolution hands back the
//! original state together with every problem found.
//!
//! Resolution runs in two passes. The first derives the character as it
//! stands so prerequisites of newly requested feats and optional features
//! are judged against real totals and proficiencies. The second derives the
//! final state with the new feats in place.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use super::abilities::{ability_totals, fixed_ability_rows};
use super::choices::{
    match_selections, offered_groups, resolve_picks, ChoiceSelection, PendingChoice,
    ResolvedGrant, TakenKeys,
};
use super::context::BuildContext;
use super::features::{
    active_modifiers, collect_features, counter_definitions, merge_counters, modifier_total,
};
use super::hit_points::max_hit_points;
use super::issues::{IssueCode, UnmetRequirement, UnverifiableRequirement, ValidationIssue};
use super::prerequisites::{evaluate, CharacterFacts, PrerequisiteOutcome};
use super::proficiencies::{fixed_languages, fixed_proficiencies};
use super::spellcasting::{apply_slot_plan, chosen_spell_status, fixed_spells, plan_slots};
use crate::aggregates::Character;
use crate::compendium::{CompendiumRepository, Entity, EntityKind, EntityRef, ModifierCategory};
use crate::entities::{
    CharacterAbilityScore, CharacterEquipment, CharacterLanguage, CharacterProficiency,
    CharacterSpell, FeatureSelection, SpellUses,
};
use crate::error::DomainError;
use crate::rules::CalculationEngine;
use crate::value_objects::{Ability, Slug};

/// Derivation repeats while picked optional features change the source set.
const MAX_DERIVE_PASSES: usize = 3;

// ============================================================================
// Policy
// ============================================================================

/// What to do when a prerequisite can only be checked by a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnverifiablePolicy {
    /// Fail the resolution and report the requirement for confirmation
    #[default]
    Block,
    /// Accept, still reporting the requirement
    Allow,
}

impl UnverifiablePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Allow => "allow",
        }
    }
}

impl FromStr for UnverifiablePolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "block" => Ok(Self::Block),
            "allow" => Ok(Self::Allow),
            _ => Err(DomainError::parse(format!("Unknown unverifiable policy: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolutionPolicy {
    pub unverifiable: UnverifiablePolicy,
}

// ============================================================================
// Request / result
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionRequest {
    #[serde(default)]
    pub choices: Vec<ChoiceSelection>,
    #[serde(default)]
    pub add_feats: Vec<Slug>,
    #[serde(default)]
    pub remove_feats: Vec<Slug>,
}

impl ResolutionRequest {
    pub fn with_choice(mut self, selection: ChoiceSelection) -> Self {
        self.choices.push(selection);
        self
    }

    pub fn adding_feat(mut self, feat: Slug) -> Self {
        self.add_feats.push(feat);
        self
    }

    pub fn removing_feat(mut self, feat: Slug) -> Self {
        self.remove_feats.push(feat);
        self
    }
}

/// Outcome of one resolution.
///
/// On failure `character` is the unchanged input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub success: bool,
    pub character: Character,
    pub validation_errors: Vec<ValidationIssue>,
    pub unmet_prerequisites: Vec<UnmetRequirement>,
    pub unverifiable_prerequisites: Vec<UnverifiableRequirement>,
    pub pending_choices: Vec<PendingChoice>,
}

// ============================================================================
// Builder
// ============================================================================

/// Resolves characters against one compendium snapshot and rule set.
#[derive(Clone)]
pub struct CharacterBuilder {
    repo: Arc<dyn CompendiumRepository>,
    rules: Arc<dyn CalculationEngine>,
    policy: ResolutionPolicy,
}

impl CharacterBuilder {
    pub fn new(repo: Arc<dyn CompendiumRepository>, rules: Arc<dyn CalculationEngine>) -> Self {
        Self {
            repo,
            rules,
            policy: ResolutionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ResolutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[inline]
    pub fn policy(&self) -> ResolutionPolicy {
        self.policy
    }

    #[inline]
    pub fn rules(&self) -> &dyn CalculationEngine {
        self.rules.as_ref()
    }

    #[inline]
    pub fn repository(&self) -> &dyn CompendiumRepository {
        self.repo.as_ref()
    }

    /// Resolve `character` with `request` applied.
    pub fn resolve(&self, character: &Character, request: &ResolutionRequest) -> Resolution {
        let repo = self.repo.as_ref();
        let mut issues = Vec::new();
        let mut working = character.clone();

        // Feat removals and lookups
        let mut selections = working.feature_selections().to_vec();
        for (index, feat) in request.remove_feats.iter().enumerate() {
            let before = selections.len();
            selections.retain(|s| !(s.is_feat() && s.feature.slug.loosely_matches(feat)));
            if selections.len() == before {
                issues.push(ValidationIssue::new(
                    format!("removeFeats[{}]", index),
                    IssueCode::NotFound,
                    format!("the character does not have feat {}", feat),
                ));
            }
        }
        working.replace_feature_selections(selections);

        let mut new_feats: Vec<Entity> = Vec::new();
        for (index, feat) in request.add_feats.iter().enumerate() {
            let field = format!("addFeats[{}]", index);
            match repo.entity(EntityKind::Feat, feat) {
                Ok(entity) => {
                    let feat_ref = entity.entity_ref();
                    let taken = working
                        .feature_selections()
                        .iter()
                        .any(|s| s.feature.refers_to(&feat_ref))
                        || new_feats.iter().any(|f| f.entity_ref().refers_to(&feat_ref));
                    if taken {
                        issues.push(ValidationIssue::new(
                            field,
                            IssueCode::AlreadyGranted,
                            format!("the character already has feat {}", feat_ref.slug),
                        ));
                    } else {
                        new_feats.push(entity);
                    }
                }
                Err(e) => issues.push(ValidationIssue::lookup(field, &e)),
            }
        }

        // Pass 1: the character as it stands, for prerequisite facts
        let before_context = match BuildContext::load(repo, &working) {
            Ok(context) => context,
            Err(load_issues) => {
                issues.extend(load_issues);
                return self.failure(character, issues, Vec::new(), Vec::new());
            }
        };
        let first_pass = self
            .derive(&working, &request.choices)
            .or_else(|_| self.derive(&working, &[]));
        let first_pass = match first_pass {
            Ok(derived) => derived,
            Err(derive_issues) => {
                issues.extend(derive_issues);
                return self.failure(character, issues, Vec::new(), Vec::new());
            }
        };
        let facts = CharacterFacts::gather(&first_pass, &before_context);

        let mut unmet = Vec::new();
        let mut unverifiable = Vec::new();
        let mut judge = |target: EntityRef, entity: &Entity| {
            match evaluate(&target, &repo.prerequisites(entity.target()), &facts) {
                PrerequisiteOutcome::Eligible => {}
                PrerequisiteOutcome::NotMet { unmet: rows } => unmet.extend(rows),
                PrerequisiteOutcome::Unverifiable { requirements, .. } => {
                    unverifiable.extend(requirements)
                }
            }
        };
        for feat in &new_feats {
            judge(feat.entity_ref(), feat);
        }
        for picked in first_pass.feature_selections() {
            let is_new = picked.provenance.is_some()
                && !character
                    .feature_selections()
                    .iter()
                    .any(|s| s.feature.refers_to(&picked.feature));
            if !is_new {
                continue;
            }
            if let Ok(entity) = repo.entity_by_ref(&picked.feature) {
                judge(picked.feature.clone(), &entity);
            }
        }

        // Pass 2: final state with the new feats
        let level = working.total_level();
        let mut selections = working.feature_selections().to_vec();
        selections.extend(new_feats.iter().map(|feat| FeatureSelection {
            feature: feat.entity_ref(),
            provenance: None,
            level_acquired: level,
        }));
        working.replace_feature_selections(selections);

        let derived = match self.derive(&working, &request.choices) {
            Ok(derived) => Some(derived),
            Err(derive_issues) => {
                issues.extend(derive_issues);
                None
            }
        };

        let blocked_by_unverifiable =
            !unverifiable.is_empty() && self.policy.unverifiable == UnverifiablePolicy::Block;
        let derived = match derived {
            Some(derived) if issues.is_empty() && unmet.is_empty() && !blocked_by_unverifiable => {
                derived
            }
            _ => return self.failure(character, issues, unmet, unverifiable),
        };

        if let Err(e) = derived.check_integrity() {
            issues.push(ValidationIssue::new(
                "character",
                IssueCode::DuplicateGrant,
                e.to_string(),
            ));
            return self.failure(character, issues, unmet, unverifiable);
        }

        Resolution {
            success: true,
            pending_choices: self.pending_choices(&derived),
            character: derived,
            validation_errors: Vec::new(),
            unmet_prerequisites: unmet,
            unverifiable_prerequisites: unverifiable,
        }
    }

    fn failure(
        &self,
        character: &Character,
        issues: Vec<ValidationIssue>,
        unmet: Vec<UnmetRequirement>,
        unverifiable: Vec<UnverifiableRequirement>,
    ) -> Resolution {
        Resolution {
            success: false,
            character: character.clone(),
            validation_errors: issues,
            unmet_prerequisites: unmet,
            unverifiable_prerequisites: unverifiable,
            pending_choices: self.pending_choices(character),
        }
    }

    /// Offered groups the character has no rows for yet.
    pub fn pending_choices(&self, character: &Character) -> Vec<PendingChoice> {
        let repo = self.repo.as_ref();
        let Ok(context) = BuildContext::load(repo, character) else {
            return Vec::new();
        };
        let (offered, _) = offered_groups(repo, &context.sources());
        offered
            .iter()
            .filter(|g| !character.has_choice_grants(&g.source, &g.group.name))
            .map(PendingChoice::from_offered)
            .collect()
    }

    /// Prerequisite outcome of acquiring `entity` now.
    ///
    /// # Errors
    ///
    /// The character's sources or the entity do not resolve.
    pub fn eligibility(
        &self,
        character: &Character,
        entity: &EntityRef,
    ) -> Result<PrerequisiteOutcome, Vec<ValidationIssue>> {
        let repo = self.repo.as_ref();
        let context = BuildContext::load(repo, character)?;
        let target = repo
            .entity_by_ref(entity)
            .map_err(|e| vec![ValidationIssue::lookup("entity", &e)])?;
        let facts = CharacterFacts::gather(character, &context);
        Ok(evaluate(
            &target.entity_ref(),
            &repo.prerequisites(target.target()),
            &facts,
        ))
    }

    /// Derive until the set of picked features settles.
    fn derive(
        &self,
        character: &Character,
        choices: &[ChoiceSelection],
    ) -> Result<Character, Vec<ValidationIssue>> {
        let mut input = character.clone();
        let mut derived = self.derive_once(&input, choices)?;
        for _ in 1..MAX_DERIVE_PASSES {
            if derived.feature_selections() == input.feature_selections() {
                break;
            }
            input = character.clone();
            input.replace_feature_selections(derived.feature_selections().to_vec());
            derived = self.derive_once(&input, choices)?;
        }
        Ok(derived)
    }

    /// One full recompute of every derived collection.
    fn derive_once(
        &self,
        character: &Character,
        choices: &[ChoiceSelection],
    ) -> Result<Character, Vec<ValidationIssue>> {
        let repo = self.repo.as_ref();
        let rules = self.rules.as_ref();
        let context = BuildContext::load(repo, character)?;
        let sources = context.sources();

        let fixed_abilities = fixed_ability_rows(repo, &sources);
        let fixed_profs = fixed_proficiencies(repo, &sources);
        let fixed_langs = fixed_languages(repo, &sources);
        let fixed_spell_rows = fixed_spells(repo, &sources, character.spells());

        let (offered, mut issues) = offered_groups(repo, &sources);
        let (matched, match_issues) = match_selections(&offered, choices);
        issues.extend(match_issues);

        let kept_abilities: Vec<CharacterAbilityScore> = character
            .ability_scores()
            .iter()
            .filter(|r| matched.keeps(&offered, &r.provenance))
            .cloned()
            .collect();
        let kept_profs: Vec<CharacterProficiency> = character
            .proficiencies()
            .iter()
            .filter(|r| matched.keeps(&offered, &r.provenance))
            .cloned()
            .collect();
        let kept_langs: Vec<CharacterLanguage> = character
            .languages()
            .iter()
            .filter(|r| matched.keeps(&offered, &r.provenance))
            .cloned()
            .collect();
        let kept_spells: Vec<CharacterSpell> = character
            .spells()
            .iter()
            .filter(|r| {
                matched.keeps(&offered, &r.provenance)
                    || (r.provenance.is_manual()
                        && r.class.as_ref().map_or(true, |c| context.class(c).is_some()))
            })
            .cloned()
            .collect();
        let kept = |provenance: &Option<_>| {
            provenance
                .as_ref()
                .is_some_and(|p| matched.keeps(&offered, p))
        };
        let manual_equipment = character.equipment().iter().filter(|e| e.provenance.is_none());
        let kept_equipment = character.equipment().iter().filter(|e| kept(&e.provenance));
        let mut equipment: Vec<CharacterEquipment> =
            manual_equipment.chain(kept_equipment).cloned().collect();
        let mut selections: Vec<FeatureSelection> = character
            .feature_selections()
            .iter()
            .filter(|s| s.provenance.is_none() || kept(&s.provenance))
            .cloned()
            .collect();

        let mut taken = TakenKeys::new();
        fixed_langs.iter().chain(&kept_langs).for_each(|l| taken.add_language(&l.language));
        fixed_profs.iter().chain(&kept_profs).for_each(|p| taken.add_proficiency(p));
        fixed_spell_rows
            .iter()
            .chain(&kept_spells)
            .for_each(|s| taken.add_spell(&s.spell));
        selections.iter().for_each(|s| taken.add_optional_feature(&s.feature));

        let held = fixed_profs
            .iter()
            .chain(&kept_profs)
            .filter(|p| !p.expertise)
            .map(|p| p.subject.clone())
            .collect();

        let picks = match resolve_picks(repo, &offered, choices, &matched, &mut taken, held) {
            Ok(picks) if issues.is_empty() => picks,
            Ok(_) => return Err(issues),
            Err(pick_issues) => {
                issues.extend(pick_issues);
                return Err(issues);
            }
        };

        let mut abilities: Vec<CharacterAbilityScore> =
            fixed_abilities.into_iter().chain(kept_abilities).collect();
        let mut proficiencies: Vec<CharacterProficiency> =
            fixed_profs.into_iter().chain(kept_profs).collect();
        let mut languages = fixed_langs;
        for row in kept_langs {
            if !languages.iter().any(|l| l.language.loosely_matches(&row.language)) {
                languages.push(row);
            }
        }
        let mut spells = fixed_spell_rows;
        for row in kept_spells {
            if !spells.iter().any(|s| s.spell.loosely_matches(&row.spell)) {
                spells.push(row);
            }
        }

        for pick in picks {
            let provenance = pick.provenance;
            match pick.grant {
                ResolvedGrant::AbilityScore { ability, bonus } => {
                    abilities.push(CharacterAbilityScore {
                        ability,
                        bonus,
                        provenance,
                    })
                }
                ResolvedGrant::Language(language) => {
                    languages.push(CharacterLanguage {
                        language,
                        provenance,
                    })
                }
                ResolvedGrant::Proficiency(subject) => proficiencies.push(CharacterProficiency {
                    subject,
                    expertise: false,
                    provenance,
                }),
                ResolvedGrant::Expertise(subject) => proficiencies.push(CharacterProficiency {
                    subject,
                    expertise: true,
                    provenance,
                }),
                ResolvedGrant::Spell { spell, class } => {
                    let uses = pick.uses.map(|(max_uses, reset_timing)| SpellUses {
                        max_uses,
                        used: max_uses.cap(spent_uses(character, &spell)),
                        reset_timing,
                    });
                    spells.push(CharacterSpell {
                        spell,
                        status: chosen_spell_status(class.as_ref().and_then(|c| context.class(c))),
                        class,
                        uses,
                        provenance,
                    })
                }
                ResolvedGrant::Equipment { item } => {
                    match equipment.iter_mut().find(|e| {
                        e.item.loosely_matches(&item) && e.provenance.as_ref() == Some(&provenance)
                    }) {
                        Some(existing) => existing.quantity += 1,
                        None => equipment.push(CharacterEquipment {
                            item,
                            quantity: 1,
                            equipped: false,
                            provenance: Some(provenance),
                        }),
                    }
                }
                ResolvedGrant::OptionalFeature(feature) => selections.push(FeatureSelection {
                    feature,
                    provenance: Some(provenance),
                    level_acquired: context.total_level,
                }),
            }
        }

        let counters = merge_counters(character.counters(), counter_definitions(repo, &sources));
        let slots = apply_slot_plan(character.spell_slots(), &plan_slots(repo, &context));
        let modifiers = active_modifiers(repo, &sources);
        let totals = ability_totals(character.base_scores(), &abilities);

        let mut derived = character.clone();
        derived.replace_ability_scores(abilities);
        derived.replace_proficiencies(proficiencies);
        derived.replace_languages(languages);
        derived.replace_spells(spells);
        derived.replace_spell_slots(slots);
        derived.replace_features(collect_features(repo, &sources));
        derived.replace_feature_selections(selections);
        derived.replace_counters(counters);
        derived.replace_equipment(equipment);
        for class in &context.classes {
            derived.set_class_hit_die(&class.class.slug, class.class.hit_die);
        }

        let max_hp = max_hit_points(
            rules,
            &derived,
            &context,
            rules.ability_modifier(totals.get(Ability::Con)),
            modifier_total(&modifiers, ModifierCategory::HitPointsPerLevel),
        );
        derived.set_max_hit_points(max_hp);

        Ok(derived)
    }
}

/// Uses already spent on a stored row for `spell`, so a re-pick does not refill it.
fn spent_uses(character: &Character, spell: &Slug) -> u32 {
    character
        .spell(spell)
        .and_then(|s| s.uses)
        .map_or(0, |u| u.used)
}
