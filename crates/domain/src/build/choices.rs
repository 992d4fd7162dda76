//! Choice groups: what the sources offer, and turning picks into grants.
//!
//! Every choice type shares one pipeline. Offered groups are gathered from
//! `Choice` attachments, `is_choice` proficiency rows and open spell grants;
//! submitted selections are matched to exactly one offered group; each pick
//! then goes through the [`ChoiceStrategy`] for the group's type, which
//! validates the target and yields a typed [`ResolvedGrant`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::context::BuildSource;
use super::issues::{IssueCode, ValidationIssue};
use crate::compendium::{
    Choice, ChoiceConstraint, ChoiceFilter, ChoiceGroup, ChoiceType, CompendiumError,
    CompendiumRepository, Entity, EntityKind, EntityRef, ProficiencyCategory, ProficiencyGrant,
    ProficiencySubject,
};
use crate::entities::{CharacterProficiency, Provenance};
use crate::value_objects::{Ability, ResetTiming, Slug, UsesLimit};

// ============================================================================
// Requests
// ============================================================================

/// Picks submitted for one choice group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceSelection {
    /// Owning entity; needed only when two sources offer the same group name
    #[serde(default)]
    pub source: Option<Slug>,
    pub choice_group: String,
    pub selected: Vec<Slug>,
}

impl ChoiceSelection {
    pub fn new(choice_group: impl Into<String>, selected: Vec<Slug>) -> Self {
        Self {
            source: None,
            choice_group: choice_group.into(),
            selected,
        }
    }

    pub fn from_source(mut self, source: Slug) -> Self {
        self.source = Some(source);
        self
    }
}

// ============================================================================
// Offered groups
// ============================================================================

/// A choice group one of the character's sources currently offers.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferedGroup {
    pub source: EntityRef,
    pub source_level: u8,
    /// Owning class for class and subclass sources
    pub class: Option<Slug>,
    pub group: ChoiceGroup,
    /// Per-spell casting limit carried by spell grants
    pub uses: Option<(UsesLimit, ResetTiming)>,
}

impl OfferedGroup {
    pub fn provenance(&self) -> Provenance {
        Provenance::choice(self.source.clone(), self.group.name.clone())
    }
}

fn malformed(source: &BuildSource, error: impl std::fmt::Display) -> ValidationIssue {
    ValidationIssue::new(
        format!("choices.{}", source.entity_ref()),
        IssueCode::MalformedChoice,
        error.to_string(),
    )
}

/// Proficiency rows flagged `is_choice`, folded the same way `Choice` rows are.
fn proficiency_choice_rows(grants: &[ProficiencyGrant]) -> Vec<Choice> {
    grants
        .iter()
        .map(|grant| {
            let group = grant.choice_group.clone().unwrap_or_else(|| "proficiencies".to_string());
            let mut row = Choice::new(group, ChoiceType::Proficiency);
            row.quantity = grant.quantity;
            match &grant.subject {
                Some(ProficiencySubject::SavingThrow(ability)) => {
                    row.target_slug = Slug::new(ability.as_str()).ok();
                }
                Some(subject) => row.target_slug = subject.slug().cloned(),
                None => {}
            }
            if row.target_slug.is_none() {
                row.filter = ChoiceFilter {
                    proficiency_category: Some(grant.category),
                    ..ChoiceFilter::default()
                };
            }
            row
        })
        .collect()
}

/// Every group offered by the sources at their current levels.
///
/// Starting equipment is only offered by the first class. A class taken
/// later only offers proficiency picks flagged for multiclassing.
pub fn offered_groups(
    repo: &dyn CompendiumRepository,
    sources: &[BuildSource],
) -> (Vec<OfferedGroup>, Vec<ValidationIssue>) {
    let mut offered = Vec::new();
    let mut issues = Vec::new();

    for source in sources {
        let target = source.entity.target();
        let offer = |group: ChoiceGroup, uses: Option<(UsesLimit, ResetTiming)>| OfferedGroup {
            source: source.entity_ref(),
            source_level: source.level,
            class: source.class.clone(),
            group,
            uses,
        };

        match ChoiceGroup::from_rows(&repo.choices(target)) {
            Ok(groups) => offered.extend(
                groups
                    .into_iter()
                    .filter(|g| g.offered_at(source.level))
                    .filter(|g| {
                        !(g.choice_type == ChoiceType::Equipment && source.is_secondary_class())
                    })
                    .map(|g| offer(g, None)),
            ),
            Err(e) => issues.push(malformed(source, e)),
        }

        let proficiency_rows: Vec<ProficiencyGrant> = repo
            .proficiency_grants(target)
            .into_iter()
            .filter(|g| g.is_choice && g.active_at(source.level))
            .filter(|g| g.multiclass || !source.is_secondary_class())
            .collect();
        if !proficiency_rows.is_empty() {
            match ChoiceGroup::from_rows(&proficiency_choice_rows(&proficiency_rows)) {
                Ok(groups) => offered.extend(groups.into_iter().map(|g| offer(g, None))),
                Err(e) => issues.push(malformed(source, e)),
            }
        }

        let spell_grants = repo.spell_grants(target);
        for (index, grant) in spell_grants.iter().filter(|g| g.is_choice()).enumerate() {
            if !grant.active_at(source.level) {
                continue;
            }
            let name = grant
                .choice_group
                .clone()
                .unwrap_or_else(|| format!("spells-{}", index + 1));
            let row = Choice::new(name, ChoiceType::Spell)
                .quantity(grant.quantity.unwrap_or(1).max(1))
                .filter(ChoiceFilter {
                    max_level: grant.max_level,
                    school: grant.school.clone(),
                    class_list: grant.class_list.clone(),
                    cantrip: grant.cantrip.then_some(true),
                    ..ChoiceFilter::default()
                });
            match ChoiceGroup::from_rows(&[row]) {
                Ok(groups) => offered.extend(groups.into_iter().map(|g| offer(g, grant.uses))),
                Err(e) => issues.push(malformed(source, e)),
            }
        }
    }

    (offered, issues)
}

// ============================================================================
// Matching selections to groups
// ============================================================================

/// Which offered group each selection resolved to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionMatch {
    /// `(selection index, offered group index)`
    pub pairs: Vec<(usize, usize)>,
}

impl SelectionMatch {
    /// Whether a stored row survives this resolution untouched.
    ///
    /// Choice rows are kept while their group is still offered and no
    /// selection replaces it. Fixed rows are always regenerated, so they are
    /// never "kept".
    pub fn keeps(&self, offered: &[OfferedGroup], provenance: &Provenance) -> bool {
        let Some(group) = provenance.choice_group.as_deref() else {
            return false;
        };
        offered.iter().enumerate().any(|(index, g)| {
            provenance.is_from(&g.source, group)
                && g.group.name == group
                && !self.pairs.iter().any(|(_, o)| *o == index)
        })
    }

    pub fn replaces(&self, offered_index: usize) -> bool {
        self.pairs.iter().any(|(_, o)| *o == offered_index)
    }
}

/// Resolve each selection to exactly one offered group.
pub fn match_selections(
    offered: &[OfferedGroup],
    selections: &[ChoiceSelection],
) -> (SelectionMatch, Vec<ValidationIssue>) {
    let mut matched = SelectionMatch::default();
    let mut issues = Vec::new();

    for (index, selection) in selections.iter().enumerate() {
        let field = format!("choices[{}]", index);
        let candidates: Vec<usize> = offered
            .iter()
            .enumerate()
            .filter(|(_, g)| g.group.name == selection.choice_group)
            .filter(|(_, g)| {
                selection
                    .source
                    .as_ref()
                    .map_or(true, |s| g.source.slug.loosely_matches(s))
            })
            .map(|(i, _)| i)
            .collect();

        match candidates.as_slice() {
            [] => issues.push(ValidationIssue::new(
                field,
                IssueCode::UnknownChoiceGroup,
                format!("no source offers choice group '{}'", selection.choice_group),
            )),
            [only] => {
                if matched.replaces(*only) {
                    issues.push(ValidationIssue::new(
                        field,
                        IssueCode::DuplicateSelection,
                        format!(
                            "choice group '{}' of {} is selected more than once",
                            selection.choice_group, offered[*only].source
                        ),
                    ));
                } else {
                    matched.pairs.push((index, *only));
                }
            }
            many => {
                let owners: Vec<String> =
                    many.iter().map(|i| offered[*i].source.to_string()).collect();
                issues.push(ValidationIssue::new(
                    field,
                    IssueCode::AmbiguousChoiceGroup,
                    format!(
                        "choice group '{}' is offered by {}; name the source",
                        selection.choice_group,
                        owners.join(", ")
                    ),
                ));
            }
        }
    }

    (matched, issues)
}

// ============================================================================
// Strategies
// ============================================================================

/// A validated pick, typed by what it grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedGrant {
    AbilityScore { ability: Ability, bonus: i32 },
    Language(Slug),
    Proficiency(ProficiencySubject),
    Expertise(ProficiencySubject),
    Spell { spell: Slug, class: Option<Slug> },
    Equipment { item: Slug },
    OptionalFeature(EntityRef),
}

/// Why a single pick was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickRejection {
    pub code: IssueCode,
    pub message: String,
}

impl PickRejection {
    fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn lookup(error: CompendiumError) -> Self {
        let code = match error {
            CompendiumError::Ambiguous { .. } => IssueCode::AmbiguousReference,
            _ => IssueCode::UnknownTarget,
        };
        Self::new(code, error.to_string())
    }

    fn mismatch(pick: &Slug, group: &ChoiceGroup, why: impl std::fmt::Display) -> Self {
        Self::new(
            IssueCode::TargetMismatch,
            format!("{} does not fit choice group '{}': {}", pick, group.name, why),
        )
    }
}

/// What a strategy can consult besides the compendium.
pub struct PickContext<'a> {
    pub repo: &'a dyn CompendiumRepository,
    /// Proficiencies the character holds, including ones picked earlier in
    /// the same resolution
    pub held: &'a [ProficiencySubject],
}

/// Validates one pick against its group and produces the typed grant.
pub trait ChoiceStrategy: Send + Sync {
    fn resolve(
        &self,
        ctx: &PickContext<'_>,
        offered: &OfferedGroup,
        pick: &Slug,
    ) -> Result<ResolvedGrant, PickRejection>;
}

fn require_offered(group: &ChoiceGroup, pick: &Slug) -> Result<(), PickRejection> {
    if group.is_open() || group.offers(pick) {
        Ok(())
    } else {
        Err(PickRejection::mismatch(pick, group, "not one of the options"))
    }
}

fn lookup(
    ctx: &PickContext<'_>,
    kind: EntityKind,
    pick: &Slug,
) -> Result<Entity, PickRejection> {
    ctx.repo.entity(kind, pick).map_err(PickRejection::lookup)
}

fn filter(group: &ChoiceGroup) -> ChoiceFilter {
    group.open_filter.clone().unwrap_or_default()
}

struct AbilityScoreStrategy;

impl ChoiceStrategy for AbilityScoreStrategy {
    fn resolve(
        &self,
        _ctx: &PickContext<'_>,
        offered: &OfferedGroup,
        pick: &Slug,
    ) -> Result<ResolvedGrant, PickRejection> {
        let group = &offered.group;
        let ability: Ability = pick.base().parse().map_err(|_| {
            PickRejection::new(IssueCode::UnknownTarget, format!("{} is not an ability", pick))
        })?;
        if !group.is_open() {
            let allowed = group
                .options
                .iter()
                .filter_map(|o| o.base().parse::<Ability>().ok())
                .any(|a| a == ability);
            if !allowed {
                return Err(PickRejection::mismatch(pick, group, "not one of the options"));
            }
        }
        Ok(ResolvedGrant::AbilityScore {
            ability,
            bonus: group.bonus_value(),
        })
    }
}

struct LanguageStrategy;

impl ChoiceStrategy for LanguageStrategy {
    fn resolve(
        &self,
        ctx: &PickContext<'_>,
        offered: &OfferedGroup,
        pick: &Slug,
    ) -> Result<ResolvedGrant, PickRejection> {
        let language = lookup(ctx, EntityKind::Language, pick)?;
        require_offered(&offered.group, pick)?;
        Ok(ResolvedGrant::Language(language.slug().clone()))
    }
}

/// Skill first, then the other proficiency types; ability codes for saves.
fn proficiency_subject(
    ctx: &PickContext<'_>,
    pick: &Slug,
    category: Option<ProficiencyCategory>,
) -> Result<ProficiencySubject, PickRejection> {
    if category == Some(ProficiencyCategory::SavingThrow) {
        return ProficiencySubject::from_pick(ProficiencyCategory::SavingThrow, pick).ok_or_else(
            || PickRejection::new(IssueCode::UnknownTarget, format!("{} is not an ability", pick)),
        );
    }
    match ctx.repo.entity(EntityKind::Skill, pick) {
        Ok(skill) => return Ok(ProficiencySubject::Skill(skill.slug().clone())),
        Err(e @ CompendiumError::Ambiguous { .. }) => return Err(PickRejection::lookup(e)),
        Err(_) => {}
    }
    match ctx.repo.entity(EntityKind::ProficiencyType, pick) {
        Ok(Entity::ProficiencyType(kind)) => {
            ProficiencySubject::from_pick(kind.category, &kind.slug).ok_or_else(|| {
                PickRejection::new(
                    IssueCode::UnknownTarget,
                    format!("{} has no usable category", pick),
                )
            })
        }
        Ok(_) => Err(PickRejection::new(
            IssueCode::UnknownTarget,
            format!("{} is not a proficiency", pick),
        )),
        Err(e) => Err(PickRejection::lookup(e)),
    }
}

struct ProficiencyStrategy;

impl ChoiceStrategy for ProficiencyStrategy {
    fn resolve(
        &self,
        ctx: &PickContext<'_>,
        offered: &OfferedGroup,
        pick: &Slug,
    ) -> Result<ResolvedGrant, PickRejection> {
        let group = &offered.group;
        let wanted = filter(group).proficiency_category;
        let subject = proficiency_subject(ctx, pick, wanted)?;
        require_offered(group, pick)?;
        if let Some(category) = wanted.filter(|c| *c != subject.category()) {
            return Err(PickRejection::mismatch(
                pick,
                group,
                format!("expected a {} proficiency", category),
            ));
        }
        Ok(ResolvedGrant::Proficiency(subject))
    }
}

struct ExpertiseStrategy;

impl ChoiceStrategy for ExpertiseStrategy {
    fn resolve(
        &self,
        ctx: &PickContext<'_>,
        offered: &OfferedGroup,
        pick: &Slug,
    ) -> Result<ResolvedGrant, PickRejection> {
        let group = &offered.group;
        let subject = proficiency_subject(ctx, pick, filter(group).proficiency_category)?;
        require_offered(group, pick)?;
        if !ctx.held.iter().any(|held| held.matches(&subject)) {
            return Err(PickRejection::mismatch(
                pick,
                group,
                "expertise requires proficiency first",
            ));
        }
        Ok(ResolvedGrant::Expertise(subject))
    }
}

struct SpellStrategy;

impl ChoiceStrategy for SpellStrategy {
    fn resolve(
        &self,
        ctx: &PickContext<'_>,
        offered: &OfferedGroup,
        pick: &Slug,
    ) -> Result<ResolvedGrant, PickRejection> {
        let group = &offered.group;
        let entity = lookup(ctx, EntityKind::Spell, pick)?;
        let Some(spell) = entity.as_spell() else {
            return Err(PickRejection::new(
                IssueCode::UnknownTarget,
                format!("{} is not a spell", pick),
            ));
        };
        require_offered(group, pick)?;

        let filter = filter(group);
        if let Some(max) = filter.max_level.filter(|max| spell.level > *max) {
            return Err(PickRejection::mismatch(
                pick,
                group,
                format!("level {} is above {}", spell.level, max),
            ));
        }
        if let Some(school) = filter.school.as_deref() {
            if !spell.school.eq_ignore_ascii_case(school) {
                return Err(PickRejection::mismatch(pick, group, format!("not {}", school)));
            }
        }
        match filter.cantrip {
            Some(true) if !spell.is_cantrip() => {
                return Err(PickRejection::mismatch(pick, group, "not a cantrip"));
            }
            Some(false) if spell.is_cantrip() => {
                return Err(PickRejection::mismatch(pick, group, "cantrips are not allowed"));
            }
            _ => {}
        }
        if let Some(list) = &filter.class_list {
            let on_list = ctx
                .repo
                .spell_lists(&spell.slug)
                .iter()
                .any(|class| class.loosely_matches(list));
            if !on_list {
                return Err(PickRejection::mismatch(
                    pick,
                    group,
                    format!("not on the {} spell list", list),
                ));
            }
        }

        Ok(ResolvedGrant::Spell {
            spell: spell.slug.clone(),
            class: offered.class.clone(),
        })
    }
}

struct EquipmentStrategy;

impl ChoiceStrategy for EquipmentStrategy {
    fn resolve(
        &self,
        ctx: &PickContext<'_>,
        offered: &OfferedGroup,
        pick: &Slug,
    ) -> Result<ResolvedGrant, PickRejection> {
        let group = &offered.group;
        let entity = lookup(ctx, EntityKind::Item, pick)?;
        require_offered(group, pick)?;
        if let (Some(item), Some(wanted)) = (entity.as_item(), filter(group).item_type) {
            if !item.item_type.eq_ignore_ascii_case(&wanted) {
                return Err(PickRejection::mismatch(pick, group, format!("not a {}", wanted)));
            }
        }
        Ok(ResolvedGrant::Equipment {
            item: entity.slug().clone(),
        })
    }
}

struct OptionalFeatureStrategy;

impl ChoiceStrategy for OptionalFeatureStrategy {
    fn resolve(
        &self,
        ctx: &PickContext<'_>,
        offered: &OfferedGroup,
        pick: &Slug,
    ) -> Result<ResolvedGrant, PickRejection> {
        let group = &offered.group;
        let entity = lookup(ctx, EntityKind::OptionalFeature, pick)?;
        require_offered(group, pick)?;
        if let (Some(feature), Some(wanted)) =
            (entity.as_optional_feature(), filter(group).feature_type)
        {
            if !feature.feature_type.eq_ignore_ascii_case(&wanted) {
                return Err(PickRejection::mismatch(pick, group, format!("not a {}", wanted)));
            }
        }
        Ok(ResolvedGrant::OptionalFeature(entity.entity_ref()))
    }
}

/// The strategy for a choice type.
pub fn strategy_for(choice_type: ChoiceType) -> &'static dyn ChoiceStrategy {
    match choice_type {
        ChoiceType::AbilityScore => &AbilityScoreStrategy,
        ChoiceType::Language => &LanguageStrategy,
        ChoiceType::Proficiency => &ProficiencyStrategy,
        ChoiceType::Expertise => &ExpertiseStrategy,
        ChoiceType::Spell => &SpellStrategy,
        ChoiceType::Equipment => &EquipmentStrategy,
        ChoiceType::OptionalFeature => &OptionalFeatureStrategy,
    }
}

// ============================================================================
// Exclusive keys
// ============================================================================

/// Grants that may exist only once per character, across all groups.
///
/// Ability-score bonuses stack and equipment merges quantities, so neither
/// is tracked.
#[derive(Debug, Clone, Default)]
pub struct TakenKeys {
    keys: BTreeSet<(&'static str, String)>,
}

impl TakenKeys {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(grant: &ResolvedGrant) -> Option<(&'static str, String)> {
        match grant {
            ResolvedGrant::AbilityScore { .. } | ResolvedGrant::Equipment { .. } => None,
            ResolvedGrant::Language(slug) => Some(("language", slug.base().to_string())),
            ResolvedGrant::Proficiency(subject) => Some(("proficiency", subject.to_string())),
            ResolvedGrant::Expertise(subject) => Some(("expertise", subject.to_string())),
            ResolvedGrant::Spell { spell, .. } => Some(("spell", spell.base().to_string())),
            ResolvedGrant::OptionalFeature(feature) => {
                Some(("optional_feature", feature.slug.base().to_string()))
            }
        }
    }

    /// Record a grant; false when it was already taken.
    pub fn claim(&mut self, grant: &ResolvedGrant) -> bool {
        match Self::key(grant) {
            Some(key) => self.keys.insert(key),
            None => true,
        }
    }

    pub fn add_language(&mut self, language: &Slug) {
        self.claim(&ResolvedGrant::Language(language.clone()));
    }

    pub fn add_proficiency(&mut self, row: &CharacterProficiency) {
        let grant = if row.expertise {
            ResolvedGrant::Expertise(row.subject.clone())
        } else {
            ResolvedGrant::Proficiency(row.subject.clone())
        };
        self.claim(&grant);
    }

    pub fn add_spell(&mut self, spell: &Slug) {
        self.claim(&ResolvedGrant::Spell {
            spell: spell.clone(),
            class: None,
        });
    }

    pub fn add_optional_feature(&mut self, feature: &EntityRef) {
        if feature.kind == EntityKind::OptionalFeature {
            self.claim(&ResolvedGrant::OptionalFeature(feature.clone()));
        }
    }
}

// ============================================================================
// Resolving picks
// ============================================================================

/// One accepted pick with the provenance its row will carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPick {
    pub provenance: Provenance,
    pub grant: ResolvedGrant,
    pub uses: Option<(UsesLimit, ResetTiming)>,
}

fn is_exclusive(choice_type: ChoiceType) -> bool {
    !matches!(choice_type, ChoiceType::AbilityScore | ChoiceType::Equipment)
}

/// Validate every matched selection and resolve its picks.
///
/// Expertise groups run last so they can build on proficiencies picked in
/// the same request. All problems are collected; any problem means no picks
/// are returned.
pub fn resolve_picks(
    repo: &dyn CompendiumRepository,
    offered: &[OfferedGroup],
    selections: &[ChoiceSelection],
    matched: &SelectionMatch,
    taken: &mut TakenKeys,
    held: Vec<ProficiencySubject>,
) -> Result<Vec<ResolvedPick>, Vec<ValidationIssue>> {
    let mut held = held;
    let mut picks = Vec::new();
    let mut issues = Vec::new();

    let mut order: Vec<(usize, usize)> = matched.pairs.clone();
    order.sort_by_key(|(_, o)| offered[*o].group.choice_type == ChoiceType::Expertise);

    for (selection_index, offered_index) in order {
        let selection = &selections[selection_index];
        let group = &offered[offered_index];
        let field = format!("choices[{}]", selection_index);

        if selection.selected.len() != usize::from(group.group.quantity) {
            issues.push(ValidationIssue::new(
                field.clone(),
                IssueCode::QuantityMismatch,
                format!(
                    "choice group '{}' needs {} pick(s), got {}",
                    group.group.name,
                    group.group.quantity,
                    selection.selected.len()
                ),
            ));
        }

        let distinct = group.group.constraint == Some(ChoiceConstraint::Different)
            || is_exclusive(group.group.choice_type);
        let strategy = strategy_for(group.group.choice_type);

        for (pick_index, pick) in selection.selected.iter().enumerate() {
            let pick_field = format!("{}.selected[{}]", field, pick_index);
            if distinct
                && selection.selected[..pick_index]
                    .iter()
                    .any(|earlier| earlier.loosely_matches(pick))
            {
                issues.push(ValidationIssue::new(
                    pick_field,
                    IssueCode::DuplicateSelection,
                    format!("{} is picked more than once in '{}'", pick, group.group.name),
                ));
                continue;
            }

            let ctx = PickContext {
                repo,
                held: &held,
            };
            match strategy.resolve(&ctx, group, pick) {
                Ok(grant) => {
                    if let ResolvedGrant::AbilityScore { ability, .. } = &grant {
                        let repeated = distinct
                            && picks.iter().any(|p: &ResolvedPick| {
                                p.provenance == group.provenance()
                                    && matches!(&p.grant, ResolvedGrant::AbilityScore { ability: a, .. } if a == ability)
                            });
                        if repeated {
                            issues.push(ValidationIssue::new(
                                pick_field,
                                IssueCode::DuplicateSelection,
                                format!("{} is picked more than once in '{}'", ability, group.group.name),
                            ));
                            continue;
                        }
                    }
                    if !taken.claim(&grant) {
                        issues.push(ValidationIssue::new(
                            pick_field,
                            IssueCode::AlreadyGranted,
                            format!("{} is already granted to the character", pick),
                        ));
                        continue;
                    }
                    if let ResolvedGrant::Proficiency(subject) = &grant {
                        held.push(subject.clone());
                    }
                    picks.push(ResolvedPick {
                        provenance: group.provenance(),
                        grant,
                        uses: group.uses,
                    });
                }
                Err(rejection) => {
                    issues.push(ValidationIssue::new(pick_field, rejection.code, rejection.message));
                }
            }
        }
    }

    if issues.is_empty() {
        Ok(picks)
    } else {
        Err(issues)
    }
}

// ============================================================================
// Pending choices
// ============================================================================

/// An offered group the character has not answered yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChoice {
    pub source: EntityRef,
    pub choice_group: String,
    pub choice_type: ChoiceType,
    pub quantity: u8,
    /// Empty for open groups
    pub options: Vec<Slug>,
}

impl PendingChoice {
    pub fn from_offered(offered: &OfferedGroup) -> Self {
        Self {
            source: offered.source.clone(),
            choice_group: offered.group.name.clone(),
            choice_type: offered.group.choice_type,
            quantity: offered.group.quantity,
            options: offered.group.options.clone(),
        }
    }
}
