//! Normalized choice rows and their per-group aggregate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::attachments::ProficiencyCategory;
use crate::error::DomainError;
use crate::value_objects::Slug;

/// Kinds of things a choice group offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceType {
    AbilityScore,
    Language,
    Proficiency,
    Expertise,
    Spell,
    Equipment,
    OptionalFeature,
}

impl ChoiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AbilityScore => "ability_score",
            Self::Language => "language",
            Self::Proficiency => "proficiency",
            Self::Expertise => "expertise",
            Self::Spell => "spell",
            Self::Equipment => "equipment",
            Self::OptionalFeature => "optional_feature",
        }
    }
}

impl fmt::Display for ChoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ChoiceType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ability_score" => Ok(Self::AbilityScore),
            "language" => Ok(Self::Language),
            "proficiency" => Ok(Self::Proficiency),
            "expertise" => Ok(Self::Expertise),
            "spell" => Ok(Self::Spell),
            "equipment" => Ok(Self::Equipment),
            "optional_feature" => Ok(Self::OptionalFeature),
            _ => Err(DomainError::parse(format!("Unknown choice type: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceConstraint {
    /// Every pick in the group must be distinct
    Different,
}

/// Structured filter fields for open-ended choices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceFilter {
    pub max_level: Option<u8>,
    pub school: Option<String>,
    /// Spell list (class slug) the pick must be on
    pub class_list: Option<Slug>,
    /// Some(true) = cantrips only, Some(false) = leveled spells only
    pub cantrip: Option<bool>,
    pub proficiency_category: Option<ProficiencyCategory>,
    pub item_type: Option<String>,
    pub feature_type: Option<String>,
}

/// One normalized choice row.
///
/// A group is the set of rows sharing `choice_group` on one owner. Rows with
/// a `target_slug` are fixed options; a row without one opens the group to
/// anything matching `filter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub choice_group: String,
    pub choice_type: ChoiceType,
    /// Defined on one row per group
    pub quantity: Option<u8>,
    pub constraint: Option<ChoiceConstraint>,
    pub target_slug: Option<Slug>,
    pub filter: ChoiceFilter,
    /// Ability-score bonus per pick
    pub value: Option<i32>,
    /// Minimum level at which the group is offered
    pub level: Option<u8>,
    /// Escape hatch for data the normalized fields cannot express
    pub extensions: BTreeMap<String, String>,
}

impl Choice {
    pub fn new(group: impl Into<String>, choice_type: ChoiceType) -> Self {
        Self {
            choice_group: group.into(),
            choice_type,
            quantity: None,
            constraint: None,
            target_slug: None,
            filter: ChoiceFilter::default(),
            value: None,
            level: None,
            extensions: BTreeMap::new(),
        }
    }

    pub fn quantity(mut self, quantity: u8) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn different(mut self) -> Self {
        self.constraint = Some(ChoiceConstraint::Different);
        self
    }

    pub fn target(mut self, slug: Slug) -> Self {
        self.target_slug = Some(slug);
        self
    }

    pub fn filter(mut self, filter: ChoiceFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn value(mut self, value: i32) -> Self {
        self.value = Some(value);
        self
    }

    pub fn at_level(mut self, level: u8) -> Self {
        self.level = Some(level);
        self
    }

    pub fn extension(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }
}

/// All rows of one `choice_group`, folded into a single offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceGroup {
    pub name: String,
    pub choice_type: ChoiceType,
    pub quantity: u8,
    pub constraint: Option<ChoiceConstraint>,
    /// Fixed options
    pub options: Vec<Slug>,
    /// Present when the group accepts anything matching the filter
    pub open_filter: Option<ChoiceFilter>,
    pub value: Option<i32>,
    pub level: Option<u8>,
    pub extensions: BTreeMap<String, String>,
}

impl ChoiceGroup {
    /// Fold choice rows into groups, preserving first-seen group order.
    ///
    /// # Errors
    ///
    /// `DomainError::Constraint` when rows of one group disagree on
    /// `choice_type`, define conflicting quantities, or define a zero quantity.
    pub fn from_rows(rows: &[Choice]) -> Result<Vec<ChoiceGroup>, DomainError> {
        let mut groups: Vec<ChoiceGroup> = Vec::new();

        for row in rows {
            let index = match groups.iter().position(|g| g.name == row.choice_group) {
                Some(index) => {
                    if groups[index].choice_type != row.choice_type {
                        return Err(DomainError::constraint(format!(
                            "choice group '{}' mixes {} and {}",
                            row.choice_group, groups[index].choice_type, row.choice_type
                        )));
                    }
                    index
                }
                None => {
                    groups.push(ChoiceGroup {
                        name: row.choice_group.clone(),
                        choice_type: row.choice_type,
                        quantity: 0,
                        constraint: None,
                        options: Vec::new(),
                        open_filter: None,
                        value: None,
                        level: None,
                        extensions: BTreeMap::new(),
                    });
                    groups.len() - 1
                }
            };
            let group = &mut groups[index];

            if let Some(quantity) = row.quantity {
                if quantity == 0 {
                    return Err(DomainError::constraint(format!(
                        "choice group '{}' has a zero quantity",
                        row.choice_group
                    )));
                }
                if group.quantity != 0 && group.quantity != quantity {
                    return Err(DomainError::constraint(format!(
                        "choice group '{}' defines quantity {} and {}",
                        row.choice_group, group.quantity, quantity
                    )));
                }
                group.quantity = quantity;
            }

            group.constraint = group.constraint.or(row.constraint);
            group.value = group.value.or(row.value);
            group.level = match (group.level, row.level) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
            for (key, value) in &row.extensions {
                group.extensions.entry(key.clone()).or_insert_with(|| value.clone());
            }

            match &row.target_slug {
                Some(slug) => {
                    if !group.options.contains(slug) {
                        group.options.push(slug.clone());
                    }
                }
                None => group.open_filter = Some(row.filter.clone()),
            }
        }

        for group in &mut groups {
            if group.quantity == 0 {
                group.quantity = 1;
            }
        }

        Ok(groups)
    }

    pub fn is_open(&self) -> bool {
        self.open_filter.is_some()
    }

    /// Whether a pick is one of the fixed options (source prefix tolerant).
    pub fn offers(&self, pick: &Slug) -> bool {
        self.options.iter().any(|option| option.loosely_matches(pick))
    }

    pub fn offered_at(&self, level: u8) -> bool {
        self.level.map_or(true, |gate| level >= gate)
    }

    /// Ability-score bonus per pick.
    ///
    /// Uses `value`; falls back to a `bonus` extension ("+2"), then +1.
    pub fn bonus_value(&self) -> i32 {
        if let Some(value) = self.value {
            return value;
        }
        self.extensions
            .get("bonus")
            .and_then(|raw| raw.trim().trim_start_matches('+').parse().ok())
            .unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slug(s: &str) -> Slug {
        Slug::new(s).unwrap()
    }

    #[test]
    fn folds_rows_into_groups() {
        let rows = vec![
            Choice::new("skills", ChoiceType::Proficiency)
                .quantity(2)
                .target(slug("history")),
            Choice::new("skills", ChoiceType::Proficiency).target(slug("insight")),
            Choice::new("skills", ChoiceType::Proficiency).target(slug("medicine")),
            Choice::new("languages", ChoiceType::Language).quantity(1),
        ];
        let groups = ChoiceGroup::from_rows(&rows).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].quantity, 2);
        assert_eq!(groups[0].options.len(), 3);
        assert!(!groups[0].is_open());
        assert!(groups[1].is_open());
    }

    #[test]
    fn rejects_mixed_types() {
        let rows = vec![
            Choice::new("g", ChoiceType::Language).quantity(1),
            Choice::new("g", ChoiceType::Spell),
        ];
        assert!(matches!(
            ChoiceGroup::from_rows(&rows),
            Err(DomainError::Constraint(_))
        ));
    }

    #[test]
    fn rejects_conflicting_quantities() {
        let rows = vec![
            Choice::new("g", ChoiceType::Language).quantity(1),
            Choice::new("g", ChoiceType::Language).quantity(2),
        ];
        assert!(ChoiceGroup::from_rows(&rows).is_err());
    }

    #[test]
    fn missing_quantity_defaults_to_one() {
        let rows = vec![Choice::new("g", ChoiceType::Language)];
        assert_eq!(ChoiceGroup::from_rows(&rows).unwrap()[0].quantity, 1);
    }

    #[test]
    fn bonus_value_prefers_normalized_field() {
        let rows = vec![Choice::new("asi", ChoiceType::AbilityScore)
            .quantity(1)
            .value(2)
            .extension("bonus", "+1")];
        assert_eq!(ChoiceGroup::from_rows(&rows).unwrap()[0].bonus_value(), 2);

        let rows = vec![Choice::new("asi", ChoiceType::AbilityScore).extension("bonus", "+2")];
        assert_eq!(ChoiceGroup::from_rows(&rows).unwrap()[0].bonus_value(), 2);

        let rows = vec![Choice::new("asi", ChoiceType::AbilityScore)];
        assert_eq!(ChoiceGroup::from_rows(&rows).unwrap()[0].bonus_value(), 1);
    }
}
