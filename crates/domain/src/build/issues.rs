//! Non-fatal resolution problems, reported as data.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::compendium::{CompendiumError, EntityRef};

/// Machine-readable validation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    /// `len(selected) != quantity`
    QuantityMismatch,
    /// A pick repeated inside one group where picks must differ
    DuplicateSelection,
    /// The pick is already granted by another group or a fixed grant
    AlreadyGranted,
    /// The pick exists but is not offered by the group
    TargetMismatch,
    /// The pick does not resolve in the compendium
    UnknownTarget,
    UnknownChoiceGroup,
    AmbiguousChoiceGroup,
    SubraceRequired,
    /// An unprefixed slug matches entities from several sources
    AmbiguousReference,
    /// A build reference (race, class, background, feat) does not resolve
    NotFound,
    /// Two rows of the resolved state share a natural key
    DuplicateGrant,
    /// Compendium choice rows that do not fold into a valid group
    MalformedChoice,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuantityMismatch => "quantity_mismatch",
            Self::DuplicateSelection => "duplicate_selection",
            Self::AlreadyGranted => "already_granted",
            Self::TargetMismatch => "target_mismatch",
            Self::UnknownTarget => "unknown_target",
            Self::UnknownChoiceGroup => "unknown_choice_group",
            Self::AmbiguousChoiceGroup => "ambiguous_choice_group",
            Self::SubraceRequired => "subrace_required",
            Self::AmbiguousReference => "ambiguous_reference",
            Self::NotFound => "not_found",
            Self::DuplicateGrant => "duplicate_grant",
            Self::MalformedChoice => "malformed_choice",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One validation problem: `{field, code, message}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub code: IssueCode,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code,
            message: message.into(),
        }
    }

    /// A failed compendium lookup for a build reference.
    pub fn lookup(field: impl Into<String>, error: &CompendiumError) -> Self {
        let code = match error {
            CompendiumError::Ambiguous { .. } => IssueCode::AmbiguousReference,
            _ => IssueCode::NotFound,
        };
        Self::new(field, code, error.to_string())
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.field, self.code, self.message)
    }
}

/// A prerequisite row that the character does not meet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmetRequirement {
    /// What was being acquired
    pub target: EntityRef,
    pub group: u8,
    pub requirement: String,
}

/// A prerequisite row that cannot be checked mechanically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnverifiableRequirement {
    pub target: EntityRef,
    pub group: u8,
    pub description: String,
}
