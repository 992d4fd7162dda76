//! Character lifecycle errors.

use crate::infrastructure::ports::RepoError;
use sheetsmith_domain::{
    CharacterId, CompendiumError, DomainError, Resolution, Slug, UnmetRequirement,
    UnverifiableRequirement,
};

use crate::use_cases::describe_issues;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Character not found: {0}")]
    CharacterNotFound(CharacterId),

    #[error("Compendium lookup failed: {0}")]
    Compendium(#[from] CompendiumError),

    #[error("{0} is a subclass; level its parent class instead")]
    SubclassNotLevelable(Slug),

    #[error("{subclass} is not a subclass of {class}")]
    InvalidSubclass { class: Slug, subclass: Slug },

    #[error("Character has no levels in {0}")]
    ClassNotTaken(Slug),

    #[error("{class} subclass unlocks at class level {required}, character has {level}")]
    SubclassLocked { class: Slug, level: u8, required: u8 },

    #[error("Hit point roll {roll} is outside 1..={hit_die}")]
    InvalidHitPointRoll { roll: u8, hit_die: u8 },

    #[error("Multiclass prerequisites not met for {class}: {}", requirements(.unmet))]
    PrerequisitesNotMet {
        class: Slug,
        unmet: Vec<UnmetRequirement>,
    },

    #[error("Multiclass prerequisites for {class} need confirmation")]
    UnverifiablePrerequisites {
        class: Slug,
        requirements: Vec<UnverifiableRequirement>,
        /// Failing rows of the other groups, shown alongside
        unmet: Vec<UnmetRequirement>,
    },

    /// The change applied but the character no longer resolves; nothing was stored
    #[error("Resolution rejected: {}", describe_issues(&.0.validation_errors))]
    Rejected(Box<Resolution>),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

fn requirements(unmet: &[UnmetRequirement]) -> String {
    unmet
        .iter()
        .map(|u| u.requirement.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
