//! Resolution operation errors.

use crate::infrastructure::ports::RepoError;
use sheetsmith_domain::{CharacterId, DomainError, ValidationIssue};

use crate::use_cases::describe_issues;

/// Errors that can occur during resolution operations.
///
/// A rejected resolution is not an error; it comes back as data in
/// [`sheetsmith_domain::Resolution`].
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("Character not found: {0}")]
    CharacterNotFound(CharacterId),

    /// The stored character references content its sheet cannot be built from
    #[error("Character cannot be derived: {}", describe_issues(.0))]
    Underivable(Vec<ValidationIssue>),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}
