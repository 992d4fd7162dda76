//! Spell list errors.

use crate::infrastructure::ports::RepoError;
use sheetsmith_domain::{CharacterId, DomainError};

#[derive(Debug, thiserror::Error)]
pub enum SpellError {
    #[error("Character not found: {0}")]
    CharacterNotFound(CharacterId),

    /// Off-list, too-high or cantrip requests, full lists and spent limits
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}
