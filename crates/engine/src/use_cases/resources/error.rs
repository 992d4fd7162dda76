//! Resource tracking errors.

use crate::infrastructure::ports::RepoError;
use sheetsmith_domain::{CharacterId, DomainError};

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("Character not found: {0}")]
    CharacterNotFound(CharacterId),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}
