//! Import/export errors.

use crate::infrastructure::ports::RepoError;
use sheetsmith_domain::{CharacterId, DomainError};

#[derive(Debug, thiserror::Error)]
pub enum PortabilityError {
    #[error("Character not found: {0}")]
    CharacterNotFound(CharacterId),

    #[error("Invalid character document: {0}")]
    InvalidDocument(String),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl From<serde_json::Error> for PortabilityError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidDocument(e.to_string())
    }
}
