//! Port traits for infrastructure boundaries.
//!
//! Ports exist for:
//! - Character storage (in-memory or SQLite)
//! - Clock/Random (for testing)

use std::fmt::Display;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sheetsmith_domain::{Character, CharacterId};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("Not found")]
    NotFound,
    #[error("Database error during {operation}: {message}")]
    Database { operation: String, message: String },
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// A save would break a natural-key uniqueness rule; nothing was written
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl RepoError {
    pub fn database(operation: impl Into<String>, error: impl Display) -> Self {
        Self::Database {
            operation: operation.into(),
            message: error.to_string(),
        }
    }

    pub fn serialization(error: impl Display) -> Self {
        Self::Serialization(error.to_string())
    }

    pub fn conflict(reason: impl Display) -> Self {
        Self::Conflict(reason.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

// =============================================================================
// Storage Ports
// =============================================================================

/// Persistence of whole character aggregates.
///
/// `save` replaces the aggregate and every child collection atomically; a
/// `Conflict` leaves the stored value untouched. `delete` cascades and is a
/// no-op for unknown ids.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CharacterStore: Send + Sync {
    async fn get(&self, id: CharacterId) -> Result<Option<Character>, RepoError>;
    async fn save(&self, character: &Character) -> Result<(), RepoError>;
    async fn delete(&self, id: CharacterId) -> Result<(), RepoError>;
    async fn list(&self) -> Result<Vec<Character>, RepoError>;
}

// =============================================================================
// Testability Ports
// =============================================================================

#[cfg_attr(test, mockall::automock)]
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[cfg_attr(test, mockall::automock)]
pub trait RandomPort: Send + Sync {
    /// Uniform integer in `min..=max`.
    fn gen_range(&self, min: i32, max: i32) -> i32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_helpers_classify() {
        let conflict = RepoError::conflict("duplicate spell 'bless'");
        assert!(conflict.is_conflict());
        assert!(!conflict.is_not_found());
        assert_eq!(conflict.to_string(), "Conflict: duplicate spell 'bless'");

        let db = RepoError::database("save", "disk full");
        assert_eq!(db.to_string(), "Database error during save: disk full");
        assert!(RepoError::NotFound.is_not_found());
    }
}
