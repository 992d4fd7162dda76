//! Domain error type.
//!
//! Fallible constructors and aggregate mutations return [`DomainError`].
//! Build problems that a caller should see all at once are collected as
//! [`ValidationIssue`](crate::build::ValidationIssue) data instead.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value is out of range or a required field is empty
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Duplicate natural keys, exhausted resources, mismatched choice groups
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// A string did not name a known variant
    #[error("Parse error: {0}")]
    Parse(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::Constraint(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}
