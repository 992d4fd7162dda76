//! Slug value object - the stable external key of a compendium entity.
//!
//! A slug is lowercase kebab-case, optionally prefixed with a source
//! namespace (`phb:wizard`). Characters reference compendium content only
//! through slugs so they survive a reseed of the static content.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

const MAX_SLUG_LENGTH: usize = 150;

/// A validated, optionally source-prefixed slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Create a new validated slug.
    ///
    /// Input is trimmed and lowercased. Both the source prefix and the body
    /// may contain `a-z`, `0-9` and `-`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for empty segments, more than one
    /// `:` separator, illegal characters, or input over 150 characters.
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        let normalized = value.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(DomainError::validation("Slug cannot be empty"));
        }
        if normalized.len() > MAX_SLUG_LENGTH {
            return Err(DomainError::validation(format!(
                "Slug cannot exceed {} characters",
                MAX_SLUG_LENGTH
            )));
        }

        let mut segments = normalized.split(':');
        let first = segments.next().unwrap_or_default();
        let second = segments.next();
        if segments.next().is_some() {
            return Err(DomainError::validation(format!(
                "Slug '{}' has more than one source separator",
                normalized
            )));
        }

        for segment in std::iter::once(first).chain(second) {
            if segment.is_empty() {
                return Err(DomainError::validation(format!(
                    "Slug '{}' has an empty segment",
                    normalized
                )));
            }
            if !segment
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            {
                return Err(DomainError::validation(format!(
                    "Slug '{}' contains characters outside a-z, 0-9 and '-'",
                    normalized
                )));
            }
        }

        Ok(Self(normalized))
    }

    /// Returns the full slug, prefix included.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The source namespace, if the slug carries one.
    pub fn source(&self) -> Option<&str> {
        self.0.split_once(':').map(|(source, _)| source)
    }

    /// The slug body without its source namespace.
    pub fn base(&self) -> &str {
        match self.0.split_once(':') {
            Some((_, base)) => base,
            None => &self.0,
        }
    }

    pub fn is_qualified(&self) -> bool {
        self.source().is_some()
    }

    /// True when both slugs name the same thing, treating a missing source
    /// prefix on either side as a wildcard.
    pub fn loosely_matches(&self, other: &Slug) -> bool {
        if self.is_qualified() && other.is_qualified() {
            return self == other;
        }
        self.base() == other.base()
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for Slug {
    type Error = DomainError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> String {
        slug.0
    }
}
