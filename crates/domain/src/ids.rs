use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a stored character.
///
/// Never part of an exported document; an import always gets a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharacterId(Uuid);

impl CharacterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CharacterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Internal compendium identifier.
///
/// Assigned when a catalog is built and NOT stable across reseeds. Character
/// data never stores one; it is a lookup cache behind the slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompendiumKey(u64);

impl CompendiumKey {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Placeholder carried by entities that have not been added to a catalog yet.
    pub const UNASSIGNED: CompendiumKey = CompendiumKey(0);
}

impl fmt::Display for CompendiumKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
