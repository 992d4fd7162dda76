//! Value objects - Immutable objects defined by their attributes

mod ability;
mod names;
mod slug;
mod uses;

pub use ability::{Ability, AbilityScores, MAX_ABILITY_SCORE, MIN_ABILITY_SCORE};
pub use names::CharacterName;
pub use slug::Slug;
pub use uses::{ResetTiming, UsesLimit, UNLIMITED_USES};
