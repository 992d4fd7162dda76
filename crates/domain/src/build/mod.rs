//! Character build resolution.
//!
//! Each submodule derives one slice of a character from the compendium:
//! ability contributions, proficiencies and languages, features and counters,
//! spellcasting, hit points, choices and prerequisites. [`CharacterBuilder`]
//! runs them together as one pure transformation, and also manages the
//! learned and prepared spell list.

pub mod abilities;
pub mod choices;
pub mod context;
pub mod features;
pub mod hit_points;
pub mod issues;
pub mod prerequisites;
pub mod proficiencies;
pub mod resolver;
pub mod spell_book;
pub mod spellcasting;

pub use abilities::{ability_totals, fixed_ability_rows};
pub use choices::{ChoiceSelection, PendingChoice};
pub use context::{BuildContext, BuildSource, ClassContext, SourceRole};
pub use features::{ActiveModifier, CounterDefinition};
pub use issues::{IssueCode, UnmetRequirement, UnverifiableRequirement, ValidationIssue};
pub use prerequisites::{CharacterFacts, PrerequisiteOutcome};
pub use proficiencies::consolidate;
pub use resolver::{
    CharacterBuilder, Resolution, ResolutionPolicy, ResolutionRequest, UnverifiablePolicy,
};
pub use spellcasting::{ClassCasting, PlannedSlot};
