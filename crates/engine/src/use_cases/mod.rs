//! Use cases - User story orchestration.
//!
//! Each module groups the use cases of one area. A use case that changes a
//! character holds that character's lock from load to save.

pub mod lifecycle;
pub mod portability;
pub mod resolution;
pub mod resources;
pub mod spells;

use sheetsmith_domain::ValidationIssue;

pub use lifecycle::LifecycleUseCases;
pub use portability::PortabilityUseCases;
pub use resolution::ResolutionUseCases;
pub use resources::ResourceUseCases;
pub use spells::SpellUseCases;

/// One line per issue, for error messages.
pub(crate) fn describe_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
