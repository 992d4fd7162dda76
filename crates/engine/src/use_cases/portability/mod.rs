//! Portability use cases.
//!
//! Characters leave and enter the engine as slug-only JSON documents, so they
//! survive a reseed of the compendium or a move to another instance.

mod error;
mod export;
mod import;
mod references;

use std::sync::Arc;

pub use error::PortabilityError;
pub use export::ExportCharacter;
pub use import::{ImportCharacter, ImportReport};
pub use references::{dangling_references, ReferenceReport, ValidateReferences};

/// Container for portability use cases.
pub struct PortabilityUseCases {
    pub export: Arc<ExportCharacter>,
    pub import: Arc<ImportCharacter>,
    pub validate_references: Arc<ValidateReferences>,
}

impl PortabilityUseCases {
    pub fn new(
        export: Arc<ExportCharacter>,
        import: Arc<ImportCharacter>,
        validate_references: Arc<ValidateReferences>,
    ) -> Self {
        Self {
            export,
            import,
            validate_references,
        }
    }
}
