//! Resolve a stored character with a batch of choices and feat changes.

use std::sync::Arc;

use sheetsmith_domain::{CharacterBuilder, CharacterId, Resolution, ResolutionRequest};

use crate::infrastructure::locks::CharacterLocks;
use crate::infrastructure::ports::{CharacterStore, ClockPort};

use super::ResolutionError;

/// One read-resolve-save transaction.
///
/// The store only changes when the resolution succeeds. A rejected request
/// is returned as `Ok` with `success == false` and the stored character as
/// it was.
pub struct ResolveCharacter {
    store: Arc<dyn CharacterStore>,
    builder: Arc<CharacterBuilder>,
    locks: Arc<CharacterLocks>,
    clock: Arc<dyn ClockPort>,
}

impl ResolveCharacter {
    pub fn new(
        store: Arc<dyn CharacterStore>,
        builder: Arc<CharacterBuilder>,
        locks: Arc<CharacterLocks>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            store,
            builder,
            locks,
            clock,
        }
    }

    pub async fn execute(
        &self,
        id: CharacterId,
        request: ResolutionRequest,
    ) -> Result<Resolution, ResolutionError> {
        let _guard = self.locks.acquire(id).await;
        let character = self
            .store
            .get(id)
            .await?
            .ok_or(ResolutionError::CharacterNotFound(id))?;

        let mut resolution = self.builder.resolve(&character, &request);
        if !resolution.success {
            tracing::debug!(
                character_id = %id,
                issues = resolution.validation_errors.len(),
                unmet = resolution.unmet_prerequisites.len(),
                unverifiable = resolution.unverifiable_prerequisites.len(),
                "Resolution rejected"
            );
            return Ok(resolution);
        }

        resolution.character.touch(self.clock.now());
        self.store.save(&resolution.character).await?;

        tracing::info!(
            character_id = %id,
            total_level = resolution.character.total_level(),
            pending_choices = resolution.pending_choices.len(),
            "Resolution committed"
        );
        Ok(resolution)
    }
}
