//! Delete a character and every row it owns.

use std::sync::Arc;

use sheetsmith_domain::CharacterId;

use crate::infrastructure::locks::CharacterLocks;
use crate::infrastructure::ports::CharacterStore;

use super::LifecycleError;

pub struct DeleteCharacter {
    store: Arc<dyn CharacterStore>,
    locks: Arc<CharacterLocks>,
}

impl DeleteCharacter {
    pub fn new(store: Arc<dyn CharacterStore>, locks: Arc<CharacterLocks>) -> Self {
        Self { store, locks }
    }

    pub async fn execute(&self, id: CharacterId) -> Result<(), LifecycleError> {
        let guard = self.locks.acquire(id).await;
        if self.store.get(id).await?.is_none() {
            return Err(LifecycleError::CharacterNotFound(id));
        }
        self.store.delete(id).await?;
        drop(guard);
        self.locks.forget(id);

        tracing::info!(character_id = %id, "Character deleted");
        Ok(())
    }
}
