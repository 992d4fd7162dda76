//! Spell list use cases.
//!
//! Learn and forget spells for spellbook and known casters, and prepare or
//! unprepare them for casters that prepare. The rules live on
//! [`CharacterBuilder`]; these wrap them in the character's lock.

mod error;
mod learn;
mod prepare;

use std::sync::Arc;

use sheetsmith_domain::{Character, CharacterBuilder, CharacterId};

use crate::infrastructure::locks::CharacterLocks;
use crate::infrastructure::ports::{CharacterStore, ClockPort};

pub use error::SpellError;
pub use learn::{ForgetSpell, LearnSpell};
pub use prepare::{PrepareSpell, UnprepareSpell};

/// Container for spell list use cases.
pub struct SpellUseCases {
    pub learn: Arc<LearnSpell>,
    pub forget: Arc<ForgetSpell>,
    pub prepare: Arc<PrepareSpell>,
    pub unprepare: Arc<UnprepareSpell>,
}

impl SpellUseCases {
    pub fn new(store: SpellListStore) -> Self {
        Self {
            learn: Arc::new(LearnSpell::new(store.clone())),
            forget: Arc::new(ForgetSpell::new(store.clone())),
            prepare: Arc::new(PrepareSpell::new(store.clone())),
            unprepare: Arc::new(UnprepareSpell::new(store)),
        }
    }
}

/// Store access and rules shared by the spell list use cases.
#[derive(Clone)]
pub struct SpellListStore {
    store: Arc<dyn CharacterStore>,
    builder: Arc<CharacterBuilder>,
    locks: Arc<CharacterLocks>,
    clock: Arc<dyn ClockPort>,
}

impl SpellListStore {
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

    /// Run `mutate` on the stored character under its lock, saving only
    /// when it reports a change.
    async fn update<T>(
        &self,
        id: CharacterId,
        mutate: impl FnOnce(&CharacterBuilder, &mut Character) -> Result<(T, bool), SpellError>,
    ) -> Result<T, SpellError> {
        let _guard = self.locks.acquire(id).await;
        let mut character = self
            .store
            .get(id)
            .await?
            .ok_or(SpellError::CharacterNotFound(id))?;

        let (result, changed) = mutate(&self.builder, &mut character)?;
        if changed {
            character.touch(self.clock.now());
            self.store.save(&character).await?;
        }
        Ok(result)
    }
}

#[cfg(test)]
fn spell_store(engine: &crate::test_fixtures::TestEngine) -> SpellListStore {
    SpellListStore::new(
        engine.store(),
        engine.builder.clone(),
        engine.locks.clone(),
        engine.clock.clone(),
    )
}
