//! Limited-use counters.

use sheetsmith_domain::{CharacterId, CounterRestore, CounterUse, EntityRef};

use super::{ResourceError, ResourceStore};

pub struct UseCounter {
    store: ResourceStore,
}

impl UseCounter {
    pub fn new(store: ResourceStore) -> Self {
        Self { store }
    }

    /// Spend one use of the counter called `name`.
    ///
    /// `source` is only needed when several sources grant a counter with the
    /// same name.
    pub async fn execute(
        &self,
        id: CharacterId,
        name: &str,
        source: Option<EntityRef>,
    ) -> Result<CounterUse, ResourceError> {
        let outcome = self
            .store
            .update(id, |character| {
                let outcome = character.use_counter(name, source.as_ref())?;
                let changed = matches!(outcome, CounterUse::Used { .. });
                Ok((outcome, changed))
            })
            .await?;

        tracing::debug!(character_id = %id, counter = name, outcome = ?outcome, "Counter used");
        Ok(outcome)
    }
}

pub struct RestoreCounter {
    store: ResourceStore,
}

impl RestoreCounter {
    pub fn new(store: ResourceStore) -> Self {
        Self { store }
    }

    /// Restore `amount` uses, or all of them when `None`.
    pub async fn execute(
        &self,
        id: CharacterId,
        name: &str,
        source: Option<EntityRef>,
        amount: Option<u32>,
    ) -> Result<CounterRestore, ResourceError> {
        let outcome = self
            .store
            .update(id, |character| {
                let outcome = character.restore_counter(name, source.as_ref(), amount)?;
                let changed = matches!(outcome, CounterRestore::Restored { .. });
                Ok((outcome, changed))
            })
            .await?;

        tracing::debug!(character_id = %id, counter = name, outcome = ?outcome, "Counter restored");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::locks::CharacterLocks;
    use crate::infrastructure::ports::{MockCharacterStore, MockClockPort};
    use crate::test_fixtures::{level_one, TestEngine};
    use mockall::predicate::*;
    use sheetsmith_domain::DomainError;
    use std::sync::Arc;

    fn resources(engine: &TestEngine) -> ResourceStore {
        ResourceStore::new(engine.store(), engine.locks.clone(), engine.clock.clone())
    }

    fn second_wind(character: &sheetsmith_domain::Character) -> u32 {
        character
            .counters()
            .iter()
            .find(|c| c.name == "Second Wind")
            .map(|c| c.current_uses)
            .unwrap()
    }

    #[tokio::test]
    async fn using_and_restoring_a_counter() {
        let engine = TestEngine::new();
        let id = engine.insert(level_one("Gareth", "fighter")).await;
        let use_counter = UseCounter::new(resources(&engine));
        let restore = RestoreCounter::new(resources(&engine));

        let used = use_counter.execute(id, "second wind", None).await.unwrap();
        assert_eq!(used, CounterUse::Used { remaining: 0 });
        assert_eq!(second_wind(&engine.stored(id).await), 0);

        let again = use_counter.execute(id, "Second Wind", None).await.unwrap();
        assert_eq!(again, CounterUse::Exhausted);

        let restored = restore.execute(id, "Second Wind", None, None).await.unwrap();
        assert_eq!(restored, CounterRestore::Restored { current: 1 });
        assert_eq!(second_wind(&engine.stored(id).await), 1);

        let full = restore.execute(id, "Second Wind", None, Some(1)).await.unwrap();
        assert_eq!(full, CounterRestore::AlreadyFull);
    }

    #[tokio::test]
    async fn unknown_counter_is_not_found() {
        let engine = TestEngine::new();
        let id = engine.insert(level_one("Gareth", "fighter")).await;

        let err = UseCounter::new(resources(&engine))
            .execute(id, "Ki", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResourceError::Domain(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn exhausted_counter_is_not_saved() {
        let mut character = level_one("Gareth", "fighter");
        character.use_counter("Second Wind", None).unwrap();
        let id = character.id();

        let mut store = MockCharacterStore::new();
        store
            .expect_get()
            .with(eq(id))
            .returning(move |_| Ok(Some(character.clone())));
        store.expect_save().never();

        let resources = ResourceStore::new(
            Arc::new(store),
            Arc::new(CharacterLocks::new()),
            Arc::new(MockClockPort::new()),
        );
        let outcome = UseCounter::new(resources)
            .execute(id, "Second Wind", None)
            .await
            .unwrap();
        assert_eq!(outcome, CounterUse::Exhausted);
    }
}
