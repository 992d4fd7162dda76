//! Resource tracking use cases.
//!
//! Spend and refill the mutable parts of a character: counters, spell slots,
//! per-spell uses, hit dice and hit points. None of these re-resolve the build.

mod counters;
mod error;
mod rest;
mod slots;
mod vitals;

use std::sync::Arc;

use sheetsmith_domain::{CalculationEngine, Character, CharacterId};

use crate::infrastructure::locks::CharacterLocks;
use crate::infrastructure::ports::{CharacterStore, ClockPort, RandomPort};

pub use counters::{RestoreCounter, UseCounter};
pub use error::ResourceError;
pub use rest::{HitDieSpend, SpendHitDie, TakeRest};
pub use slots::{UseSpell, UseSpellSlot};
pub use vitals::{AdjustHitPoints, HpAdjustment};

/// Container for resource use cases.
pub struct ResourceUseCases {
    pub use_counter: Arc<UseCounter>,
    pub restore_counter: Arc<RestoreCounter>,
    pub use_spell_slot: Arc<UseSpellSlot>,
    pub use_spell: Arc<UseSpell>,
    pub take_rest: Arc<TakeRest>,
    pub spend_hit_die: Arc<SpendHitDie>,
    pub adjust_hit_points: Arc<AdjustHitPoints>,
}

impl ResourceUseCases {
    pub fn new(
        store: ResourceStore,
        rules: Arc<dyn CalculationEngine>,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        Self {
            use_counter: Arc::new(UseCounter::new(store.clone())),
            restore_counter: Arc::new(RestoreCounter::new(store.clone())),
            use_spell_slot: Arc::new(UseSpellSlot::new(store.clone())),
            use_spell: Arc::new(UseSpell::new(store.clone())),
            take_rest: Arc::new(TakeRest::new(store.clone())),
            spend_hit_die: Arc::new(SpendHitDie::new(store.clone(), rules, random)),
            adjust_hit_points: Arc::new(AdjustHitPoints::new(store)),
        }
    }
}

/// Store access shared by the resource use cases.
#[derive(Clone)]
pub struct ResourceStore {
    store: Arc<dyn CharacterStore>,
    locks: Arc<CharacterLocks>,
    clock: Arc<dyn ClockPort>,
}

impl ResourceStore {
    pub fn new(
        store: Arc<dyn CharacterStore>,
        locks: Arc<CharacterLocks>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            store,
            locks,
            clock,
        }
    }

    /// Run `mutate` on the stored character under its lock.
    ///
    /// The character is saved only when `mutate` reports a change.
    async fn update<T>(
        &self,
        id: CharacterId,
        mutate: impl FnOnce(&mut Character) -> Result<(T, bool), ResourceError>,
    ) -> Result<T, ResourceError> {
        let _guard = self.locks.acquire(id).await;
        let mut character = self
            .store
            .get(id)
            .await?
            .ok_or(ResourceError::CharacterNotFound(id))?;

        let (result, changed) = mutate(&mut character)?;
        if changed {
            character.touch(self.clock.now());
            self.store.save(&character).await?;
        }
        Ok(result)
    }
}
