//! Rests and hit dice.

use std::sync::Arc;

use serde::Serialize;

use sheetsmith_domain::build::ability_totals;
use sheetsmith_domain::{
    Ability, CalculationEngine, CharacterId, DomainError, RestOutcome, RestType, Slug,
};

use crate::infrastructure::ports::RandomPort;

use super::{ResourceError, ResourceStore};

pub struct TakeRest {
    store: ResourceStore,
}

impl TakeRest {
    pub fn new(store: ResourceStore) -> Self {
        Self { store }
    }

    pub async fn execute(&self, id: CharacterId, rest: RestType) -> Result<RestOutcome, ResourceError> {
        let outcome = self
            .store
            .update(id, |character| {
                let outcome = character.take_rest(rest);
                let changed = outcome != RestOutcome::default();
                Ok((outcome, changed))
            })
            .await?;

        tracing::info!(
            character_id = %id,
            rest = ?rest,
            counters_reset = outcome.counters_reset.len(),
            slots_restored = outcome.slots_restored,
            hit_dice_recovered = outcome.hit_dice_recovered,
            "Rest taken"
        );
        Ok(outcome)
    }
}

/// Result of spending one hit die.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HitDieSpend {
    pub roll: u8,
    pub healed: i32,
    pub dice_remaining: u8,
}

/// Spend a hit die during a short rest and heal roll + CON modifier.
pub struct SpendHitDie {
    store: ResourceStore,
    rules: Arc<dyn CalculationEngine>,
    random: Arc<dyn RandomPort>,
}

impl SpendHitDie {
    pub fn new(
        store: ResourceStore,
        rules: Arc<dyn CalculationEngine>,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        Self {
            store,
            rules,
            random,
        }
    }

    pub async fn execute(&self, id: CharacterId, class: Slug) -> Result<HitDieSpend, ResourceError> {
        let spend = self
            .store
            .update(id, |character| {
                let hit_die = character
                    .class_entry(&class)
                    .map(|entry| entry.hit_die)
                    .ok_or_else(|| DomainError::not_found("character class", class.to_string()))?;
                let dice_remaining = character.spend_hit_die(&class)?;

                let rolled = self.random.gen_range(1, i32::from(hit_die.max(1)));
                let roll = u8::try_from(rolled.clamp(1, i32::from(hit_die.max(1)))).unwrap_or(1);
                let totals = ability_totals(character.base_scores(), character.ability_scores());
                let con = self.rules.ability_modifier(totals.get(Ability::Con));
                let healed = character.heal(u32::try_from(i32::from(roll) + con).unwrap_or(0));

                Ok((
                    HitDieSpend {
                        roll,
                        healed,
                        dice_remaining,
                    },
                    true,
                ))
            })
            .await?;

        tracing::debug!(
            character_id = %id,
            class = %class,
            roll = spend.roll,
            healed = spend.healed,
            "Hit die spent"
        );
        Ok(spend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{builder, level_one, slug, TestEngine};
    use sheetsmith_domain::{Dnd5eRules, ResolutionRequest, SlotType};

    fn resources(engine: &TestEngine) -> ResourceStore {
        ResourceStore::new(engine.store(), engine.locks.clone(), engine.clock.clone())
    }

    fn spender(engine: &TestEngine) -> SpendHitDie {
        SpendHitDie::new(
            resources(engine),
            Arc::new(Dnd5eRules::new()),
            engine.random.clone(),
        )
    }

    fn cleric(levels: u8) -> sheetsmith_domain::Character {
        let mut character = level_one("Maren", "cleric");
        for _ in 1..levels {
            character.add_class_level(slug("cleric"), None, 20).unwrap();
        }
        builder()
            .resolve(&character, &ResolutionRequest::default())
            .character
    }

    #[tokio::test]
    async fn long_rest_restores_slots_hit_points_and_half_the_dice() {
        let engine = TestEngine::with_roll(3);
        let mut character = cleric(4);
        character.use_spell_slot(1, Some(SlotType::Standard)).unwrap();
        character.take_damage(20);
        let id = engine.insert(character).await;

        let spender = spender(&engine);
        for _ in 0..3 {
            spender.execute(id, slug("cleric")).await.unwrap();
        }
        let before = engine.stored(id).await;
        assert_eq!(before.classes()[0].hit_dice_spent, 3);

        let outcome = TakeRest::new(resources(&engine))
            .execute(id, RestType::Long)
            .await
            .unwrap();

        assert_eq!(outcome.slots_restored, 1);
        assert_eq!(outcome.hit_dice_recovered, 2);
        let after = engine.stored(id).await;
        assert_eq!(after.hit_points().current(), after.hit_points().max);
        assert_eq!(after.classes()[0].hit_dice_spent, 1);
        assert!(after.spell_slots().iter().all(|s| s.used_slots == 0));
    }

    #[tokio::test]
    async fn short_rest_refills_short_rest_counters() {
        let engine = TestEngine::new();
        let mut character = level_one("Gareth", "fighter");
        character.use_counter("Second Wind", None).unwrap();
        let id = engine.insert(character).await;

        let outcome = TakeRest::new(resources(&engine))
            .execute(id, RestType::Short)
            .await
            .unwrap();

        assert_eq!(outcome.counters_reset, vec!["Second Wind".to_string()]);
        assert_eq!(outcome.hit_dice_recovered, 0);
    }

    #[tokio::test]
    async fn hit_die_heals_roll_plus_constitution() {
        let engine = TestEngine::with_roll(3);
        let mut character = cleric(2);
        character.take_damage(10);
        let id = engine.insert(character).await;

        let spend = spender(&engine).execute(id, slug("cleric")).await.unwrap();

        assert_eq!(
            spend,
            HitDieSpend {
                roll: 3,
                healed: 3 + 2,
                dice_remaining: 1
            }
        );
        let stored = engine.stored(id).await;
        assert_eq!(stored.hit_points().current(), stored.hit_points().max - 10 + 5);
    }

    #[tokio::test]
    async fn no_dice_left_is_an_error() {
        let engine = TestEngine::new();
        let id = engine.insert(level_one("Maren", "cleric")).await;
        let spender = spender(&engine);

        spender.execute(id, slug("cleric")).await.unwrap();
        let err = spender.execute(id, slug("cleric")).await.unwrap_err();
        assert!(matches!(
            err,
            ResourceError::Domain(DomainError::Constraint(_))
        ));

        let err = spender.execute(id, slug("wizard")).await.unwrap_err();
        assert!(matches!(
            err,
            ResourceError::Domain(DomainError::NotFound { .. })
        ));
    }
}
