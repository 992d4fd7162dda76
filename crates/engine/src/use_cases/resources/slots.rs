//! Spell slot and per-spell use expenditure.

use sheetsmith_domain::{CharacterId, SlotType, SlotUse, Slug, SpellUse};

use super::{ResourceError, ResourceStore};

pub struct UseSpellSlot {
    store: ResourceStore,
}

impl UseSpellSlot {
    pub fn new(store: ResourceStore) -> Self {
        Self { store }
    }

    /// Expend one slot of `level`; with no `slot_type` a standard slot is
    /// preferred over a pact slot.
    pub async fn execute(
        &self,
        id: CharacterId,
        level: u8,
        slot_type: Option<SlotType>,
    ) -> Result<SlotUse, ResourceError> {
        let outcome = self
            .store
            .update(id, |character| {
                let outcome = character.use_spell_slot(level, slot_type)?;
                let changed = matches!(outcome, SlotUse::Used { .. });
                Ok((outcome, changed))
            })
            .await?;

        tracing::debug!(character_id = %id, level, outcome = ?outcome, "Spell slot used");
        Ok(outcome)
    }
}

pub struct UseSpell {
    store: ResourceStore,
}

impl UseSpell {
    pub fn new(store: ResourceStore) -> Self {
        Self { store }
    }

    /// Cast `spell` through its own limited uses, without a slot.
    pub async fn execute(&self, id: CharacterId, spell: Slug) -> Result<SpellUse, ResourceError> {
        let outcome = self
            .store
            .update(id, |character| {
                let outcome = character.use_spell(&spell)?;
                let changed = matches!(outcome, SpellUse::Used { .. });
                Ok((outcome, changed))
            })
            .await?;

        tracing::debug!(character_id = %id, spell = %spell, outcome = ?outcome, "Spell use spent");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{builder, level_one, slug, TestEngine};
    use crate::use_cases::resources::TakeRest;
    use sheetsmith_domain::{
        AbilityScores, Character, CharacterName, ChoiceSelection, DomainError, ResolutionRequest,
        RestType,
    };

    fn use_case(engine: &TestEngine) -> UseSpellSlot {
        UseSpellSlot::new(ResourceStore::new(
            engine.store(),
            engine.locks.clone(),
            engine.clock.clone(),
        ))
    }

    #[tokio::test]
    async fn expends_until_none_remain() {
        let engine = TestEngine::new();
        let id = engine.insert(level_one("Maren", "cleric")).await;
        let use_case = use_case(&engine);

        assert_eq!(
            use_case.execute(id, 1, None).await.unwrap(),
            SlotUse::Used {
                level: 1,
                slot_type: SlotType::Standard,
                remaining: 1
            }
        );
        use_case.execute(id, 1, None).await.unwrap();
        assert_eq!(
            use_case.execute(id, 1, None).await.unwrap(),
            SlotUse::NoSlotsRemaining
        );
        assert_eq!(engine.stored(id).await.spell_slots()[0].used_slots, 2);
    }

    #[tokio::test]
    async fn warlock_falls_back_to_pact_slots() {
        let engine = TestEngine::new();
        let id = engine.insert(level_one("Vex", "warlock")).await;

        let outcome = use_case(&engine).execute(id, 1, None).await.unwrap();
        assert!(matches!(
            outcome,
            SlotUse::Used {
                slot_type: SlotType::Pact,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn level_without_slots_is_not_found() {
        let engine = TestEngine::new();
        let id = engine.insert(level_one("Maren", "cleric")).await;

        let err = use_case(&engine).execute(id, 3, None).await.unwrap_err();
        assert!(matches!(
            err,
            ResourceError::Domain(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn used_slots_survive_a_level_up() {
        let engine = TestEngine::new();
        let id = engine.insert(level_one("Maren", "cleric")).await;
        use_case(&engine).execute(id, 1, None).await.unwrap();

        let mut character = engine.stored(id).await;
        character.add_class_level(slug("cleric"), None, 20).unwrap();
        let resolved = builder()
            .resolve(&character, &ResolutionRequest::default())
            .character;

        let slot = &resolved.spell_slots()[0];
        assert_eq!((slot.max_slots, slot.used_slots), (3, 1));
    }

    /// A fighter with Fey Touched, Sleep picked for its spell.
    fn fey_touched_fighter() -> Character {
        let mut character = Character::new(
            CharacterName::new("Brann").unwrap(),
            slug("human"),
            None,
            AbilityScores::uniform(14),
            slug("fighter"),
        );
        for _ in 1..4 {
            character.add_class_level(slug("fighter"), None, 20).unwrap();
        }
        let request = ResolutionRequest::default()
            .adding_feat(slug("fey-touched"))
            .with_choice(ChoiceSelection::new("fey-spell", vec![slug("sleep")]));
        let resolution = builder().resolve(&character, &request);
        assert!(resolution.success, "{:?}", resolution.validation_errors);
        resolution.character
    }

    #[tokio::test]
    async fn spell_use_is_spent_and_refilled_by_a_long_rest() {
        let engine = TestEngine::new();
        let id = engine.insert(fey_touched_fighter()).await;
        let store = ResourceStore::new(engine.store(), engine.locks.clone(), engine.clock.clone());
        let use_spell = UseSpell::new(store.clone());

        assert_eq!(
            use_spell.execute(id, slug("misty-step")).await.unwrap(),
            SpellUse::Used { remaining: 0 }
        );
        assert_eq!(
            use_spell.execute(id, slug("misty-step")).await.unwrap(),
            SpellUse::Exhausted
        );
        let stored = engine.stored(id).await;
        assert_eq!(stored.spell(&slug("misty-step")).unwrap().uses.unwrap().used, 1);

        let rest = TakeRest::new(store)
            .execute(id, RestType::Long)
            .await
            .unwrap();
        assert_eq!(rest.spell_uses_reset, 1);
        assert_eq!(
            use_spell.execute(id, slug("misty-step")).await.unwrap(),
            SpellUse::Used { remaining: 0 }
        );
    }

    #[tokio::test]
    async fn spent_spell_use_survives_re_resolution() {
        let engine = TestEngine::new();
        let id = engine.insert(fey_touched_fighter()).await;
        let store = ResourceStore::new(engine.store(), engine.locks.clone(), engine.clock.clone());
        UseSpell::new(store).execute(id, slug("sleep")).await.unwrap();

        let request = ResolutionRequest::default()
            .with_choice(ChoiceSelection::new("fey-spell", vec![slug("sleep")]));
        let resolved = builder().resolve(&engine.stored(id).await, &request);
        assert!(resolved.success, "{:?}", resolved.validation_errors);
        let sleep = resolved.character.spell(&slug("sleep")).unwrap();
        assert_eq!(sleep.uses.unwrap().used, 1);
    }

    #[tokio::test]
    async fn slot_cast_spell_has_no_uses_to_spend() {
        let engine = TestEngine::new();
        let id = engine.insert(fey_touched_fighter()).await;
        let store = ResourceStore::new(engine.store(), engine.locks.clone(), engine.clock.clone());

        let err = UseSpell::new(store).execute(id, slug("shield")).await.unwrap_err();
        assert!(matches!(
            err,
            ResourceError::Domain(DomainError::NotFound { .. })
        ));
    }
}
