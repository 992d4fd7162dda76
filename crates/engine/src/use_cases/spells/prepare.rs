//! Preparing and unpreparing spells.

use sheetsmith_domain::{CharacterId, PreparationChange, Slug};

use super::{SpellError, SpellListStore};

pub struct PrepareSpell {
    store: SpellListStore,
}

impl PrepareSpell {
    pub fn new(store: SpellListStore) -> Self {
        Self { store }
    }

    /// Prepare `spell`, counting it against the limit of `class` (the row's
    /// class, then the primary class, when `None`).
    pub async fn execute(
        &self,
        id: CharacterId,
        spell: Slug,
        class: Option<Slug>,
    ) -> Result<PreparationChange, SpellError> {
        let change = self
            .store
            .update(id, |builder, character| {
                let change = builder.prepare_spell(character, &spell, class.as_ref())?;
                let changed = change.changed();
                Ok((change, changed))
            })
            .await?;

        tracing::debug!(character_id = %id, spell = %spell, change = ?change, "Spell prepared");
        Ok(change)
    }
}

pub struct UnprepareSpell {
    store: SpellListStore,
}

impl UnprepareSpell {
    pub fn new(store: SpellListStore) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        id: CharacterId,
        spell: Slug,
    ) -> Result<PreparationChange, SpellError> {
        let change = self
            .store
            .update(id, |builder, character| {
                let change = builder.unprepare_spell(character, &spell)?;
                let changed = change.changed();
                Ok((change, changed))
            })
            .await?;

        tracing::debug!(character_id = %id, spell = %spell, change = ?change, "Spell unprepared");
        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{level_one, slug, TestEngine};
    use crate::use_cases::spells::{spell_store, LearnSpell};
    use sheetsmith_domain::{DomainError, PreparationStatus};

    #[tokio::test]
    async fn cleric_prepares_up_to_the_limit() {
        let engine = TestEngine::new();
        // Wisdom 14 at level 1: three prepared spells
        let id = engine.insert(level_one("Maren", "cleric")).await;
        let prepare = PrepareSpell::new(spell_store(&engine));

        for spell in ["bless", "cure-wounds", "detect-magic"] {
            assert_eq!(
                prepare.execute(id, slug(spell), None).await.unwrap(),
                PreparationChange::Prepared
            );
        }
        let stored = engine.stored(id).await;
        assert_eq!(
            stored
                .spells()
                .iter()
                .filter(|s| s.status == PreparationStatus::Prepared && s.provenance.is_manual())
                .count(),
            3
        );

        let unprepare = UnprepareSpell::new(spell_store(&engine));
        assert_eq!(
            unprepare.execute(id, slug("bless")).await.unwrap(),
            PreparationChange::Removed
        );
        assert!(engine.stored(id).await.spell(&slug("bless")).is_none());
    }

    #[tokio::test]
    async fn limit_blocks_one_more() {
        let engine = TestEngine::new();
        let id = engine.insert(level_one("Ilse", "wizard")).await;
        let store = spell_store(&engine);
        let learn = LearnSpell::new(store.clone());
        let prepare = PrepareSpell::new(store);

        // Intelligence 14 at level 1: three prepared spells
        let book = ["magic-missile", "shield", "sleep", "burning-hands"];
        for spell in book {
            learn.execute(id, slug(spell), None).await.unwrap();
        }
        for spell in &book[..3] {
            prepare.execute(id, slug(spell), None).await.unwrap();
        }
        let err = prepare
            .execute(id, slug("burning-hands"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SpellError::Domain(DomainError::Constraint(_))));
        assert_eq!(
            engine.stored(id).await.spell(&slug("burning-hands")).unwrap().status,
            PreparationStatus::Known
        );
    }

    #[tokio::test]
    async fn repeated_prepare_does_not_save() {
        let engine = TestEngine::new();
        let id = engine.insert(level_one("Maren", "cleric")).await;
        let prepare = PrepareSpell::new(spell_store(&engine));
        prepare.execute(id, slug("bless"), None).await.unwrap();
        let saved = engine.stored(id).await;

        assert_eq!(
            prepare.execute(id, slug("bless"), None).await.unwrap(),
            PreparationChange::AlreadyPrepared
        );
        assert_eq!(engine.stored(id).await, saved);
    }
}
