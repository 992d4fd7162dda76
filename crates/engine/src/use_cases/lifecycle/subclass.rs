//! Subclass selection.

use std::sync::Arc;

use sheetsmith_domain::{CharacterBuilder, CharacterId, Resolution, ResolutionRequest, Slug};

use crate::infrastructure::locks::CharacterLocks;
use crate::infrastructure::ports::{CharacterStore, ClockPort};

use super::LifecycleError;

pub struct SetSubclass {
    store: Arc<dyn CharacterStore>,
    builder: Arc<CharacterBuilder>,
    locks: Arc<CharacterLocks>,
    clock: Arc<dyn ClockPort>,
}

impl SetSubclass {
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

    /// Pick `subclass` for `class` and re-resolve with `request`.
    ///
    /// The subclass must name `class` as its parent and the character's level
    /// in `class` must have reached the class's subclass level.
    pub async fn execute(
        &self,
        id: CharacterId,
        class: Slug,
        subclass: Slug,
        request: ResolutionRequest,
    ) -> Result<Resolution, LifecycleError> {
        let _guard = self.locks.acquire(id).await;
        let mut character = self
            .store
            .get(id)
            .await?
            .ok_or(LifecycleError::CharacterNotFound(id))?;

        let repo = self.builder.repository();
        let base = repo.class(&class)?;
        let sub = repo.class(&subclass)?;
        if !sub
            .parent_class
            .as_ref()
            .is_some_and(|parent| parent.loosely_matches(&base.slug))
        {
            return Err(LifecycleError::InvalidSubclass {
                class: base.slug,
                subclass: sub.slug,
            });
        }

        let level = character
            .class_entry(&base.slug)
            .map(|entry| entry.level)
            .ok_or_else(|| LifecycleError::ClassNotTaken(base.slug.clone()))?;
        let required = base.subclass_level.unwrap_or(1);
        if level < required {
            return Err(LifecycleError::SubclassLocked {
                class: base.slug,
                level,
                required,
            });
        }

        character.set_subclass(&base.slug, sub.slug.clone())?;
        let mut resolution = self.builder.resolve(&character, &request);
        if !resolution.success {
            return Err(LifecycleError::Rejected(Box::new(resolution)));
        }

        resolution.character.touch(self.clock.now());
        self.store.save(&resolution.character).await?;

        tracing::info!(
            character_id = %id,
            class = %base.slug,
            subclass = %sub.slug,
            "Subclass set"
        );
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{builder, level_one, slug, TestEngine};
    use sheetsmith_domain::{Character, CasterType};

    fn use_case(engine: &TestEngine) -> SetSubclass {
        SetSubclass::new(
            engine.store(),
            engine.builder.clone(),
            engine.locks.clone(),
            engine.clock.clone(),
        )
    }

    fn fighter(levels: u8) -> Character {
        let mut character = level_one("Gareth", "fighter");
        for _ in 1..levels {
            character.add_class_level(slug("fighter"), None, 20).unwrap();
        }
        builder()
            .resolve(&character, &ResolutionRequest::default())
            .character
    }

    #[tokio::test]
    async fn domain_unlocks_at_first_level() {
        let engine = TestEngine::new();
        let id = engine.insert(level_one("Maren", "cleric")).await;

        let resolution = use_case(&engine)
            .execute(
                id,
                slug("cleric"),
                slug("life-domain"),
                ResolutionRequest::default(),
            )
            .await
            .unwrap();

        assert!(resolution.success);
        let stored = engine.stored(id).await;
        assert_eq!(
            stored.classes()[0].subclass.as_ref().map(|s| s.base()),
            Some("life-domain")
        );
        assert!(stored.spells().iter().any(|s| s.spell.base() == "bless"));
    }

    #[tokio::test]
    async fn archetype_waits_for_its_level() {
        let engine = TestEngine::new();
        let id = engine.insert(fighter(2)).await;

        let err = use_case(&engine)
            .execute(
                id,
                slug("fighter"),
                slug("eldritch-knight"),
                ResolutionRequest::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LifecycleError::SubclassLocked {
                level: 2,
                required: 3,
                ..
            }
        ));
        assert!(engine.stored(id).await.classes()[0].subclass.is_none());
    }

    #[tokio::test]
    async fn eldritch_knight_becomes_a_third_caster() {
        let engine = TestEngine::new();
        let id = engine.insert(fighter(3)).await;

        let resolution = use_case(&engine)
            .execute(
                id,
                slug("fighter"),
                slug("eldritch-knight"),
                ResolutionRequest::default(),
            )
            .await
            .unwrap();

        assert!(resolution.success, "{:?}", resolution.validation_errors);
        let sheet = crate::use_cases::resolution::GetCharacterSheet::new(
            engine.store(),
            engine.builder.clone(),
        )
        .execute(id)
        .await
        .unwrap();
        assert_eq!(sheet.spellcasting.len(), 1);
        assert_eq!(sheet.spellcasting[0].caster_type, CasterType::Third);
    }

    #[tokio::test]
    async fn subclass_of_another_class_is_rejected() {
        let engine = TestEngine::new();
        let id = engine.insert(level_one("Maren", "cleric")).await;

        let err = use_case(&engine)
            .execute(
                id,
                slug("cleric"),
                slug("eldritch-knight"),
                ResolutionRequest::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidSubclass { .. }));

        let err = use_case(&engine)
            .execute(
                id,
                slug("fighter"),
                slug("eldritch-knight"),
                ResolutionRequest::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::ClassNotTaken(_)));
    }
}
