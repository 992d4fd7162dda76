//! Create a character and resolve it immediately.

use std::sync::Arc;

use sheetsmith_domain::{
    AbilityScores, Character, CharacterBuilder, CharacterName, Resolution, ResolutionRequest,
    Slug,
};

use crate::infrastructure::ports::{CharacterStore, ClockPort};

use super::LifecycleError;

#[derive(Debug, Clone)]
pub struct CreateCharacterInput {
    pub name: String,
    pub race: Slug,
    pub background: Option<Slug>,
    pub class: Slug,
    pub base_scores: AbilityScores,
    /// Choices submitted with creation; groups left out stay pending
    pub request: ResolutionRequest,
}

pub struct CreateCharacter {
    store: Arc<dyn CharacterStore>,
    builder: Arc<CharacterBuilder>,
    clock: Arc<dyn ClockPort>,
}

impl CreateCharacter {
    pub fn new(
        store: Arc<dyn CharacterStore>,
        builder: Arc<CharacterBuilder>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            store,
            builder,
            clock,
        }
    }

    /// The character is stored only when its first resolution succeeds.
    pub async fn execute(&self, input: CreateCharacterInput) -> Result<Resolution, LifecycleError> {
        let name = CharacterName::new(input.name)?;
        let class = self.builder.repository().class(&input.class)?;
        if class.is_subclass() {
            return Err(LifecycleError::SubclassNotLevelable(class.slug));
        }

        let character = Character::new(
            name,
            input.race,
            input.background,
            input.base_scores,
            class.slug,
        );
        let mut resolution = self.builder.resolve(&character, &input.request);
        if !resolution.success {
            tracing::debug!(
                issues = resolution.validation_errors.len(),
                "Character creation rejected"
            );
            return Ok(resolution);
        }

        resolution.character.touch(self.clock.now());
        self.store.save(&resolution.character).await?;

        tracing::info!(
            character_id = %resolution.character.id(),
            name = %resolution.character.name(),
            "Character created"
        );
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::MockCharacterStore;
    use crate::test_fixtures::{builder, fixed_time, slug, TestEngine};
    use sheetsmith_domain::{ChoiceSelection, CompendiumError, IssueCode};

    fn use_case(engine: &TestEngine) -> CreateCharacter {
        CreateCharacter::new(engine.store(), engine.builder.clone(), engine.clock.clone())
    }

    fn input(race: &str, class: &str) -> CreateCharacterInput {
        CreateCharacterInput {
            name: "Sister Maren".to_string(),
            race: slug(race),
            background: Some(slug("acolyte")),
            class: slug(class),
            base_scores: AbilityScores::new(10, 12, 14, 10, 15, 13).unwrap(),
            request: ResolutionRequest::default(),
        }
    }

    #[tokio::test]
    async fn creates_and_stores_resolved_character() {
        let engine = TestEngine::new();
        let mut input = input("human", "cleric");
        input.request = ResolutionRequest::default()
            .with_choice(ChoiceSelection::new(
                "skills",
                vec![slug("history"), slug("medicine")],
            ));

        let resolution = use_case(&engine).execute(input).await.unwrap();

        assert!(resolution.success, "{:?}", resolution.validation_errors);
        let stored = engine.stored(resolution.character.id()).await;
        assert_eq!(stored, resolution.character);
        assert_eq!(stored.updated_at(), Some(fixed_time()));
        assert_eq!(stored.total_level(), 1);
        assert_eq!(stored.hit_points().max, 8 + 2);
        assert!(resolution
            .pending_choices
            .iter()
            .any(|p| p.choice_group == "cantrips"));
    }

    #[tokio::test]
    async fn race_requiring_a_subrace_is_not_stored() {
        let mut store = MockCharacterStore::new();
        store.expect_save().never();
        let use_case = CreateCharacter::new(
            Arc::new(store),
            Arc::new(builder()),
            TestEngine::new().clock,
        );

        let resolution = use_case.execute(input("elf", "wizard")).await.unwrap();

        assert!(!resolution.success);
        assert!(resolution
            .validation_errors
            .iter()
            .any(|i| i.code == IssueCode::SubraceRequired));
    }

    #[tokio::test]
    async fn subclass_cannot_be_a_starting_class() {
        let engine = TestEngine::new();
        let err = use_case(&engine)
            .execute(input("human", "life-domain"))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::SubclassNotLevelable(_)));
    }

    #[tokio::test]
    async fn unknown_class_and_blank_name_fail() {
        let engine = TestEngine::new();
        let err = use_case(&engine)
            .execute(input("human", "artificer"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Compendium(CompendiumError::NotFound { .. })
        ));

        let mut blank = input("human", "cleric");
        blank.name = "   ".to_string();
        let err = use_case(&engine).execute(blank).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Domain(_)));
    }
}
