//! Derived character sheet.

use std::sync::Arc;

use sheetsmith_domain::{CharacterBuilder, CharacterId, CharacterSheet};

use crate::infrastructure::ports::CharacterStore;

use super::ResolutionError;

pub struct GetCharacterSheet {
    store: Arc<dyn CharacterStore>,
    builder: Arc<CharacterBuilder>,
}

impl GetCharacterSheet {
    pub fn new(store: Arc<dyn CharacterStore>, builder: Arc<CharacterBuilder>) -> Self {
        Self { store, builder }
    }

    pub async fn execute(&self, id: CharacterId) -> Result<CharacterSheet, ResolutionError> {
        let character = self
            .store
            .get(id)
            .await?
            .ok_or(ResolutionError::CharacterNotFound(id))?;

        CharacterSheet::derive(
            self.builder.repository(),
            self.builder.rules(),
            &character,
        )
        .map_err(|issues| {
            tracing::warn!(
                character_id = %id,
                issues = issues.len(),
                "Stored character no longer derives"
            );
            ResolutionError::Underivable(issues)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{level_one, reseeded_catalog, slug, TestEngine};
    use sheetsmith_domain::{
        Ability, AbilityScores, Character, CharacterName, Dnd5eRules, IssueCode,
    };

    #[tokio::test]
    async fn derives_sheet_of_stored_character() {
        let engine = TestEngine::new();
        let id = engine.insert(level_one("Maren", "cleric")).await;

        let sheet = GetCharacterSheet::new(engine.store(), engine.builder.clone())
            .execute(id)
            .await
            .unwrap();

        assert_eq!(sheet.character_id, id);
        assert_eq!(sheet.total_level, 1);
        assert_eq!(sheet.proficiency_bonus, 2);
        assert_eq!(sheet.ability(Ability::Wis).map(|a| a.score), Some(14));
        assert_eq!(sheet.spellcasting.len(), 1);
    }

    #[tokio::test]
    async fn sheet_survives_a_reseed() {
        let engine = TestEngine::new();
        let id = engine.insert(level_one("Maren", "cleric")).await;
        let reseeded = Arc::new(CharacterBuilder::new(
            reseeded_catalog(),
            Arc::new(Dnd5eRules::new()),
        ));

        let before = GetCharacterSheet::new(engine.store(), engine.builder.clone())
            .execute(id)
            .await
            .unwrap();
        let after = GetCharacterSheet::new(engine.store(), reseeded)
            .execute(id)
            .await
            .unwrap();
        assert_eq!(before.abilities, after.abilities);
        assert_eq!(before.skills, after.skills);
        assert_eq!(before.spell_slots, after.spell_slots);
        assert_eq!(before.hit_points, after.hit_points);
    }

    #[tokio::test]
    async fn unknown_race_is_underivable() {
        let engine = TestEngine::new();
        let orphan = Character::new(
            CharacterName::new("Nobody").unwrap(),
            slug("tortle"),
            None,
            AbilityScores::uniform(10),
            slug("fighter"),
        );
        let id = engine.insert(orphan).await;

        let err = GetCharacterSheet::new(engine.store(), engine.builder.clone())
            .execute(id)
            .await
            .unwrap_err();
        match err {
            ResolutionError::Underivable(issues) => {
                assert_eq!(issues[0].code, IssueCode::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
