//! In-memory character store.

use async_trait::async_trait;
use dashmap::DashMap;
use sheetsmith_domain::{Character, CharacterId};

use crate::infrastructure::ports::{CharacterStore, RepoError};

/// Characters held in a concurrent map. Contents are lost on drop.
#[derive(Default)]
pub struct InMemoryCharacterStore {
    characters: DashMap<CharacterId, Character>,
}

impl InMemoryCharacterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CharacterStore for InMemoryCharacterStore {
    async fn get(&self, id: CharacterId) -> Result<Option<Character>, RepoError> {
        Ok(self.characters.get(&id).map(|c| c.value().clone()))
    }

    async fn save(&self, character: &Character) -> Result<(), RepoError> {
        character.check_integrity().map_err(RepoError::conflict)?;
        self.characters.insert(character.id(), character.clone());
        Ok(())
    }

    async fn delete(&self, id: CharacterId) -> Result<(), RepoError> {
        self.characters.remove(&id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Character>, RepoError> {
        let mut characters: Vec<Character> =
            self.characters.iter().map(|c| c.value().clone()).collect();
        characters.sort_by(|a, b| a.name().as_str().cmp(b.name().as_str()));
        Ok(characters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{duplicate_language_character, level_one};

    #[tokio::test]
    async fn save_get_delete() {
        let store = InMemoryCharacterStore::new();
        let character = level_one("Vex", "cleric");

        store.save(&character).await.unwrap();
        assert_eq!(store.get(character.id()).await.unwrap(), Some(character.clone()));
        assert_eq!(store.list().await.unwrap().len(), 1);

        store.delete(character.id()).await.unwrap();
        assert!(store.get(character.id()).await.unwrap().is_none());
        store.delete(character.id()).await.unwrap();
    }

    #[tokio::test]
    async fn conflicting_save_keeps_stored_value() {
        let store = InMemoryCharacterStore::new();
        let original = level_one("Vex", "cleric");
        store.save(&original).await.unwrap();

        let broken = duplicate_language_character(original.clone());
        let err = store.save(&broken).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.get(original.id()).await.unwrap(), Some(original));
    }
}
