//! Export a character as a portable, slug-only document.

use std::sync::Arc;

use sheetsmith_domain::{CharacterExport, CharacterId};

use crate::infrastructure::ports::{CharacterStore, ClockPort};

use super::PortabilityError;

pub struct ExportCharacter {
    store: Arc<dyn CharacterStore>,
    clock: Arc<dyn ClockPort>,
}

impl ExportCharacter {
    pub fn new(store: Arc<dyn CharacterStore>, clock: Arc<dyn ClockPort>) -> Self {
        Self { store, clock }
    }

    /// The export envelope as pretty-printed JSON.
    pub async fn execute(&self, id: CharacterId) -> Result<String, PortabilityError> {
        let character = self
            .store
            .get(id)
            .await?
            .ok_or(PortabilityError::CharacterNotFound(id))?;

        let export = CharacterExport::new(&character, self.clock.now());
        let document = serde_json::to_string_pretty(&export)?;
        tracing::info!(character_id = %id, bytes = document.len(), "Character exported");
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{fixed_time, level_one, TestEngine};
    use sheetsmith_domain::EXPORT_FORMAT_VERSION;

    #[tokio::test]
    async fn document_carries_no_identity() {
        let engine = TestEngine::new();
        let character = level_one("Maren", "cleric");
        let id = engine.insert(character).await;

        let document = ExportCharacter::new(engine.store(), engine.clock.clone())
            .execute(id)
            .await
            .unwrap();

        assert!(!document.contains(&id.to_string()));
        let value: serde_json::Value = serde_json::from_str(&document).unwrap();
        assert_eq!(value["formatVersion"], EXPORT_FORMAT_VERSION);
        assert_eq!(
            value["exportedAt"],
            serde_json::to_value(fixed_time()).unwrap()
        );
        assert_eq!(value["character"]["name"], "Maren");
        assert!(value["character"]["race"]
            .as_str()
            .unwrap()
            .ends_with("human"));
    }

    #[tokio::test]
    async fn missing_character_is_an_error() {
        let engine = TestEngine::new();
        let err = ExportCharacter::new(engine.store(), engine.clock.clone())
            .execute(CharacterId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PortabilityError::CharacterNotFound(_)));
    }
}
