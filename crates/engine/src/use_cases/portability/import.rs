//! Import a portable character document.

use std::sync::Arc;

use sheetsmith_domain::{
    CharacterBuilder, CharacterExport, CharacterId, Resolution, ResolutionRequest,
};

use crate::infrastructure::ports::{CharacterStore, ClockPort};

use super::references::{dangling_references, ReferenceReport};
use super::PortabilityError;

#[derive(Debug, Clone)]
pub struct ImportReport {
    pub character_id: CharacterId,
    /// Slugs the current compendium does not know; kept on the character
    pub warnings: ReferenceReport,
    pub resolution: Resolution,
}

pub struct ImportCharacter {
    store: Arc<dyn CharacterStore>,
    builder: Arc<CharacterBuilder>,
    clock: Arc<dyn ClockPort>,
}

impl ImportCharacter {
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

    /// Store the document under a new id and resolve it against the current
    /// compendium.
    ///
    /// A character that no longer resolves is still stored as imported; the
    /// resolution's issues say what needs fixing.
    pub async fn execute(&self, document: &str) -> Result<ImportReport, PortabilityError> {
        let export: CharacterExport = serde_json::from_str(document)?;
        let id = CharacterId::new();
        let imported = export.into_character(id)?;

        let warnings = dangling_references(self.builder.repository(), &imported);
        for reference in warnings.iter() {
            tracing::warn!(character_id = %id, reference = %reference, "Imported dangling reference");
        }

        let resolution = self.builder.resolve(&imported, &ResolutionRequest::default());
        let mut stored = resolution.character.clone();
        stored.touch(self.clock.now());
        self.store.save(&stored).await?;

        tracing::info!(
            character_id = %id,
            resolved = resolution.success,
            dangling = warnings.len(),
            "Character imported"
        );
        Ok(ImportReport {
            character_id: id,
            warnings,
            resolution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{level_one, reseeded_catalog, slug, TestEngine};
    use crate::use_cases::portability::ExportCharacter;
    use sheetsmith_domain::{
        ChoiceSelection, Dnd5eRules, EntityKind, EntityRef, IssueCode, PortableCharacter,
    };

    async fn exported(engine: &TestEngine, id: CharacterId) -> String {
        ExportCharacter::new(engine.store(), engine.clock.clone())
            .execute(id)
            .await
            .unwrap()
    }

    fn cleric_with_skills(engine: &TestEngine) -> sheetsmith_domain::Character {
        let request = ResolutionRequest::default().with_choice(ChoiceSelection::new(
            "skills",
            vec![slug("history"), slug("medicine")],
        ));
        let resolution = engine
            .builder
            .resolve(&level_one("Maren", "cleric"), &request);
        assert!(resolution.success);
        resolution.character
    }

    #[tokio::test]
    async fn round_trip_creates_a_new_character() {
        let engine = TestEngine::new();
        let original = cleric_with_skills(&engine);
        let id = engine.insert(original.clone()).await;
        let document = exported(&engine, id).await;

        let report = ImportCharacter::new(engine.store(), engine.builder.clone(), engine.clock.clone())
            .execute(&document)
            .await
            .unwrap();

        assert_ne!(report.character_id, id);
        assert!(report.warnings.is_empty());
        assert!(report.resolution.success);
        let imported = engine.stored(report.character_id).await;
        assert_eq!(
            PortableCharacter::from(&imported),
            PortableCharacter::from(&original)
        );
    }

    #[tokio::test]
    async fn import_survives_a_reseed() {
        let engine = TestEngine::new();
        let original = cleric_with_skills(&engine);
        let id = engine.insert(original.clone()).await;
        let document = exported(&engine, id).await;

        let reseeded = TestEngine {
            builder: Arc::new(CharacterBuilder::new(
                reseeded_catalog(),
                Arc::new(Dnd5eRules::new()),
            )),
            ..TestEngine::new()
        };
        let report = ImportCharacter::new(
            reseeded.store(),
            reseeded.builder.clone(),
            reseeded.clock.clone(),
        )
        .execute(&document)
        .await
        .unwrap();

        assert!(report.resolution.success, "{:?}", report.resolution.validation_errors);
        let imported = reseeded.stored(report.character_id).await;
        assert_eq!(imported.proficiencies(), original.proficiencies());
        assert_eq!(imported.spell_slots(), original.spell_slots());
        assert_eq!(imported.hit_points(), original.hit_points());
    }

    #[tokio::test]
    async fn dangling_references_are_kept_as_warnings() {
        let engine = TestEngine::new();
        let id = engine.insert(level_one("Maren", "cleric")).await;
        let mut value: serde_json::Value =
            serde_json::from_str(&exported(&engine, id).await).unwrap();
        value["character"]["race"] = serde_json::json!("tortle");

        let report = ImportCharacter::new(engine.store(), engine.builder.clone(), engine.clock.clone())
            .execute(&value.to_string())
            .await
            .unwrap();

        assert_eq!(
            report.warnings.dangling["race"],
            vec![EntityRef::new(EntityKind::Race, slug("tortle"))]
        );
        assert!(!report.resolution.success);
        assert_eq!(report.resolution.validation_errors[0].code, IssueCode::NotFound);
        let stored = engine.stored(report.character_id).await;
        assert_eq!(stored.race().as_str(), "tortle");
    }

    #[tokio::test]
    async fn malformed_documents_are_rejected() {
        let engine = TestEngine::new();
        let use_case = ImportCharacter::new(engine.store(), engine.builder.clone(), engine.clock.clone());

        let err = use_case.execute("{\"formatVersion\": 1}").await.unwrap_err();
        assert!(matches!(err, PortabilityError::InvalidDocument(_)));

        let id = engine.insert(level_one("Maren", "cleric")).await;
        let mut value: serde_json::Value =
            serde_json::from_str(&exported(&engine, id).await).unwrap();
        value["formatVersion"] = serde_json::json!(99);
        let err = use_case.execute(&value.to_string()).await.unwrap_err();
        assert!(matches!(err, PortabilityError::Domain(_)));
    }
}
