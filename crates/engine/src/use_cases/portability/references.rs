//! Dangling compendium references.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use sheetsmith_domain::{
    Character, CharacterBuilder, CharacterId, CompendiumRepository, EntityRef,
};

use crate::infrastructure::ports::CharacterStore;

use super::PortabilityError;

/// References that no longer resolve, grouped by entity kind (`"race"`,
/// `"spell"`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReferenceReport {
    pub dangling: BTreeMap<&'static str, Vec<EntityRef>>,
}

impl ReferenceReport {
    pub fn len(&self) -> usize {
        self.dangling.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityRef> {
        self.dangling.values().flatten()
    }
}

/// Check every slug the character points at.
///
/// Only a missing entity counts; an unprefixed slug that became ambiguous
/// still exists and is reported by resolution instead.
pub fn dangling_references(repo: &dyn CompendiumRepository, character: &Character) -> ReferenceReport {
    let mut report = ReferenceReport::default();
    for reference in character.referenced() {
        if matches!(repo.entity_by_ref(&reference), Err(e) if e.is_not_found()) {
            report
                .dangling
                .entry(reference.kind.as_str())
                .or_default()
                .push(reference);
        }
    }
    report
}

pub struct ValidateReferences {
    store: Arc<dyn CharacterStore>,
    builder: Arc<CharacterBuilder>,
}

impl ValidateReferences {
    pub fn new(store: Arc<dyn CharacterStore>, builder: Arc<CharacterBuilder>) -> Self {
        Self { store, builder }
    }

    pub async fn execute(&self, id: CharacterId) -> Result<ReferenceReport, PortabilityError> {
        let character = self
            .store
            .get(id)
            .await?
            .ok_or(PortabilityError::CharacterNotFound(id))?;

        let report = dangling_references(self.builder.repository(), &character);
        for reference in report.iter() {
            tracing::warn!(character_id = %id, reference = %reference, "Dangling reference");
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{level_one, slug, TestEngine};
    use sheetsmith_domain::{AbilityScores, CharacterName, EntityKind};

    #[tokio::test]
    async fn resolved_character_is_clean() {
        let engine = TestEngine::new();
        let id = engine.insert(level_one("Maren", "cleric")).await;

        let report = ValidateReferences::new(engine.store(), engine.builder.clone())
            .execute(id)
            .await
            .unwrap();
        assert!(report.is_empty());
    }

    #[tokio::test]
    async fn groups_missing_slugs_by_kind() {
        let engine = TestEngine::new();
        let mut character = Character::new(
            CharacterName::new("Drift").unwrap(),
            slug("tortle"),
            Some(slug("urchin")),
            AbilityScores::uniform(10),
            slug("fighter"),
        );
        character.add_equipment(slug("vorpal-sword"), 1);
        let id = engine.insert(character).await;

        let report = ValidateReferences::new(engine.store(), engine.builder.clone())
            .execute(id)
            .await
            .unwrap();

        assert_eq!(report.len(), 3);
        assert_eq!(
            report.dangling["race"],
            vec![EntityRef::new(EntityKind::Race, slug("tortle"))]
        );
        assert_eq!(report.dangling["background"].len(), 1);
        assert_eq!(report.dangling["item"].len(), 1);
        assert!(!report.dangling.contains_key("class"));
    }
}
