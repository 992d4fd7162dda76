//! Feat eligibility listing.

use std::sync::Arc;

use sheetsmith_domain::{
    CharacterBuilder, CharacterId, EntityKind, PrerequisiteOutcome, Slug,
};

use crate::infrastructure::ports::CharacterStore;

use super::ResolutionError;

/// One feat and whether the character could take it now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatEligibility {
    pub feat: Slug,
    pub name: String,
    pub outcome: PrerequisiteOutcome,
    pub already_taken: bool,
}

impl FeatEligibility {
    /// Eligible and not yet taken.
    pub fn is_available(&self) -> bool {
        self.outcome.is_eligible() && !self.already_taken
    }
}

pub struct ListEligibleFeats {
    store: Arc<dyn CharacterStore>,
    builder: Arc<CharacterBuilder>,
}

impl ListEligibleFeats {
    pub fn new(store: Arc<dyn CharacterStore>, builder: Arc<CharacterBuilder>) -> Self {
        Self { store, builder }
    }

    /// Every compendium feat with its prerequisite outcome, in catalog order.
    pub async fn execute(&self, id: CharacterId) -> Result<Vec<FeatEligibility>, ResolutionError> {
        let character = self
            .store
            .get(id)
            .await?
            .ok_or(ResolutionError::CharacterNotFound(id))?;

        let feats = self.builder.repository().list(EntityKind::Feat);
        let mut listing = Vec::with_capacity(feats.len());
        for feat in feats {
            let outcome = self
                .builder
                .eligibility(&character, &feat.entity_ref())
                .map_err(ResolutionError::Underivable)?;
            listing.push(FeatEligibility {
                already_taken: character.has_feat(feat.slug()),
                feat: feat.slug().clone(),
                name: feat.name().to_string(),
                outcome,
            });
        }

        tracing::debug!(
            character_id = %id,
            feats = listing.len(),
            available = listing.iter().filter(|f| f.is_available()).count(),
            "Listed feat eligibility"
        );
        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::MockCharacterStore;
    use crate::test_fixtures::{builder, level_one, slug, TestEngine};
    use mockall::predicate::*;
    use sheetsmith_domain::ResolutionRequest;

    fn find<'a>(listing: &'a [FeatEligibility], feat: &str) -> &'a FeatEligibility {
        listing
            .iter()
            .find(|f| f.feat.base() == feat)
            .unwrap_or_else(|| panic!("{} is listed", feat))
    }

    #[tokio::test]
    async fn lists_every_feat_with_its_outcome() {
        let engine = TestEngine::new();
        let id = engine.insert(level_one("Maren", "cleric")).await;
        let use_case = ListEligibleFeats::new(engine.store(), engine.builder.clone());

        let listing = use_case.execute(id).await.unwrap();

        assert_eq!(
            listing.len(),
            engine.builder.repository().list(EntityKind::Feat).len()
        );
        assert!(find(&listing, "alert").is_available());
        assert!(find(&listing, "grappler").outcome.is_eligible());
        assert!(matches!(
            find(&listing, "chosen-of-the-gods").outcome,
            PrerequisiteOutcome::Unverifiable { .. }
        ));
    }

    #[tokio::test]
    async fn taken_feats_are_flagged() {
        let engine = TestEngine::new();
        let character = level_one("Maren", "fighter");
        let taken = engine
            .builder
            .resolve(&character, &ResolutionRequest::default().adding_feat(slug("alert")));
        assert!(taken.success, "{:?}", taken.validation_errors);
        let id = engine.insert(taken.character).await;

        let listing = ListEligibleFeats::new(engine.store(), engine.builder.clone())
            .execute(id)
            .await
            .unwrap();

        let alert = find(&listing, "alert");
        assert!(alert.already_taken);
        assert!(!alert.is_available());
        assert!(!find(&listing, "tough").already_taken);
    }

    #[tokio::test]
    async fn missing_character_is_an_error() {
        let mut store = MockCharacterStore::new();
        let id = CharacterId::new();
        store.expect_get().with(eq(id)).returning(|_| Ok(None));

        let err = ListEligibleFeats::new(Arc::new(store), Arc::new(builder()))
            .execute(id)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::CharacterNotFound(_)));
    }
}
