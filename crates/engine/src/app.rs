//! Application state and composition.

use std::sync::Arc;

use sheetsmith_domain::{
    CalculationEngine, CharacterBuilder, CompendiumRepository, Dnd5eRules, ResolutionPolicy,
};

use crate::config::EngineConfig;
use crate::infrastructure::{
    clock::{SystemClock, SystemRandom},
    locks::CharacterLocks,
    memory_store::InMemoryCharacterStore,
    ports::{CharacterStore, ClockPort, RandomPort, RepoError},
    sqlite_store::SqliteCharacterStore,
};
use crate::use_cases::{self, resources::ResourceStore, spells::SpellListStore};

/// Main application state.
///
/// Holds the store, the shared character builder and every use case.
pub struct App {
    pub config: EngineConfig,
    pub store: Arc<dyn CharacterStore>,
    pub builder: Arc<CharacterBuilder>,
    pub use_cases: UseCases,
}

/// Container for all use cases.
pub struct UseCases {
    pub resolution: use_cases::ResolutionUseCases,
    pub lifecycle: use_cases::LifecycleUseCases,
    pub resources: use_cases::ResourceUseCases,
    pub spells: use_cases::SpellUseCases,
    pub portability: use_cases::PortabilityUseCases,
}

impl App {
    /// Wire the engine over `compendium`.
    ///
    /// The SQLite store is opened when the config names a database file;
    /// otherwise characters live in memory.
    pub async fn new(
        config: EngineConfig,
        compendium: Arc<dyn CompendiumRepository>,
    ) -> Result<Self, RepoError> {
        let store: Arc<dyn CharacterStore> = match &config.database_path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Opening SQLite character store");
                Arc::new(SqliteCharacterStore::new(&path.to_string_lossy()).await?)
            }
            None => {
                tracing::info!("Using in-memory character store");
                Arc::new(InMemoryCharacterStore::new())
            }
        };

        Ok(Self::with_parts(
            config,
            compendium,
            store,
            Arc::new(SystemClock),
            Arc::new(SystemRandom),
        ))
    }

    /// Wire the engine from explicit ports.
    pub fn with_parts(
        config: EngineConfig,
        compendium: Arc<dyn CompendiumRepository>,
        store: Arc<dyn CharacterStore>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        let rules: Arc<dyn CalculationEngine> = Arc::new(Dnd5eRules::new());
        let builder = Arc::new(
            CharacterBuilder::new(compendium, rules.clone()).with_policy(ResolutionPolicy {
                unverifiable: config.unverifiable_policy,
            }),
        );
        let locks = Arc::new(CharacterLocks::new());

        let resolution = use_cases::ResolutionUseCases::new(
            Arc::new(use_cases::resolution::ResolveCharacter::new(
                store.clone(),
                builder.clone(),
                locks.clone(),
                clock.clone(),
            )),
            Arc::new(use_cases::resolution::ListEligibleFeats::new(
                store.clone(),
                builder.clone(),
            )),
            Arc::new(use_cases::resolution::GetCharacterSheet::new(
                store.clone(),
                builder.clone(),
            )),
        );

        let lifecycle = use_cases::LifecycleUseCases::new(
            Arc::new(use_cases::lifecycle::CreateCharacter::new(
                store.clone(),
                builder.clone(),
                clock.clone(),
            )),
            Arc::new(use_cases::lifecycle::AddClassLevel::new(
                store.clone(),
                builder.clone(),
                locks.clone(),
                clock.clone(),
                random.clone(),
                &config,
            )),
            Arc::new(use_cases::lifecycle::SetSubclass::new(
                store.clone(),
                builder.clone(),
                locks.clone(),
                clock.clone(),
            )),
            Arc::new(use_cases::lifecycle::DeleteCharacter::new(
                store.clone(),
                locks.clone(),
            )),
        );

        let resources = use_cases::ResourceUseCases::new(
            ResourceStore::new(store.clone(), locks.clone(), clock.clone()),
            rules,
            random,
        );

        let spells = use_cases::SpellUseCases::new(SpellListStore::new(
            store.clone(),
            builder.clone(),
            locks.clone(),
            clock.clone(),
        ));

        let portability = use_cases::PortabilityUseCases::new(
            Arc::new(use_cases::portability::ExportCharacter::new(
                store.clone(),
                clock.clone(),
            )),
            Arc::new(use_cases::portability::ImportCharacter::new(
                store.clone(),
                builder.clone(),
                clock,
            )),
            Arc::new(use_cases::portability::ValidateReferences::new(
                store.clone(),
                builder.clone(),
            )),
        );

        Self {
            config,
            store,
            builder,
            use_cases: UseCases {
                resolution,
                lifecycle,
                resources,
                spells,
                portability,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::{FixedClock, FixedRandom};
    use crate::test_fixtures::{catalog, fixed_time, slug};
    use crate::use_cases::lifecycle::{AddClassLevelInput, CreateCharacterInput, HpChoice};
    use sheetsmith_domain::{
        AbilityScores, ChoiceSelection, CounterUse, PreparationStatus, ResolutionRequest, RestType,
        UnverifiablePolicy,
    };

    fn app(config: EngineConfig) -> App {
        App::with_parts(
            config,
            catalog(),
            Arc::new(InMemoryCharacterStore::new()),
            Arc::new(FixedClock(fixed_time())),
            Arc::new(FixedRandom(7)),
        )
    }

    #[tokio::test]
    async fn fighter_career() {
        let app = app(EngineConfig::default());
        let lifecycle = &app.use_cases.lifecycle;

        let created = lifecycle
            .create
            .execute(CreateCharacterInput {
                name: "Gareth".to_string(),
                race: slug("human"),
                background: Some(slug("soldier")),
                class: slug("fighter"),
                base_scores: AbilityScores::new(15, 13, 14, 10, 12, 8).unwrap(),
                request: ResolutionRequest::default().with_choice(ChoiceSelection::new(
                    "ability-scores",
                    vec![slug("str"), slug("con")],
                )),
            })
            .await
            .unwrap();
        assert!(created.success, "{:?}", created.validation_errors);
        let id = created.character.id();

        for _ in 0..2 {
            lifecycle
                .add_level
                .execute(
                    id,
                    AddClassLevelInput::new(slug("fighter")).with_hp(HpChoice::Roll),
                )
                .await
                .unwrap();
        }
        lifecycle
            .set_subclass
            .execute(
                id,
                slug("fighter"),
                slug("eldritch-knight"),
                ResolutionRequest::default(),
            )
            .await
            .unwrap();

        let sheet = app.use_cases.resolution.sheet.execute(id).await.unwrap();
        assert_eq!(sheet.total_level, 3);
        // 10 + 2 at first level, then two rolled 7s + 2
        assert_eq!(sheet.hit_points.max, 12 + 9 + 9);
        assert_eq!(sheet.spell_slots.len(), 1);

        let resources = &app.use_cases.resources;
        assert_eq!(
            resources
                .use_counter
                .execute(id, "Second Wind", None)
                .await
                .unwrap(),
            CounterUse::Used { remaining: 0 }
        );
        let rest = resources
            .take_rest
            .execute(id, RestType::Short)
            .await
            .unwrap();
        assert_eq!(rest.counters_reset, vec!["Second Wind".to_string()]);

        let document = app.use_cases.portability.export.execute(id).await.unwrap();
        let imported = app
            .use_cases
            .portability
            .import
            .execute(&document)
            .await
            .unwrap();
        assert!(imported.resolution.success);
        assert_eq!(app.store.list().await.unwrap().len(), 2);

        lifecycle.delete.execute(id).await.unwrap();
        assert_eq!(app.store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn prepared_spells_survive_a_level_up() {
        let app = app(EngineConfig::default());
        let created = app
            .use_cases
            .lifecycle
            .create
            .execute(CreateCharacterInput {
                name: "Maren".to_string(),
                race: slug("human"),
                background: None,
                class: slug("cleric"),
                base_scores: AbilityScores::uniform(14),
                request: ResolutionRequest::default(),
            })
            .await
            .unwrap();
        let id = created.character.id();

        app.use_cases
            .spells
            .prepare
            .execute(id, slug("bless"), None)
            .await
            .unwrap();
        app.use_cases
            .lifecycle
            .add_level
            .execute(id, AddClassLevelInput::new(slug("cleric")))
            .await
            .unwrap();

        let stored = app.store.get(id).await.unwrap().unwrap();
        assert_eq!(stored.total_level(), 2);
        assert_eq!(
            stored.spell(&slug("bless")).map(|s| s.status),
            Some(PreparationStatus::Prepared)
        );
    }

    #[tokio::test]
    async fn configured_policy_reaches_the_builder() {
        let config = EngineConfig {
            unverifiable_policy: UnverifiablePolicy::Allow,
            max_level: 1,
            ..EngineConfig::default()
        };
        let app = app(config);
        assert_eq!(
            app.builder.policy().unverifiable,
            UnverifiablePolicy::Allow
        );

        let created = app
            .use_cases
            .lifecycle
            .create
            .execute(CreateCharacterInput {
                name: "Maren".to_string(),
                race: slug("human"),
                background: None,
                class: slug("cleric"),
                base_scores: AbilityScores::uniform(13),
                request: ResolutionRequest::default()
                    .adding_feat(slug("chosen-of-the-gods")),
            })
            .await
            .unwrap();
        assert!(created.success);
        assert_eq!(created.unverifiable_prerequisites.len(), 1);

        let err = app
            .use_cases
            .lifecycle
            .add_level
            .execute(created.character.id(), AddClassLevelInput::new(slug("cleric")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            use_cases::lifecycle::LifecycleError::Domain(_)
        ));
    }
}
