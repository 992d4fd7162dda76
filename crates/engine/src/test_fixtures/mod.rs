//! Common test helpers: the SRD-like compendium, resolved characters and
//! in-memory wiring for use-case tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_fixtures::{level_one, TestEngine};
//!
//! #[tokio::test]
//! async fn cleric_levels_up() {
//!     let engine = TestEngine::new();
//!     let id = engine.insert(level_one("Maren", "cleric")).await;
//!     // ... test logic
//! }
//! ```

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use sheetsmith_domain::testing::{srd_catalog, srd_catalog_with_offset};
use sheetsmith_domain::{
    AbilityScores, Catalog, Character, CharacterBuilder, CharacterId, CharacterName, Dnd5eRules,
    ResolutionRequest, Slug,
};

use crate::config::EngineConfig;
use crate::infrastructure::clock::{FixedClock, FixedRandom};
use crate::infrastructure::locks::CharacterLocks;
use crate::infrastructure::memory_store::InMemoryCharacterStore;
use crate::infrastructure::ports::{CharacterStore, ClockPort, RandomPort};

// =============================================================================
// Compendium
// =============================================================================

/// The fixture compendium.
///
/// # Panics
///
/// Panics if the fixture data breaks a catalog invariant.
pub fn catalog() -> Arc<Catalog> {
    Arc::new(srd_catalog().expect("fixture catalog builds"))
}

/// The same compendium with every internal key shifted, as after a reseed.
pub fn reseeded_catalog() -> Arc<Catalog> {
    Arc::new(srd_catalog_with_offset(50_000).expect("reseeded fixture catalog builds"))
}

pub fn builder() -> CharacterBuilder {
    CharacterBuilder::new(catalog(), Arc::new(Dnd5eRules::new()))
}

pub fn slug(s: &str) -> Slug {
    Slug::new(s).expect("valid slug")
}

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 10, 30, 0).unwrap()
}

// =============================================================================
// Characters
// =============================================================================

/// A resolved level-1 human of `class` with 14 in every score.
pub fn level_one(name: &str, class: &str) -> Character {
    let character = Character::new(
        CharacterName::new(name).expect("valid name"),
        slug("human"),
        None,
        AbilityScores::uniform(14),
        slug(class),
    );
    let resolution = builder().resolve(&character, &ResolutionRequest::default());
    assert!(resolution.success, "{:?}", resolution.validation_errors);
    resolution.character
}

/// A copy of `character` whose first language row appears twice.
///
/// Built through the serialized form, which is the only way to get past the
/// aggregate's own guards.
pub fn duplicate_language_character(character: Character) -> Character {
    let mut value = serde_json::to_value(&character).unwrap();
    let languages = value["languages"].as_array_mut().unwrap();
    let first = languages[0].clone();
    languages.push(first);
    serde_json::from_value(value).unwrap()
}

// =============================================================================
// Wiring
// =============================================================================

/// In-memory ports shared by a test's use cases.
pub struct TestEngine {
    pub store: Arc<InMemoryCharacterStore>,
    pub builder: Arc<CharacterBuilder>,
    pub locks: Arc<CharacterLocks>,
    pub clock: Arc<dyn ClockPort>,
    pub random: Arc<dyn RandomPort>,
    pub config: EngineConfig,
}

impl TestEngine {
    pub fn new() -> Self {
        Self::with_roll(4)
    }

    /// Wiring whose random port always rolls `roll` (clamped to the die).
    pub fn with_roll(roll: i32) -> Self {
        Self {
            store: Arc::new(InMemoryCharacterStore::new()),
            builder: Arc::new(builder()),
            locks: Arc::new(CharacterLocks::new()),
            clock: Arc::new(FixedClock(fixed_time())),
            random: Arc::new(FixedRandom(roll)),
            config: EngineConfig::default(),
        }
    }

    pub fn store(&self) -> Arc<dyn CharacterStore> {
        self.store.clone()
    }

    pub async fn insert(&self, character: Character) -> CharacterId {
        let id = character.id();
        self.store.save(&character).await.unwrap();
        id
    }

    pub async fn stored(&self, id: CharacterId) -> Character {
        self.store.get(id).await.unwrap().expect("character is stored")
    }
}
