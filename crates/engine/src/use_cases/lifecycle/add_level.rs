//! Level up in an existing class or multiclass into a new one.

use std::sync::Arc;

use sheetsmith_domain::{
    Character, CharacterBuilder, CharacterId, EntityKind, EntityRef, LevelUpOutcome,
    PrerequisiteOutcome, Resolution, ResolutionRequest, Slug, UnverifiablePolicy,
};

use crate::config::{EngineConfig, HpMethod};
use crate::infrastructure::locks::CharacterLocks;
use crate::infrastructure::ports::{CharacterStore, ClockPort, RandomPort};

use super::LifecycleError;

/// How the new level's hit points are gained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HpChoice {
    /// Fixed average of the hit die
    Average,
    /// A roll made outside the engine
    Fixed(u8),
    /// Roll the hit die now
    Roll,
}

impl From<HpMethod> for HpChoice {
    fn from(method: HpMethod) -> Self {
        match method {
            HpMethod::Average => Self::Average,
            HpMethod::Roll => Self::Roll,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AddClassLevelInput {
    pub class: Slug,
    /// Falls back to the configured method
    pub hp: Option<HpChoice>,
    /// Choices unlocked by the new level, resolved in the same transaction
    pub request: ResolutionRequest,
}

impl AddClassLevelInput {
    pub fn new(class: Slug) -> Self {
        Self {
            class,
            hp: None,
            request: ResolutionRequest::default(),
        }
    }

    pub fn with_hp(mut self, hp: HpChoice) -> Self {
        self.hp = Some(hp);
        self
    }

    pub fn with_request(mut self, request: ResolutionRequest) -> Self {
        self.request = request;
        self
    }
}

#[derive(Debug, Clone)]
pub struct LevelUp {
    pub outcome: LevelUpOutcome,
    pub resolution: Resolution,
}

pub struct AddClassLevel {
    store: Arc<dyn CharacterStore>,
    builder: Arc<CharacterBuilder>,
    locks: Arc<CharacterLocks>,
    clock: Arc<dyn ClockPort>,
    random: Arc<dyn RandomPort>,
    max_level: u8,
    default_hp: HpMethod,
}

impl AddClassLevel {
    pub fn new(
        store: Arc<dyn CharacterStore>,
        builder: Arc<CharacterBuilder>,
        locks: Arc<CharacterLocks>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            store,
            builder,
            locks,
            clock,
            random,
            max_level: config.max_level,
            default_hp: config.hp_method,
        }
    }

    pub async fn execute(
        &self,
        id: CharacterId,
        input: AddClassLevelInput,
    ) -> Result<LevelUp, LifecycleError> {
        let _guard = self.locks.acquire(id).await;
        let mut character = self
            .store
            .get(id)
            .await?
            .ok_or(LifecycleError::CharacterNotFound(id))?;

        let class = self.builder.repository().class(&input.class)?;
        if class.is_subclass() {
            return Err(LifecycleError::SubclassNotLevelable(class.slug));
        }

        if character.class_entry(&class.slug).is_none() {
            self.check_multiclass(&character, &class.slug)?;
        }

        let hp_roll = match input.hp.unwrap_or_else(|| self.default_hp.into()) {
            HpChoice::Average => None,
            HpChoice::Fixed(roll) => {
                if roll == 0 || roll > class.hit_die {
                    return Err(LifecycleError::InvalidHitPointRoll {
                        roll,
                        hit_die: class.hit_die,
                    });
                }
                Some(roll)
            }
            HpChoice::Roll => {
                let rolled = self.random.gen_range(1, i32::from(class.hit_die));
                Some(u8::try_from(rolled.clamp(1, i32::from(class.hit_die))).unwrap_or(1))
            }
        };

        let outcome = character.add_class_level(class.slug.clone(), hp_roll, self.max_level)?;
        let mut resolution = self.builder.resolve(&character, &input.request);
        if !resolution.success {
            tracing::debug!(
                character_id = %id,
                class = %class.slug,
                issues = resolution.validation_errors.len(),
                "Level-up rejected"
            );
            return Err(LifecycleError::Rejected(Box::new(resolution)));
        }

        resolution.character.touch(self.clock.now());
        self.store.save(&resolution.character).await?;

        tracing::info!(
            character_id = %id,
            class = %class.slug,
            total_level = outcome.total_level(),
            hp_roll = ?hp_roll,
            multiclassed = matches!(outcome, LevelUpOutcome::Multiclassed { .. }),
            "Class level added"
        );
        Ok(LevelUp {
            outcome,
            resolution,
        })
    }

    /// Both the new class and every class already held must accept the character.
    fn check_multiclass(&self, character: &Character, new_class: &Slug) -> Result<(), LifecycleError> {
        let targets = std::iter::once(new_class.clone())
            .chain(character.classes().iter().map(|c| c.class.clone()));

        for class in targets {
            let entity = EntityRef::new(EntityKind::Class, class.clone());
            let outcome = self
                .builder
                .eligibility(character, &entity)
                .map_err(|issues| {
                    LifecycleError::Rejected(Box::new(Resolution {
                        success: false,
                        character: character.clone(),
                        validation_errors: issues,
                        unmet_prerequisites: Vec::new(),
                        unverifiable_prerequisites: Vec::new(),
                        pending_choices: Vec::new(),
                    }))
                })?;

            match outcome {
                PrerequisiteOutcome::Eligible => {}
                PrerequisiteOutcome::NotMet { unmet } => {
                    return Err(LifecycleError::PrerequisitesNotMet { class, unmet });
                }
                PrerequisiteOutcome::Unverifiable {
                    requirements,
                    unmet,
                } => {
                    if self.builder.policy().unverifiable == UnverifiablePolicy::Block {
                        return Err(LifecycleError::UnverifiablePrerequisites {
                            class,
                            requirements,
                            unmet,
                        });
                    }
                    tracing::warn!(
                        character_id = %character.id(),
                        class = %class,
                        "Multiclass allowed with unverified prerequisites"
                    );
                }
            }
        }
        Ok(())
    }
}
