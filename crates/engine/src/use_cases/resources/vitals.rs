//! Damage and healing.

use sheetsmith_domain::{CharacterId, HitPoints};

use super::{ResourceError, ResourceStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HpAdjustment {
    Damage(u32),
    Heal(u32),
    /// Temporary hit points do not stack; the larger pool is kept
    Temporary(u32),
}

pub struct AdjustHitPoints {
    store: ResourceStore,
}

impl AdjustHitPoints {
    pub fn new(store: ResourceStore) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        id: CharacterId,
        adjustment: HpAdjustment,
    ) -> Result<HitPoints, ResourceError> {
        let hit_points = self
            .store
            .update(id, |character| {
                let before = *character.hit_points();
                match adjustment {
                    HpAdjustment::Damage(amount) => character.take_damage(amount),
                    HpAdjustment::Heal(amount) => {
                        character.heal(amount);
                    }
                    HpAdjustment::Temporary(amount) => character.set_temporary_hit_points(amount),
                }
                let after = *character.hit_points();
                Ok((after, after != before))
            })
            .await?;

        tracing::debug!(
            character_id = %id,
            adjustment = ?adjustment,
            current = hit_points.current(),
            "Hit points adjusted"
        );
        Ok(hit_points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{level_one, TestEngine};

    #[tokio::test]
    async fn damage_then_heal() {
        let engine = TestEngine::new();
        let id = engine.insert(level_one("Maren", "cleric")).await;
        let use_case = AdjustHitPoints::new(ResourceStore::new(
            engine.store(),
            engine.locks.clone(),
            engine.clock.clone(),
        ));

        let hp = use_case
            .execute(id, HpAdjustment::Temporary(3))
            .await
            .unwrap();
        assert_eq!(hp.temporary, 3);

        let hp = use_case.execute(id, HpAdjustment::Damage(7)).await.unwrap();
        assert_eq!((hp.temporary, hp.current()), (0, 6));

        let hp = use_case.execute(id, HpAdjustment::Heal(100)).await.unwrap();
        assert_eq!(hp.current(), 10);
        assert_eq!(engine.stored(id).await.hit_points().current(), 10);
    }
}
